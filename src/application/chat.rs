use std::io::Write;

use anyhow::Result;
use tokio::sync::mpsc;
use yansi::Paint;

use super::output::format_architecture;
use super::output::format_message;
use crate::domain::models::Action;
use crate::domain::models::Event;
use crate::domain::models::SlashCommand;
use crate::domain::services::events::EventsService;

fn print_prompt() -> Result<()> {
    print!("{} ", Paint::green(">").bold());
    std::io::stdout().flush()?;
    return Ok(());
}

async fn start_loop(
    tx: mpsc::UnboundedSender<Action>,
    events: &mut EventsService,
) -> Result<()> {
    let mut waiting_for_backend = false;
    let mut streaming = false;

    loop {
        match events.next().await? {
            Event::UserInput(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    if !waiting_for_backend {
                        print_prompt()?;
                    }
                    continue;
                }

                if let Some(command) = SlashCommand::parse(&text) {
                    if command.is_quit() {
                        tx.send(Action::Quit())?;
                        continue;
                    }
                }

                tx.send(Action::BackendRequest(text))?;
            }
            Event::InputClosed() => {
                tx.send(Action::Quit())?;
            }
            Event::KeyboardCTRLC() => {
                if waiting_for_backend {
                    tx.send(Action::BackendAbort())?;
                } else {
                    println!();
                    tx.send(Action::Quit())?;
                }
            }
            Event::BackendPromptResponse(res) => {
                if res.done {
                    if streaming {
                        println!();
                    }
                    streaming = false;
                    continue;
                }

                streaming = true;
                print!("{}", Paint::new(res.text).dimmed());
                std::io::stdout().flush()?;
            }
            Event::BackendMessage(msg) => {
                if streaming {
                    println!();
                    streaming = false;
                }
                println!("{}", format_message(&msg));
            }
            Event::ArchitectureReady(architecture, warnings) => {
                if streaming {
                    println!();
                    streaming = false;
                }
                println!("\n{}\n", format_architecture(&architecture, &warnings));
            }
            Event::BackendWaiting(waiting) => {
                if waiting && !waiting_for_backend {
                    println!("{}", Paint::new("Designing... press CTRL+C to cancel.").dimmed());
                }
                waiting_for_backend = waiting;
                if !waiting {
                    print_prompt()?;
                }
            }
        }
    }
}

/// Line-oriented chat. Runs until the actions service finishes, which it does
/// after `/quit`, CTRL+C while idle, or the end of input.
pub async fn start(
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let mut events = EventsService::new(rx);
    return start_loop(tx, &mut events).await;
}

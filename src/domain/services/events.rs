#[cfg(test)]
#[path = "events_test.rs"]
mod tests;

use anyhow::Result;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::io::Lines;
use tokio::signal;
use tokio::sync::mpsc;

use crate::domain::models::Event;

type InputLines = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Merges terminal input, CTRL+C and backend events into one stream. Closed
/// sources are no longer polled, so once both are gone only CTRL+C remains.
pub struct EventsService {
    input: InputLines,
    input_open: bool,
    events_open: bool,
    events: mpsc::UnboundedReceiver<Event>,
}

impl EventsService {
    pub fn new(events: mpsc::UnboundedReceiver<Event>) -> EventsService {
        return EventsService::with_input(Box::new(BufReader::new(tokio::io::stdin())), events);
    }

    pub fn with_input(
        input: Box<dyn AsyncBufRead + Unpin + Send>,
        events: mpsc::UnboundedReceiver<Event>,
    ) -> EventsService {
        return EventsService {
            input: input.lines(),
            input_open: true,
            events_open: true,
            events,
        };
    }

    pub async fn next(&mut self) -> Result<Event> {
        loop {
            let input_open = self.input_open;
            let events_open = self.events_open;
            let evt = tokio::select! {
                event = self.events.recv(), if events_open => {
                    if event.is_none() {
                        tracing::debug!("backend event channel closed");
                        self.events_open = false;
                    }
                    event
                },
                line = self.input.next_line(), if input_open => match line {
                    Ok(Some(text)) => Some(Event::UserInput(text)),
                    Ok(None) => Some(Event::InputClosed()),
                    Err(err) => {
                        tracing::error!(error = ?err, "Failed to read input");
                        Some(Event::InputClosed())
                    }
                },
                _ = signal::ctrl_c() => Some(Event::KeyboardCTRLC()),
            };

            if let Some(Event::InputClosed()) = evt {
                self.input_open = false;
            }

            if let Some(event) = evt {
                return Ok(event);
            }
        }
    }
}

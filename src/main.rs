#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;

use anyhow::bail;
use anyhow::Error;
use anyhow::Result;
use domain::models::Action;
use domain::models::Event;
use domain::models::RendererName;
use domain::services::clipboard::ClipboardService;
use infrastructure::renderers::RendererManager;
use tokio::sync::mpsc;
use tokio::task;
use yansi::Paint;

use crate::application::chat;
use crate::application::cli;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::services::actions::ActionsService;
use crate::domain::services::Architect;
use crate::domain::services::SessionStore;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! cloudsketch has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
        eprintln!(
            "\nDebug logs are written to {} when RUST_LOG=cloudsketch is set.",
            cli::log_dir().join("debug.log").display()
        );
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

fn flatten_join(res: Option<Result<Result<()>, task::JoinError>>) -> Result<()> {
    match res {
        Some(Ok(res)) => return res,
        Some(Err(join_err)) => return Err(join_err.into()),
        None => return Ok(()),
    }
}

async fn start_chat(config: Config) -> Result<()> {
    let mut store =
        SessionStore::load(SessionStore::file_path_in(&config.get(ConfigKey::DataDir))).await;
    let session_id = config.get(ConfigKey::SessionID);
    if !session_id.is_empty() {
        store.select_active(&session_id).await?;
    }

    let architect = Architect::from_config(&config).await?;
    let renderer_name = match RendererName::parse(config.get(ConfigKey::Renderer)) {
        Some(name) => name,
        None => bail!(format!(
            "No renderer implemented for {}",
            config.get(ConfigKey::Renderer)
        )),
    };
    let renderer = RendererManager::get(renderer_name, &config.get(ConfigKey::IconsDir));

    let mut background_futures = task::JoinSet::new();

    let clipboard_tx = if let Err(clipboard_err) = ClipboardService::healthcheck() {
        tracing::warn!(err = ?clipboard_err, "Clipboard service is unable to start");
        None
    } else {
        let (clipboard_tx, clipboard_rx) = mpsc::unbounded_channel::<String>();
        background_futures.spawn(async move {
            return ClipboardService::start(clipboard_rx).await;
        });
        Some(clipboard_tx)
    };

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let service = ActionsService::new(architect, store, renderer, clipboard_tx);
    let worker_action_tx = action_tx.clone();
    background_futures.spawn(async move {
        return service
            .start(event_tx, worker_action_tx, &mut action_rx)
            .await;
    });

    let chat_future = chat::start(action_tx, event_rx);

    let res = tokio::select!(
        res = background_futures.join_next() => flatten_join(res),
        res = chat_future => res,
    );

    return res;
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let file_appender = tracing_appender::rolling::never(cli::log_dir(), "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("cloudsketch")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let config = match cli::parse().await {
        Ok(Some(config)) => config,
        Ok(None) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    if let Err(err) = start_chat(config).await {
        handle_error(err);
    }

    process::exit(0);
}

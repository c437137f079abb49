#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use std::path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::export;
use super::Architect;
use super::SessionStore;
use crate::domain::models::Action;
use crate::domain::models::ArchitectError;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::PendingTurn;
use crate::domain::models::RendererBox;
use crate::domain::models::Resolution;
use crate::domain::models::SlashCommand;
use crate::domain::models::StoreError;
use crate::infrastructure::renderers;

pub const CANCELLED_ERROR: &str = "cancelled";

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new (/n) [NAME?] - Starts a new session and makes it active.
- /sessions (/s) - Lists all sessions. The active session is marked with *.
- /switch (/sw) [SESSION_ID,SESSION_INDEX] - Makes another session active. You can pass either the session ID, or the index from /sessions.
- /rename (/rn) [NAME] - Renames the active session.
- /delete (/d) [SESSION_ID?] - Deletes a session, the active one when no ID is given.
- /show - Prints the latest architecture of the active session.
- /raw - Prints the raw model response of the last failed request.
- /export (/e) [PATH?] - Writes the latest architecture to a Markdown file, or JSON when PATH ends in .json.
- /diagram (/dg) [PATH?] - Writes the latest diagram source. With the dot renderer, a PATH ending in .png or .svg is rendered by Graphviz.
- /retry (/r) - Resubmits the last failed requirement.
- /copy (/c) - Copies the latest architecture as Markdown to your clipboard.
- /cancel - Cancels the request in progress.
- /quit /exit (/q) - Exit cloudsketch.
- /help (/h) - Provides this help menu.

HOTKEYS:
- CTRL+C - Cancel the request in progress, otherwise exit.

REQUIREMENTS:
Any other text is sent to the model as a requirement. The first requirement of a session produces a new architecture, later ones refine the latest architecture of the session.
        "#;

    return text.trim().to_string();
}

struct InFlight {
    pending: PendingTurn,
    worker: JoinHandle<Result<()>>,
}

/// Single owner of the session store while chatting. Slash commands are
/// answered in place; requirements run on a background worker that reports
/// back with `Action::BackendResolved`.
pub struct ActionsService {
    architect: Arc<Architect>,
    store: SessionStore,
    renderer: RendererBox,
    clipboard: Option<mpsc::UnboundedSender<String>>,
    in_flight: Option<InFlight>,
}

impl ActionsService {
    pub fn new(
        architect: Architect,
        store: SessionStore,
        renderer: RendererBox,
        clipboard: Option<mpsc::UnboundedSender<String>>,
    ) -> ActionsService {
        return ActionsService {
            architect: Arc::new(architect),
            store,
            renderer,
            clipboard,
            in_flight: None,
        };
    }

    fn send_message(
        tx: &mpsc::UnboundedSender<Event>,
        mtype: MessageType,
        text: &str,
    ) -> Result<()> {
        tx.send(Event::BackendMessage(Message::new_with_type(mtype, text)))?;
        return Ok(());
    }

    fn surface_warnings(&mut self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        for warning in self.store.take_warnings() {
            ActionsService::send_message(tx, MessageType::Warning, &warning)?;
        }

        return Ok(());
    }

    async fn greet(&mut self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        let backend = self.architect.backend();
        if let Err(err) = backend.health_check().await {
            ActionsService::send_message(
                tx,
                MessageType::Error,
                &format!(
                    "Hey, it looks like backend {} isn't configured. Requests will fail until that is fixed.\n\nError: {err}",
                    backend.name()
                ),
            )?;
        }

        if let Some(session) = self.store.active_session() {
            ActionsService::send_message(
                tx,
                MessageType::Normal,
                &format!(
                    "Continuing session {} using {} ({}). Describe what should change, or run /help.",
                    session.describe(),
                    backend.name(),
                    backend.model()
                ),
            )?;
        } else {
            ActionsService::send_message(
                tx,
                MessageType::Normal,
                &format!(
                    "Hey there! Describe the system you want to build and {} ({}) will propose an AWS architecture. Run /help for commands.",
                    backend.name(),
                    backend.model()
                ),
            )?;
        }

        self.surface_warnings(tx)?;
        tx.send(Event::BackendWaiting(false))?;

        return Ok(());
    }

    fn active_session_id(&self, tx: &mpsc::UnboundedSender<Event>) -> Result<Option<String>> {
        if let Some(session) = self.store.active_session() {
            return Ok(Some(session.id.to_string()));
        }

        ActionsService::send_message(
            tx,
            MessageType::Warning,
            "There is no active session. Submit a requirement or use /new to start one.",
        )?;
        return Ok(None);
    }

    async fn submit(
        &mut self,
        requirement: &str,
        tx: &mpsc::UnboundedSender<Event>,
        action_tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<()> {
        if self.in_flight.is_some() {
            ActionsService::send_message(
                tx,
                MessageType::Warning,
                "A request is already in progress. Wait for it to finish or use /cancel.",
            )?;
            return Ok(());
        }

        let session_id = match self.store.active_session() {
            Some(session) => session.id.to_string(),
            None => {
                let name = requirement.chars().take(40).collect::<String>();
                self.store.create_session(name.trim()).await
            }
        };

        let pending = match self
            .architect
            .begin(&mut self.store, &session_id, requirement)
            .await
        {
            Ok(pending) => pending,
            Err(err) => {
                ActionsService::send_message(tx, MessageType::Error, &err.to_string())?;
                return Ok(());
            }
        };

        tracing::info!(
            session_id = pending.session_id,
            turn_id = pending.turn_id,
            "submitting requirement"
        );
        tx.send(Event::BackendWaiting(true))?;

        let architect = self.architect.clone();
        let worker_pending = pending.clone();
        let worker_tx = tx.clone();
        let worker_action_tx = action_tx.clone();
        let worker: JoinHandle<Result<()>> = tokio::spawn(async move {
            let result = architect
                .resolve(
                    &worker_pending.prompt,
                    &worker_pending.requirement,
                    Some(&worker_tx),
                )
                .await;

            worker_action_tx.send(Action::BackendResolved(worker_pending, Box::new(result)))?;
            return Ok(());
        });

        self.in_flight = Some(InFlight { pending, worker });
        return Ok(());
    }

    async fn resolved(
        &mut self,
        pending: PendingTurn,
        result: Result<Resolution, ArchitectError>,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let is_current = self
            .in_flight
            .as_ref()
            .map(|e| return e.pending.turn_id == pending.turn_id)
            .unwrap_or(false);
        if !is_current {
            tracing::debug!(turn_id = pending.turn_id, "ignoring stale result");
            return Ok(());
        }
        self.in_flight = None;

        match Architect::finish(&mut self.store, &pending, &result).await {
            Err(StoreError::TurnAlreadyResolved(turn_id)) => {
                tracing::debug!(turn_id = turn_id, "turn already resolved");
                tx.send(Event::BackendWaiting(false))?;
                return Ok(());
            }
            Err(err) => {
                ActionsService::send_message(tx, MessageType::Error, &err.to_string())?;
            }
            Ok(()) => (),
        }

        match result {
            Ok(resolution) => {
                tx.send(Event::ArchitectureReady(
                    Box::new(resolution.architecture),
                    resolution.warnings,
                ))?;
            }
            Err(err) => {
                let hint = match err {
                    ArchitectError::ModelCall(_) => "Use /retry to resubmit the requirement.",
                    ArchitectError::Parse { .. } => {
                        "Use /raw to inspect the model response, or /retry to ask again."
                    }
                    _ => "",
                };
                ActionsService::send_message(
                    tx,
                    MessageType::Error,
                    format!("{err}\n{hint}").trim(),
                )?;
            }
        }

        self.surface_warnings(tx)?;
        tx.send(Event::BackendWaiting(false))?;
        return Ok(());
    }

    /// Aborts the worker and fails its turn. Returns false when nothing was
    /// in flight.
    async fn cancel(&mut self, tx: &mpsc::UnboundedSender<Event>) -> Result<bool> {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) => in_flight,
            None => return Ok(false),
        };

        in_flight.worker.abort();
        if let Err(err) = self
            .store
            .fail_turn(&in_flight.pending.turn_id, CANCELLED_ERROR, None)
            .await
        {
            tracing::debug!(error = ?err, "cancelled turn was already resolved");
        }

        tracing::info!(turn_id = in_flight.pending.turn_id, "request cancelled");
        ActionsService::send_message(tx, MessageType::Warning, "Request cancelled.")?;
        return Ok(true);
    }

    async fn new_session(
        &mut self,
        command: &SlashCommand,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        self.cancel(tx).await?;
        let id = self.store.create_session(&command.arg_text()).await;
        let session = self.store.get_session(&id)?;

        ActionsService::send_message(
            tx,
            MessageType::Normal,
            &format!("Started session {}.", session.describe()),
        )?;
        return Ok(());
    }

    fn session_list(&self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        let sessions = self.store.list_sessions();
        if sessions.is_empty() {
            ActionsService::send_message(
                tx,
                MessageType::Normal,
                "There are no sessions yet. Submit a requirement to start one.",
            )?;
            return Ok(());
        }

        let active_id = self
            .store
            .active_session()
            .map(|e| return e.id.to_string())
            .unwrap_or_default();

        let res = sessions
            .iter()
            .enumerate()
            .map(|(idx, session)| {
                let marker = if session.id == active_id { "*" } else { " " };
                return format!("{marker} ({}) {}", idx + 1, session.describe());
            })
            .collect::<Vec<String>>();

        ActionsService::send_message(tx, MessageType::Normal, &res.join("\n"))?;
        return Ok(());
    }

    async fn switch_session(
        &mut self,
        command: &SlashCommand,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let target = command.arg_text();
        if target.is_empty() {
            ActionsService::send_message(
                tx,
                MessageType::Error,
                "You must specify a session ID or index with `/switch` or `/sw`. Run `/sessions` to list them.",
            )?;
            return Ok(());
        }

        let mut session_id = target.to_string();
        if let Ok(idx) = target.parse::<usize>() {
            let sessions = self.store.list_sessions();
            if idx < 1 || idx > sessions.len() {
                ActionsService::send_message(
                    tx,
                    MessageType::Error,
                    &format!("{idx} is not a valid index from the session list."),
                )?;
                return Ok(());
            }
            session_id = sessions[idx - 1].id.to_string();
        }

        if self.store.get_session(&session_id).is_err() {
            ActionsService::send_message(
                tx,
                MessageType::Error,
                &format!("No session found for {target}. Did you mistype it?"),
            )?;
            return Ok(());
        }

        self.cancel(tx).await?;
        self.store.select_active(&session_id).await?;

        let session = self.store.get_session(&session_id)?;
        ActionsService::send_message(
            tx,
            MessageType::Normal,
            &format!("Switched to session {}.", session.describe()),
        )?;
        if let Some((architecture, warnings)) = session.latest_completed() {
            tx.send(Event::ArchitectureReady(
                Box::new(architecture.clone()),
                warnings.to_vec(),
            ))?;
        }

        return Ok(());
    }

    async fn rename_session(
        &mut self,
        command: &SlashCommand,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let name = command.arg_text();
        if name.is_empty() {
            ActionsService::send_message(
                tx,
                MessageType::Error,
                "You must specify a name with `/rename` or `/rn`.",
            )?;
            return Ok(());
        }

        if let Some(session_id) = self.active_session_id(tx)? {
            self.store.rename_session(&session_id, &name).await?;
            ActionsService::send_message(
                tx,
                MessageType::Normal,
                &format!("Renamed session {session_id} to {name}."),
            )?;
        }

        return Ok(());
    }

    async fn delete_session(
        &mut self,
        command: &SlashCommand,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let session_id = match command.args.first() {
            Some(id) => id.to_string(),
            None => match self.active_session_id(tx)? {
                Some(id) => id,
                None => return Ok(()),
            },
        };

        let in_session = self
            .in_flight
            .as_ref()
            .map(|e| return e.pending.session_id == session_id)
            .unwrap_or(false);
        if in_session {
            self.cancel(tx).await?;
        }

        match self.store.delete_session(&session_id).await {
            Ok(()) => {
                ActionsService::send_message(
                    tx,
                    MessageType::Normal,
                    &format!("Deleted session {session_id}."),
                )?;
            }
            Err(err) => {
                ActionsService::send_message(tx, MessageType::Error, &err.to_string())?;
            }
        }

        return Ok(());
    }

    fn show(&self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        let session = match self.store.active_session() {
            Some(session) => session,
            None => {
                self.active_session_id(tx)?;
                return Ok(());
            }
        };

        if let Some((architecture, warnings)) = session.latest_completed() {
            tx.send(Event::ArchitectureReady(
                Box::new(architecture.clone()),
                warnings.to_vec(),
            ))?;
        } else {
            ActionsService::send_message(
                tx,
                MessageType::Warning,
                "The active session has no architecture yet.",
            )?;
        }

        return Ok(());
    }

    fn raw(&self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        let raw = self
            .store
            .active_session()
            .and_then(|e| return e.latest_raw_response());

        match raw {
            Some(raw) => ActionsService::send_message(tx, MessageType::Normal, raw)?,
            None => ActionsService::send_message(
                tx,
                MessageType::Warning,
                "There is no raw model response to show.",
            )?,
        }

        return Ok(());
    }

    fn default_output(&self, session_id: &str, extension: &str) -> path::PathBuf {
        return path::PathBuf::from(format!("cloudsketch-{session_id}.{extension}"));
    }

    async fn export(
        &self,
        command: &SlashCommand,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let session = match self.store.active_session() {
            Some(session) => session,
            None => {
                self.active_session_id(tx)?;
                return Ok(());
            }
        };
        let architecture = match session.latest_architecture() {
            Some(architecture) => architecture,
            None => {
                ActionsService::send_message(
                    tx,
                    MessageType::Warning,
                    "The active session has no architecture to export.",
                )?;
                return Ok(());
            }
        };

        let mut output = path::PathBuf::from(command.arg_text());
        if command.args.is_empty() {
            output = self.default_output(&session.id, "md");
        }

        match export::write(&output, architecture).await {
            Ok(()) => ActionsService::send_message(
                tx,
                MessageType::Normal,
                &format!("Exported architecture to {}", output.display()),
            )?,
            Err(err) => ActionsService::send_message(
                tx,
                MessageType::Error,
                &format!("Failed to export architecture: {err}"),
            )?,
        }

        return Ok(());
    }

    async fn diagram(
        &self,
        command: &SlashCommand,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let session = match self.store.active_session() {
            Some(session) => session,
            None => {
                self.active_session_id(tx)?;
                return Ok(());
            }
        };
        let architecture = match session.latest_architecture() {
            Some(architecture) => architecture,
            None => {
                ActionsService::send_message(
                    tx,
                    MessageType::Warning,
                    "The active session has no diagram yet.",
                )?;
                return Ok(());
            }
        };

        let mut output = path::PathBuf::from(command.arg_text());
        if command.args.is_empty() {
            output = self.default_output(&session.id, self.renderer.extension());
        }

        match renderers::write_diagram(&self.renderer, architecture, &output).await {
            Ok(written) => ActionsService::send_message(
                tx,
                MessageType::Normal,
                &format!("Wrote diagram to {}", written.display()),
            )?,
            Err(err) => {
                let mut text = err.to_string();
                let source_path = output.with_extension("dot");
                if source_path != output && source_path.exists() {
                    text = format!(
                        "{text}. The diagram source was written to {}",
                        source_path.display()
                    );
                }
                ActionsService::send_message(tx, MessageType::Error, &text)?;
            }
        }

        return Ok(());
    }

    fn copy(&self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
        let architecture = self
            .store
            .active_session()
            .and_then(|e| return e.latest_architecture());
        let architecture = match architecture {
            Some(architecture) => architecture,
            None => {
                ActionsService::send_message(
                    tx,
                    MessageType::Warning,
                    "There is no architecture to copy.",
                )?;
                return Ok(());
            }
        };

        let clipboard = match &self.clipboard {
            Some(clipboard) => clipboard,
            None => {
                ActionsService::send_message(
                    tx,
                    MessageType::Error,
                    "The clipboard is not available on this system.",
                )?;
                return Ok(());
            }
        };

        clipboard.send(export::to_markdown(architecture)?)?;
        ActionsService::send_message(
            tx,
            MessageType::Normal,
            "Copied architecture to clipboard.",
        )?;

        return Ok(());
    }

    async fn retry(
        &mut self,
        tx: &mpsc::UnboundedSender<Event>,
        action_tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<()> {
        let session_id = match self.active_session_id(tx)? {
            Some(id) => id,
            None => return Ok(()),
        };

        match self.store.last_failed_requirement(&session_id) {
            Some(requirement) => {
                ActionsService::send_message(
                    tx,
                    MessageType::Normal,
                    &format!("Retrying: {requirement}"),
                )?;
                self.submit(&requirement, tx, action_tx).await?;
            }
            None => {
                ActionsService::send_message(
                    tx,
                    MessageType::Warning,
                    "The last request of this session did not fail, there is nothing to retry.",
                )?;
            }
        }

        return Ok(());
    }

    async fn handle_command(
        &mut self,
        command: SlashCommand,
        tx: &mpsc::UnboundedSender<Event>,
        action_tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<()> {
        if command.is_quit() {
            action_tx.send(Action::Quit())?;
            return Ok(());
        }

        if command.is_new_session() {
            self.new_session(&command, tx).await?;
        } else if command.is_session_list() {
            self.session_list(tx)?;
        } else if command.is_switch_session() {
            self.switch_session(&command, tx).await?;
        } else if command.is_rename_session() {
            self.rename_session(&command, tx).await?;
        } else if command.is_delete_session() {
            self.delete_session(&command, tx).await?;
        } else if command.is_show() {
            self.show(tx)?;
        } else if command.is_raw() {
            self.raw(tx)?;
        } else if command.is_export() {
            self.export(&command, tx).await?;
        } else if command.is_diagram() {
            self.diagram(&command, tx).await?;
        } else if command.is_copy() {
            self.copy(tx)?;
        } else if command.is_retry() {
            self.retry(tx, action_tx).await?;
            return Ok(());
        } else if command.is_cancel() {
            if !self.cancel(tx).await? {
                ActionsService::send_message(
                    tx,
                    MessageType::Warning,
                    "There is no request in progress.",
                )?;
            }
        } else if command.is_help() {
            ActionsService::send_message(tx, MessageType::Normal, &help_text())?;
        }

        self.surface_warnings(tx)?;
        if self.in_flight.is_none() {
            tx.send(Event::BackendWaiting(false))?;
        }

        return Ok(());
    }

    async fn request(
        &mut self,
        text: String,
        tx: &mpsc::UnboundedSender<Event>,
        action_tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        if let Some(command) = SlashCommand::parse(text) {
            return self.handle_command(command, tx, action_tx).await;
        }

        if text.starts_with('/') {
            ActionsService::send_message(
                tx,
                MessageType::Error,
                &format!(
                    "Unknown command {}. Run /help for the list of commands.",
                    text.split_whitespace().next().unwrap_or_default()
                ),
            )?;
            tx.send(Event::BackendWaiting(self.in_flight.is_some()))?;
            return Ok(());
        }

        self.submit(text, tx, action_tx).await?;
        self.surface_warnings(tx)?;
        if self.in_flight.is_none() {
            tx.send(Event::BackendWaiting(false))?;
        }

        return Ok(());
    }

    pub async fn start(
        mut self,
        tx: mpsc::UnboundedSender<Event>,
        action_tx: mpsc::UnboundedSender<Action>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        self.greet(&tx).await?;

        while let Some(action) = rx.recv().await {
            match action {
                Action::BackendAbort() => {
                    self.cancel(&tx).await?;
                    tx.send(Event::BackendWaiting(false))?;
                }
                Action::BackendRequest(text) => {
                    self.request(text, &tx, &action_tx).await?;
                }
                Action::BackendResolved(pending, result) => {
                    self.resolved(pending, *result, &tx).await?;
                }
                Action::Quit() => {
                    break;
                }
            }
        }

        self.cancel(&tx).await?;
        if let Err(err) = self.store.flush().await {
            tracing::error!(error = ?err, "Failed to flush sessions");
        }

        return Ok(());
    }
}

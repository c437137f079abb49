#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use chrono::Local;
use chrono::SecondsFormat;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::domain::models::Architecture;
use crate::domain::models::Session;
use crate::domain::models::SessionsDocument;
use crate::domain::models::StoreError;
use crate::domain::models::Turn;
use crate::domain::models::TurnOutcome;

pub const SESSIONS_FILE: &str = "sessions.yaml";
pub const INTERRUPTED_ERROR: &str = "interrupted before completion";

fn now() -> String {
    return Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
}

fn with_suffix(file_path: &path::Path, suffix: &str) -> path::PathBuf {
    let mut name = file_path.as_os_str().to_os_string();
    name.push(suffix);
    return path::PathBuf::from(name);
}

/// Owns every session and keeps them persisted in a single YAML document.
///
/// Each mutation rewrites the whole document through a temporary file and a
/// rename. When the file cannot be written the store keeps working from
/// memory and records a warning for the caller to surface.
pub struct SessionStore {
    file_path: Option<path::PathBuf>,
    document: SessionsDocument,
    warnings: Vec<String>,
}

impl SessionStore {
    pub fn create_id() -> String {
        return Uuid::new_v4()
            .to_string()
            .split('-')
            .enumerate()
            .filter_map(|(idx, str)| {
                if idx > 1 {
                    return None;
                }
                return Some(str);
            })
            .collect::<Vec<&str>>()
            .join("-");
    }

    pub fn file_path_in(data_dir: &str) -> path::PathBuf {
        return path::PathBuf::from(data_dir).join(SESSIONS_FILE);
    }

    pub fn in_memory() -> SessionStore {
        return SessionStore {
            file_path: None,
            document: SessionsDocument {
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..SessionsDocument::default()
            },
            warnings: vec![],
        };
    }

    /// Opens the store at `file_path`. This never fails: a missing file
    /// starts empty, and an unreadable one is moved aside and replaced with
    /// an empty store plus a warning.
    pub async fn load(file_path: path::PathBuf) -> SessionStore {
        let mut store = SessionStore::in_memory();
        store.file_path = Some(file_path.clone());

        if !file_path.exists() {
            return store;
        }

        let payload = match fs::read_to_string(&file_path).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = ?err, "failed to read sessions file");
                store.set_aside(&file_path, &err.to_string()).await;
                return store;
            }
        };

        if payload.trim().is_empty() {
            return store;
        }

        let document = match serde_yaml::from_str::<SessionsDocument>(&payload) {
            Ok(document) => document,
            Err(err) => {
                tracing::error!(error = ?err, "sessions file is corrupt");
                store.set_aside(&file_path, &err.to_string()).await;
                return store;
            }
        };

        store.document = document;
        store.document.version = env!("CARGO_PKG_VERSION").to_string();

        let mut interrupted = 0;
        for session in store.document.sessions.iter_mut() {
            for turn in session.turns.iter_mut() {
                if turn.is_pending() {
                    turn.outcome = TurnOutcome::Failed {
                        error: INTERRUPTED_ERROR.to_string(),
                        raw_response: None,
                    };
                    interrupted += 1;
                }
            }
        }

        if let Some(active_id) = store.document.active_session_id.clone() {
            if store.get_session(&active_id).is_err() {
                store.document.active_session_id = None;
            }
        }

        tracing::info!(
            sessions = store.document.sessions.len(),
            interrupted = interrupted,
            "loaded sessions"
        );

        if interrupted > 0 {
            store.save().await;
        }

        return store;
    }

    async fn set_aside(&mut self, file_path: &path::Path, reason: &str) {
        let corrupt_path = with_suffix(file_path, ".corrupt");
        if let Err(err) = fs::rename(file_path, &corrupt_path).await {
            tracing::error!(error = ?err, "failed to move corrupt sessions file");
            self.file_path = None;
            self.warnings.push(format!(
                "Sessions file {} could not be read ({reason}) or moved aside ({err}). Sessions will not be saved.",
                file_path.display()
            ));
            return;
        }

        self.warnings.push(format!(
            "Sessions file {} could not be read ({reason}). It was moved to {} and a new store was started.",
            file_path.display(),
            corrupt_path.display()
        ));
    }

    async fn write_tmp_and_rename(
        tmp_path: &path::Path,
        file_path: &path::Path,
        payload: &str,
    ) -> Result<()> {
        let mut file = fs::File::create(tmp_path).await?;
        file.write_all(payload.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(tmp_path, file_path).await?;

        return Ok(());
    }

    async fn write_file(file_path: &path::Path, payload: &str) -> Result<()> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = with_suffix(file_path, ".tmp");
        if let Err(err) = SessionStore::write_tmp_and_rename(&tmp_path, file_path, payload).await {
            if tmp_path.exists() {
                if let Err(remove_err) = fs::remove_file(&tmp_path).await {
                    tracing::warn!(error = ?remove_err, "failed to remove temporary sessions file");
                }
            }
            return Err(err);
        }

        return Ok(());
    }

    async fn save(&mut self) {
        if let Err(err) = self.try_save().await {
            tracing::error!(error = %err, "switching session store to memory only");
            self.file_path = None;
            self.warnings.push(format!(
                "{err}. Sessions are kept in memory only until exit."
            ));
        }
    }

    async fn try_save(&self) -> Result<(), StoreError> {
        let file_path = match &self.file_path {
            Some(file_path) => file_path,
            None => return Ok(()),
        };

        let payload = serde_yaml::to_string(&self.document)
            .map_err(|err| return StoreError::Persistence(err.to_string()))?;

        SessionStore::write_file(file_path, &payload)
            .await
            .map_err(|err| return StoreError::Persistence(err.to_string()))?;

        return Ok(());
    }

    /// Writes the final state. Unlike the save after each mutation, the error
    /// is returned to the caller.
    pub async fn flush(&mut self) -> Result<(), StoreError> {
        return self.try_save().await;
    }

    #[cfg(test)]
    pub fn is_persistent(&self) -> bool {
        return self.file_path.is_some();
    }

    /// Drains warnings raised by loading or saving.
    pub fn take_warnings(&mut self) -> Vec<String> {
        return std::mem::take(&mut self.warnings);
    }

    fn session_mut(&mut self, id: &str) -> Result<&mut Session, StoreError> {
        return self
            .document
            .sessions
            .iter_mut()
            .find(|e| return e.id == id)
            .ok_or_else(|| return StoreError::NotFound(id.to_string()));
    }

    /// Creates a session and makes it the active one.
    pub async fn create_session(&mut self, name: &str) -> String {
        let id = SessionStore::create_id();
        let mut session_name = name.trim().to_string();
        if session_name.is_empty() {
            session_name = format!("Untitled session {id}");
        }

        let timestamp = now();
        self.document.sessions.push(Session {
            id: id.to_string(),
            name: session_name,
            created_at: timestamp.to_string(),
            updated_at: timestamp,
            turns: vec![],
        });
        self.document.active_session_id = Some(id.to_string());

        tracing::debug!(session_id = id, "created session");
        self.save().await;

        return id;
    }

    pub fn list_sessions(&self) -> &[Session] {
        return &self.document.sessions;
    }

    pub fn get_session(&self, id: &str) -> Result<&Session, StoreError> {
        return self
            .document
            .sessions
            .iter()
            .find(|e| return e.id == id)
            .ok_or_else(|| return StoreError::NotFound(id.to_string()));
    }

    pub async fn rename_session(&mut self, id: &str, name: &str) -> Result<(), StoreError> {
        let session = self.session_mut(id)?;
        session.name = name.trim().to_string();
        session.updated_at = now();

        self.save().await;
        return Ok(());
    }

    pub async fn delete_session(&mut self, id: &str) -> Result<(), StoreError> {
        let idx = self
            .document
            .sessions
            .iter()
            .position(|e| return e.id == id)
            .ok_or_else(|| return StoreError::NotFound(id.to_string()))?;

        self.document.sessions.remove(idx);
        if self.document.active_session_id.as_deref() == Some(id) {
            self.document.active_session_id = None;
        }

        tracing::debug!(session_id = id, "deleted session");
        self.save().await;
        return Ok(());
    }

    pub async fn delete_all_sessions(&mut self) -> usize {
        let count = self.document.sessions.len();
        self.document.sessions.clear();
        self.document.active_session_id = None;

        self.save().await;
        return count;
    }

    pub async fn select_active(&mut self, id: &str) -> Result<(), StoreError> {
        self.get_session(id)?;
        self.document.active_session_id = Some(id.to_string());

        self.save().await;
        return Ok(());
    }

    pub fn active_session(&self) -> Option<&Session> {
        let id = self.document.active_session_id.as_ref()?;
        return self.get_session(id).ok();
    }

    /// Appends a pending turn to a session and returns the turn id.
    pub async fn append_turn(
        &mut self,
        session_id: &str,
        requirement: &str,
    ) -> Result<String, StoreError> {
        let turn_id = SessionStore::create_id();
        let timestamp = now();

        let session = self.session_mut(session_id)?;
        session.turns.push(Turn {
            id: turn_id.to_string(),
            requirement: requirement.to_string(),
            submitted_at: timestamp.to_string(),
            outcome: TurnOutcome::Pending,
        });
        session.updated_at = timestamp;

        tracing::debug!(session_id = session_id, turn_id = turn_id, "appended turn");
        self.save().await;

        return Ok(turn_id);
    }

    #[cfg(test)]
    pub fn find_turn(&self, turn_id: &str) -> Option<&Turn> {
        return self
            .document
            .sessions
            .iter()
            .flat_map(|e| return e.turns.iter())
            .find(|e| return e.id == turn_id);
    }

    async fn resolve_turn(&mut self, turn_id: &str, outcome: TurnOutcome) -> Result<(), StoreError> {
        let timestamp = now();
        let session = self
            .document
            .sessions
            .iter_mut()
            .find(|e| return e.turns.iter().any(|turn| return turn.id == turn_id))
            .ok_or_else(|| return StoreError::TurnNotFound(turn_id.to_string()))?;

        let turn = session
            .turns
            .iter_mut()
            .find(|e| return e.id == turn_id)
            .ok_or_else(|| return StoreError::TurnNotFound(turn_id.to_string()))?;

        if !turn.is_pending() {
            return Err(StoreError::TurnAlreadyResolved(turn_id.to_string()));
        }

        turn.outcome = outcome;
        session.updated_at = timestamp;

        self.save().await;
        return Ok(());
    }

    pub async fn complete_turn(
        &mut self,
        turn_id: &str,
        architecture: Architecture,
        warnings: Vec<String>,
    ) -> Result<(), StoreError> {
        tracing::debug!(turn_id = turn_id, "completing turn");
        return self
            .resolve_turn(
                turn_id,
                TurnOutcome::Completed {
                    architecture,
                    warnings,
                },
            )
            .await;
    }

    pub async fn fail_turn(
        &mut self,
        turn_id: &str,
        error: &str,
        raw_response: Option<String>,
    ) -> Result<(), StoreError> {
        tracing::debug!(turn_id = turn_id, error = error, "failing turn");
        return self
            .resolve_turn(
                turn_id,
                TurnOutcome::Failed {
                    error: error.to_string(),
                    raw_response,
                },
            )
            .await;
    }

    /// Latest completed architecture of a session, if any.
    pub fn latest_architecture(&self, session_id: &str) -> Option<&Architecture> {
        return self.get_session(session_id).ok()?.latest_architecture();
    }

    /// Requirement of the session's last turn when that turn failed.
    pub fn last_failed_requirement(&self, session_id: &str) -> Option<String> {
        let turn = self.get_session(session_id).ok()?.last_turn()?;
        if turn.is_failed() {
            return Some(turn.requirement.to_string());
        }

        return None;
    }
}

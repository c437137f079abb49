#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Architecture;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model request for this turn has not returned yet.
    Pending,
    Completed {
        architecture: Architecture,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Failed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub requirement: String,
    pub submitted_at: String,
    pub outcome: TurnOutcome,
}

impl Turn {
    pub fn architecture(&self) -> Option<&Architecture> {
        if let TurnOutcome::Completed { architecture, .. } = &self.outcome {
            return Some(architecture);
        }

        return None;
    }

    pub fn is_pending(&self) -> bool {
        return self.outcome == TurnOutcome::Pending;
    }

    pub fn is_failed(&self) -> bool {
        return matches!(self.outcome, TurnOutcome::Failed { .. });
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn latest_architecture(&self) -> Option<&Architecture> {
        return self.turns.iter().rev().find_map(|turn| return turn.architecture());
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        return self.turns.last();
    }

    /// Latest completed turn, with the warnings recorded for it.
    pub fn latest_completed(&self) -> Option<(&Architecture, &[String])> {
        return self.turns.iter().rev().find_map(|turn| {
            if let TurnOutcome::Completed {
                architecture,
                warnings,
            } = &turn.outcome
            {
                return Some((architecture, warnings.as_slice()));
            }
            return None;
        });
    }

    /// Raw model text of the most recent failed turn that kept one.
    pub fn latest_raw_response(&self) -> Option<&str> {
        return self.turns.iter().rev().find_map(|turn| {
            if let TurnOutcome::Failed {
                raw_response: Some(raw),
                ..
            } = &turn.outcome
            {
                return Some(raw.as_str());
            }
            return None;
        });
    }

    /// One line listing entry: id, name, turn count, and the latest overview.
    pub fn describe(&self) -> String {
        let mut res = format!(
            "(ID: {}) {}, Turns: {}, Updated: {}",
            self.id,
            self.name,
            self.turns.len(),
            self.updated_at
        );

        if let Some(architecture) = self.latest_architecture() {
            res = format!("{res}, {}", architecture.summary(70));
        }

        return res;
    }

    /// Requirements of completed turns, oldest first. Failed and cancelled
    /// turns never reached the architecture.
    pub fn requirements(&self) -> Vec<String> {
        return self
            .turns
            .iter()
            .filter(|turn| return turn.architecture().is_some())
            .map(|turn| return turn.requirement.to_string())
            .collect::<Vec<String>>();
    }
}

/// On-disk layout of the session store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsDocument {
    pub version: String,
    #[serde(default)]
    pub active_session_id: Option<String>,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// A turn whose model call has been issued but not resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTurn {
    pub session_id: String,
    pub turn_id: String,
    pub requirement: String,
    pub prompt: String,
}

/// The accepted outcome of a model call, after rule checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub architecture: Architecture,
    pub warnings: Vec<String>,
    pub raw: String,
}

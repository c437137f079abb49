#[cfg(test)]
#[path = "architect_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;

use super::parser;
use super::rules::improvement_prompt;
use super::rules::violation_warnings;
use super::rules::RuleSet;
use super::rules::Violation;
use super::PromptComposer;
use super::SessionStore;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Architecture;
use crate::domain::models::ArchitectError;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendName;
use crate::domain::models::BackendPrompt;
use crate::domain::models::Event;
use crate::domain::models::PendingTurn;
use crate::domain::models::Resolution;
use crate::domain::models::StoreError;
use crate::infrastructure::backends::BackendManager;

/// Runs one requirement through the model: compose, call, parse, check the
/// rules, and record the outcome on the session.
pub struct Architect {
    backend: BackendBox,
    composer: PromptComposer,
    rules: RuleSet,
    rounds: u32,
}

impl Architect {
    pub fn new(
        backend: BackendBox,
        composer: PromptComposer,
        rules: RuleSet,
        rounds: u32,
    ) -> Architect {
        return Architect {
            backend,
            composer,
            rules,
            rounds,
        };
    }

    /// Wires the configured backend, prompt overrides and rules together.
    pub async fn from_config(config: &Config) -> Result<Architect> {
        let backend_name = match BackendName::parse(config.get(ConfigKey::Backend)) {
            Some(name) => name,
            None => bail!(format!(
                "No backend implemented for {}",
                config.get(ConfigKey::Backend)
            )),
        };

        let backend = BackendManager::get(backend_name, config)?;
        let composer = PromptComposer::new(&config.get(ConfigKey::PromptsDir), backend_name);
        let rules = RuleSet::load(&config.get(ConfigKey::RulesDir)).await?;
        let rounds = config.parse::<u32>(ConfigKey::RuleImprovementRounds)?;

        tracing::debug!(
            backend = backend_name.to_string(),
            model = backend.model(),
            rules = rules.rules.len(),
            rounds = rounds,
            "architect ready"
        );

        return Ok(Architect::new(backend, composer, rules, rounds));
    }

    pub fn backend(&self) -> &BackendBox {
        return &self.backend;
    }

    /// Composes the prompt for a requirement against the session's latest
    /// architecture, then appends a pending turn for it.
    pub async fn begin(
        &self,
        store: &mut SessionStore,
        session_id: &str,
        requirement: &str,
    ) -> Result<PendingTurn, ArchitectError> {
        let session = store.get_session(session_id)?;
        let prompt = self.composer.compose_for_session(session, requirement).await?;
        let turn_id = store.append_turn(session_id, requirement).await?;

        return Ok(PendingTurn {
            session_id: session_id.to_string(),
            turn_id,
            requirement: requirement.to_string(),
            prompt,
        });
    }

    async fn call(
        &self,
        prompt: String,
        tx: Option<&mpsc::UnboundedSender<Event>>,
    ) -> Result<String, ArchitectError> {
        return self
            .backend
            .get_completion(BackendPrompt::new(prompt), tx)
            .await
            .map_err(|err| return ArchitectError::ModelCall(err.to_string()));
    }

    async fn improve(
        &self,
        architecture: &Architecture,
        requirement: &str,
        violations: &[Violation],
        tx: Option<&mpsc::UnboundedSender<Event>>,
    ) -> Result<(Architecture, String), ArchitectError> {
        let prompt =
            improvement_prompt(&self.composer, architecture, violations, requirement).await?;
        let raw = self.call(prompt, tx).await?;
        let improved = parser::parse(&raw).map_err(|error| {
            return ArchitectError::Parse {
                error,
                raw: raw.to_string(),
            };
        })?;

        return Ok((improved, raw));
    }

    /// Calls the model and turns its answer into an architecture. Rule
    /// violations trigger up to `rounds` improvement calls; whatever remains
    /// is reported as warnings. A failed improvement keeps the last accepted
    /// architecture.
    pub async fn resolve(
        &self,
        prompt: &str,
        requirement: &str,
        tx: Option<&mpsc::UnboundedSender<Event>>,
    ) -> Result<Resolution, ArchitectError> {
        let mut raw = self.call(prompt.to_string(), tx).await?;
        let mut architecture = parser::parse(&raw).map_err(|error| {
            tracing::warn!(error = ?error, "model response rejected");
            return ArchitectError::Parse {
                error,
                raw: raw.to_string(),
            };
        })?;

        let mut violations = self.rules.validate(&architecture);
        let mut round = 0;
        while !violations.is_empty() && round < self.rounds {
            round += 1;
            tracing::info!(
                round = round,
                violations = violations.len(),
                "requesting improved architecture"
            );

            match self.improve(&architecture, requirement, &violations, tx).await {
                Ok((improved, improved_raw)) => {
                    architecture = improved;
                    raw = improved_raw;
                    violations = self.rules.validate(&architecture);
                }
                Err(err) => {
                    tracing::warn!(
                        round = round,
                        error = ?err,
                        "improvement failed, keeping previous architecture"
                    );
                    break;
                }
            }
        }

        return Ok(Resolution {
            architecture,
            warnings: violation_warnings(&violations),
            raw,
        });
    }

    /// Records the result of a resolved turn.
    pub async fn finish(
        store: &mut SessionStore,
        pending: &PendingTurn,
        result: &Result<Resolution, ArchitectError>,
    ) -> Result<(), StoreError> {
        match result {
            Ok(resolution) => {
                return store
                    .complete_turn(
                        &pending.turn_id,
                        resolution.architecture.clone(),
                        resolution.warnings.clone(),
                    )
                    .await;
            }
            Err(err) => {
                return store
                    .fail_turn(&pending.turn_id, &err.to_string(), err.raw_response())
                    .await;
            }
        }
    }

    /// Runs a whole turn in place. Used by the non-interactive commands.
    pub async fn submit(
        &self,
        store: &mut SessionStore,
        session_id: &str,
        requirement: &str,
        tx: Option<&mpsc::UnboundedSender<Event>>,
    ) -> Result<Resolution, ArchitectError> {
        let pending = self.begin(store, session_id, requirement).await?;
        let result = self.resolve(&pending.prompt, requirement, tx).await;
        Architect::finish(store, &pending, &result).await?;

        return result;
    }
}

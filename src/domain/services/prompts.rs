#[cfg(test)]
#[path = "prompts_test.rs"]
mod tests;

use std::path;

use rust_embed::RustEmbed;
use tokio::fs;

use crate::domain::models::Architecture;
use crate::domain::models::BackendName;
use crate::domain::models::PromptError;
use crate::domain::models::ServiceType;
use crate::domain::models::Session;

const TEMPLATE_VERSION: &str = "v1";

#[derive(RustEmbed)]
#[folder = "assets/prompts/"]
struct PromptAssets;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PromptKind {
    Architecture,
    Refinement,
    Improvement,
}

/// Fills `{name}` placeholders in a template. `{{` and `}}` produce literal
/// braces. Values are inserted as-is and never scanned for placeholders.
pub fn render(
    template_name: &str,
    template: &str,
    values: &[(&str, &str)],
) -> Result<String, PromptError> {
    let unbalanced = |position: usize| {
        return PromptError::UnbalancedBrace {
            template: template_name.to_string(),
            position,
        };
    };

    let mut out = String::with_capacity(template.len());
    let mut pos = 0;
    while pos < template.len() {
        let rest = &template[pos..];

        if rest.starts_with("{{") {
            out.push('{');
            pos += 2;
            continue;
        }
        if rest.starts_with("}}") {
            out.push('}');
            pos += 2;
            continue;
        }
        if rest.starts_with('}') {
            return Err(unbalanced(pos));
        }
        if rest.starts_with('{') {
            let end = rest.find('}').ok_or_else(|| return unbalanced(pos))?;
            let name = &rest[1..end];
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| return c.is_ascii_lowercase() || c == '_')
            {
                return Err(unbalanced(pos));
            }

            let value = values
                .iter()
                .find(|(key, _)| return *key == name)
                .map(|(_, value)| return *value)
                .ok_or_else(|| {
                    return PromptError::UnknownPlaceholder {
                        template: template_name.to_string(),
                        name: name.to_string(),
                    };
                })?;

            out.push_str(value);
            pos += end + 1;
            continue;
        }

        if let Some(ch) = rest.chars().next() {
            out.push(ch);
            pos += ch.len_utf8();
        }
    }

    return Ok(out);
}

fn numbered(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }

    return items
        .iter()
        .enumerate()
        .map(|(idx, item)| return format!("{}. {}", idx + 1, item.trim()))
        .collect::<Vec<String>>()
        .join("\n");
}

/// Builds model prompts from the versioned templates. Templates can be
/// overridden per backend from a prompts directory.
pub struct PromptComposer {
    prompts_dir: String,
    backend: BackendName,
}

impl PromptComposer {
    pub fn new(prompts_dir: &str, backend: BackendName) -> PromptComposer {
        return PromptComposer {
            prompts_dir: prompts_dir.to_string(),
            backend,
        };
    }

    fn embedded(kind: PromptKind) -> Result<String, PromptError> {
        let name = format!("{TEMPLATE_VERSION}/{kind}.md");
        let file = PromptAssets::get(&name).ok_or_else(|| {
            return PromptError::Read {
                template: name.to_string(),
                message: "template is not embedded".to_string(),
            };
        })?;

        return Ok(String::from_utf8_lossy(&file.data).to_string());
    }

    /// Loads the template for a kind, returning its display name and text.
    pub async fn template(&self, kind: PromptKind) -> Result<(String, String), PromptError> {
        if !self.prompts_dir.is_empty() {
            let dir = path::PathBuf::from(&self.prompts_dir);
            let candidates = [
                dir.join(self.backend.to_string()).join(format!("{kind}.md")),
                dir.join(format!("{kind}.md")),
            ];

            for candidate in candidates {
                if !candidate.exists() {
                    continue;
                }

                let name = candidate.to_string_lossy().to_string();
                let text = fs::read_to_string(&candidate).await.map_err(|err| {
                    return PromptError::Read {
                        template: name.to_string(),
                        message: err.to_string(),
                    };
                })?;

                tracing::debug!(template = name, "using prompt override");
                return Ok((name, text));
            }
        }

        return Ok((
            format!("{TEMPLATE_VERSION}/{kind}"),
            PromptComposer::embedded(kind)?,
        ));
    }

    async fn compose(
        &self,
        kind: PromptKind,
        values: &[(&str, &str)],
    ) -> Result<String, PromptError> {
        let (name, template) = self.template(kind).await?;
        let service_types = ServiceType::names().join(", ");

        let mut all_values = vec![("service_types", service_types.as_str())];
        all_values.extend_from_slice(values);

        return render(&name, &template, &all_values);
    }

    pub async fn compose_initial(&self, requirement: &str) -> Result<String, PromptError> {
        return self
            .compose(PromptKind::Architecture, &[("requirements", requirement)])
            .await;
    }

    pub async fn compose_refinement(
        &self,
        requirement: &str,
        prior: &Architecture,
        history: &[String],
    ) -> Result<String, PromptError> {
        let prior_json = prior.to_pretty_json();
        let history_text = numbered(history);

        return self
            .compose(
                PromptKind::Refinement,
                &[
                    ("requirements", requirement),
                    ("prior_architecture", &prior_json),
                    ("history", &history_text),
                ],
            )
            .await;
    }

    pub async fn compose_improvement(
        &self,
        requirement: &str,
        architecture: &Architecture,
        violations: &str,
    ) -> Result<String, PromptError> {
        let prior_json = architecture.to_pretty_json();

        return self
            .compose(
                PromptKind::Improvement,
                &[
                    ("requirements", requirement),
                    ("prior_architecture", &prior_json),
                    ("violations", violations),
                ],
            )
            .await;
    }

    /// Picks the refinement template when the session already holds a
    /// completed architecture, and the initial template otherwise.
    pub async fn compose_for_session(
        &self,
        session: &Session,
        requirement: &str,
    ) -> Result<String, PromptError> {
        if let Some(prior) = session.latest_architecture() {
            return self
                .compose_refinement(requirement, prior, &session.requirements())
                .await;
        }

        return self.compose_initial(requirement).await;
    }
}

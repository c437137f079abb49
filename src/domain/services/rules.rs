#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use regex::Regex;
use tokio::fs;

use super::prompts::PromptComposer;
use crate::domain::models::Architecture;
use crate::domain::models::PromptError;
use crate::domain::models::ServiceCategory;
use crate::domain::models::ServiceType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    MustUse(ServiceType),
    MustNotUse(ServiceType),
    SecurityComponent,
    MultiAz,
    CostOptimization,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub description: String,
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub rule: String,
    pub description: String,
    pub reason: String,
}

struct ConditionMatchers {
    must_not_use: Regex,
    must_use: Regex,
    security: Regex,
    multi_az: Regex,
    cost: Regex,
}

impl ConditionMatchers {
    fn new() -> Result<ConditionMatchers> {
        return Ok(ConditionMatchers {
            must_not_use: Regex::new(r"(?i)^must\s+not\s+use\s+(.+?)\.?$")?,
            must_use: Regex::new(r"(?i)^must\s+use\s+(.+?)\.?$")?,
            security: Regex::new(r"(?i)security\s+component")?,
            multi_az: Regex::new(r"(?i)multi[-\s]?az|multiple\s+availability\s+zones")?,
            cost: Regex::new(r"(?i)\bcost")?,
        });
    }

    fn service(&self, regex: &Regex, line: &str) -> Option<ServiceType> {
        let captures = regex.captures(line)?;
        let name = captures.get(1)?.as_str();
        let service_type = ServiceType::parse(name);
        if service_type.is_none() {
            tracing::debug!(condition = line, "rule names an unknown service type");
        }

        return service_type;
    }

    fn parse(&self, line: &str) -> Option<Condition> {
        if self.must_not_use.is_match(line) {
            return self
                .service(&self.must_not_use, line)
                .map(Condition::MustNotUse);
        }
        if self.must_use.is_match(line) {
            return self
                .service(&self.must_use, line)
                .map(Condition::MustUse);
        }
        if self.security.is_match(line) {
            return Some(Condition::SecurityComponent);
        }
        if self.multi_az.is_match(line) {
            return Some(Condition::MultiAz);
        }
        if self.cost.is_match(line) {
            return Some(Condition::CostOptimization);
        }

        tracing::debug!(condition = line, "ignoring unknown rule condition");
        return None;
    }
}

fn parse_rule(matchers: &ConditionMatchers, fallback_name: &str, content: &str) -> Rule {
    let mut name = fallback_name.to_string();
    let mut description_lines: Vec<&str> = vec![];
    let mut conditions: Vec<Condition> = vec![];

    let mut seen_title = false;
    let mut in_description = false;
    let mut in_conditions = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some(title) = trimmed.strip_prefix("# ") {
            if !seen_title {
                name = title.trim().to_string();
                seen_title = true;
                in_description = true;
            }
            continue;
        }

        if let Some(heading) = trimmed.strip_prefix("## ") {
            in_description = false;
            in_conditions = heading.trim().eq_ignore_ascii_case("conditions");
            continue;
        }

        if in_description {
            if trimmed.is_empty() {
                if !description_lines.is_empty() {
                    in_description = false;
                }
                continue;
            }
            description_lines.push(trimmed);
            continue;
        }

        if in_conditions {
            let item = trimmed
                .strip_prefix("- ")
                .or_else(|| return trimmed.strip_prefix("* "));
            if let Some(condition) = item.and_then(|e| return matchers.parse(e.trim())) {
                conditions.push(condition);
            }
        }
    }

    return Rule {
        name,
        description: description_lines.join(" "),
        conditions,
    };
}

fn mentions(haystack: &[&str], needles: &[&str]) -> bool {
    let text = haystack.join("\n").to_lowercase();
    return needles.iter().any(|needle| return text.contains(needle));
}

fn check(condition: &Condition, architecture: &Architecture) -> Option<String> {
    match condition {
        Condition::MustUse(service_type) => {
            if !architecture.uses(*service_type) {
                return Some(format!("The design must use {service_type} but does not."));
            }
        }
        Condition::MustNotUse(service_type) => {
            if architecture.uses(*service_type) {
                return Some(format!("The design must not use {service_type} but does."));
            }
        }
        Condition::SecurityComponent => {
            let secured = architecture
                .components
                .iter()
                .map(|e| return e.service_type)
                .chain(architecture.diagram.nodes.iter().map(|e| return e.service_type))
                .any(|e| return e.category() == ServiceCategory::Security);
            if !secured {
                return Some(
                    "The design has no security component such as WAF, Shield, IAM or Cognito."
                        .to_string(),
                );
            }
        }
        Condition::MultiAz => {
            let mut text = vec![architecture.overview.as_str()];
            text.extend(architecture.decisions.iter().map(|e| return e.as_str()));
            if !mentions(
                &text,
                &[
                    "multi-az",
                    "multi az",
                    "multiaz",
                    "multiple availability zones",
                ],
            ) {
                return Some("The design does not describe a multi-AZ deployment.".to_string());
            }
        }
        Condition::CostOptimization => {
            let text = architecture
                .practices
                .iter()
                .chain(architecture.decisions.iter())
                .map(|e| return e.as_str())
                .collect::<Vec<&str>>();
            if !mentions(&text, &["cost"]) {
                return Some("The design does not address cost optimization.".to_string());
            }
        }
    }

    return None;
}

/// Architecture rules loaded from Markdown files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    #[cfg(test)]
    pub fn parse(fallback_name: &str, content: &str) -> Result<Rule> {
        let matchers = ConditionMatchers::new()?;
        return Ok(parse_rule(&matchers, fallback_name, content));
    }

    /// Loads every `*.md` file of a directory, in file name order. A missing
    /// directory yields an empty set.
    pub async fn load(rules_dir: &str) -> Result<RuleSet> {
        let mut rule_set = RuleSet::default();
        let dir = path::PathBuf::from(rules_dir);
        if rules_dir.is_empty() || !dir.exists() {
            return Ok(rule_set);
        }

        let mut files: Vec<path::PathBuf> = vec![];
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_path = entry.path();
            if file_path.extension().and_then(|e| return e.to_str()) == Some("md") {
                files.push(file_path);
            }
        }
        files.sort();

        let matchers = ConditionMatchers::new()?;
        for file_path in files {
            let content = match fs::read_to_string(&file_path).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(error = ?err, file = ?file_path, "failed to read rule file");
                    continue;
                }
            };

            let fallback_name = file_path
                .file_stem()
                .map(|e| return e.to_string_lossy().to_string())
                .unwrap_or_default();

            let rule = parse_rule(&matchers, &fallback_name, &content);
            tracing::debug!(rule = rule.name, conditions = rule.conditions.len(), "loaded rule");
            rule_set.rules.push(rule);
        }

        return Ok(rule_set);
    }

    /// Checks an architecture against every rule. Each rule reports at most
    /// one violation, for its first failing condition.
    pub fn validate(&self, architecture: &Architecture) -> Vec<Violation> {
        return self
            .rules
            .iter()
            .filter_map(|rule| {
                let reason = rule
                    .conditions
                    .iter()
                    .find_map(|condition| return check(condition, architecture))?;

                tracing::debug!(rule = rule.name, reason = reason, "rule violated");
                return Some(Violation {
                    rule: rule.name.to_string(),
                    description: rule.description.to_string(),
                    reason,
                });
            })
            .collect::<Vec<Violation>>();
    }
}

pub fn describe_violations(violations: &[Violation]) -> String {
    return violations
        .iter()
        .enumerate()
        .map(|(idx, violation)| {
            let mut line = format!("{}. {}: {}", idx + 1, violation.rule, violation.reason);
            if !violation.description.is_empty() {
                line = format!("{line}\n   {}", violation.description);
            }
            return line;
        })
        .collect::<Vec<String>>()
        .join("\n");
}

/// One warning line per violation, as stored on a turn.
pub fn violation_warnings(violations: &[Violation]) -> Vec<String> {
    return violations
        .iter()
        .map(|e| return format!("{}: {}", e.rule, e.reason))
        .collect::<Vec<String>>();
}

/// Builds the follow-up prompt asking the model to resolve violations.
pub async fn improvement_prompt(
    composer: &PromptComposer,
    architecture: &Architecture,
    violations: &[Violation],
    requirement: &str,
) -> Result<String, PromptError> {
    return composer
        .compose_improvement(requirement, architecture, &describe_violations(violations))
        .await;
}

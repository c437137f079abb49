#[cfg(test)]
#[path = "export_test.rs"]
mod tests;

use std::path::Path;

use anyhow::Result;

use crate::domain::models::Architecture;
use crate::domain::models::Renderer;
use crate::infrastructure::renderers::mermaid::Mermaid;

pub const EXPORT_TITLE: &str = "AWS Architecture Proposal";

fn numbered(items: &[String]) -> String {
    if items.is_empty() {
        return "_None._".to_string();
    }

    return items
        .iter()
        .enumerate()
        .map(|(idx, item)| return format!("{}. {item}", idx + 1))
        .collect::<Vec<String>>()
        .join("\n");
}

pub fn to_markdown(architecture: &Architecture) -> Result<String> {
    let mut sections = vec![
        format!("# {EXPORT_TITLE}"),
        format!("## Overview\n\n{}", architecture.overview.trim()),
    ];

    let mut components = vec!["## Components".to_string()];
    for component in architecture.components.iter() {
        let mut entry = format!(
            "### {}\n\n**Service type:** {}",
            component.name, component.service_type
        );
        if !component.description.is_empty() {
            entry += &format!("\n\n{}", component.description.trim());
        }
        components.push(entry);
    }
    sections.push(components.join("\n\n"));

    sections.push(format!(
        "## Design decisions\n\n{}",
        numbered(&architecture.decisions)
    ));
    sections.push(format!(
        "## Best practices\n\n{}",
        numbered(&architecture.practices)
    ));

    let diagram = Mermaid::default().render(architecture)?;
    sections.push(format!(
        "## Diagram\n\n```mermaid\n{}\n```",
        diagram.trim_end()
    ));

    return Ok(sections.join("\n\n") + "\n");
}

pub fn to_json(architecture: &Architecture) -> Result<String> {
    return Ok(serde_json::to_string_pretty(architecture)? + "\n");
}

/// Writes JSON when the path ends in `.json`, Markdown otherwise.
pub async fn write(path: &Path, architecture: &Architecture) -> Result<()> {
    let is_json = path
        .extension()
        .map(|e| return e.to_string_lossy().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let content = if is_json {
        to_json(architecture)?
    } else {
        to_markdown(architecture)?
    };

    tokio::fs::write(path, content).await?;
    tracing::info!(path = ?path, json = is_json, "Exported architecture");

    return Ok(());
}

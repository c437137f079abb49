#[cfg(test)]
#[path = "mermaid_test.rs"]
mod tests;

use std::collections::HashMap;

use anyhow::bail;
use anyhow::Result;

use crate::domain::models::Architecture;
use crate::domain::models::Node;
use crate::domain::models::Renderer;
use crate::domain::models::RendererName;
use crate::domain::models::ServiceCategory;
use crate::domain::models::ServiceType;

/// Mermaid ids are positional. Model ids may hold any character, collide
/// once sanitized, or be Mermaid keywords such as `end`.
fn node_id(idx: usize) -> String {
    return format!("n{idx}");
}

fn escape(text: &str) -> String {
    return text
        .replace('"', "#quot;")
        .replace('|', "#124;")
        .replace('\n', "<br/>");
}

fn node_line(id: &str, node: &Node) -> String {
    let label = escape(&format!("{}\n{}", node.name, node.service_type));

    if node.service_type.category() == ServiceCategory::Database {
        return format!("  {id}[(\"{label}\")]");
    }
    if node.service_type == ServiceType::ApiGateway {
        return format!("  {id}{{\"{label}\"}}");
    }

    return format!("  {id}[\"{label}\"]");
}

/// Mermaid flowchart output, drawn top down.
#[derive(Default)]
pub struct Mermaid {}

impl Renderer for Mermaid {
    fn name(&self) -> RendererName {
        return RendererName::Mermaid;
    }

    fn extension(&self) -> &'static str {
        return "mmd";
    }

    fn render(&self, architecture: &Architecture) -> Result<String> {
        let diagram = architecture.drawable_diagram();
        let mut lines = vec!["graph TD".to_string()];

        let ids = diagram
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| return (node.id.as_str(), node_id(idx)))
            .collect::<HashMap<&str, String>>();
        let lookup = |id: &str| -> Result<String> {
            match ids.get(id) {
                Some(res) => return Ok(res.to_string()),
                None => bail!(format!("Connection references unknown node {id}")),
            }
        };

        for (idx, node) in diagram.nodes.iter().enumerate() {
            lines.push(node_line(&node_id(idx), node));
        }

        for edge in diagram.connections.iter() {
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            if edge.label.is_empty() {
                lines.push(format!("  {from} --> {to}"));
            } else {
                lines.push(format!("  {from} -->|\"{}\"| {to}", escape(&edge.label)));
            }
        }

        lines.push("  classDef aws fill:#FF9900,stroke:#232F3E,color:#232F3E;".to_string());
        if !diagram.nodes.is_empty() {
            let class_ids = (0..diagram.nodes.len())
                .map(node_id)
                .collect::<Vec<String>>();
            lines.push(format!("  class {} aws;", class_ids.join(",")));
        }

        return Ok(lines.join("\n") + "\n");
    }
}

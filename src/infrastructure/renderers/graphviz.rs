#[cfg(test)]
#[path = "graphviz_test.rs"]
mod tests;

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::models::Architecture;
use crate::domain::models::Renderer;
use crate::domain::models::RendererName;
use crate::domain::models::ServiceCategory;
use crate::domain::models::ServiceType;

fn escape(text: &str) -> String {
    return text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
}

fn fill_color(category: ServiceCategory) -> &'static str {
    match category {
        ServiceCategory::Compute => return "#F9D9B4",
        ServiceCategory::Database => return "#C9D5F5",
        ServiceCategory::Network => return "#D9CCF2",
        ServiceCategory::Storage => return "#CDE8C4",
        ServiceCategory::Security => return "#F5C6C6",
        ServiceCategory::Integration => return "#F8D2E6",
        ServiceCategory::Management => return "#E3E3E3",
    }
}

/// Graphviz DOT output, drawn left to right.
#[derive(Default)]
pub struct Graphviz {
    icons_dir: Option<PathBuf>,
}

impl Graphviz {
    pub fn new(icons_dir: &str) -> Graphviz {
        if icons_dir.is_empty() {
            return Graphviz::default();
        }

        return Graphviz {
            icons_dir: Some(PathBuf::from(icons_dir)),
        };
    }

    fn icon(&self, service_type: ServiceType) -> Option<PathBuf> {
        let dir = self.icons_dir.as_ref()?;
        let path = dir.join(format!("{service_type}.png"));
        if path.is_file() {
            return Some(path);
        }

        return None;
    }
}

impl Renderer for Graphviz {
    fn name(&self) -> RendererName {
        return RendererName::Dot;
    }

    fn extension(&self) -> &'static str {
        return "dot";
    }

    fn render(&self, architecture: &Architecture) -> Result<String> {
        let diagram = architecture.drawable_diagram();
        let mut lines = vec![
            "digraph architecture {".to_string(),
            "  rankdir=LR;".to_string(),
            "  graph [fontname=\"Helvetica\", splines=true];".to_string(),
            "  node [shape=box, style=\"rounded,filled\", fontname=\"Helvetica\"];".to_string(),
            "  edge [fontname=\"Helvetica\", fontsize=10];".to_string(),
            "".to_string(),
        ];

        for node in diagram.nodes.iter() {
            let mut attrs = vec![
                format!(
                    "label=\"{}\"",
                    escape(&format!("{}\n{}", node.name, node.service_type))
                ),
                format!(
                    "fillcolor=\"{}\"",
                    fill_color(node.service_type.category())
                ),
            ];
            if let Some(icon) = self.icon(node.service_type) {
                attrs.push(format!(
                    "image=\"{}\"",
                    escape(&icon.to_string_lossy())
                ));
                attrs.push("labelloc=\"b\"".to_string());
            }

            lines.push(format!("  \"{}\" [{}];", escape(&node.id), attrs.join(", ")));
        }

        if !diagram.connections.is_empty() {
            lines.push("".to_string());
        }

        for edge in diagram.connections.iter() {
            let mut line = format!("  \"{}\" -> \"{}\"", escape(&edge.from), escape(&edge.to));
            if !edge.label.is_empty() {
                line += &format!(" [label=\"{}\"]", escape(&edge.label));
            }
            line += ";";
            lines.push(line);
        }

        lines.push("}".to_string());
        return Ok(lines.join("\n") + "\n");
    }
}

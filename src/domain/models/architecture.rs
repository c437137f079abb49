#[cfg(test)]
#[path = "architecture_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::ServiceType;

/// Characters the diagram tooling cannot display inside a label.
pub const FORBIDDEN_NAME_CHARS: [char; 6] = ['[', ']', '(', ')', '{', '}'];

/// Strips bracket characters from a display name.
pub fn sanitize_name(name: &str) -> String {
    return name
        .chars()
        .filter(|c| return !FORBIDDEN_NAME_CHARS.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub service_type: ServiceType,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", alias = "service_type")]
    pub service_type: ServiceType,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<Node>,
    pub connections: Vec<Edge>,
}

impl Diagram {
    /// Builds a diagram out of a component list when the model returned no
    /// nodes: one node per component, chained in declaration order.
    pub fn derived_from(components: &[Component]) -> Diagram {
        let nodes = components
            .iter()
            .enumerate()
            .map(|(idx, component)| {
                return Node {
                    id: format!("node_{idx}"),
                    service_type: component.service_type,
                    name: component.name.to_string(),
                };
            })
            .collect::<Vec<Node>>();

        let connections = nodes
            .windows(2)
            .map(|pair| {
                return Edge {
                    from: pair[0].id.to_string(),
                    to: pair[1].id.to_string(),
                    label: "".to_string(),
                };
            })
            .collect::<Vec<Edge>>();

        return Diagram { nodes, connections };
    }
}

/// A structured design proposal. Field names on the wire follow the JSON
/// schema the prompts ask the model for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    #[serde(rename = "architecture_overview")]
    pub overview: String,
    pub components: Vec<Component>,
    #[serde(rename = "diagram_description")]
    pub diagram: Diagram,
    #[serde(rename = "design_decisions")]
    pub decisions: Vec<String>,
    #[serde(rename = "best_practices")]
    pub practices: Vec<String>,
}

impl Architecture {
    /// The diagram to draw, falling back to one derived from the components.
    pub fn drawable_diagram(&self) -> Diagram {
        if self.diagram.nodes.is_empty() {
            return Diagram::derived_from(&self.components);
        }

        return self.diagram.clone();
    }

    pub fn uses(&self, service_type: ServiceType) -> bool {
        return self.components.iter().any(|e| return e.service_type == service_type)
            || self
                .diagram
                .nodes
                .iter()
                .any(|e| return e.service_type == service_type);
    }

    pub fn to_pretty_json(&self) -> String {
        // Plain structs with string keys always serialize.
        return serde_json::to_string_pretty(self).unwrap_or_default();
    }

    /// First line of the overview, clipped for session listings.
    pub fn summary(&self, max_len: usize) -> String {
        let line = self.overview.lines().next().unwrap_or_default().trim();
        if line.chars().count() <= max_len {
            return line.to_string();
        }

        let clipped = line
            .chars()
            .take(max_len.saturating_sub(3))
            .collect::<String>();
        return format!("{clipped}...");
    }
}

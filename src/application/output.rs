#[cfg(test)]
#[path = "output_test.rs"]
mod tests;

use yansi::Paint;

use crate::domain::models::Architecture;
use crate::domain::models::Message;
use crate::domain::models::MessageType;

fn heading(text: &str) -> String {
    return Paint::new(text).bold().underline().to_string();
}

fn indent(text: &str, prefix: &str) -> String {
    return text
        .lines()
        .map(|line| return format!("{prefix}{line}"))
        .collect::<Vec<String>>()
        .join("\n");
}

fn numbered(items: &[String]) -> String {
    if items.is_empty() {
        return "  (none)".to_string();
    }

    return items
        .iter()
        .enumerate()
        .map(|(idx, item)| return format!("  {}. {item}", idx + 1))
        .collect::<Vec<String>>()
        .join("\n");
}

/// Renders the five fields of an architecture, then any rule warnings.
pub fn format_architecture(architecture: &Architecture, warnings: &[String]) -> String {
    let mut sections = vec![format!(
        "{}\n{}",
        heading("Overview"),
        indent(architecture.overview.trim(), "  ")
    )];

    let components = architecture
        .components
        .iter()
        .enumerate()
        .map(|(idx, component)| {
            let mut line = format!(
                "  {}. {} {}",
                idx + 1,
                Paint::new(&component.name).bold(),
                Paint::cyan(format!("[{}]", component.service_type))
            );
            if !component.description.is_empty() {
                line = format!("{line}\n{}", indent(component.description.trim(), "     "));
            }
            return line;
        })
        .collect::<Vec<String>>();
    sections.push(format!("{}\n{}", heading("Components"), components.join("\n")));

    let diagram = architecture.drawable_diagram();
    let mut diagram_lines = diagram
        .nodes
        .iter()
        .map(|node| {
            return format!(
                "  {} {} {}",
                node.id,
                Paint::cyan(format!("[{}]", node.service_type)),
                node.name
            );
        })
        .collect::<Vec<String>>();
    diagram_lines.extend(diagram.connections.iter().map(|edge| {
        if edge.label.is_empty() {
            return format!("  {} -> {}", edge.from, edge.to);
        }
        return format!("  {} -> {}: {}", edge.from, edge.to, edge.label);
    }));
    sections.push(format!("{}\n{}", heading("Diagram"), diagram_lines.join("\n")));

    sections.push(format!(
        "{}\n{}",
        heading("Design decisions"),
        numbered(&architecture.decisions)
    ));
    sections.push(format!(
        "{}\n{}",
        heading("Best practices"),
        numbered(&architecture.practices)
    ));

    if !warnings.is_empty() {
        let lines = warnings
            .iter()
            .map(|e| return format!("  - {}", Paint::yellow(e)))
            .collect::<Vec<String>>();
        sections.push(format!("{}\n{}", heading("Rule warnings"), lines.join("\n")));
    }

    return sections.join("\n\n");
}

pub fn format_message(message: &Message) -> String {
    match message.message_type() {
        MessageType::Normal => return message.text.to_string(),
        MessageType::Warning => return Paint::yellow(&message.text).to_string(),
        MessageType::Error => return Paint::red(&message.text).to_string(),
    }
}

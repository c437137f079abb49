#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;

use serde_json::Map;
use serde_json::Value;

use crate::domain::models::sanitize_name;
use crate::domain::models::Architecture;
use crate::domain::models::Component;
use crate::domain::models::Diagram;
use crate::domain::models::Edge;
use crate::domain::models::Node;
use crate::domain::models::ParseError;
use crate::domain::models::ServiceType;

type Object = Map<String, Value>;

/// Returns the body of the first fenced code block. The language tag line is
/// skipped, and an unclosed fence runs to the end of the text.
fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];

    let mut body = after;
    if let Some(newline) = after.find('\n') {
        if !after[..newline].contains('{') {
            body = &after[newline + 1..];
        }
    }

    if let Some(end) = body.find("```") {
        return Some(&body[..end]);
    }

    return Some(body);
}

/// Locates the JSON object inside a model completion.
pub fn extract_json(raw: &str) -> Result<&str, ParseError> {
    let region = fenced_block(raw).unwrap_or(raw);

    let start = match region.find('{') {
        Some(idx) => idx,
        None => {
            return Err(ParseError::MalformedJson(
                "no JSON object found in response".to_string(),
            ));
        }
    };

    let end = match region.rfind('}') {
        Some(idx) if idx > start => idx + 1,
        _ => region.len(),
    };

    return Ok(&region[start..end]);
}

fn field<'a>(obj: &'a Object, path: &str, key: &str) -> Result<&'a Value, ParseError> {
    match obj.get(key) {
        Some(Value::Null) | None => {
            return Err(ParseError::MissingField(join_path(path, key)));
        }
        Some(value) => return Ok(value),
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        return key.to_string();
    }

    return format!("{path}.{key}");
}

fn string_field(obj: &Object, path: &str, key: &str) -> Result<String, ParseError> {
    match field(obj, path, key)? {
        Value::String(text) => return Ok(text.to_string()),
        _ => {
            return Err(ParseError::MalformedJson(format!(
                "'{}' must be a string",
                join_path(path, key)
            )));
        }
    }
}

fn optional_string_field(obj: &Object, path: &str, key: &str) -> Result<String, ParseError> {
    match obj.get(key) {
        Some(Value::String(text)) => return Ok(text.to_string()),
        Some(Value::Null) | None => return Ok("".to_string()),
        Some(_) => {
            return Err(ParseError::MalformedJson(format!(
                "'{}' must be a string",
                join_path(path, key)
            )));
        }
    }
}

fn array_field<'a>(obj: &'a Object, path: &str, key: &str) -> Result<&'a Vec<Value>, ParseError> {
    match field(obj, path, key)? {
        Value::Array(items) => return Ok(items),
        _ => {
            return Err(ParseError::MalformedJson(format!(
                "'{}' must be an array",
                join_path(path, key)
            )));
        }
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Object, ParseError> {
    if let Value::Object(obj) = value {
        return Ok(obj);
    }

    return Err(ParseError::MalformedJson(format!(
        "'{path}' must be an object"
    )));
}

fn string_list(obj: &Object, key: &str) -> Result<Vec<String>, ParseError> {
    return array_field(obj, "", key)?
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(text) => return Ok(text.to_string()),
            _ => {
                return Err(ParseError::MalformedJson(format!(
                    "'{key}[{idx}]' must be a string"
                )));
            }
        })
        .collect::<Result<Vec<String>, ParseError>>();
}

fn service_type(owner: String, value: &str) -> Result<ServiceType, ParseError> {
    return ServiceType::parse(value).ok_or_else(|| {
        return ParseError::InvalidServiceType {
            owner,
            value: value.to_string(),
        };
    });
}

fn parse_component(value: &Value, path: &str) -> Result<Component, ParseError> {
    let obj = as_object(value, path)?;
    let raw_name = string_field(obj, path, "name")?;
    let raw_type = string_field(obj, path, "service_type")?;
    let service_type = service_type(format!("component '{raw_name}'"), &raw_type)?;

    let mut name = sanitize_name(&raw_name);
    if name.is_empty() {
        name = service_type.to_string();
    }

    return Ok(Component {
        name,
        service_type,
        description: optional_string_field(obj, path, "description")?,
    });
}

fn parse_node(value: &Value, path: &str) -> Result<Node, ParseError> {
    let obj = as_object(value, path)?;
    let id = string_field(obj, path, "id")?;

    let type_key = if obj.contains_key("type") {
        "type"
    } else if obj.contains_key("service_type") {
        "service_type"
    } else {
        "type"
    };
    let raw_type = string_field(obj, path, type_key)?;
    let service_type = service_type(format!("node '{id}'"), &raw_type)?;

    let mut name = sanitize_name(&optional_string_field(obj, path, "name")?);
    if name.is_empty() {
        name = id.to_string();
    }

    return Ok(Node {
        id,
        service_type,
        name,
    });
}

fn parse_edge(value: &Value, path: &str) -> Result<Edge, ParseError> {
    let obj = as_object(value, path)?;

    return Ok(Edge {
        from: string_field(obj, path, "from")?,
        to: string_field(obj, path, "to")?,
        label: optional_string_field(obj, path, "label")?,
    });
}

fn parse_diagram(value: &Value) -> Result<Diagram, ParseError> {
    let path = "diagram_description";
    let obj = as_object(value, path)?;

    let mut nodes: Vec<Node> = vec![];
    for (idx, item) in array_field(obj, path, "nodes")?.iter().enumerate() {
        let node = parse_node(item, &format!("{path}.nodes[{idx}]"))?;
        if nodes.iter().any(|e| return e.id == node.id) {
            return Err(ParseError::DuplicateNode(node.id));
        }
        nodes.push(node);
    }

    let mut connections: Vec<Edge> = vec![];
    for (idx, item) in array_field(obj, path, "connections")?.iter().enumerate() {
        let edge = parse_edge(item, &format!("{path}.connections[{idx}]"))?;
        for endpoint in [&edge.from, &edge.to] {
            if !nodes.iter().any(|e| return &e.id == endpoint) {
                return Err(ParseError::DanglingEdge {
                    from: edge.from.to_string(),
                    to: edge.to.to_string(),
                    missing: endpoint.to_string(),
                });
            }
        }
        connections.push(edge);
    }

    return Ok(Diagram { nodes, connections });
}

/// Turns a raw model completion into a validated architecture.
pub fn parse(raw: &str) -> Result<Architecture, ParseError> {
    let json = extract_json(raw)?;
    let value: Value = serde_json::from_str(json).map_err(|err| {
        return ParseError::MalformedJson(err.to_string());
    })?;

    let root = match &value {
        Value::Object(obj) => obj,
        _ => {
            return Err(ParseError::MalformedJson(
                "response root is not an object".to_string(),
            ));
        }
    };

    let overview = string_field(root, "", "architecture_overview")?;

    let components = array_field(root, "", "components")?
        .iter()
        .enumerate()
        .map(|(idx, item)| return parse_component(item, &format!("components[{idx}]")))
        .collect::<Result<Vec<Component>, ParseError>>()?;

    let diagram = parse_diagram(field(root, "", "diagram_description")?)?;
    let decisions = string_list(root, "design_decisions")?;
    let practices = string_list(root, "best_practices")?;

    tracing::debug!(
        components = components.len(),
        nodes = diagram.nodes.len(),
        connections = diagram.connections.len(),
        "parsed architecture"
    );

    return Ok(Architecture {
        overview,
        components,
        diagram,
        decisions,
        practices,
    });
}

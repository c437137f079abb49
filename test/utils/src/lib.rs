/// A well-formed model answer for "a simple web app with a database".
pub fn architecture_fixture() -> &'static str {
    return r#"
{
  "architecture_overview": "A two tier web application with an EC2 web tier and a managed RDS database.",
  "components": [
    {"name": "Web Server", "service_type": "EC2", "description": "Serves the application over HTTP."},
    {"name": "Database", "service_type": "RDS", "description": "Stores relational application data."}
  ],
  "diagram_description": {
    "nodes": [
      {"id": "web", "type": "EC2", "name": "Web Server"},
      {"id": "db", "type": "RDS", "name": "Database"}
    ],
    "connections": [
      {"from": "web", "to": "db", "label": "SQL queries"}
    ]
  },
  "design_decisions": [
    "Use RDS to offload database administration.",
    "Keep the web tier stateless so it can scale horizontally."
  ],
  "best_practices": [
    "Place the database in private subnets.",
    "Enable automated backups."
  ]
}
"#
    .trim();
}

/// The same answer wrapped the way chat models usually reply.
pub fn fenced_response_fixture() -> String {
    return format!(
        "Here is the proposed architecture:\n\n```json\n{}\n```\n\nLet me know if you want changes.",
        architecture_fixture()
    );
}

/// A completion that was cut off mid-document.
pub fn truncated_response_fixture() -> &'static str {
    return r#"{
  "architecture_overview": "A two tier web application",
  "components": [
    {"name": "Web Server", "service_type": "EC2", "description": "Serves the"#;
}

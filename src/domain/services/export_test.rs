use anyhow::Result;
use test_utils::architecture_fixture;

use super::to_json;
use super::to_markdown;
use super::write;
use crate::domain::models::Architecture;

fn fixture() -> Architecture {
    return serde_json::from_str(architecture_fixture()).unwrap();
}

#[test]
fn it_exports_markdown() -> Result<()> {
    let res = to_markdown(&fixture())?;
    insta::assert_snapshot!(res, @r###"
    # AWS Architecture Proposal

    ## Overview

    A two tier web application with an EC2 web tier and a managed RDS database.

    ## Components

    ### Web Server

    **Service type:** EC2

    Serves the application over HTTP.

    ### Database

    **Service type:** RDS

    Stores relational application data.

    ## Design decisions

    1. Use RDS to offload database administration.
    2. Keep the web tier stateless so it can scale horizontally.

    ## Best practices

    1. Place the database in private subnets.
    2. Enable automated backups.

    ## Diagram

    ```mermaid
    graph TD
      n0["Web Server<br/>EC2"]
      n1[("Database<br/>RDS")]
      n0 -->|"SQL queries"| n1
      classDef aws fill:#FF9900,stroke:#232F3E,color:#232F3E;
      class n0,n1 aws;
    ```
    "###);

    return Ok(());
}

#[test]
fn it_marks_empty_lists() -> Result<()> {
    let mut arch = fixture();
    arch.practices.clear();

    let res = to_markdown(&arch)?;
    assert!(res.contains("## Best practices\n\n_None._\n"));

    return Ok(());
}

#[test]
fn it_exports_json_in_wire_schema() -> Result<()> {
    let res = to_json(&fixture())?;
    let value: serde_json::Value = serde_json::from_str(&res)?;
    assert_eq!(value["components"][0]["service_type"], "EC2");
    assert_eq!(value["diagram_description"]["nodes"][1]["type"], "RDS");

    let back: Architecture = serde_json::from_str(&res)?;
    assert_eq!(back, fixture());

    return Ok(());
}

#[tokio::test]
async fn it_writes_by_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let json_path = dir.path().join("design.JSON");
    let md_path = dir.path().join("design.md");

    write(&json_path, &fixture()).await?;
    write(&md_path, &fixture()).await?;

    assert!(std::fs::read_to_string(json_path)?.starts_with('{'));
    assert!(std::fs::read_to_string(md_path)?.starts_with("# AWS Architecture Proposal"));

    return Ok(());
}

use test_utils::architecture_fixture;

use super::Session;
use super::Turn;
use super::TurnOutcome;
use crate::domain::models::Architecture;

fn fixture() -> Architecture {
    return serde_json::from_str(architecture_fixture()).unwrap();
}

fn turn(id: &str, outcome: TurnOutcome) -> Turn {
    return Turn {
        id: id.to_string(),
        requirement: format!("requirement {id}"),
        submitted_at: "2023-11-01T10:00:00+00:00".to_string(),
        outcome,
    };
}

fn session(turns: Vec<Turn>) -> Session {
    return Session {
        id: "abc".to_string(),
        name: "Storefront".to_string(),
        created_at: "2023-11-01T10:00:00+00:00".to_string(),
        updated_at: "2023-11-01T10:05:00+00:00".to_string(),
        turns,
    };
}

#[test]
fn it_finds_latest_completed_turn() {
    let mut later = fixture();
    later.overview = "Later".to_string();

    let res = session(vec![
        turn(
            "1",
            TurnOutcome::Completed {
                architecture: fixture(),
                warnings: vec![],
            },
        ),
        turn(
            "2",
            TurnOutcome::Completed {
                architecture: later.clone(),
                warnings: vec!["Security baseline: missing WAF".to_string()],
            },
        ),
        turn(
            "3",
            TurnOutcome::Failed {
                error: "timeout".to_string(),
                raw_response: None,
            },
        ),
    ]);

    let (architecture, warnings) = res.latest_completed().unwrap();
    assert_eq!(architecture, &later);
    assert_eq!(warnings, ["Security baseline: missing WAF".to_string()]);
    assert_eq!(res.latest_architecture(), Some(&later));
    assert_eq!(res.requirements(), vec!["requirement 1", "requirement 2"]);
}

#[test]
fn it_finds_latest_raw_response() {
    let res = session(vec![
        turn(
            "1",
            TurnOutcome::Failed {
                error: "bad json".to_string(),
                raw_response: Some("{oops".to_string()),
            },
        ),
        turn(
            "2",
            TurnOutcome::Failed {
                error: "timeout".to_string(),
                raw_response: None,
            },
        ),
    ]);

    assert_eq!(res.latest_raw_response(), Some("{oops"));
    assert!(res.latest_completed().is_none());
}

#[test]
fn it_describes_sessions() {
    let empty = session(vec![]);
    insta::assert_snapshot!(empty.describe(), @"(ID: abc) Storefront, Turns: 0, Updated: 2023-11-01T10:05:00+00:00");

    let completed = session(vec![turn(
        "1",
        TurnOutcome::Completed {
            architecture: fixture(),
            warnings: vec![],
        },
    )]);
    insta::assert_snapshot!(completed.describe(), @"(ID: abc) Storefront, Turns: 1, Updated: 2023-11-01T10:05:00+00:00, A two tier web application with an EC2 web tier and a managed RDS d...");
}

#[test]
fn it_serializes_outcomes_with_status_tag() {
    let pending = turn("1", TurnOutcome::Pending);
    let yaml = serde_yaml::to_string(&pending).unwrap();
    assert!(yaml.contains("status: pending"));

    let back: Turn = serde_yaml::from_str(&yaml).unwrap();
    assert!(back.is_pending());
}

use std::time::Duration;

use anyhow::Result;
use mockito::Matcher;
use test_utils::architecture_fixture;
use test_utils::truncated_response_fixture;

use super::Architect;
use crate::domain::models::Architecture;
use crate::domain::models::ArchitectError;
use crate::domain::models::BackendName;
use crate::domain::models::Component;
use crate::domain::models::ModelParameters;
use crate::domain::models::Node;
use crate::domain::models::ParseError;
use crate::domain::models::ServiceType;
use crate::domain::models::TurnOutcome;
use crate::domain::services::rules::RuleSet;
use crate::domain::services::PromptComposer;
use crate::domain::services::SessionStore;
use crate::infrastructure::backends::qianwen::Qianwen;

fn fixture() -> Architecture {
    return serde_json::from_str(architecture_fixture()).unwrap();
}

fn qianwen_body(text: &str) -> String {
    return serde_json::json!({
        "output": {"text": text, "finish_reason": "stop"},
        "request_id": "r-1"
    })
    .to_string();
}

fn architect(url: String, rules: RuleSet) -> Architect {
    let backend = Qianwen::new(
        url,
        "abc".to_string(),
        ModelParameters {
            model: "qwen-max".to_string(),
            temperature: 0.7,
            top_p: 0.8,
            max_tokens: 2000,
            timeout: Duration::from_millis(2000),
        },
    );

    return Architect::new(
        Box::new(backend),
        PromptComposer::new("", BackendName::Qianwen),
        rules,
        1,
    );
}

fn with_iam(mut arch: Architecture) -> Architecture {
    arch.components.push(Component {
        name: "Access control".to_string(),
        service_type: ServiceType::Iam,
        description: "Scoped roles for the web tier.".to_string(),
    });
    return arch;
}

#[tokio::test]
async fn it_completes_a_turn_for_a_new_requirement() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::Regex(
            "a simple web app with a database".to_string(),
        ))
        .with_status(200)
        .with_body(qianwen_body(architecture_fixture()))
        .create_async()
        .await;

    let mut store = SessionStore::in_memory();
    let session_id = store.create_session("Web app").await;
    let architect = architect(server.url(), RuleSet::default());

    let res = architect
        .submit(
            &mut store,
            &session_id,
            "a simple web app with a database",
            None,
        )
        .await?;
    mock.assert_async().await;
    assert!(res.warnings.is_empty());

    let session = store.get_session(&session_id)?;
    assert_eq!(session.turns.len(), 1);

    let arch = session.turns[0].architecture().unwrap();
    let components = arch
        .components
        .iter()
        .map(|e| return (e.name.as_str(), e.service_type))
        .collect::<Vec<(&str, ServiceType)>>();
    assert_eq!(
        components,
        vec![("Web Server", ServiceType::Ec2), ("Database", ServiceType::Rds)]
    );
    assert_eq!(arch.diagram.connections.len(), 1);

    return Ok(());
}

#[tokio::test]
async fn it_fails_the_turn_on_truncated_responses() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(qianwen_body(truncated_response_fixture()))
        .create_async()
        .await;

    let mut store = SessionStore::in_memory();
    let session_id = store.create_session("Web app").await;
    let architect = architect(server.url(), RuleSet::default());

    let res = architect
        .submit(
            &mut store,
            &session_id,
            "a simple web app with a database",
            None,
        )
        .await;
    mock.assert_async().await;

    let err = res.unwrap_err();
    assert!(matches!(
        err,
        ArchitectError::Parse {
            error: ParseError::MalformedJson(_),
            ..
        }
    ));
    assert_eq!(
        err.raw_response(),
        Some(truncated_response_fixture().to_string())
    );

    let session = store.get_session(&session_id)?;
    assert_eq!(session.turns.len(), 1);
    assert!(session.turns[0].is_failed());
    assert!(store.latest_architecture(&session_id).is_none());
    assert_eq!(
        store.last_failed_requirement(&session_id),
        Some("a simple web app with a database".to_string())
    );

    return Ok(());
}

#[tokio::test]
async fn it_refines_the_latest_architecture() -> Result<()> {
    let mut refined = fixture();
    refined.components.push(Component {
        name: "Cache".to_string(),
        service_type: ServiceType::ElastiCache,
        description: "Caches hot reads.".to_string(),
    });
    refined.diagram.nodes.push(Node {
        id: "cache".to_string(),
        service_type: ServiceType::ElastiCache,
        name: "Cache".to_string(),
    });

    let mut server = mockito::Server::new_async().await;
    let initial_mock = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("System requirements:".to_string()))
        .with_status(200)
        .with_body(qianwen_body(architecture_fixture()))
        .create_async()
        .await;
    let refine_mock = server
        .mock("POST", "/")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Earlier requirements".to_string()),
            Matcher::Regex("add a caching layer".to_string()),
            Matcher::Regex("Serves the application over HTTP".to_string()),
        ]))
        .with_status(200)
        .with_body(qianwen_body(&refined.to_pretty_json()))
        .create_async()
        .await;

    let mut store = SessionStore::in_memory();
    let session_id = store.create_session("Web app").await;
    let architect = architect(server.url(), RuleSet::default());
    architect
        .submit(
            &mut store,
            &session_id,
            "a simple web app with a database",
            None,
        )
        .await?;

    let pending = architect
        .begin(&mut store, &session_id, "add a caching layer")
        .await?;
    assert!(pending.prompt.contains("add a caching layer"));
    assert!(pending.prompt.contains(&fixture().to_pretty_json()));
    assert!(pending
        .prompt
        .contains("1. a simple web app with a database"));
    assert!(store.find_turn(&pending.turn_id).unwrap().is_pending());

    let result = architect
        .resolve(&pending.prompt, &pending.requirement, None)
        .await;
    Architect::finish(&mut store, &pending, &result).await?;

    initial_mock.assert_async().await;
    refine_mock.assert_async().await;

    let latest = store.latest_architecture(&session_id).unwrap();
    assert_eq!(latest.components.len(), 3);
    assert_eq!(store.get_session(&session_id)?.turns.len(), 2);

    return Ok(());
}

#[tokio::test]
async fn it_fails_the_turn_on_model_errors() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(429)
        .with_body(r#"{"code": "Throttling", "message": "Requests rate limit exceeded."}"#)
        .create_async()
        .await;

    let mut store = SessionStore::in_memory();
    let session_id = store.create_session("Web app").await;
    let architect = architect(server.url(), RuleSet::default());

    let res = architect
        .submit(&mut store, &session_id, "a queue worker", None)
        .await;
    mock.assert_async().await;

    let err = res.unwrap_err();
    assert!(matches!(err, ArchitectError::ModelCall(_)));
    assert!(err.raw_response().is_none());

    let turn = &store.get_session(&session_id)?.turns[0];
    match &turn.outcome {
        TurnOutcome::Failed {
            error,
            raw_response,
        } => {
            assert!(error.contains("Throttling"));
            assert!(raw_response.is_none());
        }
        outcome => panic!("unexpected outcome {outcome:?}"),
    }

    return Ok(());
}

#[tokio::test]
async fn it_improves_architectures_that_break_rules() -> Result<()> {
    let improved = with_iam(fixture());

    let mut server = mockito::Server::new_async().await;
    let initial_mock = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("System requirements:".to_string()))
        .with_status(200)
        .with_body(qianwen_body(architecture_fixture()))
        .create_async()
        .await;
    let improve_mock = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("Problems to resolve".to_string()))
        .with_status(200)
        .with_body(qianwen_body(&improved.to_pretty_json()))
        .create_async()
        .await;

    let rules = RuleSet {
        rules: vec![RuleSet::parse(
            "iam",
            "# Identity\n\n## Conditions\n- Must use IAM",
        )?],
    };
    let architect = architect(server.url(), rules);

    let res = architect
        .resolve(
            &PromptComposer::new("", BackendName::Qianwen)
                .compose_initial("a web app")
                .await?,
            "a web app",
            None,
        )
        .await?;

    initial_mock.assert_async().await;
    improve_mock.assert_async().await;
    assert_eq!(res.architecture, improved);
    assert!(res.warnings.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_keeps_the_last_good_architecture_when_improvement_fails() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let initial_mock = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("System requirements:".to_string()))
        .with_status(200)
        .with_body(qianwen_body(architecture_fixture()))
        .create_async()
        .await;
    let improve_mock = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("Problems to resolve".to_string()))
        .with_status(500)
        .with_body(r#"{"code": "InternalError", "message": "Try again later."}"#)
        .create_async()
        .await;

    let rules = RuleSet {
        rules: vec![RuleSet::parse(
            "iam",
            "# Identity\n\n## Conditions\n- Must use IAM",
        )?],
    };
    let architect = architect(server.url(), rules);

    let res = architect
        .resolve(
            &PromptComposer::new("", BackendName::Qianwen)
                .compose_initial("a web app")
                .await?,
            "a web app",
            None,
        )
        .await?;

    initial_mock.assert_async().await;
    improve_mock.assert_async().await;
    assert_eq!(res.architecture, fixture());
    assert_eq!(
        res.warnings,
        vec!["Identity: The design must use IAM but does not.".to_string()]
    );

    return Ok(());
}

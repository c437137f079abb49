use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use mockito::Matcher;
use tokio::sync::mpsc;

use super::Qianwen;
use super::DEFAULT_MODEL;
use crate::domain::models::Backend;
use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendResponse;
use crate::domain::models::Event;
use crate::domain::models::ModelParameters;

fn params() -> ModelParameters {
    return ModelParameters {
        model: DEFAULT_MODEL.to_string(),
        temperature: 0.7,
        top_p: 0.8,
        max_tokens: 2000,
        timeout: Duration::from_millis(2000),
    };
}

impl Qianwen {
    fn with_url(url: String) -> Qianwen {
        return Qianwen::new(url, "abc".to_string(), params());
    }
}

fn to_res(event: Option<Event>) -> Result<BackendResponse> {
    let res = match event.unwrap() {
        Event::BackendPromptResponse(res) => res,
        _ => bail!("Wrong type from recv"),
    };

    return Ok(res);
}

#[tokio::test]
async fn it_health_checks_configuration() {
    let backend = Qianwen::with_url("http://localhost".to_string());
    assert!(backend.health_check().await.is_ok());

    let missing_key = Qianwen::new("http://localhost".to_string(), "".to_string(), params());
    assert!(missing_key.health_check().await.is_err());

    let missing_url = Qianwen::new("".to_string(), "abc".to_string(), params());
    assert!(missing_url.health_check().await.is_err());
}

#[tokio::test]
async fn it_gets_completions() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_header("authorization", "Bearer abc")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "qwen-max",
            "input": {"prompt": "Design a web app"},
            "parameters": {"max_tokens": 2000, "result_format": "text"}
        })))
        .with_status(200)
        .with_body(r#"{"output": {"text": "{\"a\": 1}", "finish_reason": "stop"}, "request_id": "r-1"}"#)
        .create_async()
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let backend = Qianwen::with_url(server.url());
    let text = backend
        .get_completion(BackendPrompt::new("Design a web app".to_string()), Some(&tx))
        .await?;

    mock.assert_async().await;
    assert_eq!(text, "{\"a\": 1}");

    let first_recv = to_res(rx.recv().await)?;
    let second_recv = to_res(rx.recv().await)?;
    assert_eq!(first_recv.text, "{\"a\": 1}");
    assert!(!first_recv.done);
    assert_eq!(second_recv.text, "");
    assert!(second_recv.done);

    return Ok(());
}

#[tokio::test]
async fn it_fails_on_error_status() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(401)
        .with_body(r#"{"code": "InvalidApiKey", "message": "Invalid API-key provided."}"#)
        .create_async()
        .await;

    let backend = Qianwen::with_url(server.url());
    let res = backend
        .get_completion(BackendPrompt::new("Design a web app".to_string()), None)
        .await;

    mock.assert_async().await;
    let err = res.unwrap_err().to_string();
    assert!(err.contains("401"));
    assert!(err.contains("InvalidApiKey"));
    assert!(!err.contains("abc"));

    return Ok(());
}

#[tokio::test]
async fn it_fails_without_output() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"request_id": "r-2"}"#)
        .create_async()
        .await;

    let backend = Qianwen::with_url(server.url());
    let res = backend
        .get_completion(BackendPrompt::new("Design a web app".to_string()), None)
        .await;

    mock.assert_async().await;
    assert!(res.is_err());

    return Ok(());
}

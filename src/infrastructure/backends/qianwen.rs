#[cfg(test)]
#[path = "qianwen_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::sync::mpsc;

use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendResponse;
use crate::domain::models::Event;
use crate::domain::models::ModelParameters;

pub const DEFAULT_MODEL: &str = "qwen-max";

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompletionInput {
    prompt: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompletionParameters {
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    result_format: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompletionRequest {
    model: String,
    input: CompletionInput,
    parameters: CompletionParameters,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionOutput {
    #[serde(default)]
    text: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionResponse {
    output: Option<CompletionOutput>,
    #[serde(default)]
    request_id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Alibaba DashScope text generation API.
pub struct Qianwen {
    url: String,
    token: String,
    params: ModelParameters,
}

impl Qianwen {
    pub fn new(url: String, token: String, params: ModelParameters) -> Qianwen {
        return Qianwen { url, token, params };
    }
}

#[async_trait]
impl Backend for Qianwen {
    fn name(&self) -> BackendName {
        return BackendName::Qianwen;
    }

    fn model(&self) -> String {
        return self.params.model.to_string();
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Qianwen URL is not defined");
        }
        if self.token.is_empty() {
            bail!("Qianwen API key is not defined. Set it with --qianwen-api-key, QIANWEN_API_KEY, or the config file.");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn get_completion<'a>(
        &self,
        prompt: BackendPrompt,
        tx: Option<&'a mpsc::UnboundedSender<Event>>,
    ) -> Result<String> {
        let req = CompletionRequest {
            model: self.params.model.to_string(),
            input: CompletionInput {
                prompt: prompt.text,
            },
            parameters: CompletionParameters {
                temperature: self.params.temperature,
                top_p: self.params.top_p,
                max_tokens: self.params.max_tokens,
                result_format: "text".to_string(),
            },
        };

        let res = reqwest::Client::new()
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .timeout(self.params.timeout)
            .json(&req)
            .send()
            .await?;

        let status = res.status().as_u16();
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) if !err.message.is_empty() => format!("{}: {}", err.code, err.message),
                _ => body,
            };

            tracing::error!(status = status, "Failed to make completion request to Qianwen");
            bail!(format!(
                "Failed to make completion request to Qianwen, {status} {detail}"
            ));
        }

        let ores = res.json::<CompletionResponse>().await?;
        tracing::debug!(request_id = ores.request_id, "Completion response");

        let text = match ores.output {
            Some(output) => output.text,
            None => bail!("Qianwen returned a response without output text"),
        };

        if let Some(tx) = tx {
            tx.send(Event::BackendPromptResponse(BackendResponse {
                text: text.to_string(),
                done: false,
            }))?;
            tx.send(Event::BackendPromptResponse(BackendResponse {
                text: "".to_string(),
                done: true,
            }))?;
        }

        return Ok(text);
    }
}

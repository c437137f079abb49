#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

use super::convert_err;
use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendResponse;
use crate::domain::models::Event;
use crate::domain::models::ModelParameters;

pub const DEFAULT_MODEL: &str = "gemini-pro";

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ResponseError {
    #[serde(default)]
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ResponseError>,
}

impl CompletionResponse {
    fn text(&self) -> String {
        if self.candidates.is_empty() {
            return "".to_string();
        }

        return self.candidates[0]
            .content
            .parts
            .iter()
            .map(|e| return e.text.to_string())
            .collect::<Vec<String>>()
            .join("");
    }
}

/// Google Gemini streaming API.
pub struct Gemini {
    url: String,
    token: String,
    params: ModelParameters,
}

impl Gemini {
    pub fn new(url: String, token: String, params: ModelParameters) -> Gemini {
        return Gemini { url, token, params };
    }

    fn model_path(&self) -> String {
        let model = self.params.model.trim_start_matches("models/");
        return format!("models/{model}");
    }
}

#[async_trait]
impl Backend for Gemini {
    fn name(&self) -> BackendName {
        return BackendName::Gemini;
    }

    fn model(&self) -> String {
        return self.params.model.to_string();
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.token.is_empty() {
            bail!("Gemini API key is not defined. Set it with --gemini-api-key, GEMINI_API_KEY, or the config file.");
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
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![ContentPart { text: prompt.text }],
            }],
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                top_p: self.params.top_p,
                max_output_tokens: self.params.max_tokens,
            },
        };

        let res = reqwest::Client::new()
            .post(format!(
                "{url}/v1beta/{model}:streamGenerateContent?alt=sse&key={key}",
                url = self.url.trim_end_matches('/'),
                model = self.model_path(),
                key = self.token,
            ))
            .timeout(self.params.timeout)
            .json(&req)
            .send()
            .await
            .map_err(|err| {
                // Request errors carry the URL, and with it the key.
                return anyhow::anyhow!(
                    "Failed to reach Gemini: {}",
                    err.without_url().to_string()
                );
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<CompletionResponse>(&body) {
                Ok(CompletionResponse {
                    error: Some(err), ..
                }) => err.message,
                _ => body,
            };

            tracing::error!(status = status, "Failed to make completion request to Gemini");
            bail!(format!(
                "Failed to make completion request to Gemini, {status} {detail}"
            ));
        }

        let stream = res
            .bytes_stream()
            .map_err(|err| return convert_err(err.without_url()));
        let mut lines_reader = StreamReader::new(stream).lines();

        let mut last_message = "".to_string();
        while let Some(line) = lines_reader.next_line().await? {
            let cleaned_line = line.trim();
            let payload = match cleaned_line.strip_prefix("data:") {
                Some(payload) => payload.trim(),
                None => continue,
            };
            if payload.is_empty() || payload == "[DONE]" {
                continue;
            }

            let ores: CompletionResponse = serde_json::from_str(payload)?;
            if let Some(err) = ores.error {
                bail!(format!("Gemini returned an error: {}", err.message));
            }

            let text = ores.text();
            if text.is_empty() {
                continue;
            }

            last_message += &text;
            if let Some(tx) = tx {
                tx.send(Event::BackendPromptResponse(BackendResponse {
                    text,
                    done: false,
                }))?;
            }
        }

        if let Some(tx) = tx {
            tx.send(Event::BackendPromptResponse(BackendResponse {
                text: "".to_string(),
                done: true,
            }))?;
        }

        return Ok(last_message);
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;

use super::Event;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendName {
    Qianwen,
    Gemini,
}

impl BackendName {
    pub fn parse(text: String) -> Option<BackendName> {
        return BackendName::iter().find(|e| return e.to_string() == text);
    }
}

/// Generation settings shared by every backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelParameters {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

pub struct BackendPrompt {
    pub text: String,
}

impl BackendPrompt {
    pub fn new(text: String) -> BackendPrompt {
        return BackendPrompt { text };
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendResponse {
    pub text: String,
    pub done: bool,
}

#[async_trait]
pub trait Backend {
    fn name(&self) -> BackendName;

    fn model(&self) -> String;

    /// Used before the first request to verify all configurations are
    /// available to work with the backend.
    async fn health_check(&self) -> Result<()>;

    /// Requests a completion from the backend and returns the full text.
    ///
    /// Backends that stream may forward each partial chunk through `tx` so the
    /// terminal can show progress. A final `done` response is always sent
    /// when a channel is provided.
    async fn get_completion<'a>(
        &self,
        prompt: BackendPrompt,
        tx: Option<&'a mpsc::UnboundedSender<Event>>,
    ) -> Result<String>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;

pub mod gemini;
pub mod qianwen;

use std::time::Duration;

use anyhow::Result;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendName;
use crate::domain::models::ModelParameters;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

pub struct BackendManager {}

impl BackendManager {
    pub fn parameters(config: &Config, default_model: &str) -> Result<ModelParameters> {
        let mut model = config.get(ConfigKey::Model);
        if model.is_empty() {
            model = default_model.to_string();
        }

        return Ok(ModelParameters {
            model,
            temperature: config.parse::<f32>(ConfigKey::Temperature)?,
            top_p: config.parse::<f32>(ConfigKey::TopP)?,
            max_tokens: config.parse::<u32>(ConfigKey::MaxTokens)?,
            timeout: Duration::from_millis(config.parse::<u64>(ConfigKey::RequestTimeout)?),
        });
    }

    pub fn get(name: BackendName, config: &Config) -> Result<BackendBox> {
        match name {
            BackendName::Qianwen => {
                let params = BackendManager::parameters(config, qianwen::DEFAULT_MODEL)?;
                return Ok(Box::new(qianwen::Qianwen::new(
                    config.get(ConfigKey::QianwenURL),
                    config.get(ConfigKey::QianwenApiKey),
                    params,
                )));
            }
            BackendName::Gemini => {
                let params = BackendManager::parameters(config, gemini::DEFAULT_MODEL)?;
                return Ok(Box::new(gemini::Gemini::new(
                    config.get(ConfigKey::GeminiURL),
                    config.get(ConfigKey::GeminiApiKey),
                    params,
                )));
            }
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::collections::HashMap;
#[cfg(target_os = "macos")]
use std::env;
use std::path;
use std::str::FromStr;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::BackendName;
use crate::domain::models::RendererName;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    Backend,
    Model,
    QianwenURL,
    QianwenApiKey,
    GeminiURL,
    GeminiApiKey,
    Temperature,
    TopP,
    MaxTokens,
    RequestTimeout,
    DataDir,
    PromptsDir,
    RulesDir,
    IconsDir,
    Renderer,
    RuleImprovementRounds,
    ConfigFile,
    SessionID,
}

impl ConfigKey {
    fn is_secret(&self) -> bool {
        return *self == ConfigKey::QianwenApiKey || *self == ConfigKey::GeminiApiKey;
    }

    fn is_numeric(&self) -> bool {
        return [
            ConfigKey::Temperature,
            ConfigKey::TopP,
            ConfigKey::MaxTokens,
            ConfigKey::RequestTimeout,
            ConfigKey::RuleImprovementRounds,
        ]
        .contains(self);
    }
}

fn config_dir() -> path::PathBuf {
    #[cfg(not(target_os = "macos"))]
    let dir = dirs::config_dir().unwrap_or_default().join("cloudsketch");
    #[cfg(target_os = "macos")]
    let dir = path::PathBuf::from(env::var("HOME").unwrap_or_default()).join(".config/cloudsketch");

    return dir;
}

/// Resolved settings for one run. Built once at startup from defaults, the
/// config file, then CLI flags and environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    values: HashMap<ConfigKey, String>,
}

impl Config {
    /// A config holding only default values.
    pub fn defaults() -> Config {
        let values = ConfigKey::iter()
            .map(|key| return (key, Config::default(key)))
            .collect::<HashMap<ConfigKey, String>>();

        return Config { values };
    }

    pub fn get(&self, key: ConfigKey) -> String {
        if let Some(val) = self.values.get(&key) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(&mut self, key: ConfigKey, value: &str) {
        self.values.insert(key, value.to_string());
    }

    /// Parses a value, failing with a message naming the key.
    pub fn parse<T: FromStr>(&self, key: ConfigKey) -> Result<T> {
        let val = self.get(key);
        if let Ok(res) = val.parse::<T>() {
            return Ok(res);
        }

        bail!(format!("Config key '{key}' has an invalid value: {val}"));
    }

    pub fn default(key: ConfigKey) -> String {
        let default_backend = BackendName::Qianwen.to_string();
        let default_renderer = RendererName::Dot.to_string();

        let config_dir = config_dir();
        let config_path = config_dir.join("config.toml");
        let data_dir = dirs::data_dir().unwrap_or_default().join("cloudsketch");

        let res = match key {
            ConfigKey::Backend => default_backend,
            ConfigKey::Model => "".to_string(),
            ConfigKey::QianwenURL => {
                "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
                    .to_string()
            }
            ConfigKey::QianwenApiKey => "".to_string(),
            ConfigKey::GeminiURL => "https://generativelanguage.googleapis.com".to_string(),
            ConfigKey::GeminiApiKey => "".to_string(),
            ConfigKey::Temperature => "0.7".to_string(),
            ConfigKey::TopP => "0.8".to_string(),
            ConfigKey::MaxTokens => "2000".to_string(),
            ConfigKey::RequestTimeout => "120000".to_string(),
            ConfigKey::DataDir => data_dir.to_string_lossy().to_string(),
            ConfigKey::PromptsDir => config_dir.join("prompts").to_string_lossy().to_string(),
            ConfigKey::RulesDir => config_dir.join("rules").to_string_lossy().to_string(),
            ConfigKey::IconsDir => "".to_string(),
            ConfigKey::Renderer => default_renderer,
            ConfigKey::RuleImprovementRounds => "1".to_string(),

            // Special
            ConfigKey::ConfigFile => config_path.to_string_lossy().to_string(),
            ConfigKey::SessionID => "".to_string(),
        };

        return res;
    }

    fn possible_values(cmd: &Command, key: ConfigKey) -> Vec<String> {
        let arg = cmd
            .get_arguments()
            .find(|e| return e.get_long() == Some(key.to_string().as_str()));

        if let Some(arg) = arg {
            return arg
                .get_possible_values()
                .iter()
                .map(|e| return e.get_name().to_string())
                .collect::<Vec<String>>();
        }

        return vec![];
    }

    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<Config> {
        let mut config = Config::defaults();

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }
        config.set(ConfigKey::ConfigFile, &config_file);

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile || key == ConfigKey::SessionID {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    // Use clap value parsers to do validation.
                    let possible_values = Config::possible_values(&cmd, key);

                    if let Some(val_int) = val.as_integer() {
                        config.set(key, &val_int.to_string());
                    } else if let Some(val_float) = val.as_float() {
                        config.set(key, &val_float.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        if !possible_values.is_empty()
                            && !possible_values.contains(&val_str.to_string())
                        {
                            bail!(format!("config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}", possible_values.join(", ")));
                        }
                        config.set(key, val_str);
                    } else {
                        bail!(format!(
                            "config.toml has an invalid value for key '{key}'"
                        ));
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    config.set(key, val)
                }
            }
        }

        config.validate()?;

        tracing::debug!(
            backend = config.get(ConfigKey::Backend),
            model = config.get(ConfigKey::Model),
            renderer = config.get(ConfigKey::Renderer),
            data_dir = config.get(ConfigKey::DataDir),
            rules_dir = config.get(ConfigKey::RulesDir),
            "config"
        );

        return Ok(config);
    }

    fn validate(&self) -> Result<()> {
        if BackendName::parse(self.get(ConfigKey::Backend)).is_none() {
            bail!(format!(
                "Config key 'backend' has an invalid value: {}",
                self.get(ConfigKey::Backend)
            ));
        }
        if RendererName::parse(self.get(ConfigKey::Renderer)).is_none() {
            bail!(format!(
                "Config key 'renderer' has an invalid value: {}",
                self.get(ConfigKey::Renderer)
            ));
        }

        self.parse::<f32>(ConfigKey::Temperature)?;
        self.parse::<f32>(ConfigKey::TopP)?;
        self.parse::<u32>(ConfigKey::MaxTokens)?;
        self.parse::<u64>(ConfigKey::RequestTimeout)?;
        self.parse::<u32>(ConfigKey::RuleImprovementRounds)?;

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::SessionID || key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|e| return e.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if !arg.get_possible_values().is_empty() {
                    let possible_values = arg
                        .get_possible_values()
                        .iter()
                        .map(|e| return e.get_name())
                        .collect::<Vec<_>>()
                        .join(", ");
                    description = format!("{description} [possible values: {}]", possible_values);
                }

                let mut val = Config::default(key);
                if val.is_empty() || key.is_secret() {
                    val = format!("# {key} = \"\"");
                } else if key.is_numeric() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}

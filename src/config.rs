use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub web_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            web_root: "web/dist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub search_model: String,
    pub reply_model: String,
    pub reply_temperature: f64,
    pub reply_max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.aimlapi.com/v1".to_string(),
            search_model: "gpt-4o".to_string(),
            reply_model: "gpt-4o".to_string(),
            reply_temperature: 0.9,
            reply_max_tokens: 300,
            timeout_ms: 20_000,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolhouseConfig {
    pub api_base: String,
    pub bundle: String,
    pub timeout_ms: u64,
}

impl Default for ToolhouseConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.toolhouse.ai/v1".to_string(),
            bundle: "default".to_string(),
            timeout_ms: 20_000,
        }
    }
}

impl ToolhouseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedConfig {
    pub path: PathBuf,
}

impl Default for SavedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/saved.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyDeliveryConfig {
    pub delay_ms: u64,
}

impl Default for ReplyDeliveryConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub toolhouse: ToolhouseConfig,
    pub saved: SavedConfig,
    pub reply: ReplyDeliveryConfig,
}

impl AppConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                Self::from_toml(&contents)?
            }
            _ => AppConfig::default(),
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|err| format!("failed to parse config: {}", err))
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create config dir: {}", err))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| format!("failed to serialize config: {}", err))?;
        std::fs::write(path, payload).map_err(|err| format!("failed to write config: {}", err))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = non_empty_var("REPLYGUY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed_var::<u16>("REPLYGUY_PORT") {
            self.server.port = port;
        }
        if let Some(api_base) = non_empty_var("AIML_API_BASE") {
            self.llm.api_base = api_base;
        }
        if let Some(model) = non_empty_var("SEARCH_MODEL") {
            self.llm.search_model = model;
        }
        if let Some(model) = non_empty_var("OPENAI_MODEL") {
            self.llm.reply_model = model;
        }
        if let Some(timeout) = parsed_var::<u64>("LLM_TIMEOUT_MS") {
            self.llm.timeout_ms = timeout;
        }
        if let Some(api_base) = non_empty_var("TOOLHOUSE_API_BASE") {
            self.toolhouse.api_base = api_base;
        }
        if let Some(path) = non_empty_var("SAVED_ITEMS_PATH") {
            self.saved.path = PathBuf::from(path);
        }
        if let Some(delay) = parsed_var::<u64>("REPLY_DELAY_MS") {
            self.reply.delay_ms = delay;
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

fn default_config_path() -> Option<PathBuf> {
    non_empty_var("REPLYGUY_CONFIG_PATH")
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/replyguy.toml")))
}

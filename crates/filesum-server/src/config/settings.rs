use anyhow::{bail, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chat completions endpoint. `api_key` has no default on purpose.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMatch {
    /// Whole (trimmed) message must equal the keyword
    #[default]
    Exact,
    /// Keyword anywhere in the message
    Contains,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// Call the gateway and reply with the summary
    #[default]
    Direct,
    /// Hand the synthesized prompt back to the host pipeline
    Delegate,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SummaryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_file_size_kb")]
    pub max_file_size_kb: u64,
    /// Character budget for document text embedded into a prompt
    #[serde(default = "default_max_token_size")]
    pub max_token_size: usize,
    /// Allow summarizing in group chats
    #[serde(default = "default_true")]
    pub group: bool,
    #[serde(default = "default_qa_prefix")]
    pub qa_prefix: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_trigger_keyword")]
    pub trigger_keyword: String,
    #[serde(default)]
    pub trigger_match: TriggerMatch,
    #[serde(default)]
    pub mode: SummaryMode,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_file_size_kb: default_max_file_size_kb(),
            max_token_size: default_max_token_size(),
            group: true,
            qa_prefix: default_qa_prefix(),
            prompt: default_prompt(),
            trigger_keyword: default_trigger_keyword(),
            trigger_match: TriggerMatch::default(),
            mode: SummaryMode::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_file_cache_seconds")]
    pub file_cache_seconds: u64,
    #[serde(default = "default_content_cache_seconds")]
    pub content_cache_seconds: u64,
    /// 0 = no background sweep, expiry stays lazy only
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_cache_seconds: default_file_cache_seconds(),
            content_cache_seconds: default_content_cache_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl CacheConfig {
    pub fn file_ttl(&self) -> Duration {
        Duration::from_secs(self.file_cache_seconds)
    }

    pub fn content_ttl(&self) -> Duration {
        Duration::from_secs(self.content_cache_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtractorConfig {
    /// Binary used to turn legacy .doc files into text (prints to stdout)
    #[serde(default = "default_word_converter")]
    pub word_converter: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            word_converter: default_word_converter(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8089
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_answer_temperature() -> f32 {
    0.7
}
fn default_answer_max_tokens() -> usize {
    1000
}
fn default_true() -> bool {
    true
}
fn default_max_file_size_kb() -> u64 {
    15000
}
fn default_max_token_size() -> usize {
    4000
}
fn default_qa_prefix() -> String {
    "问".to_string()
}
fn default_prompt() -> String {
    "请总结这个文件的主要内容".to_string()
}
fn default_trigger_keyword() -> String {
    "总结".to_string()
}
fn default_file_cache_seconds() -> u64 {
    60
}
fn default_content_cache_seconds() -> u64 {
    300
}
fn default_sweep_interval_seconds() -> u64 {
    60
}
fn default_word_converter() -> String {
    "antiword".to_string()
}

impl Settings {
    /// Load `.env`, `config/settings.toml` (optional) and `APP__*` env overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// No safe defaults exist for credentials, so a bad config stops startup.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            bail!("llm.api_key must be set");
        }
        if self.llm.base_url.trim().is_empty() {
            bail!("llm.base_url must not be empty");
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if self.summary.qa_prefix.is_empty() {
            bail!("summary.qa_prefix must not be empty");
        }
        if self.summary.trigger_keyword.trim().is_empty() {
            bail!("summary.trigger_keyword must not be empty");
        }
        if self.summary.max_token_size == 0 {
            bail!("summary.max_token_size must be greater than 0");
        }
        if self.cache.file_cache_seconds == 0 || self.cache.content_cache_seconds == 0 {
            bail!("cache TTLs must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_filled_in() {
        let settings = Settings::from_toml_str(
            r#"
            [llm]
            api_key = "sk-test"
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(settings.llm.model, "gpt-3.5-turbo");
        assert_eq!(settings.summary.max_file_size_kb, 15000);
        assert_eq!(settings.summary.max_token_size, 4000);
        assert_eq!(settings.summary.qa_prefix, "问");
        assert_eq!(settings.summary.trigger_match, TriggerMatch::Exact);
        assert_eq!(settings.summary.mode, SummaryMode::Direct);
        assert_eq!(settings.cache.file_ttl(), Duration::from_secs(60));
        assert_eq!(settings.cache.content_ttl(), Duration::from_secs(300));
        assert_eq!(settings.extractor.word_converter, "antiword");
    }

    #[test]
    fn test_overrides_and_enums() {
        let settings = Settings::from_toml_str(
            r#"
            [llm]
            api_key = "sk-test"
            model = "qwen-plus"

            [summary]
            group = false
            trigger_match = "contains"
            mode = "delegate"

            [cache]
            file_cache_seconds = 120
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.model, "qwen-plus");
        assert!(!settings.summary.group);
        assert_eq!(settings.summary.trigger_match, TriggerMatch::Contains);
        assert_eq!(settings.summary.mode, SummaryMode::Delegate);
        assert_eq!(settings.cache.file_cache_seconds, 120);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        assert!(Settings::from_toml_str("[llm]\napi_key = \"  \"\n").is_err());
        assert!(Settings::from_toml_str("[summary]\nenabled = true\n").is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = Settings::from_toml_str(
            r#"
            [llm]
            api_key = "sk-test"

            [cache]
            content_cache_seconds = 0
            "#,
        );
        assert!(result.is_err());
    }
}

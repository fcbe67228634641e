//! Process configuration.
//!
//! Settings come from three layers, later ones winning: an optional
//! `sqlchat.toml` in the working directory, a `.env` file, and `SQLCHAT_*`
//! environment variables.

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Connection string for the database to chat with. The scheme picks the
    /// engine: `postgres://` or `sqlite://`.
    pub database_url: String,
    pub openai_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Alternative completions requested per question, tried in order.
    #[serde(default = "default_candidates")]
    pub candidates: u32,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_candidates() -> u32 {
    3
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl Settings {
    pub fn load() -> Result<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        Figment::new()
            .merge(Toml::file("sqlchat.toml"))
            .merge(Env::prefixed("SQLCHAT_"))
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {}", e)))
    }

    pub fn llm_config(&self) -> LLMConfig {
        LLMConfig {
            base_url: self.openai_base_url.clone(),
            model: self.model.clone(),
            api_key: self.openai_api_key.clone(),
            ..LLMConfig::default()
        }
    }
}

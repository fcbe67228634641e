use super::LLMClient;
use crate::domain::chat::ChatMessage;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::json;

/// Client for OpenAI-compatible chat-completion APIs.
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn api_key(config: &LLMConfig) -> Result<String> {
        config
            .api_key
            .clone()
            .ok_or_else(|| AppError::LLMError("Missing API key".to_string()))
    }
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(
        &self,
        config: &LLMConfig,
        messages: &[ChatMessage],
        candidates: u32,
    ) -> Result<Vec<String>> {
        let api_key = Self::api_key(config)?;
        let url = if config.base_url.ends_with('/') {
            format!("{}chat/completions", config.base_url)
        } else {
            format!("{}/chat/completions", config.base_url)
        };

        let mut body = json!({
            "model": config.model,
            "messages": messages,
            "n": candidates,
        });
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = config.temperature {
            body["temperature"] = json!(temperature);
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        let choices = json["choices"]
            .as_array()
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))?;

        let completions: Vec<String> = choices
            .iter()
            .filter_map(|c| c["message"]["content"].as_str())
            .map(|s| s.to_string())
            .collect();

        if completions.is_empty() {
            return Err(AppError::LLMError(
                "Response contained no completions".to_string(),
            ));
        }

        Ok(completions)
    }
}

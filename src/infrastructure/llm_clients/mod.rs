pub mod openai;

use crate::domain::chat::ChatMessage;
use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;

pub use openai::OpenAIClient;

/// A chat-completion backend. `candidates` independent completions are
/// requested in a single call; the returned texts are in the provider's
/// order.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete(
        &self,
        config: &LLMConfig,
        messages: &[ChatMessage],
        candidates: u32,
    ) -> Result<Vec<String>>;
}

use crate::application::Conversation;
use crate::domain::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Maps opaque conversation ids to engines. Each conversation sits behind its
/// own async mutex; holding it for the whole `ask` keeps history appends
/// serialized per conversation.
pub struct ConversationRegistry {
    conversations: RwLock<HashMap<Uuid, Arc<Mutex<Conversation>>>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, conversation: Conversation) -> Uuid {
        let id = Uuid::new_v4();
        let mut conversations = self.conversations.write().await;
        conversations.insert(id, Arc::new(Mutex::new(conversation)));
        id
    }

    pub async fn get(&self, id: &Uuid) -> Result<Arc<Mutex<Conversation>>> {
        let conversations = self.conversations.read().await;
        conversations
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Conversation not found: {}", id)))
    }
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMConfig;
    use crate::domain::schema::Schema;
    use crate::infrastructure::db::executor::QueryExecutor;
    use crate::infrastructure::llm_clients::LLMClient;
    use async_trait::async_trait;

    struct NoopLLM;

    #[async_trait]
    impl LLMClient for NoopLLM {
        async fn complete(
            &self,
            _config: &LLMConfig,
            _messages: &[crate::domain::chat::ChatMessage],
            _candidates: u32,
        ) -> crate::domain::error::Result<Vec<String>> {
            Err(AppError::LLMError("unused".to_string()))
        }
    }

    struct NoopExecutor;

    #[async_trait]
    impl QueryExecutor for NoopExecutor {
        async fn execute(&self, _sql: &str) -> crate::domain::error::Result<String> {
            Err(AppError::DatabaseError("unused".to_string()))
        }
    }

    fn conversation() -> Conversation {
        Conversation::new(
            Arc::new(NoopLLM),
            Arc::new(NoopExecutor),
            LLMConfig::default(),
            3,
            "sqlite",
            Schema::default(),
        )
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let registry = ConversationRegistry::new();
        let id = registry.insert(conversation()).await;
        assert!(registry.get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let registry = ConversationRegistry::new();
        let err = registry.get(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

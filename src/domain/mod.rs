pub mod chat;
pub mod error;
pub mod exchange;
pub mod llm_config;
pub mod schema;

//! The conversation engine.
//!
//! Owns per-conversation history and drives each turn: assemble the prompt
//! from schema plus every prior exchange, request several candidate queries
//! in one model call, execute them in order until one succeeds, and record
//! the outcome (success or the last failure) back into history so later
//! turns can self-correct.

use crate::domain::chat::ChatMessage;
use crate::domain::error::{AppError, Result};
use crate::domain::exchange::{Exchange, Request, Response};
use crate::domain::llm_config::LLMConfig;
use crate::domain::schema::Schema;
use crate::infrastructure::db::executor::QueryExecutor;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use tracing::{debug, warn};

const SQL_ONLY_INSTRUCTION: &str = "You are a chatbot that answers questions about a database in the form of SQL queries.\n\
You will only use the content from the schema provided to answer questions.\n\
Avoid queries with placeholders.";

const SAMPLE_QUESTIONS_INSTRUCTION: &str = "Provide three example questions that may be answered using SQL queries against this database.\n\
Ensure that these questions could be turned into SQL queries using only the schema provided.\n\
Lean towards questions that aggregate data rather than expecting the user to specify values.\n\
Do not provide the SQL queries themselves.\n\
Output questions one per line.";

pub struct Conversation {
    llm: Arc<dyn LLMClient>,
    executor: Arc<dyn QueryExecutor>,
    config: LLMConfig,
    candidates: u32,
    engine_label: String,
    schema: Schema,
    history: Vec<Exchange>,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("config", &self.config)
            .field("candidates", &self.candidates)
            .field("engine_label", &self.engine_label)
            .field("schema", &self.schema)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl Conversation {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        executor: Arc<dyn QueryExecutor>,
        config: LLMConfig,
        candidates: u32,
        engine_label: impl Into<String>,
        schema: Schema,
    ) -> Self {
        Self {
            llm,
            executor,
            config,
            candidates,
            engine_label: engine_label.into(),
            schema,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    fn schema_prompt_message(&self) -> ChatMessage {
        ChatMessage::assistant(format!(
            "Use the following schema to answer questions\nThe database type is {}\n\n{}\n\n",
            self.engine_label, self.schema
        ))
    }

    /// Answer one question. Candidates are tried in model order; the first
    /// that executes wins. If all fail, the last failure is returned and
    /// recorded in history as context for later turns.
    pub async fn ask(&mut self, question: impl Into<String>) -> Result<Response> {
        let request = Request {
            question: question.into(),
        };

        let mut messages = vec![
            self.schema_prompt_message(),
            ChatMessage::system(SQL_ONLY_INSTRUCTION),
        ];
        for exchange in &self.history {
            messages.extend(exchange.to_messages());
        }
        messages.push(ChatMessage::user(format!(
            "Please answer this question in the form of an SQL query, do not explain your response:\n{}",
            request.question
        )));

        debug!(
            "Prompt assembled: {} messages, {} prior exchanges",
            messages.len(),
            self.history.len()
        );

        // A generation failure surfaces here, before history grows.
        let candidates = self
            .llm
            .complete(&self.config, &messages, self.candidates)
            .await?;

        // The exchange joins history before any candidate runs, fixing the
        // number of prior turns no matter how execution goes.
        let index = self.history.len();
        self.history.push(Exchange {
            request,
            response: None,
        });

        let mut response = Response::default();
        let mut last_err: Option<AppError> = None;
        for candidate in &candidates {
            response.query = candidate.clone();
            match self.executor.execute(candidate).await {
                Ok(data_csv) => {
                    response.data_csv = data_csv;
                    last_err = None;
                    break;
                }
                Err(err) => {
                    warn!("Candidate query failed: {}", err);
                    response.data_csv.clear();
                    last_err = Some(err);
                }
            }
        }

        response.error = last_err.as_ref().map(|e| e.to_string());
        self.history[index].response = Some(response.clone());

        match last_err {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    /// One-shot request for three example questions over the schema. The
    /// model's reply is split on line breaks and passed through unvalidated.
    pub async fn sample_questions(&self) -> Result<Vec<String>> {
        let messages = vec![
            self.schema_prompt_message(),
            ChatMessage::system(SAMPLE_QUESTIONS_INSTRUCTION),
        ];

        let completions = self.llm.complete(&self.config, &messages, 1).await?;
        let response = completions.into_iter().next().unwrap_or_default();
        Ok(response.split('\n').map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::ChatRole;
    use crate::domain::schema::{Column, Table};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    struct MockLLM {
        replies: Mutex<VecDeque<Result<Vec<String>>>>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl MockLLM {
        fn new(replies: Vec<Result<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMClient for MockLLM {
        async fn complete(
            &self,
            _config: &LLMConfig,
            messages: &[ChatMessage],
            _candidates: u32,
        ) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::LLMError("No scripted reply".to_string())))
        }
    }

    struct MockExecutor {
        ok: HashMap<String, String>,
        executed: Mutex<Vec<String>>,
    }

    impl MockExecutor {
        fn new(ok: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                ok: ok
                    .iter()
                    .map(|(sql, csv)| (sql.to_string(), csv.to_string()))
                    .collect(),
                executed: Mutex::new(Vec::new()),
            })
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryExecutor for MockExecutor {
        async fn execute(&self, sql: &str) -> Result<String> {
            self.executed.lock().unwrap().push(sql.to_string());
            match self.ok.get(sql) {
                Some(csv) => Ok(csv.clone()),
                None => Err(AppError::DatabaseError(format!(
                    "query:\n{}\nrelation does not exist",
                    sql
                ))),
            }
        }
    }

    fn users_schema() -> Schema {
        Schema {
            tables: vec![Table {
                name: "users".to_string(),
                columns: vec![
                    Column {
                        name: "id".to_string(),
                        ty: "int".to_string(),
                    },
                    Column {
                        name: "name".to_string(),
                        ty: "text".to_string(),
                    },
                ],
                sample_row: Some(vec!["1".to_string(), "Alice".to_string()]),
            }],
        }
    }

    fn conversation(llm: Arc<MockLLM>, executor: Arc<MockExecutor>) -> Conversation {
        Conversation::new(
            llm,
            executor,
            LLMConfig::default(),
            3,
            "postgres",
            users_schema(),
        )
    }

    #[tokio::test]
    async fn test_first_successful_candidate_wins() {
        let llm = MockLLM::new(vec![Ok(vec![
            "SELECT COUNT(*) FROM nonexistent".to_string(),
            "SELECT COUNT(*) FROM users".to_string(),
            "SELECT 1".to_string(),
        ])]);
        let executor = MockExecutor::new(&[
            ("SELECT COUNT(*) FROM users", "count\n1\n"),
            ("SELECT 1", "one\n1\n"),
        ]);
        let mut conversation = conversation(llm, executor.clone());

        let response = conversation
            .ask("How many users are there?")
            .await
            .unwrap();

        assert_eq!(response.query, "SELECT COUNT(*) FROM users");
        assert_eq!(response.data_csv, "count\n1\n");
        assert!(response.error.is_none());

        // Third candidate is never tried once one succeeds.
        assert_eq!(
            executor.executed(),
            vec![
                "SELECT COUNT(*) FROM nonexistent".to_string(),
                "SELECT COUNT(*) FROM users".to_string(),
            ]
        );

        assert_eq!(conversation.history().len(), 1);
        let stored = conversation.history()[0].response.as_ref().unwrap();
        assert_eq!(stored.query, "SELECT COUNT(*) FROM users");
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn test_all_candidates_failing_returns_last_error() {
        let llm = MockLLM::new(vec![Ok(vec![
            "SELECT * FROM a".to_string(),
            "SELECT * FROM b".to_string(),
            "SELECT * FROM c".to_string(),
        ])]);
        let executor = MockExecutor::new(&[]);
        let mut conversation = conversation(llm, executor.clone());

        let err = conversation.ask("Anything?").await.unwrap_err();
        assert!(err.to_string().contains("SELECT * FROM c"));
        assert_eq!(executor.executed().len(), 3);

        // The failure still lands in history as context for later turns.
        assert_eq!(conversation.history().len(), 1);
        let stored = conversation.history()[0].response.as_ref().unwrap();
        assert_eq!(stored.query, "SELECT * FROM c");
        assert!(stored.data_csv.is_empty());
        assert!(stored
            .error
            .as_ref()
            .unwrap()
            .contains("SELECT * FROM c"));
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history_unchanged() {
        let llm = MockLLM::new(vec![Err(AppError::LLMError("boom".to_string()))]);
        let executor = MockExecutor::new(&[]);
        let mut conversation = conversation(llm, executor.clone());

        let err = conversation.ask("Anything?").await.unwrap_err();
        assert!(matches!(err, AppError::LLMError(_)));
        assert_eq!(conversation.history().len(), 0);
        assert!(executor.executed().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_all_prior_exchanges_in_order() {
        let llm = MockLLM::new(vec![
            Ok(vec!["SELECT 1".to_string()]),
            Ok(vec!["SELECT 2".to_string()]),
            Ok(vec!["SELECT 3".to_string()]),
        ]);
        let executor = MockExecutor::new(&[
            ("SELECT 1", "a\n1\n"),
            ("SELECT 2", "a\n2\n"),
            ("SELECT 3", "a\n3\n"),
        ]);
        let mut conversation = conversation(llm.clone(), executor);

        conversation.ask("first question").await.unwrap();
        conversation.ask("second question").await.unwrap();
        conversation.ask("third question").await.unwrap();

        let calls = llm.calls();
        assert_eq!(calls.len(), 3);

        // Third prompt: schema + instruction, two rendered exchanges of three
        // messages each, and the new question.
        let prompt = &calls[2];
        assert_eq!(prompt.len(), 2 + 3 + 3 + 1);
        assert_eq!(prompt[0].role, ChatRole::Assistant);
        assert!(prompt[0].content.contains("CREATE TABLE users"));
        assert!(prompt[0].content.contains("The database type is postgres"));
        assert_eq!(prompt[1].role, ChatRole::System);

        assert!(prompt[2].content.contains("first question"));
        assert_eq!(prompt[3].content, "SELECT 1");
        assert!(prompt[5].content.contains("second question"));
        assert_eq!(prompt[6].content, "SELECT 2");

        let last = prompt.last().unwrap();
        assert_eq!(last.role, ChatRole::User);
        assert!(last.content.contains("third question"));
    }

    #[tokio::test]
    async fn test_failed_turn_becomes_context_for_the_next() {
        let llm = MockLLM::new(vec![
            Ok(vec!["SELECT * FROM missing".to_string()]),
            Ok(vec!["SELECT COUNT(*) FROM users".to_string()]),
        ]);
        let executor = MockExecutor::new(&[("SELECT COUNT(*) FROM users", "count\n1\n")]);
        let mut conversation = conversation(llm.clone(), executor);

        assert!(conversation.ask("first question").await.is_err());
        conversation.ask("second question").await.unwrap();

        let calls = llm.calls();
        let prompt = &calls[1];
        // Failed exchange renders question, query, and the error message.
        let error_message = prompt
            .iter()
            .find(|m| m.content.starts_with("The above query returned the error:"))
            .expect("prior failure should be in the prompt");
        assert_eq!(error_message.role, ChatRole::System);
        assert!(error_message.content.contains("SELECT * FROM missing"));
    }

    #[tokio::test]
    async fn test_sample_questions_split_on_lines() {
        let llm = MockLLM::new(vec![Ok(vec![
            "How many users are there?\nWhat is the most common name?\nHow many names start with A?"
                .to_string(),
        ])]);
        let executor = MockExecutor::new(&[]);
        let conversation = conversation(llm.clone(), executor);

        let questions = conversation.sample_questions().await.unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0], "How many users are there?");

        // One model call, no execution, no history.
        assert_eq!(llm.calls().len(), 1);
        assert_eq!(conversation.history().len(), 0);
    }

    #[tokio::test]
    async fn test_degenerate_sample_questions_pass_through() {
        let llm = MockLLM::new(vec![Ok(vec!["only one line".to_string()])]);
        let executor = MockExecutor::new(&[]);
        let conversation = conversation(llm, executor);

        let questions = conversation.sample_questions().await.unwrap();
        assert_eq!(questions, vec!["only one line".to_string()]);
    }
}

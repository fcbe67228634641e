use crate::domain::chat::ChatMessage;
use crate::shared::text::first_lines;
use serde::{Deserialize, Serialize};

/// Number of result lines embedded into follow-up prompts. Hard limit, not
/// configurable; the caller-facing CSV is unbounded.
pub const SAMPLE_LINES: usize = 5;

/// One question asked by the user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Request {
    pub question: String,
}

/// The outcome of one question: the query chosen for it, the full CSV of its
/// result, and the last execution error if no candidate succeeded.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Response {
    pub query: String,
    pub data_csv: String,
    pub error: Option<String>,
}

/// One question/answer turn in a conversation's history.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Exchange {
    pub request: Request,
    pub response: Option<Response>,
}

impl Exchange {
    /// Render this exchange as prompt messages: the question, then the query
    /// (if any), then either a bounded result sample or the error text.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::user(format!(
            "Please answer this question in the form of an SQL query, do not explain your response:\n{}",
            self.request.question
        ))];

        if let Some(response) = &self.response {
            messages.push(ChatMessage::assistant(response.query.clone()));
            if !response.data_csv.is_empty() {
                messages.push(ChatMessage::system(format!(
                    "Sample data from the above query:\n{}",
                    first_lines(&response.data_csv, SAMPLE_LINES)
                )));
            }
            if let Some(error) = &response.error {
                messages.push(ChatMessage::system(format!(
                    "The above query returned the error: {}",
                    error
                )));
            }
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::ChatRole;

    fn exchange(response: Option<Response>) -> Exchange {
        Exchange {
            request: Request {
                question: "How many users are there?".to_string(),
            },
            response,
        }
    }

    #[test]
    fn test_pending_exchange_renders_question_only() {
        let messages = exchange(None).to_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
        assert!(messages[0].content.contains("How many users are there?"));
        assert!(messages[0]
            .content
            .starts_with("Please answer this question in the form of an SQL query"));
    }

    #[test]
    fn test_successful_exchange_renders_query_and_sample() {
        let messages = exchange(Some(Response {
            query: "SELECT COUNT(*) FROM users".to_string(),
            data_csv: "count\n42\n".to_string(),
            error: None,
        }))
        .to_messages();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, "SELECT COUNT(*) FROM users");
        assert_eq!(messages[2].role, ChatRole::System);
        assert!(messages[2]
            .content
            .starts_with("Sample data from the above query:"));
    }

    #[test]
    fn test_failed_exchange_renders_error_without_sample() {
        let messages = exchange(Some(Response {
            query: "SELECT * FROM nope".to_string(),
            data_csv: String::new(),
            error: Some("relation \"nope\" does not exist".to_string()),
        }))
        .to_messages();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, ChatRole::System);
        assert!(messages[2]
            .content
            .starts_with("The above query returned the error:"));
        assert!(messages[2].content.contains("does not exist"));
    }

    #[test]
    fn test_sample_is_truncated_to_five_lines() {
        let data_csv = (0..1000)
            .map(|i| format!("row{}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = exchange(Some(Response {
            query: "SELECT * FROM big".to_string(),
            data_csv,
            error: None,
        }))
        .to_messages();

        let sample = &messages[2].content;
        // Header line plus 5 sample lines.
        assert_eq!(sample.lines().count(), 1 + SAMPLE_LINES);
        assert!(sample.ends_with("row4"));
    }
}

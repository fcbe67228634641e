//! Terminal REPL.
//!
//! Talks to the HTTP interface like any other caller: one conversation per
//! session, sample questions up front, then a question loop. An empty line
//! exits.

use crate::domain::error::{AppError, Result};
use crate::domain::exchange::SAMPLE_LINES;
use crate::interfaces::http::{
    AskRequest, AskResponse, NewConversationResponse, SampleQuestionsRequest,
    SampleQuestionsResponse,
};
use crate::shared::text::first_lines;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/api/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse JSON: {}", e)))
    }

    pub async fn new_conversation(&self) -> Result<String> {
        let response: NewConversationResponse =
            self.post_json("new", &serde_json::json!({})).await?;
        Ok(response.conversation_id)
    }

    pub async fn ask(&self, conversation_id: &str, question: &str) -> Result<AskResponse> {
        self.post_json(
            "ask",
            &AskRequest {
                conversation_id: conversation_id.to_string(),
                question: question.to_string(),
            },
        )
        .await
    }

    pub async fn sample_questions(&self, conversation_id: &str) -> Result<Vec<String>> {
        let response: SampleQuestionsResponse = self
            .post_json(
                "sample-questions",
                &SampleQuestionsRequest {
                    conversation_id: conversation_id.to_string(),
                },
            )
            .await?;
        Ok(response.questions)
    }
}

pub async fn run_repl(base_url: &str) -> Result<()> {
    let client = ApiClient::new(base_url);

    let conversation_id = client.new_conversation().await?;
    let samples = client.sample_questions(&conversation_id).await?;

    println!("Welcome to sqlchat! Your schema has been read and you may ask questions like the below:");
    println!();
    for sample in samples {
        println!("{}", sample);
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Ask a question: ");
        std::io::stdout().flush()?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AppError::IoError(e.to_string()))?
        else {
            break;
        };
        if line.is_empty() {
            break;
        }

        match client.ask(&conversation_id, &line).await {
            Ok(response) => {
                println!("{}", response.query);
                println!();
                println!("Data sample:");
                println!("{}", first_lines(&response.data_csv, SAMPLE_LINES));
                println!();
            }
            Err(err) => {
                eprintln!("{}", err);
            }
        }
    }

    Ok(())
}

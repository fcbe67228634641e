//! HTTP interface.
//!
//! A thin JSON adapter around the conversation engine: create a
//! conversation, ask a question, fetch sample questions. Errors map to
//! status codes (404 for unknown conversations, 500 otherwise) with the
//! error text as the body.

pub mod registry;

use crate::application::Conversation;
use crate::domain::error::AppError;
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::db::executor::QueryExecutor;
use crate::infrastructure::db::schema_loader::load_schema;
use crate::infrastructure::db::Database;
use crate::infrastructure::llm_clients::LLMClient;
use actix_cors::Cors;
use actix_web::{dev::Server, post, web, App, HttpResponse, HttpServer, Responder};
use registry::ConversationRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub struct HttpState {
    pub db: Arc<Database>,
    pub llm: Arc<dyn LLMClient>,
    pub executor: Arc<dyn QueryExecutor>,
    pub llm_config: LLMConfig,
    pub candidates: u32,
    pub registry: ConversationRegistry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewConversationResponse {
    pub conversation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub conversation_id: String,
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub query: String,
    pub data_csv: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleQuestionsRequest {
    pub conversation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleQuestionsResponse {
    pub questions: Vec<String>,
}

fn error_response(err: &AppError) -> HttpResponse {
    match err {
        AppError::NotFound(_) => HttpResponse::NotFound().body(err.to_string()),
        _ => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[post("/new")]
async fn new_conversation(data: web::Data<HttpState>) -> impl Responder {
    // The schema load is part of conversation creation: slow and
    // failure-prone, so it happens here rather than on the ask path.
    let schema = match load_schema(&data.db).await {
        Ok(schema) => schema,
        Err(e) => {
            error!("Failed to load schema: {}", e);
            return error_response(&e);
        }
    };

    let conversation = Conversation::new(
        data.llm.clone(),
        data.executor.clone(),
        data.llm_config.clone(),
        data.candidates,
        data.db.engine_label(),
        schema,
    );
    let id = data.registry.insert(conversation).await;
    info!("Created conversation {}", id);

    HttpResponse::Ok().json(NewConversationResponse {
        conversation_id: id.to_string(),
    })
}

#[post("/ask")]
async fn ask(data: web::Data<HttpState>, req: web::Json<AskRequest>) -> impl Responder {
    let id = match Uuid::parse_str(&req.conversation_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid conversation id"),
    };

    let conversation = match data.registry.get(&id).await {
        Ok(conversation) => conversation,
        Err(e) => return error_response(&e),
    };

    // One in-flight ask per conversation; the lock covers the whole turn.
    let mut conversation = conversation.lock().await;
    match conversation.ask(req.question.clone()).await {
        Ok(response) => HttpResponse::Ok().json(AskResponse {
            query: response.query,
            data_csv: response.data_csv,
        }),
        Err(e) => {
            error!("Ask failed for conversation {}: {}", id, e);
            error_response(&e)
        }
    }
}

#[post("/sample-questions")]
async fn sample_questions(
    data: web::Data<HttpState>,
    req: web::Json<SampleQuestionsRequest>,
) -> impl Responder {
    let id = match Uuid::parse_str(&req.conversation_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid conversation id"),
    };

    let conversation = match data.registry.get(&id).await {
        Ok(conversation) => conversation,
        Err(e) => return error_response(&e),
    };

    let conversation = conversation.lock().await;
    match conversation.sample_questions().await {
        Ok(questions) => HttpResponse::Ok().json(SampleQuestionsResponse { questions }),
        Err(e) => {
            error!("Sample questions failed for conversation {}: {}", id, e);
            error_response(&e)
        }
    }
}

pub fn start_server(state: HttpState, bind_addr: &str) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new().wrap(cors).app_data(state.clone()).service(
            web::scope("/api")
                .service(new_conversation)
                .service(ask)
                .service(sample_questions),
        )
    })
    .bind(bind_addr)?
    .run();

    Ok(server)
}

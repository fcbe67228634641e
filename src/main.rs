use sqlchat::infrastructure::config::Settings;
use sqlchat::infrastructure::db::executor::{DbExecutor, QueryExecutor};
use sqlchat::infrastructure::db::{Database, DbConfig};
use sqlchat::infrastructure::llm_clients::{LLMClient, OpenAIClient};
use sqlchat::interfaces::cli;
use sqlchat::interfaces::http::registry::ConversationRegistry;
use sqlchat::interfaces::http::{start_server, HttpState};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlchat=info".into()),
        )
        .init();

    let settings = Settings::load().expect("Failed to load settings");

    let db_config = DbConfig {
        query_timeout_secs: settings.query_timeout_secs,
        ..DbConfig::default()
    };
    let db = Arc::new(
        Database::connect(&settings.database_url, &db_config)
            .await
            .expect("Failed to connect to database"),
    );

    let llm: Arc<dyn LLMClient> = Arc::new(OpenAIClient::new());
    let executor: Arc<dyn QueryExecutor> = Arc::new(DbExecutor::new(db.clone()));

    let state = HttpState {
        db,
        llm,
        executor,
        llm_config: settings.llm_config(),
        candidates: settings.candidates,
        registry: ConversationRegistry::new(),
    };

    let server = start_server(state, &settings.bind_addr).expect("Failed to start HTTP server");
    tokio::spawn(server);
    info!("HTTP server started on {}", settings.bind_addr);

    let base_url = format!("http://{}", settings.bind_addr);
    if let Err(err) = cli::run_repl(&base_url).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

//! greenroom - automated interview backend
//!
//! A Rust backend implementing the interview session state machine:
//! durable conversation turns, phase-checked lifecycle operations, and
//! a chat-completion model collaborator.

mod api;
mod db;
mod interview;
mod llm;
mod system_prompt;

use api::{create_router, AppState};
use db::Database;
use interview::InterviewService;
use llm::{LlmConfig, LlmService, LoggingService, OpenAiCompatService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenroom=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("GREENROOM_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.greenroom/greenroom.db")
    });

    let port: u16 = std::env::var("GREENROOM_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    // Initialize model client
    let llm_config = LlmConfig::from_env();
    if llm_config.api_key.is_none() {
        tracing::warn!("No model API key configured. Set GROQ_API_KEY or OPENAI_API_KEY.");
    }
    let model: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(
        OpenAiCompatService::new(
            llm_config.api_key.unwrap_or_default(),
            llm_config.base_url.as_deref(),
            llm_config.model.as_deref(),
        ),
    )));
    tracing::info!(model = %model.model_id(), "Model client initialized");

    // Create application state
    let state = AppState::new(InterviewService::new(db, model));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("greenroom server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

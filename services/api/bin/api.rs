//! Main Entrypoint for the Learning Path API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Choosing the document store (PostgreSQL, or in-memory without `DATABASE_URL`).
//! 3. Initializing the generation backend and the prompt book.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use learnpath_api::{
    config::{Config, Provider},
    db::PgLearningPathStore,
    router::create_router,
    state::AppState,
};
use learnpath_core::{
    ConversationOrchestrator,
    llm_client::OpenAICompatibleClient,
    prompts::PromptBook,
    session::SessionRegistry,
    store::{InMemoryLearningPathStore, LearningPathStore},
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn LearningPathStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("Failed to connect to database")?;
            let store = PgLearningPathStore::new(pool);
            store.run_migrations().await?;
            info!("Database connection established and migrations are up-to-date.");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; learning paths will be kept in memory only.");
            Ok(Arc::new(InMemoryLearningPathStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Document Store ---
    let store = build_store(&config).await?;

    // --- 4. Initialize Generation Backend and Prompts ---
    let api_key = config
        .api_key()
        .context("No API key configured for the selected provider")?;
    let api_base = match config.provider {
        Provider::OpenAI => "https://api.openai.com/v1/",
        Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
    };
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);
    let llm_client = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));

    let prompts = match &config.prompts_path {
        Some(path) => PromptBook::from_dir(path)?,
        None => PromptBook::default(),
    };

    let registry = Arc::new(SessionRegistry::new(llm_client));
    let orchestrator = ConversationOrchestrator::new(registry, store, prompts)
        .with_generation_timeout(config.generation_timeout);
    let app_state = Arc::new(AppState::new(orchestrator));

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        timeout_secs = config.generation_timeout.as_secs(),
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}

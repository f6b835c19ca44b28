//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and the OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AiResponse, DetailPayload, ErrorResponse, ExchangeResponse, GeneratePayload,
        LearningPathResponse, MemoryResponse, MessageResponse, PreferencesResponse, SavePayload,
        TranscriptResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::alive,
        handlers::restart,
        handlers::dump,
        handlers::memory,
        handlers::greet,
        handlers::detail,
        handlers::generate,
        handlers::preferences,
        handlers::save_learning_path,
        handlers::list_learning_paths,
        handlers::get_learning_path,
        handlers::delete_learning_path,
    ),
    components(
        schemas(
            AiResponse, DetailPayload, GeneratePayload, SavePayload, MessageResponse,
            TranscriptResponse, ExchangeResponse, MemoryResponse, LearningPathResponse,
            PreferencesResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Learning Path API", description = "Guided dialogue that builds and stores personalized learning paths")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/alive", get(handlers::alive))
        .route("/restart", post(handlers::restart))
        .route("/dump", get(handlers::dump))
        .route("/memory", get(handlers::memory))
        .route("/greet", get(handlers::greet))
        .route("/detail", post(handlers::detail))
        .route("/generate", post(handlers::generate))
        .route("/preferences", post(handlers::preferences))
        .route(
            "/learning-paths",
            get(handlers::list_learning_paths).post(handlers::save_learning_path),
        )
        .route(
            "/learning-paths/{path_id}",
            get(handlers::get_learning_path).delete(handlers::delete_learning_path),
        )
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

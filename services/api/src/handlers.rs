//! Axum Handlers for the REST API
//!
//! Each handler extracts the student id from the `x-student-id` header, calls
//! the matching orchestrator operation and translates its `PathError` into an
//! HTTP response through [`ApiError`].

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use learnpath_core::PathError;
use std::sync::Arc;
use tracing::{error, warn};

use crate::{
    models::{
        AiResponse, DetailPayload, ErrorResponse, GeneratePayload, LearningPathResponse,
        MemoryResponse, MessageResponse, PreferencesResponse, SavePayload, TranscriptResponse,
    },
    state::AppState,
};

/// Header carrying the opaque student identifier.
pub const STUDENT_ID_HEADER: &str = "x-student-id";

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    GatewayTimeout(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::GatewayTimeout(message) => (StatusCode::GATEWAY_TIMEOUT, message),
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::NotFound(_) => Self::NotFound(err.to_string()),
            PathError::EmptyHistory(_) => Self::BadRequest(err.to_string()),
            PathError::Generation(ref cause) => {
                warn!(error = ?cause, "Generation backend failed");
                Self::BadGateway(err.to_string())
            }
            PathError::SchemaParse(_) => Self::BadGateway(err.to_string()),
            PathError::GenerationTimeout(_) => Self::GatewayTimeout(err.to_string()),
            PathError::Persistence(cause) => Self::InternalServerError(cause),
        }
    }
}

fn student_id(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(STUDENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} header is required", STUDENT_ID_HEADER)))
}

/// Health check.
#[utoipa::path(
    get,
    path = "/alive",
    responses((status = 200, description = "Service is up", body = AiResponse))
)]
pub async fn alive(State(state): State<Arc<AppState>>) -> Json<AiResponse> {
    Json(AiResponse::new(state.orchestrator.health()))
}

/// Discard the student's conversation session. Succeeds for unknown students.
#[utoipa::path(
    post,
    path = "/restart",
    responses(
        (status = 200, description = "Session cleared", body = AiResponse),
        (status = 400, description = "Missing student id", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn restart(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AiResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    state.orchestrator.restart(student_id).await;
    Ok(Json(AiResponse::new("Memory is cleared!")))
}

/// Dump the student's current transcript.
#[utoipa::path(
    get,
    path = "/dump",
    responses(
        (status = 200, description = "Current transcript", body = TranscriptResponse),
        (status = 404, description = "No active session", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn dump(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    let transcript = state.orchestrator.dump_transcript(student_id).await?;
    Ok(Json(TranscriptResponse { transcript }))
}

/// Inspect the conversational memory behind the student's session.
#[utoipa::path(
    get,
    path = "/memory",
    responses(
        (status = 200, description = "Remembered exchanges", body = MemoryResponse),
        (status = 404, description = "No active session", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn memory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MemoryResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    let memory = state.orchestrator.memory(student_id).await?;
    Ok(Json(MemoryResponse {
        memory: memory.into_iter().map(Into::into).collect(),
    }))
}

/// Greet the student and introduce the tutor.
#[utoipa::path(
    get,
    path = "/greet",
    responses(
        (status = 200, description = "Greeting", body = AiResponse),
        (status = 502, description = "Generation failed", body = ErrorResponse),
        (status = 504, description = "Generation timed out", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn greet(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AiResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    let response = state.orchestrator.greet(student_id).await?;
    Ok(Json(AiResponse::new(response)))
}

/// Ask the student about their preferences for a topic.
#[utoipa::path(
    post,
    path = "/detail",
    request_body = DetailPayload,
    responses(
        (status = 200, description = "Preference questions", body = AiResponse),
        (status = 502, description = "Generation failed", body = ErrorResponse),
        (status = 504, description = "Generation timed out", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn detail(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DetailPayload>,
) -> Result<Json<AiResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    let response = state
        .orchestrator
        .elicit_preferences(student_id, &payload.topic)
        .await?;
    Ok(Json(AiResponse::new(response)))
}

/// Generate a learning path from the student's answers.
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GeneratePayload,
    responses(
        (status = 200, description = "Generated learning path", body = AiResponse),
        (status = 502, description = "Generation failed", body = ErrorResponse),
        (status = 504, description = "Generation timed out", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GeneratePayload>,
) -> Result<Json<AiResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    let response = state
        .orchestrator
        .synthesize_path(student_id, &payload.student_answers)
        .await?;
    Ok(Json(AiResponse::new(response)))
}

/// Ask the preference questions as a structured JSON object.
#[utoipa::path(
    post,
    path = "/preferences",
    request_body = DetailPayload,
    responses(
        (status = 200, description = "Structured preference questions", body = PreferencesResponse),
        (status = 502, description = "Generation failed or returned malformed output", body = ErrorResponse),
        (status = 504, description = "Generation timed out", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn preferences(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DetailPayload>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    let questions = state
        .orchestrator
        .elicit_structured_preferences(student_id, &payload.topic)
        .await?;
    Ok(Json(questions.into()))
}

/// Save the latest response as a learning path.
#[utoipa::path(
    post,
    path = "/learning-paths",
    request_body = SavePayload,
    responses(
        (status = 201, description = "Learning path saved", body = MessageResponse),
        (status = 400, description = "Nothing to save", body = ErrorResponse),
        (status = 404, description = "No active session", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn save_learning_path(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SavePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = student_id(&headers)?;
    state
        .orchestrator
        .save(student_id, &payload.learning_path_title)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Learning path saved successfully.".to_string(),
        }),
    ))
}

/// List the student's saved learning paths.
#[utoipa::path(
    get,
    path = "/learning-paths",
    responses(
        (status = 200, description = "Saved learning paths", body = [LearningPathResponse]),
        (status = 404, description = "No saved learning paths", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(("x-student-id" = String, Header, description = "The ID of the student"))
)]
pub async fn list_learning_paths(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LearningPathResponse>>, ApiError> {
    let student_id = student_id(&headers)?;
    let paths = state.orchestrator.list_paths(student_id).await?;
    Ok(Json(paths.into_iter().map(Into::into).collect()))
}

/// Get one learning path by id.
#[utoipa::path(
    get,
    path = "/learning-paths/{path_id}",
    responses(
        (status = 200, description = "Learning path", body = LearningPathResponse),
        (status = 404, description = "Learning path not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("path_id" = String, Path, description = "Learning path ID"),
        ("x-student-id" = String, Header, description = "The ID of the student")
    )
)]
pub async fn get_learning_path(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(path_id): Path<String>,
) -> Result<Json<LearningPathResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    let path = state.orchestrator.get_path(student_id, &path_id).await?;
    Ok(Json(path.into()))
}

/// Delete one learning path. Deleting an unknown path succeeds.
#[utoipa::path(
    delete,
    path = "/learning-paths/{path_id}",
    responses(
        (status = 200, description = "Learning path deleted", body = MessageResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("path_id" = String, Path, description = "Learning path ID"),
        ("x-student-id" = String, Header, description = "The ID of the student")
    )
)]
pub async fn delete_learning_path(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(path_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let student_id = student_id(&headers)?;
    state.orchestrator.delete_path(student_id, &path_id).await?;
    Ok(Json(MessageResponse {
        message: "Learning path deleted successfully.".to_string(),
    }))
}

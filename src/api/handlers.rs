use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
};
use serde::Serialize;
use std::sync::Arc;

use crate::ai::{AiError, StudyAssistant, TextGenerator};
use crate::config::AppConfig;
use crate::logic::{ActivityOutcome, ExtractError, ProgressTracker, TextExtractor};
use crate::model::{Activity, Document, Id, User, UserContext};
use crate::store::traits::Store;

/// Shared state handed to every handler
pub struct AppState<S> {
    pub store: Arc<S>,
    pub assistant: StudyAssistant,
    pub extractor: TextExtractor,
    pub config: Arc<AppConfig>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            assistant: self.assistant.clone(),
            extractor: self.extractor.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> AppState<S> {
    pub fn new(store: Arc<S>, generator: Arc<dyn TextGenerator>, config: AppConfig) -> Self {
        Self {
            store,
            assistant: StudyAssistant::new(generator, config.ai.max_context_chars),
            extractor: TextExtractor::new(config.uploads.pdftotext_path.clone()),
            config: Arc::new(config),
        }
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Result of an action together with the XP and achievements it earned
#[derive(Debug, Serialize)]
pub struct ProgressResponse<T> {
    #[serde(flatten)]
    pub data: T,
    pub progress: ActivityOutcome,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

pub fn bad_request(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, message)
}

pub fn store_error(e: anyhow::Error) -> ApiError {
    log::error!("Store operation failed: {:#}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}

pub fn ai_error(e: AiError) -> ApiError {
    let status = match &e {
        AiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        AiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::BAD_GATEWAY,
    };
    log::warn!("AI request failed: {}", e);
    // Provider error bodies stay in the log
    let message = match &e {
        AiError::Api { status, .. } => format!("AI service returned an error (HTTP {})", status),
        AiError::Http(_) => "AI service could not be reached".to_string(),
        _ => e.to_string(),
    };
    api_error(status, &message)
}

pub fn extract_error(e: ExtractError) -> ApiError {
    let status = match &e {
        ExtractError::UnsupportedType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ExtractError::Empty | ExtractError::Pdf(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ExtractError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log::warn!("Text extraction failed: {}", e);
    api_error(status, &e.to_string())
}

/// Load the caller's user record, creating it on first sight
pub async fn ensure_user<S: Store>(store: &S, ctx: &UserContext) -> Result<User, ApiError> {
    if let Some(user) = store.get_user(&ctx.user_id).await.map_err(store_error)? {
        return Ok(user);
    }

    let user = User::from_context(ctx);
    log::info!("Provisioning user {}", user.id);
    store.upsert_user(user.clone()).await.map_err(store_error)?;
    Ok(user)
}

/// Fetch a document owned by the caller; anyone else's document is a 404
pub async fn load_document<S: Store>(
    store: &S,
    user: &UserContext,
    document_id: &Id,
) -> Result<Document, ApiError> {
    store
        .get_document(&user.user_id, document_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Document not found"))
}

pub async fn record_progress<S: Store>(
    store: &S,
    activity: Activity,
) -> Result<ActivityOutcome, ApiError> {
    ProgressTracker::record(store, activity)
        .await
        .map_err(store_error)
}

/// GET /docs
pub async fn get_api_docs<S: Store>(_state: State<AppState<S>>) -> Html<String> {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>StudyMate API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
    <style>
        body {
            margin: 0;
            background: #fafafa;
        }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: '/docs/openapi.json',
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis],
            });
        };
    </script>
</body>
</html>
"#;
    Html(html.to_string())
}

/// GET /docs/openapi.json
pub async fn get_openapi_spec<S: Store>(_state: State<AppState<S>>) -> Json<serde_json::Value> {
    let id_param = |name: &str| {
        serde_json::json!({
            "name": name,
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        })
    };
    let op = |tag: &str, summary: &str| {
        serde_json::json!({
            "tags": [tag],
            "summary": summary,
            "responses": { "200": { "description": "OK" } }
        })
    };
    let with_id = |mut operation: serde_json::Value, name: &str| {
        operation["parameters"] = serde_json::json!([id_param(name)]);
        operation
    };

    let spec = serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": "StudyMate API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Upload study material and turn it into summaries, flashcards, quizzes and tutoring chat. \
                Callers identify themselves with the X-User-Id, X-User-Email and X-User-Name headers."
        },
        "servers": [{ "url": "/", "description": "Current server" }],
        "tags": [
            { "name": "Profile", "description": "Learner profile, XP and achievements" },
            { "name": "Documents", "description": "Uploaded study material" },
            { "name": "Flashcards", "description": "Generated flashcards and reviews" },
            { "name": "Quizzes", "description": "Generated quizzes and scoring" },
            { "name": "Tutor", "description": "Chat and concept explanations" }
        ],
        "paths": {
            "/health": { "get": op("Profile", "Liveness check") },
            "/me": {
                "get": op("Profile", "Profile with XP, level and streak"),
                "patch": op("Profile", "Update name or email")
            },
            "/me/achievements": { "get": op("Profile", "Achievement catalog with status") },
            "/me/dashboard": { "get": op("Profile", "Study analytics dashboard") },
            "/me/activity": { "get": op("Profile", "Recent activity, newest first") },
            "/documents": {
                "get": op("Documents", "List documents"),
                "post": op("Documents", "Upload a file (base64) or pasted text")
            },
            "/documents/{id}": {
                "get": with_id(op("Documents", "Get a document with its text"), "id"),
                "patch": with_id(op("Documents", "Rename a document"), "id"),
                "delete": with_id(op("Documents", "Delete a document and everything generated from it"), "id")
            },
            "/documents/{id}/summary": {
                "get": with_id(op("Documents", "Stored summary"), "id"),
                "post": with_id(op("Documents", "Generate the summary"), "id")
            },
            "/documents/{id}/flashcards": {
                "get": with_id(op("Flashcards", "Flashcards of a document"), "id"),
                "post": with_id(op("Flashcards", "Generate flashcards (count 1-30)"), "id")
            },
            "/flashcards": { "get": op("Flashcards", "All flashcards, optionally only starred") },
            "/flashcards/{id}": {
                "patch": with_id(op("Flashcards", "Star or unstar"), "id"),
                "delete": with_id(op("Flashcards", "Delete a flashcard"), "id")
            },
            "/flashcards/{id}/review": { "post": with_id(op("Flashcards", "Record a review"), "id") },
            "/documents/{id}/quizzes": {
                "get": with_id(op("Quizzes", "Quizzes of a document"), "id"),
                "post": with_id(op("Quizzes", "Generate a quiz (count 1-20, difficulty)"), "id")
            },
            "/quizzes": { "get": op("Quizzes", "All quizzes") },
            "/quizzes/{id}": {
                "get": with_id(op("Quizzes", "Quiz; answers are revealed once completed"), "id"),
                "delete": with_id(op("Quizzes", "Delete a quiz"), "id")
            },
            "/quizzes/{id}/submit": { "post": with_id(op("Quizzes", "Submit answers for scoring"), "id") },
            "/documents/{id}/chat": {
                "get": with_id(op("Tutor", "Chat history"), "id"),
                "post": with_id(op("Tutor", "Ask about the document"), "id"),
                "delete": with_id(op("Tutor", "Clear chat history"), "id")
            },
            "/documents/{id}/explain": { "post": with_id(op("Tutor", "Explain a concept from the document"), "id") }
        }
    });

    Json(spec)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::info;
use serde::Serialize;

use crate::api::handlers::{
    ai_error, api_error, bad_request, ensure_user, extract_error, load_document, not_found,
    record_progress, store_error, ApiError, AppState, ListResponse, ProgressResponse,
};
use crate::logic::content_hash;
use crate::logic::gamification::base_xp;
use crate::model::{
    generate_id, title_from_file_name, Activity, ActivityKind, Document, DocumentKind,
    DocumentSummary, DocumentUpdate, Id, NewDocument, UserContext,
};
use crate::store::traits::Store;

pub const MAX_TITLE_CHARS: usize = 200;
const PASTED_TEXT_FILE_NAME: &str = "pasted-text.txt";

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub document_id: Id,
    pub summary: Option<String>,
}

/// GET /documents
pub async fn list_documents<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
) -> Result<Json<ListResponse<DocumentSummary>>, ApiError> {
    let documents = state
        .store
        .list_documents(&user.user_id)
        .await
        .map_err(store_error)?;
    let summaries: Vec<DocumentSummary> = documents.iter().map(DocumentSummary::from).collect();
    Ok(Json(summaries.into()))
}

/// POST /documents
///
/// Accepts either a base64-encoded file or pasted text. The text is extracted
/// once at upload time; everything generated later works from that copy.
pub async fn upload_document<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    RequestJson(upload): RequestJson<NewDocument>,
) -> Result<Json<ProgressResponse<DocumentSummary>>, ApiError> {
    let (file_name, bytes) = match (upload.data_base64, upload.text) {
        (Some(data), None) => {
            let file_name = upload
                .file_name
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| bad_request("file_name is required when uploading a file"))?;
            let bytes = decode_base64(&data)
                .map_err(|_| bad_request("data_base64 is not valid base64"))?;
            (file_name, bytes)
        }
        (None, Some(text)) => {
            let file_name = upload
                .file_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| PASTED_TEXT_FILE_NAME.to_string());
            (file_name, text.into_bytes())
        }
        (Some(_), Some(_)) => {
            return Err(bad_request("Provide either data_base64 or text, not both"));
        }
        (None, None) => {
            return Err(bad_request("Provide a file in data_base64 or pasted text"));
        }
    };

    let max_bytes = state.config.uploads.max_bytes;
    if bytes.len() > max_bytes {
        return Err(api_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            &format!("Document exceeds the {} byte upload limit", max_bytes),
        ));
    }
    if bytes.is_empty() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Uploaded document is empty",
        ));
    }

    let kind = DocumentKind::detect(&file_name, upload.content_type.as_deref(), &bytes)
        .ok_or_else(|| {
            api_error(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported document type; upload a PDF, .txt or .md file",
            )
        })?;

    ensure_user(state.store.as_ref(), &user).await?;

    let hash = content_hash(&bytes);
    if let Some(existing) = state
        .store
        .find_document_by_hash(&user.user_id, &hash)
        .await
        .map_err(store_error)?
    {
        return Err(api_error(
            StatusCode::CONFLICT,
            &format!("This document was already uploaded as '{}'", existing.title),
        ));
    }

    let extracted = state
        .extractor
        .extract(kind, &bytes)
        .await
        .map_err(extract_error)?;

    let title = match upload.title {
        Some(title) if !title.trim().is_empty() => validate_title(&title)?,
        _ => title_from_file_name(&file_name),
    };

    let now = chrono::Utc::now();
    let document = Document {
        id: generate_id(),
        user_id: user.user_id.clone(),
        title,
        file_name,
        kind,
        size_bytes: bytes.len() as i64,
        content_hash: hash,
        extracted_text: extracted.text,
        word_count: extracted.word_count,
        summary: None,
        created_at: now,
        updated_at: now,
    };

    // A concurrent upload of the same bytes can pass the lookup above
    let inserted = state
        .store
        .insert_document(document.clone())
        .await
        .map_err(store_error)?;
    if !inserted {
        return Err(api_error(
            StatusCode::CONFLICT,
            "This document was already uploaded",
        ));
    }
    info!(
        "User {} uploaded {} document {} ({} words)",
        user.user_id,
        kind.as_str(),
        document.id,
        document.word_count
    );

    let activity = Activity::new(
        &user.user_id,
        ActivityKind::DocumentUploaded,
        base_xp(ActivityKind::DocumentUploaded),
    )
    .with_document(Some(&document.id));
    let progress = record_progress(state.store.as_ref(), activity).await?;

    Ok(Json(ProgressResponse {
        data: DocumentSummary::from(&document),
        progress,
    }))
}

/// GET /documents/:id
pub async fn get_document<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<Document>, ApiError> {
    let document = load_document(state.store.as_ref(), &user, &document_id).await?;
    Ok(Json(document))
}

/// PATCH /documents/:id
pub async fn update_document<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
    RequestJson(update): RequestJson<DocumentUpdate>,
) -> Result<Json<Document>, ApiError> {
    let title = validate_title(&update.title)?;
    let mut document = load_document(state.store.as_ref(), &user, &document_id).await?;

    document.title = title;
    document.updated_at = chrono::Utc::now();
    let renamed = state
        .store
        .rename_document(&user.user_id, &document_id, &document.title, document.updated_at)
        .await
        .map_err(store_error)?;
    if !renamed {
        return Err(not_found("Document not found"));
    }

    Ok(Json(document))
}

/// DELETE /documents/:id
///
/// Flashcards, quizzes and chat history go with the document. Activities stay,
/// so earned XP and streaks are not lost.
pub async fn delete_document<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .store
        .delete_document(&user.user_id, &document_id)
        .await
        .map_err(store_error)?;
    if !deleted {
        return Err(not_found("Document not found"));
    }

    info!("User {} deleted document {}", user.user_id, document_id);
    Ok(Json(serde_json::json!({
        "deleted": true,
        "id": document_id,
    })))
}

/// GET /documents/:id/summary
pub async fn get_summary<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let document = load_document(state.store.as_ref(), &user, &document_id).await?;
    Ok(Json(SummaryResponse {
        document_id: document.id,
        summary: document.summary,
    }))
}

/// POST /documents/:id/summary
///
/// Generates the summary, replacing any stored one.
pub async fn generate_summary<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<ProgressResponse<SummaryResponse>>, ApiError> {
    let document = load_document(state.store.as_ref(), &user, &document_id).await?;

    let summary = state
        .assistant
        .summarize(&document)
        .await
        .map_err(ai_error)?;

    // The document may have been deleted while the model was working
    let stored = state
        .store
        .set_document_summary(&user.user_id, &document_id, &summary, chrono::Utc::now())
        .await
        .map_err(store_error)?;
    if !stored {
        return Err(not_found("Document not found"));
    }

    let activity = Activity::new(
        &user.user_id,
        ActivityKind::SummaryGenerated,
        base_xp(ActivityKind::SummaryGenerated),
    )
    .with_document(Some(&document_id));
    let progress = record_progress(state.store.as_ref(), activity).await?;

    Ok(Json(ProgressResponse {
        data: SummaryResponse {
            document_id,
            summary: Some(summary),
        },
        progress,
    }))
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(bad_request("Title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(bad_request(&format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

/// Decode an uploaded payload, tolerating a `data:` URL prefix and line breaks
fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = data
        .split_once(";base64,")
        .map(|(_, payload)| payload)
        .unwrap_or(data);
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_accepts_data_urls() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64("data:text/plain;base64,aGVs\nbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_base64("not base64!").is_err());
    }

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  Cell biology ").unwrap(), "Cell biology");
        assert_eq!(validate_title("   ").unwrap_err().0, StatusCode::BAD_REQUEST);
        let long = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(validate_title(&long).is_err());
    }
}

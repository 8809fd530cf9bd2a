use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::api::handlers::{
    ai_error, api_error, bad_request, load_document, not_found, record_progress, store_error,
    ApiError, AppState, ListResponse, ProgressResponse,
};
use crate::logic::gamification::{base_xp, quiz_xp};
use crate::model::{
    Activity, ActivityKind, ChatMessage, ChatRequest, ChatRole, ExplainRequest, Flashcard,
    FlashcardReview, FlashcardUpdate, GenerateFlashcardsRequest, GenerateQuizRequest, Id, Quiz,
    QuizResult, QuizSubmission, QuizSubmissionError, QuizView, UserContext,
};
use crate::store::traits::Store;

pub const DEFAULT_FLASHCARD_COUNT: usize = 10;
pub const MAX_FLASHCARD_COUNT: usize = 30;
pub const DEFAULT_QUIZ_QUESTIONS: usize = 5;
pub const MAX_QUIZ_QUESTIONS: usize = 20;
pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct FlashcardQuery {
    pub starred: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ChatExchange {
    pub question: ChatMessage,
    pub answer: ChatMessage,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub document_id: Id,
    pub concept: String,
    pub explanation: String,
}

fn requested_count(
    requested: Option<usize>,
    default: usize,
    max: usize,
    what: &str,
) -> Result<usize, ApiError> {
    let count = requested.unwrap_or(default);
    if count == 0 || count > max {
        return Err(bad_request(&format!(
            "{} count must be between 1 and {}",
            what, max
        )));
    }
    Ok(count)
}

fn required_text(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(bad_request(&format!("{} must not be empty", field)));
    }
    if value.chars().count() > MAX_MESSAGE_CHARS {
        return Err(bad_request(&format!(
            "{} must be at most {} characters",
            field, MAX_MESSAGE_CHARS
        )));
    }
    Ok(value.to_string())
}

// Flashcards

/// GET /documents/:id/flashcards
pub async fn list_document_flashcards<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<ListResponse<Flashcard>>, ApiError> {
    load_document(state.store.as_ref(), &user, &document_id).await?;
    let cards = state
        .store
        .list_flashcards_for_document(&user.user_id, &document_id)
        .await
        .map_err(store_error)?;
    Ok(Json(cards.into()))
}

/// POST /documents/:id/flashcards
pub async fn generate_flashcards<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
    RequestJson(request): RequestJson<GenerateFlashcardsRequest>,
) -> Result<Json<ProgressResponse<ListResponse<Flashcard>>>, ApiError> {
    let count = requested_count(
        request.count,
        DEFAULT_FLASHCARD_COUNT,
        MAX_FLASHCARD_COUNT,
        "Flashcard",
    )?;
    let document = load_document(state.store.as_ref(), &user, &document_id).await?;

    let drafts = state
        .assistant
        .flashcards(&document, count)
        .await
        .map_err(ai_error)?;

    let cards: Vec<Flashcard> = drafts
        .into_iter()
        .map(|draft| Flashcard::from_draft(&user.user_id, &document_id, draft))
        .collect();
    let stored = state
        .store
        .insert_flashcards(&user.user_id, &document_id, cards.clone(), request.replace)
        .await
        .map_err(store_error)?;
    if !stored {
        return Err(not_found("Document not found"));
    }
    info!(
        "Stored {} flashcards for document {}{}",
        cards.len(),
        document_id,
        if request.replace { ", replacing the previous set" } else { "" }
    );

    let activity = Activity::new(
        &user.user_id,
        ActivityKind::FlashcardsGenerated,
        base_xp(ActivityKind::FlashcardsGenerated),
    )
    .with_document(Some(&document_id));
    let progress = record_progress(state.store.as_ref(), activity).await?;

    Ok(Json(ProgressResponse {
        data: cards.into(),
        progress,
    }))
}

/// GET /flashcards?starred=true
pub async fn list_flashcards<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Query(query): Query<FlashcardQuery>,
) -> Result<Json<ListResponse<Flashcard>>, ApiError> {
    let cards = state
        .store
        .list_flashcards(&user.user_id)
        .await
        .map_err(store_error)?;
    let cards: Vec<Flashcard> = match query.starred {
        Some(starred) => cards.into_iter().filter(|c| c.starred == starred).collect(),
        None => cards,
    };
    Ok(Json(cards.into()))
}

/// PATCH /flashcards/:id
pub async fn update_flashcard<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(card_id): Path<Id>,
    RequestJson(update): RequestJson<FlashcardUpdate>,
) -> Result<Json<Flashcard>, ApiError> {
    let card = state
        .store
        .set_flashcard_starred(&user.user_id, &card_id, update.starred)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Flashcard not found"))?;
    Ok(Json(card))
}

/// DELETE /flashcards/:id
pub async fn delete_flashcard<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(card_id): Path<Id>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .store
        .delete_flashcard(&user.user_id, &card_id)
        .await
        .map_err(store_error)?;
    if !deleted {
        return Err(not_found("Flashcard not found"));
    }
    Ok(Json(serde_json::json!({ "deleted": true, "id": card_id })))
}

/// POST /flashcards/:id/review
pub async fn review_flashcard<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(card_id): Path<Id>,
    RequestJson(review): RequestJson<FlashcardReview>,
) -> Result<Json<ProgressResponse<Flashcard>>, ApiError> {
    let card = state
        .store
        .review_flashcard(&user.user_id, &card_id, review.known, chrono::Utc::now())
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Flashcard not found"))?;

    let activity = Activity::new(
        &user.user_id,
        ActivityKind::FlashcardReviewed,
        base_xp(ActivityKind::FlashcardReviewed),
    )
    .with_document(Some(&card.document_id))
    .with_reference(Some(&card.id));
    let progress = record_progress(state.store.as_ref(), activity).await?;

    Ok(Json(ProgressResponse {
        data: card,
        progress,
    }))
}

// Quizzes

/// GET /documents/:id/quizzes
pub async fn list_document_quizzes<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<ListResponse<QuizView>>, ApiError> {
    load_document(state.store.as_ref(), &user, &document_id).await?;
    let quizzes = state
        .store
        .list_quizzes_for_document(&user.user_id, &document_id)
        .await
        .map_err(store_error)?;
    let views: Vec<QuizView> = quizzes.iter().map(QuizView::from).collect();
    Ok(Json(views.into()))
}

/// POST /documents/:id/quizzes
pub async fn generate_quiz<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
    RequestJson(request): RequestJson<GenerateQuizRequest>,
) -> Result<Json<ProgressResponse<QuizView>>, ApiError> {
    let count = requested_count(
        request.count,
        DEFAULT_QUIZ_QUESTIONS,
        MAX_QUIZ_QUESTIONS,
        "Question",
    )?;
    let difficulty = request.difficulty.unwrap_or_default();
    let document = load_document(state.store.as_ref(), &user, &document_id).await?;

    let questions = state
        .assistant
        .quiz(&document, count, difficulty)
        .await
        .map_err(ai_error)?;

    let title = match request.title {
        Some(title) if !title.trim().is_empty() => title.trim().to_string(),
        _ => format!("{} quiz", document.title),
    };
    let quiz = Quiz::new(&user.user_id, &document_id, title, difficulty, questions);
    let stored = state
        .store
        .insert_quiz(quiz.clone())
        .await
        .map_err(store_error)?;
    if !stored {
        return Err(not_found("Document not found"));
    }
    info!(
        "Generated quiz {} with {} questions for document {}",
        quiz.id,
        quiz.questions.len(),
        document_id
    );

    let activity = Activity::new(
        &user.user_id,
        ActivityKind::QuizGenerated,
        base_xp(ActivityKind::QuizGenerated),
    )
    .with_document(Some(&document_id))
    .with_reference(Some(&quiz.id));
    let progress = record_progress(state.store.as_ref(), activity).await?;

    Ok(Json(ProgressResponse {
        data: QuizView::from(&quiz),
        progress,
    }))
}

/// GET /quizzes
pub async fn list_quizzes<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
) -> Result<Json<ListResponse<QuizView>>, ApiError> {
    let quizzes = state
        .store
        .list_quizzes(&user.user_id)
        .await
        .map_err(store_error)?;
    let views: Vec<QuizView> = quizzes.iter().map(QuizView::from).collect();
    Ok(Json(views.into()))
}

async fn load_quiz<S: Store>(
    state: &AppState<S>,
    user: &UserContext,
    quiz_id: &Id,
) -> Result<Quiz, ApiError> {
    state
        .store
        .get_quiz(&user.user_id, quiz_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Quiz not found"))
}

/// GET /quizzes/:id
pub async fn get_quiz<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(quiz_id): Path<Id>,
) -> Result<Json<QuizView>, ApiError> {
    let quiz = load_quiz(&state, &user, &quiz_id).await?;
    Ok(Json(QuizView::from(&quiz)))
}

/// DELETE /quizzes/:id
pub async fn delete_quiz<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(quiz_id): Path<Id>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .store
        .delete_quiz(&user.user_id, &quiz_id)
        .await
        .map_err(store_error)?;
    if !deleted {
        return Err(not_found("Quiz not found"));
    }
    Ok(Json(serde_json::json!({ "deleted": true, "id": quiz_id })))
}

/// POST /quizzes/:id/submit
pub async fn submit_quiz<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(quiz_id): Path<Id>,
    RequestJson(submission): RequestJson<QuizSubmission>,
) -> Result<Json<ProgressResponse<QuizResult>>, ApiError> {
    let mut quiz = load_quiz(&state, &user, &quiz_id).await?;

    let result = quiz.submit(submission.answers).map_err(|e| match &e {
        QuizSubmissionError::AlreadyCompleted => api_error(StatusCode::CONFLICT, &e.to_string()),
        _ => bad_request(&e.to_string()),
    })?;

    // Only one of two racing submissions gets to mark the quiz completed
    let completed = state
        .store
        .complete_quiz(&quiz)
        .await
        .map_err(store_error)?;
    if !completed {
        return Err(match load_quiz(&state, &user, &quiz_id).await {
            Ok(_) => api_error(
                StatusCode::CONFLICT,
                &QuizSubmissionError::AlreadyCompleted.to_string(),
            ),
            Err(e) => e,
        });
    }
    info!(
        "User {} scored {}/{} on quiz {}",
        user.user_id, result.score, result.total, quiz.id
    );

    let activity = Activity::new(
        &user.user_id,
        ActivityKind::QuizCompleted,
        quiz_xp(result.score, result.total),
    )
    .with_document(Some(&quiz.document_id))
    .with_reference(Some(&quiz.id))
    .with_score(Some(result.percentage));
    let progress = record_progress(state.store.as_ref(), activity).await?;

    Ok(Json(ProgressResponse {
        data: result,
        progress,
    }))
}

// Tutor

/// GET /documents/:id/chat
pub async fn get_chat_history<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<ListResponse<ChatMessage>>, ApiError> {
    load_document(state.store.as_ref(), &user, &document_id).await?;
    let messages = state
        .store
        .list_chat_messages(&user.user_id, &document_id)
        .await
        .map_err(store_error)?;
    Ok(Json(messages.into()))
}

/// POST /documents/:id/chat
pub async fn send_chat_message<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
    RequestJson(request): RequestJson<ChatRequest>,
) -> Result<Json<ProgressResponse<ChatExchange>>, ApiError> {
    let message = required_text(&request.message, "Message")?;
    let document = load_document(state.store.as_ref(), &user, &document_id).await?;

    let history = state
        .store
        .list_chat_messages(&user.user_id, &document_id)
        .await
        .map_err(store_error)?;
    let reply = state
        .assistant
        .chat(&document, &history, &message)
        .await
        .map_err(ai_error)?;

    let question = ChatMessage::new(&user.user_id, &document_id, ChatRole::User, message);
    let answer = ChatMessage::new(&user.user_id, &document_id, ChatRole::Assistant, reply);
    let stored = state
        .store
        .append_chat_messages(&user.user_id, &document_id, vec![question.clone(), answer.clone()])
        .await
        .map_err(store_error)?;
    if !stored {
        return Err(not_found("Document not found"));
    }

    let activity = Activity::new(
        &user.user_id,
        ActivityKind::ChatMessage,
        base_xp(ActivityKind::ChatMessage),
    )
    .with_document(Some(&document_id));
    let progress = record_progress(state.store.as_ref(), activity).await?;

    Ok(Json(ProgressResponse {
        data: ChatExchange { question, answer },
        progress,
    }))
}

/// DELETE /documents/:id/chat
pub async fn clear_chat_history<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
) -> Result<Json<serde_json::Value>, ApiError> {
    load_document(state.store.as_ref(), &user, &document_id).await?;
    let removed = state
        .store
        .clear_chat(&user.user_id, &document_id)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::json!({ "deleted": removed })))
}

/// POST /documents/:id/explain
///
/// One-off explanation; it is not added to the chat history.
pub async fn explain_concept<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(document_id): Path<Id>,
    RequestJson(request): RequestJson<ExplainRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let concept = required_text(&request.concept, "Concept")?;
    let document = load_document(state.store.as_ref(), &user, &document_id).await?;

    let explanation = state
        .assistant
        .explain(&document, &concept)
        .await
        .map_err(ai_error)?;

    Ok(Json(ExplainResponse {
        document_id,
        concept,
        explanation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_count_bounds() {
        assert_eq!(requested_count(None, 10, 30, "Flashcard").unwrap(), 10);
        assert_eq!(requested_count(Some(30), 10, 30, "Flashcard").unwrap(), 30);
        assert!(requested_count(Some(0), 10, 30, "Flashcard").is_err());
        let (status, body) = requested_count(Some(31), 10, 30, "Flashcard").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Flashcard count must be between 1 and 30");
    }

    #[test]
    fn test_required_text_trims_and_limits() {
        assert_eq!(required_text("  why?  ", "Message").unwrap(), "why?");
        assert!(required_text(" \n ", "Message").is_err());
        assert!(required_text(&"a".repeat(MAX_MESSAGE_CHARS + 1), "Message").is_err());
    }
}

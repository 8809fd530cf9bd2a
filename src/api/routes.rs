use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::api::{document_handlers, handlers, progress_handlers, study_handlers};
use crate::api::handlers::AppState;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API Documentation
        .route("/docs", get(handlers::get_api_docs::<S>))
        .route("/docs/openapi.json", get(handlers::get_openapi_spec::<S>))
        // Profile and gamification
        .route(
            "/me",
            get(progress_handlers::get_profile::<S>).patch(progress_handlers::update_profile::<S>),
        )
        .route("/me/achievements", get(progress_handlers::list_achievements::<S>))
        .route("/me/dashboard", get(progress_handlers::get_dashboard::<S>))
        .route("/me/activity", get(progress_handlers::list_activity::<S>))
        // Documents
        .route(
            "/documents",
            get(document_handlers::list_documents::<S>)
                .post(document_handlers::upload_document::<S>),
        )
        .route(
            "/documents/:id",
            get(document_handlers::get_document::<S>)
                .patch(document_handlers::update_document::<S>)
                .delete(document_handlers::delete_document::<S>),
        )
        .route(
            "/documents/:id/summary",
            get(document_handlers::get_summary::<S>)
                .post(document_handlers::generate_summary::<S>),
        )
        // Flashcards
        .route(
            "/documents/:id/flashcards",
            get(study_handlers::list_document_flashcards::<S>)
                .post(study_handlers::generate_flashcards::<S>),
        )
        .route("/flashcards", get(study_handlers::list_flashcards::<S>))
        .route(
            "/flashcards/:id",
            patch(study_handlers::update_flashcard::<S>)
                .delete(study_handlers::delete_flashcard::<S>),
        )
        .route(
            "/flashcards/:id/review",
            post(study_handlers::review_flashcard::<S>),
        )
        // Quizzes
        .route(
            "/documents/:id/quizzes",
            get(study_handlers::list_document_quizzes::<S>)
                .post(study_handlers::generate_quiz::<S>),
        )
        .route("/quizzes", get(study_handlers::list_quizzes::<S>))
        .route(
            "/quizzes/:id",
            get(study_handlers::get_quiz::<S>).delete(study_handlers::delete_quiz::<S>),
        )
        .route("/quizzes/:id/submit", post(study_handlers::submit_quiz::<S>))
        // Tutor
        .route(
            "/documents/:id/chat",
            get(study_handlers::get_chat_history::<S>)
                .post(study_handlers::send_chat_message::<S>)
                .delete(study_handlers::clear_chat_history::<S>),
        )
        .route(
            "/documents/:id/explain",
            post(study_handlers::explain_concept::<S>),
        )
}

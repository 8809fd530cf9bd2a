use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use studymate::ai::{AiError, GeminiClient, Prompt, TextGenerator};
use studymate::config::{AiConfig, AppConfig};
use studymate::model::ActivityKind;
use studymate::store::{ActivityStore, DocumentStore, MemoryStore};
use studymate::{build_app, AppState};

const NOTES: &str = "Photosynthesis converts light energy into chemical energy.\n\n\
It happens in the chloroplasts and releases oxygen as a by-product.";

/// Answers like a well-behaved model, keyed off the prompt wording
struct ScriptedTutor;

#[async_trait::async_trait]
impl TextGenerator for ScriptedTutor {
    async fn generate(&self, prompt: &Prompt) -> Result<String, AiError> {
        let text = prompt.last_user_text().unwrap_or_default();

        let reply = if text.starts_with("Summarize") {
            "## Overview\nPlants turn light into sugar.".to_string()
        } else if text.contains("flashcards from the study material") {
            r#"```json
[
  {"question": "Where does photosynthesis happen?", "answer": "In the chloroplasts"},
  {"front": "By-product of photosynthesis", "back": "Oxygen"}
]
```"#
                .to_string()
        } else if text.contains("multiple-choice quiz") {
            r#"[
  {"question": "Where does photosynthesis happen?",
   "options": ["Mitochondria", "Chloroplasts", "Nucleus", "Ribosome"],
   "correct_index": 1, "explanation": "Chloroplasts hold chlorophyll."},
  {"question": "Which gas is released?",
   "options": ["A) Nitrogen", "B) Carbon dioxide", "C) Oxygen", "D) Helium"],
   "answer": "C"}
]"#
            .to_string()
        } else if text.starts_with("Explain the concept") {
            "Chlorophyll is the pigment that captures light.".to_string()
        } else {
            format!(
                "You asked: {} ({} earlier turns)",
                text,
                prompt.messages.len() - 1
            )
        };
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        "scripted-tutor"
    }
}

/// Deletes the learner's documents while the model is "thinking", then answers
struct DeletingTutor {
    store: Arc<MemoryStore>,
    user_id: String,
}

#[async_trait::async_trait]
impl TextGenerator for DeletingTutor {
    async fn generate(&self, prompt: &Prompt) -> Result<String, AiError> {
        for doc in self.store.list_documents(&self.user_id).await.unwrap() {
            self.store.delete_document(&self.user_id, &doc.id).await.unwrap();
        }
        ScriptedTutor.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "deleting-tutor"
    }
}

fn app_with(generator: Arc<dyn TextGenerator>, config: AppConfig) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), generator, config);
    (build_app(state), store)
}

fn app() -> (Router, Arc<MemoryStore>) {
    app_with(Arc::new(ScriptedTutor), AppConfig::default())
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn upload_notes(app: &Router, user: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/documents",
        user,
        Some(json!({ "title": "Photosynthesis", "text": NOTES })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_docs() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::GET, "/health", "ada", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/docs/openapi.json", "ada", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/quizzes/{id}/submit"].is_object());
}

#[tokio::test]
async fn test_text_upload_awards_xp_and_rejects_duplicates() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents",
        "ada",
        Some(json!({ "text": NOTES, "file_name": "notes.md" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["title"], "notes");
    assert_eq!(body["kind"], "markdown");
    assert_eq!(body["has_summary"], false);
    assert_eq!(body["progress"]["xp_awarded"], 45);
    assert_eq!(body["progress"]["new_achievements"][0]["id"], "first-upload");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents",
        "ada",
        Some(json!({ "text": NOTES })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already uploaded"));

    let (status, body) = send(&app, Method::GET, "/documents", "ada", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body["items"][0].get("extracted_text").is_none());

    let (status, body) = send(&app, Method::GET, &format!("/documents/{}", id), "ada", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["extracted_text"].as_str().unwrap().contains("chloroplasts"));
    assert_eq!(body["word_count"], 18);
}

#[tokio::test]
async fn test_upload_validation() {
    let mut config = AppConfig::default();
    config.uploads.max_bytes = 64;
    let (app, _) = app_with(Arc::new(ScriptedTutor), config);

    let (status, _) = send(&app, Method::POST, "/documents", "ada", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/documents",
        "ada",
        Some(json!({ "file_name": "notes.txt", "data_base64": "%%%" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/documents",
        "ada",
        Some(json!({
            "file_name": "slides.pptx",
            "data_base64": STANDARD.encode(b"PK\x03\x04 not a study document"),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = send(
        &app,
        Method::POST,
        "/documents",
        "ada",
        Some(json!({ "text": "x".repeat(65) })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = send(
        &app,
        Method::POST,
        "/documents",
        "ada",
        Some(json!({ "text": "   \n\n  " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents",
        "ada",
        Some(json!({
            "file_name": "cell_biology.txt",
            "content_type": "text/plain",
            "data_base64": STANDARD.encode("Cells are the unit of life."),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["title"], "cell biology");
    assert_eq!(body["kind"], "text");
}

#[tokio::test]
async fn test_documents_are_scoped_to_their_owner() {
    let (app, _) = app();
    let id = upload_notes(&app, "ada").await;
    let path = format!("/documents/{}", id);

    let (status, _) = send(&app, Method::GET, &path, "grace", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &path, "grace", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/flashcards", path),
        "grace",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::GET, "/documents", "grace", None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(&app, Method::GET, &path, "ada", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_study_workflow() {
    let (app, _) = app();
    let id = upload_notes(&app, "ada").await;
    let doc = format!("/documents/{}", id);

    // Summary
    let (_, body) = send(&app, Method::GET, &format!("{}/summary", doc), "ada", None).await;
    assert!(body["summary"].is_null());
    let (status, body) = send(&app, Method::POST, &format!("{}/summary", doc), "ada", None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["summary"].as_str().unwrap().starts_with("## Overview"));
    assert_eq!(body["progress"]["xp_awarded"], 10);
    let (_, body) = send(&app, Method::GET, &format!("{}/summary", doc), "ada", None).await;
    assert!(body["summary"].as_str().unwrap().contains("light into sugar"));

    // Flashcards
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/flashcards", doc),
        "ada",
        Some(json!({ "count": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][1]["answer"], "Oxygen");
    let card_id = body["items"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/flashcards/{}/review", card_id),
        "ada",
        Some(json!({ "known": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["review_count"], 1);
    assert_eq!(body["known"], true);
    assert_eq!(body["progress"]["xp_awarded"], 2);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/flashcards/{}", card_id),
        "ada",
        Some(json!({ "starred": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, "/flashcards?starred=true", "ada", None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], card_id.as_str());

    // Regenerating with replace keeps the set at the new size
    let (_, body) = send(
        &app,
        Method::POST,
        &format!("{}/flashcards", doc),
        "ada",
        Some(json!({ "replace": true })),
    )
    .await;
    assert_eq!(body["total"], 2);
    let (_, body) = send(&app, Method::GET, &format!("{}/flashcards", doc), "ada", None).await;
    assert_eq!(body["total"], 2);

    // Quiz
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/quizzes", doc),
        "ada",
        Some(json!({ "count": 2, "difficulty": "easy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["title"], "Photosynthesis quiz");
    assert_eq!(body["difficulty"], "easy");
    assert_eq!(body["question_count"], 2);
    assert_eq!(body["questions"][1]["options"][2], "Oxygen");
    assert!(!body.to_string().contains("correct_index"));
    let quiz_id = body["id"].as_str().unwrap().to_string();
    let quiz_path = format!("/quizzes/{}", quiz_id);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/submit", quiz_path),
        "ada",
        Some(json!({ "answers": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/submit", quiz_path),
        "ada",
        Some(json!({ "answers": [1, 2] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["score"], 2);
    assert_eq!(body["percentage"], 100);
    assert_eq!(body["results"][0]["explanation"], "Chloroplasts hold chlorophyll.");
    // 20 base + 2 * 5 per correct + 25 perfect, plus the first-quiz achievement
    assert_eq!(body["progress"]["xp_awarded"], 80);
    assert!(body["progress"]["new_achievements"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["id"] == "quiz-rookie"));

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/submit", quiz_path),
        "ada",
        Some(json!({ "answers": [0, 0] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, Method::GET, &quiz_path, "ada", None).await;
    assert_eq!(body["result"]["results"][1]["correct_index"], 2);

    // Chat keeps history and feeds it back to the model
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/chat", doc),
        "ada",
        Some(json!({ "message": "What is released?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["question"]["role"], "user");
    assert_eq!(body["answer"]["content"], "You asked: What is released? (0 earlier turns)");

    let (_, body) = send(
        &app,
        Method::POST,
        &format!("{}/chat", doc),
        "ada",
        Some(json!({ "message": "And where?" })),
    )
    .await;
    assert_eq!(body["answer"]["content"], "You asked: And where? (2 earlier turns)");

    let (_, body) = send(&app, Method::GET, &format!("{}/chat", doc), "ada", None).await;
    assert_eq!(body["total"], 4);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/chat", doc),
        "ada",
        Some(json!({ "message": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Explain
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/explain", doc),
        "ada",
        Some(json!({ "concept": "chlorophyll" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["concept"], "chlorophyll");
    assert!(body["explanation"].as_str().unwrap().contains("pigment"));

    // Progress views
    let (status, body) = send(&app, Method::GET, "/me/dashboard", "ada", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_documents"], 1);
    assert_eq!(body["total_flashcards"], 2);
    assert_eq!(body["quizzes_completed"], 1);
    assert_eq!(body["best_score"], 100);
    assert_eq!(body["current_streak"], 1);
    assert_eq!(body["weekly_activity"].as_array().unwrap().len(), 7);

    let (_, body) = send(&app, Method::GET, "/me/achievements", "ada", None).await;
    let achievements = body["items"].as_array().unwrap();
    let status_of = |id: &str| {
        achievements
            .iter()
            .find(|a| a["id"] == id)
            .map(|a| a["status"].clone())
            .unwrap()
    };
    assert_eq!(status_of("first-upload"), "unlocked");
    assert_eq!(status_of("quiz-rookie"), "unlocked");
    assert_eq!(status_of("summarizer"), "in_progress");
    assert_eq!(status_of("librarian"), "in_progress");
    assert_eq!(status_of("quiz-master"), "in_progress");
    assert_eq!(status_of("perfectionist"), "in_progress");

    let (_, body) = send(&app, Method::GET, "/me/activity?limit=3", "ada", None).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"][0]["kind"], "chat_message");

    let (status, body) = send(&app, Method::GET, "/me", "ada", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "ada");
    assert_eq!(body["achievements_unlocked"], 2);
    assert_eq!(body["streak"]["current"], 1);
    assert!(body["level"]["total_xp"].as_i64().unwrap() > 100);
    assert_eq!(body["level"]["level"], 2);
}

#[tokio::test]
async fn test_generation_count_limits() {
    let (app, _) = app();
    let id = upload_notes(&app, "ada").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/documents/{}/flashcards", id),
        "ada",
        Some(json!({ "count": 31 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Flashcard count must be between 1 and 30");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/documents/{}/quizzes", id),
        "ada",
        Some(json!({ "count": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/documents/{}/quizzes", id),
        "ada",
        Some(json!({ "difficulty": "impossible" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_ai_features_without_api_key_are_unavailable() {
    let client = GeminiClient::new(&AiConfig::default(), None).unwrap();
    let (app, _) = app_with(Arc::new(client), AppConfig::default());
    let id = upload_notes(&app, "ada").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/documents/{}/summary", id),
        "ada",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not configured"));

    // Nothing but the upload was recorded
    let (_, body) = send(&app, Method::GET, "/me/activity", "ada", None).await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_delete_document_cascades_but_keeps_progress() {
    let (app, store) = app();
    let id = upload_notes(&app, "ada").await;
    let doc = format!("/documents/{}", id);

    send(&app, Method::POST, &format!("{}/flashcards", doc), "ada", Some(json!({}))).await;
    send(&app, Method::POST, &format!("{}/quizzes", doc), "ada", Some(json!({}))).await;
    send(
        &app,
        Method::POST,
        &format!("{}/chat", doc),
        "ada",
        Some(json!({ "message": "Hi" })),
    )
    .await;
    let activities_before = store.list_activities(&"ada".to_string()).await.unwrap().len();

    let (status, body) = send(&app, Method::DELETE, &doc, "ada", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = send(&app, Method::GET, &doc, "ada", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, Method::GET, "/flashcards", "ada", None).await;
    assert_eq!(body["total"], 0);
    let (_, body) = send(&app, Method::GET, "/quizzes", "ada", None).await;
    assert_eq!(body["total"], 0);

    let activities_after = store.list_activities(&"ada".to_string()).await.unwrap().len();
    assert_eq!(activities_before, activities_after);

    // The same content can be uploaded again once the original is gone
    upload_notes(&app, "ada").await;
}

#[tokio::test]
async fn test_profile_update() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/me",
        "ada",
        Some(json!({ "name": "Ada Lovelace", "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada Lovelace");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["level"]["level"], 1);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/me",
        "ada",
        Some(json!({ "email": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid email"));

    let (_, body) = send(&app, Method::GET, "/me", "ada", None).await;
    assert_eq!(body["name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_document_deleted_during_generation_stays_deleted() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(DeletingTutor {
        store: store.clone(),
        user_id: "ada".to_string(),
    });
    let app = build_app(AppState::new(store.clone(), generator, AppConfig::default()));

    let requests = [
        ("summary", json!({})),
        ("flashcards", json!({})),
        ("quizzes", json!({})),
        ("chat", json!({ "message": "Still there?" })),
    ];
    for (action, body) in requests {
        let id = upload_notes(&app, "ada").await;
        let (status, response) = send(
            &app,
            Method::POST,
            &format!("/documents/{}/{}", id, action),
            "ada",
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}: {}", action, response);

        let (_, documents) = send(&app, Method::GET, "/documents", "ada", None).await;
        assert_eq!(documents["total"], 0, "{} brought the document back", action);
    }

    let (_, cards) = send(&app, Method::GET, "/flashcards", "ada", None).await;
    assert_eq!(cards["total"], 0);
    let (_, quizzes) = send(&app, Method::GET, "/quizzes", "ada", None).await;
    assert_eq!(quizzes["total"], 0);

    let activities = store.list_activities(&"ada".to_string()).await.unwrap();
    assert!(activities
        .iter()
        .all(|a| matches!(a.kind, ActivityKind::DocumentUploaded | ActivityKind::AchievementUnlocked)));
}

#[tokio::test]
async fn test_concurrent_quiz_submissions_score_once() {
    let (app, store) = app();
    let id = upload_notes(&app, "ada").await;

    let (status, quiz) = send(
        &app,
        Method::POST,
        &format!("/documents/{}/quizzes", id),
        "ada",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", quiz);
    let submit = format!("/quizzes/{}/submit", quiz["id"].as_str().unwrap());

    let answers = json!({ "answers": [1, 2] });
    let (first, second) = tokio::join!(
        send(&app, Method::POST, &submit, "ada", Some(answers.clone())),
        send(&app, Method::POST, &submit, "ada", Some(answers.clone())),
    );
    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let completions = store
        .list_activities(&"ada".to_string())
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.kind == ActivityKind::QuizCompleted)
        .count();
    assert_eq!(completions, 1);
}

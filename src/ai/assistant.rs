use crate::ai::client::{Prompt, PromptRole, TextGenerator};
use crate::ai::error::Result;
use crate::logic::{parse, prompts};
use crate::model::{ChatMessage, ChatRole, Difficulty, Document, FlashcardDraft, QuizQuestion};
use log::info;
use std::sync::Arc;

pub const CHAT_HISTORY_TURNS: usize = 10;

/// Study features built on a [`TextGenerator`]
#[derive(Clone)]
pub struct StudyAssistant {
    generator: Arc<dyn TextGenerator>,
    max_context_chars: usize,
}

impl StudyAssistant {
    pub fn new(generator: Arc<dyn TextGenerator>, max_context_chars: usize) -> Self {
        Self {
            generator,
            max_context_chars,
        }
    }

    fn context(&self, document: &Document) -> String {
        prompts::truncate_for_context(&document.extracted_text, self.max_context_chars)
    }

    pub async fn summarize(&self, document: &Document) -> Result<String> {
        info!(
            "Summarizing document {} with {}",
            document.id,
            self.generator.model_name()
        );
        let prompt = Prompt::user(prompts::summary_prompt(&document.title, &self.context(document)))
            .with_system(prompts::SYSTEM_TUTOR);
        let summary = self.generator.generate(&prompt).await?;
        Ok(summary.trim().to_string())
    }

    pub async fn flashcards(&self, document: &Document, count: usize) -> Result<Vec<FlashcardDraft>> {
        info!("Generating {} flashcards for document {}", count, document.id);
        let prompt = Prompt::user(prompts::flashcards_prompt(&self.context(document), count))
            .with_system(prompts::SYSTEM_TUTOR);
        let response = self.generator.generate(&prompt).await?;
        Ok(parse::parse_flashcards(&response, count)?)
    }

    pub async fn quiz(
        &self,
        document: &Document,
        count: usize,
        difficulty: Difficulty,
    ) -> Result<Vec<QuizQuestion>> {
        info!(
            "Generating {} {} quiz questions for document {}",
            count,
            difficulty.as_str(),
            document.id
        );
        let prompt = Prompt::user(prompts::quiz_prompt(&self.context(document), count, difficulty))
            .with_system(prompts::SYSTEM_TUTOR);
        let response = self.generator.generate(&prompt).await?;
        Ok(parse::parse_quiz_questions(&response, count)?)
    }

    /// Answer `message` in the context of the document and the recent conversation
    pub async fn chat(
        &self,
        document: &Document,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String> {
        let mut prompt = Prompt {
            system: Some(prompts::chat_system_prompt(&document.title, &self.context(document))),
            messages: Vec::new(),
        };
        for turn in prompts::recent_history(history, CHAT_HISTORY_TURNS) {
            let role = match turn.role {
                ChatRole::User => PromptRole::User,
                ChatRole::Assistant => PromptRole::Model,
            };
            prompt.push(role, turn.content.clone());
        }
        prompt.push(PromptRole::User, message);

        let reply = self.generator.generate(&prompt).await?;
        Ok(reply.trim().to_string())
    }

    pub async fn explain(&self, document: &Document, concept: &str) -> Result<String> {
        let prompt = Prompt::user(prompts::explain_prompt(concept, &self.context(document)))
            .with_system(prompts::SYSTEM_TUTOR);
        let explanation = self.generator.generate(&prompt).await?;
        Ok(explanation.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::error::AiError;
    use crate::model::DocumentKind;
    use parking_lot::Mutex;

    /// Replays a fixed response and remembers the prompts it was given
    struct Scripted {
        response: String,
        seen: Mutex<Vec<Prompt>>,
    }

    #[async_trait::async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &Prompt) -> Result<String> {
            self.seen.lock().push(prompt.clone());
            if self.response.is_empty() {
                return Err(AiError::EmptyResponse);
            }
            Ok(self.response.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn assistant(response: &str) -> (StudyAssistant, Arc<Scripted>) {
        let generator = Arc::new(Scripted {
            response: response.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        (StudyAssistant::new(generator.clone(), 20), generator)
    }

    fn document() -> Document {
        let now = chrono::Utc::now();
        Document {
            id: "doc-1".to_string(),
            user_id: "u1".to_string(),
            title: "Photosynthesis".to_string(),
            file_name: "photo.txt".to_string(),
            kind: DocumentKind::Text,
            size_bytes: 64,
            content_hash: "hash".to_string(),
            extracted_text: "Plants convert light energy into chemical energy stored in glucose."
                .to_string(),
            word_count: 10,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_flashcards_are_parsed_and_context_truncated() {
        let (assistant, generator) =
            assistant(r#"[{"question": "What do plants make?", "answer": "Glucose"}]"#);
        let cards = assistant.flashcards(&document(), 5).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].answer, "Glucose");

        let seen = generator.seen.lock();
        let text = seen[0].last_user_text().unwrap();
        assert!(text.contains("Plants convert light"));
        assert!(text.contains("[... document truncated ...]"));
        assert!(!text.contains("glucose."));
    }

    #[tokio::test]
    async fn test_unusable_quiz_response_is_invalid() {
        let (assistant, _) = assistant("Sorry, I cannot help with that.");
        let err = assistant
            .quiz(&document(), 3, Difficulty::Easy)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_chat_maps_history_to_turns() {
        let (assistant, generator) = assistant("  It happens in chloroplasts.  ");
        let doc = document();
        let history = vec![
            ChatMessage::new(&doc.user_id, &doc.id, ChatRole::User, "What is this about?".into()),
            ChatMessage::new(&doc.user_id, &doc.id, ChatRole::Assistant, "Photosynthesis.".into()),
        ];
        let reply = assistant.chat(&doc, &history, "Where does it happen?").await.unwrap();
        assert_eq!(reply, "It happens in chloroplasts.");

        let seen = generator.seen.lock();
        let prompt = &seen[0];
        assert!(prompt.system.as_deref().unwrap().contains("Photosynthesis"));
        assert_eq!(prompt.messages.len(), 3);
        assert_eq!(prompt.messages[1].role, PromptRole::Model);
        assert_eq!(prompt.last_user_text(), Some("Where does it happen?"));
    }
}

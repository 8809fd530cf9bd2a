use crate::model::{generate_id, Id, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Id,
    pub user_id: Id,
    pub document_id: Id,
    pub question: String,
    pub answer: String,
    pub starred: bool,
    pub known: bool,
    pub review_count: i32,
    pub last_reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Question/answer pair as produced by the assistant, before it is owned by anyone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardDraft {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    pub fn from_draft(user_id: &Id, document_id: &Id, draft: FlashcardDraft) -> Self {
        Self {
            id: generate_id(),
            user_id: user_id.clone(),
            document_id: document_id.clone(),
            question: draft.question,
            answer: draft.answer,
            starred: false,
            known: false,
            review_count: 0,
            last_reviewed_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn record_review(&mut self, known: bool, reviewed_at: Timestamp) {
        self.known = known;
        self.review_count += 1;
        self.last_reviewed_at = Some(reviewed_at);
    }
}

/// Input model for POST /documents/:id/flashcards
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateFlashcardsRequest {
    pub count: Option<usize>,
    /// Drop the document's existing cards before storing the new set
    #[serde(default)]
    pub replace: bool,
}

/// Input model for PATCH /flashcards/:id
#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardUpdate {
    pub starred: bool,
}

/// Input model for POST /flashcards/:id/review
#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardReview {
    pub known: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_counts_and_marks_known() {
        let mut card = Flashcard::from_draft(
            &"u1".to_string(),
            &"d1".to_string(),
            FlashcardDraft {
                question: "What is ATP?".to_string(),
                answer: "The cell's energy currency".to_string(),
            },
        );
        assert_eq!(card.review_count, 0);
        assert!(card.last_reviewed_at.is_none());

        card.record_review(false, chrono::Utc::now());
        card.record_review(true, chrono::Utc::now());

        assert_eq!(card.review_count, 2);
        assert!(card.known);
        assert!(card.last_reviewed_at.is_some());
    }
}

use crate::model::{generate_id, Id, Timestamp};
use serde::{Deserialize, Serialize};

/// Something a learner did that counts towards XP, streaks and achievements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    DocumentUploaded,
    SummaryGenerated,
    FlashcardsGenerated,
    FlashcardReviewed,
    QuizGenerated,
    QuizCompleted,
    ChatMessage,
    AchievementUnlocked,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 8] = [
        ActivityKind::DocumentUploaded,
        ActivityKind::SummaryGenerated,
        ActivityKind::FlashcardsGenerated,
        ActivityKind::FlashcardReviewed,
        ActivityKind::QuizGenerated,
        ActivityKind::QuizCompleted,
        ActivityKind::ChatMessage,
        ActivityKind::AchievementUnlocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::DocumentUploaded => "document_uploaded",
            ActivityKind::SummaryGenerated => "summary_generated",
            ActivityKind::FlashcardsGenerated => "flashcards_generated",
            ActivityKind::FlashcardReviewed => "flashcard_reviewed",
            ActivityKind::QuizGenerated => "quiz_generated",
            ActivityKind::QuizCompleted => "quiz_completed",
            ActivityKind::ChatMessage => "chat_message",
            ActivityKind::AchievementUnlocked => "achievement_unlocked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Whether this activity counts as studying for streak purposes
    pub fn counts_as_study(&self) -> bool {
        !matches!(self, ActivityKind::AchievementUnlocked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Id,
    pub user_id: Id,
    pub kind: ActivityKind,
    pub document_id: Option<Id>,
    /// Quiz, flashcard or achievement the activity refers to
    pub reference_id: Option<Id>,
    pub xp: i64,
    /// Percentage score for completed quizzes
    pub score_percent: Option<i32>,
    pub created_at: Timestamp,
}

impl Activity {
    pub fn new(user_id: &Id, kind: ActivityKind, xp: i64) -> Self {
        Self {
            id: generate_id(),
            user_id: user_id.clone(),
            kind,
            document_id: None,
            reference_id: None,
            xp,
            score_percent: None,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn with_document(mut self, document_id: Option<&Id>) -> Self {
        self.document_id = document_id.cloned();
        self
    }

    pub fn with_reference(mut self, reference_id: Option<&Id>) -> Self {
        self.reference_id = reference_id.cloned();
        self
    }

    pub fn with_score(mut self, score_percent: Option<u32>) -> Self {
        self.score_percent = score_percent.map(|s| s as i32);
        self
    }
}

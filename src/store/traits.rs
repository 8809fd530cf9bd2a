use crate::model::{
    Activity, ChatMessage, Document, Flashcard, Id, Quiz, Timestamp, User, UserAchievement,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &Id) -> Result<Option<User>>;
    async fn upsert_user(&self, user: User) -> Result<()>;
}

/// Document reads are scoped to the owning user
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, user_id: &Id, id: &Id) -> Result<Option<Document>>;
    async fn find_document_by_hash(&self, user_id: &Id, content_hash: &str) -> Result<Option<Document>>;
    /// Newest first
    async fn list_documents(&self, user_id: &Id) -> Result<Vec<Document>>;
    /// Returns false when the user already has a document with the same content hash
    async fn insert_document(&self, document: Document) -> Result<bool>;
    /// Returns false when the document is gone
    async fn rename_document(&self, user_id: &Id, id: &Id, title: &str, updated_at: Timestamp) -> Result<bool>;
    /// Returns false when the document is gone
    async fn set_document_summary(
        &self,
        user_id: &Id,
        id: &Id,
        summary: &str,
        updated_at: Timestamp,
    ) -> Result<bool>;
    /// Delete a document together with its flashcards, quizzes and chat history
    async fn delete_document(&self, user_id: &Id, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait FlashcardStore: Send + Sync {
    async fn get_flashcard(&self, user_id: &Id, id: &Id) -> Result<Option<Flashcard>>;
    /// Oldest first, in generation order
    async fn list_flashcards_for_document(&self, user_id: &Id, document_id: &Id) -> Result<Vec<Flashcard>>;
    async fn list_flashcards(&self, user_id: &Id) -> Result<Vec<Flashcard>>;
    /// Store generated cards, optionally dropping the document's existing ones first.
    /// Returns false, storing nothing, when the document is gone.
    async fn insert_flashcards(
        &self,
        user_id: &Id,
        document_id: &Id,
        flashcards: Vec<Flashcard>,
        replace: bool,
    ) -> Result<bool>;
    async fn set_flashcard_starred(&self, user_id: &Id, id: &Id, starred: bool) -> Result<Option<Flashcard>>;
    async fn review_flashcard(
        &self,
        user_id: &Id,
        id: &Id,
        known: bool,
        reviewed_at: Timestamp,
    ) -> Result<Option<Flashcard>>;
    async fn delete_flashcard(&self, user_id: &Id, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait QuizStore: Send + Sync {
    async fn get_quiz(&self, user_id: &Id, id: &Id) -> Result<Option<Quiz>>;
    /// Newest first
    async fn list_quizzes_for_document(&self, user_id: &Id, document_id: &Id) -> Result<Vec<Quiz>>;
    /// Newest first
    async fn list_quizzes(&self, user_id: &Id) -> Result<Vec<Quiz>>;
    /// Returns false when the quiz's document is gone
    async fn insert_quiz(&self, quiz: Quiz) -> Result<bool>;
    /// Persist the answers of a graded quiz. Returns false unless the quiz
    /// exists and had not been completed yet.
    async fn complete_quiz(&self, quiz: &Quiz) -> Result<bool>;
    async fn delete_quiz(&self, user_id: &Id, id: &Id) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Oldest first
    async fn list_chat_messages(&self, user_id: &Id, document_id: &Id) -> Result<Vec<ChatMessage>>;
    /// Returns false when the document is gone
    async fn append_chat_messages(
        &self,
        user_id: &Id,
        document_id: &Id,
        messages: Vec<ChatMessage>,
    ) -> Result<bool>;
    async fn clear_chat(&self, user_id: &Id, document_id: &Id) -> Result<u64>;
}

#[async_trait::async_trait]
pub trait ActivityStore: Send + Sync {
    async fn record_activity(&self, activity: Activity) -> Result<()>;
    /// Oldest first
    async fn list_activities(&self, user_id: &Id) -> Result<Vec<Activity>>;
}

#[async_trait::async_trait]
pub trait AchievementStore: Send + Sync {
    async fn list_unlocked_achievements(&self, user_id: &Id) -> Result<Vec<UserAchievement>>;
    /// Record an unlock; returns false when it was already recorded
    async fn unlock_achievement(&self, achievement: UserAchievement) -> Result<bool>;
}

pub trait Store:
    UserStore
    + DocumentStore
    + FlashcardStore
    + QuizStore
    + ChatStore
    + ActivityStore
    + AchievementStore
    + Send
    + Sync
{
}

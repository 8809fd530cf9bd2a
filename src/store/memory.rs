use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::model::{
    Activity, ChatMessage, Document, Flashcard, Id, Quiz, Timestamp, User, UserAchievement,
};
use crate::store::traits::{
    AchievementStore, ActivityStore, ChatStore, DocumentStore, FlashcardStore, QuizStore, Store,
    UserStore,
};

/// In-process store with the same semantics as [`PostgresStore`](crate::store::PostgresStore).
///
/// Locks are never held across an await point. Writes to a document's
/// children hold the documents read lock, so they cannot interleave with
/// the document's deletion.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Id, User>>,
    documents: RwLock<HashMap<Id, Document>>,
    flashcards: RwLock<HashMap<Id, Flashcard>>,
    quizzes: RwLock<HashMap<Id, Quiz>>,
    chat: RwLock<Vec<ChatMessage>>,
    activities: RwLock<Vec<Activity>>,
    achievements: RwLock<Vec<UserAchievement>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owns_document(documents: &HashMap<Id, Document>, user_id: &Id, document_id: &Id) -> bool {
    documents
        .get(document_id)
        .is_some_and(|doc| &doc.user_id == user_id)
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: &Id) -> Result<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        self.users.write().insert(user.id.clone(), user);
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, user_id: &Id, id: &Id) -> Result<Option<Document>> {
        Ok(self
            .documents
            .read()
            .get(id)
            .filter(|doc| &doc.user_id == user_id)
            .cloned())
    }

    async fn find_document_by_hash(&self, user_id: &Id, content_hash: &str) -> Result<Option<Document>> {
        Ok(self
            .documents
            .read()
            .values()
            .find(|doc| &doc.user_id == user_id && doc.content_hash == content_hash)
            .cloned())
    }

    async fn list_documents(&self, user_id: &Id) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .read()
            .values()
            .filter(|doc| &doc.user_id == user_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn insert_document(&self, document: Document) -> Result<bool> {
        let mut documents = self.documents.write();
        let duplicate = documents
            .values()
            .any(|doc| doc.user_id == document.user_id && doc.content_hash == document.content_hash);
        if duplicate || documents.contains_key(&document.id) {
            return Ok(false);
        }
        documents.insert(document.id.clone(), document);
        Ok(true)
    }

    async fn rename_document(&self, user_id: &Id, id: &Id, title: &str, updated_at: Timestamp) -> Result<bool> {
        let mut documents = self.documents.write();
        match documents.get_mut(id) {
            Some(doc) if &doc.user_id == user_id => {
                doc.title = title.to_string();
                doc.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_document_summary(
        &self,
        user_id: &Id,
        id: &Id,
        summary: &str,
        updated_at: Timestamp,
    ) -> Result<bool> {
        let mut documents = self.documents.write();
        match documents.get_mut(id) {
            Some(doc) if &doc.user_id == user_id => {
                doc.summary = Some(summary.to_string());
                doc.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_document(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let removed = {
            let mut documents = self.documents.write();
            match documents.get(id) {
                Some(doc) if &doc.user_id == user_id => documents.remove(id).is_some(),
                _ => false,
            }
        };
        if removed {
            self.flashcards.write().retain(|_, card| &card.document_id != id);
            self.quizzes.write().retain(|_, quiz| &quiz.document_id != id);
            self.chat.write().retain(|msg| &msg.document_id != id);
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl FlashcardStore for MemoryStore {
    async fn get_flashcard(&self, user_id: &Id, id: &Id) -> Result<Option<Flashcard>> {
        Ok(self
            .flashcards
            .read()
            .get(id)
            .filter(|card| &card.user_id == user_id)
            .cloned())
    }

    async fn list_flashcards_for_document(&self, user_id: &Id, document_id: &Id) -> Result<Vec<Flashcard>> {
        let mut cards: Vec<Flashcard> = self
            .flashcards
            .read()
            .values()
            .filter(|card| &card.user_id == user_id && &card.document_id == document_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(cards)
    }

    async fn list_flashcards(&self, user_id: &Id) -> Result<Vec<Flashcard>> {
        let mut cards: Vec<Flashcard> = self
            .flashcards
            .read()
            .values()
            .filter(|card| &card.user_id == user_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(cards)
    }

    async fn insert_flashcards(
        &self,
        user_id: &Id,
        document_id: &Id,
        flashcards: Vec<Flashcard>,
        replace: bool,
    ) -> Result<bool> {
        // The read lock keeps the document from being deleted mid-insert
        let documents = self.documents.read();
        if !owns_document(&documents, user_id, document_id) {
            return Ok(false);
        }

        let mut stored = self.flashcards.write();
        if replace {
            stored.retain(|_, card| !(&card.user_id == user_id && &card.document_id == document_id));
        }
        for card in flashcards {
            stored.insert(card.id.clone(), card);
        }
        Ok(true)
    }

    async fn set_flashcard_starred(&self, user_id: &Id, id: &Id, starred: bool) -> Result<Option<Flashcard>> {
        let mut cards = self.flashcards.write();
        Ok(cards
            .get_mut(id)
            .filter(|card| &card.user_id == user_id)
            .map(|card| {
                card.starred = starred;
                card.clone()
            }))
    }

    async fn review_flashcard(
        &self,
        user_id: &Id,
        id: &Id,
        known: bool,
        reviewed_at: Timestamp,
    ) -> Result<Option<Flashcard>> {
        let mut cards = self.flashcards.write();
        Ok(cards
            .get_mut(id)
            .filter(|card| &card.user_id == user_id)
            .map(|card| {
                card.record_review(known, reviewed_at);
                card.clone()
            }))
    }

    async fn delete_flashcard(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let mut cards = self.flashcards.write();
        match cards.get(id) {
            Some(card) if &card.user_id == user_id => Ok(cards.remove(id).is_some()),
            _ => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl QuizStore for MemoryStore {
    async fn get_quiz(&self, user_id: &Id, id: &Id) -> Result<Option<Quiz>> {
        Ok(self
            .quizzes
            .read()
            .get(id)
            .filter(|quiz| &quiz.user_id == user_id)
            .cloned())
    }

    async fn list_quizzes_for_document(&self, user_id: &Id, document_id: &Id) -> Result<Vec<Quiz>> {
        let mut quizzes: Vec<Quiz> = self
            .quizzes
            .read()
            .values()
            .filter(|quiz| &quiz.user_id == user_id && &quiz.document_id == document_id)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn list_quizzes(&self, user_id: &Id) -> Result<Vec<Quiz>> {
        let mut quizzes: Vec<Quiz> = self
            .quizzes
            .read()
            .values()
            .filter(|quiz| &quiz.user_id == user_id)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn insert_quiz(&self, quiz: Quiz) -> Result<bool> {
        let documents = self.documents.read();
        if !owns_document(&documents, &quiz.user_id, &quiz.document_id) {
            return Ok(false);
        }
        self.quizzes.write().insert(quiz.id.clone(), quiz);
        Ok(true)
    }

    async fn complete_quiz(&self, quiz: &Quiz) -> Result<bool> {
        let mut quizzes = self.quizzes.write();
        match quizzes.get_mut(&quiz.id) {
            Some(stored) if stored.user_id == quiz.user_id && !stored.is_completed() => {
                stored.answers = quiz.answers.clone();
                stored.score = quiz.score;
                stored.completed_at = quiz.completed_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_quiz(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let mut quizzes = self.quizzes.write();
        match quizzes.get(id) {
            Some(quiz) if &quiz.user_id == user_id => Ok(quizzes.remove(id).is_some()),
            _ => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl ChatStore for MemoryStore {
    async fn list_chat_messages(&self, user_id: &Id, document_id: &Id) -> Result<Vec<ChatMessage>> {
        Ok(self
            .chat
            .read()
            .iter()
            .filter(|msg| &msg.user_id == user_id && &msg.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn append_chat_messages(
        &self,
        user_id: &Id,
        document_id: &Id,
        messages: Vec<ChatMessage>,
    ) -> Result<bool> {
        let documents = self.documents.read();
        if !owns_document(&documents, user_id, document_id) {
            return Ok(false);
        }
        self.chat.write().extend(messages);
        Ok(true)
    }

    async fn clear_chat(&self, user_id: &Id, document_id: &Id) -> Result<u64> {
        let mut chat = self.chat.write();
        let before = chat.len();
        chat.retain(|msg| !(&msg.user_id == user_id && &msg.document_id == document_id));
        Ok((before - chat.len()) as u64)
    }
}

#[async_trait::async_trait]
impl ActivityStore for MemoryStore {
    async fn record_activity(&self, activity: Activity) -> Result<()> {
        self.activities.write().push(activity);
        Ok(())
    }

    async fn list_activities(&self, user_id: &Id) -> Result<Vec<Activity>> {
        let mut activities: Vec<Activity> = self
            .activities
            .read()
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(activities)
    }
}

#[async_trait::async_trait]
impl AchievementStore for MemoryStore {
    async fn list_unlocked_achievements(&self, user_id: &Id) -> Result<Vec<UserAchievement>> {
        Ok(self
            .achievements
            .read()
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn unlock_achievement(&self, achievement: UserAchievement) -> Result<bool> {
        let mut achievements = self.achievements.write();
        let exists = achievements.iter().any(|a| {
            a.user_id == achievement.user_id && a.achievement_id == achievement.achievement_id
        });
        if exists {
            return Ok(false);
        }
        achievements.push(achievement);
        Ok(true)
    }
}

impl Store for MemoryStore {}

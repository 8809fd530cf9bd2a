use anyhow::{anyhow, Context, Result};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    PgPool, Postgres, Row, Transaction,
};

use crate::model::{
    Activity, ActivityKind, ChatMessage, ChatRole, Difficulty, Document, DocumentKind, Flashcard,
    Id, Quiz, QuizQuestion, Timestamp, User, UserAchievement,
};
use crate::store::traits::{
    AchievementStore, ActivityStore, ChatStore, DocumentStore, FlashcardStore, QuizStore, Store,
    UserStore,
};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }
}

/// Lock the document row for the rest of the transaction, so a concurrent
/// delete waits until its children are written. False when it is gone.
async fn lock_document(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &Id,
    document_id: &Id,
) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM documents WHERE user_id = $1 AND id = $2 FOR SHARE")
        .bind(user_id)
        .bind(document_id)
        .fetch_optional(&mut **tx)
        .await
        .context("Failed to lock document")?;
    Ok(row.is_some())
}

const DOCUMENT_COLUMNS: &str = "id, user_id, title, file_name, kind, size_bytes, content_hash, \
     extracted_text, word_count, summary, created_at, updated_at";

const FLASHCARD_COLUMNS: &str = "id, user_id, document_id, question, answer, starred, known, \
     review_count, last_reviewed_at, created_at";

const QUIZ_COLUMNS: &str = "id, user_id, document_id, title, difficulty, questions, answers, \
     score, completed_at, created_at";

fn document_from_row(row: &PgRow) -> Document {
    let kind: String = row.get("kind");
    Document {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        file_name: row.get("file_name"),
        kind: DocumentKind::parse(&kind).unwrap_or(DocumentKind::Text),
        size_bytes: row.get("size_bytes"),
        content_hash: row.get("content_hash"),
        extracted_text: row.get("extracted_text"),
        word_count: row.get("word_count"),
        summary: row.get("summary"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn flashcard_from_row(row: &PgRow) -> Flashcard {
    Flashcard {
        id: row.get("id"),
        user_id: row.get("user_id"),
        document_id: row.get("document_id"),
        question: row.get("question"),
        answer: row.get("answer"),
        starred: row.get("starred"),
        known: row.get("known"),
        review_count: row.get("review_count"),
        last_reviewed_at: row.get("last_reviewed_at"),
        created_at: row.get("created_at"),
    }
}

fn quiz_from_row(row: &PgRow) -> Quiz {
    let difficulty: String = row.get("difficulty");
    let questions: Json<Vec<QuizQuestion>> = row.get("questions");
    let answers: Option<Json<Vec<Option<usize>>>> = row.get("answers");
    Quiz {
        id: row.get("id"),
        user_id: row.get("user_id"),
        document_id: row.get("document_id"),
        title: row.get("title"),
        difficulty: Difficulty::parse(&difficulty).unwrap_or_default(),
        questions: questions.0,
        answers: answers.map(|a| a.0),
        score: row.get("score"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
    }
}

fn chat_message_from_row(row: &PgRow) -> Result<ChatMessage> {
    let role: String = row.get("role");
    Ok(ChatMessage {
        id: row.get("id"),
        user_id: row.get("user_id"),
        document_id: row.get("document_id"),
        role: ChatRole::parse(&role).ok_or_else(|| anyhow!("Unknown chat role '{}'", role))?,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

fn activity_from_row(row: &PgRow) -> Result<Activity> {
    let kind: String = row.get("kind");
    Ok(Activity {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: ActivityKind::parse(&kind).ok_or_else(|| anyhow!("Unknown activity kind '{}'", kind))?,
        document_id: row.get("document_id"),
        reference_id: row.get("reference_id"),
        xp: row.get("xp"),
        score_percent: row.get("score_percent"),
        created_at: row.get("created_at"),
    })
}

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    async fn get_user(&self, id: &Id) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert user")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresStore {
    async fn get_document(&self, user_id: &Id, id: &Id) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE user_id = $1 AND id = $2",
            DOCUMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch document")?;

        Ok(row.as_ref().map(document_from_row))
    }

    async fn find_document_by_hash(&self, user_id: &Id, content_hash: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE user_id = $1 AND content_hash = $2",
            DOCUMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up document by hash")?;

        Ok(row.as_ref().map(document_from_row))
    }

    async fn list_documents(&self, user_id: &Id) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE user_id = $1 ORDER BY created_at DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list documents")?;

        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn insert_document(&self, document: Document) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (id, user_id, title, file_name, kind, size_bytes, content_hash,
                                   extracted_text, word_count, summary, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id, content_hash) DO NOTHING
            "#,
        )
        .bind(&document.id)
        .bind(&document.user_id)
        .bind(&document.title)
        .bind(&document.file_name)
        .bind(document.kind.as_str())
        .bind(document.size_bytes)
        .bind(&document.content_hash)
        .bind(&document.extracted_text)
        .bind(document.word_count)
        .bind(&document.summary)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert document")?;

        Ok(result.rows_affected() > 0)
    }

    async fn rename_document(&self, user_id: &Id, id: &Id, title: &str, updated_at: Timestamp) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET title = $3, updated_at = $4 WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .bind(title)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to rename document")?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_document_summary(
        &self,
        user_id: &Id,
        id: &Id,
        summary: &str,
        updated_at: Timestamp,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET summary = $3, updated_at = $4 WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .bind(summary)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to store summary")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_document(&self, user_id: &Id, id: &Id) -> Result<bool> {
        // Flashcards, quizzes and chat rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM documents WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl FlashcardStore for PostgresStore {
    async fn get_flashcard(&self, user_id: &Id, id: &Id) -> Result<Option<Flashcard>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM flashcards WHERE user_id = $1 AND id = $2",
            FLASHCARD_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch flashcard")?;

        Ok(row.as_ref().map(flashcard_from_row))
    }

    async fn list_flashcards_for_document(&self, user_id: &Id, document_id: &Id) -> Result<Vec<Flashcard>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM flashcards WHERE user_id = $1 AND document_id = $2 ORDER BY created_at, id",
            FLASHCARD_COLUMNS
        ))
        .bind(user_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list flashcards")?;

        Ok(rows.iter().map(flashcard_from_row).collect())
    }

    async fn list_flashcards(&self, user_id: &Id) -> Result<Vec<Flashcard>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM flashcards WHERE user_id = $1 ORDER BY created_at, id",
            FLASHCARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list flashcards")?;

        Ok(rows.iter().map(flashcard_from_row).collect())
    }

    async fn insert_flashcards(
        &self,
        user_id: &Id,
        document_id: &Id,
        flashcards: Vec<Flashcard>,
        replace: bool,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start flashcard transaction")?;

        if !lock_document(&mut tx, user_id, document_id).await? {
            return Ok(false);
        }

        if replace {
            sqlx::query("DELETE FROM flashcards WHERE user_id = $1 AND document_id = $2")
                .bind(user_id)
                .bind(document_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete flashcards")?;
        }

        for card in flashcards {
            sqlx::query(
                r#"
                INSERT INTO flashcards (id, user_id, document_id, question, answer, starred, known,
                                        review_count, last_reviewed_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&card.id)
            .bind(&card.user_id)
            .bind(&card.document_id)
            .bind(&card.question)
            .bind(&card.answer)
            .bind(card.starred)
            .bind(card.known)
            .bind(card.review_count)
            .bind(card.last_reviewed_at)
            .bind(card.created_at)
            .execute(&mut *tx)
            .await
            .context("Failed to insert flashcard")?;
        }

        tx.commit().await.context("Failed to commit flashcards")?;
        Ok(true)
    }

    async fn set_flashcard_starred(&self, user_id: &Id, id: &Id, starred: bool) -> Result<Option<Flashcard>> {
        let row = sqlx::query(&format!(
            "UPDATE flashcards SET starred = $3 WHERE user_id = $1 AND id = $2 RETURNING {}",
            FLASHCARD_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .bind(starred)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to star flashcard")?;

        Ok(row.as_ref().map(flashcard_from_row))
    }

    async fn review_flashcard(
        &self,
        user_id: &Id,
        id: &Id,
        known: bool,
        reviewed_at: Timestamp,
    ) -> Result<Option<Flashcard>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE flashcards
            SET known = $3, review_count = review_count + 1, last_reviewed_at = $4
            WHERE user_id = $1 AND id = $2
            RETURNING {}
            "#,
            FLASHCARD_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .bind(known)
        .bind(reviewed_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to record flashcard review")?;

        Ok(row.as_ref().map(flashcard_from_row))
    }

    async fn delete_flashcard(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flashcards WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete flashcard")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl QuizStore for PostgresStore {
    async fn get_quiz(&self, user_id: &Id, id: &Id) -> Result<Option<Quiz>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM quizzes WHERE user_id = $1 AND id = $2",
            QUIZ_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch quiz")?;

        Ok(row.as_ref().map(quiz_from_row))
    }

    async fn list_quizzes_for_document(&self, user_id: &Id, document_id: &Id) -> Result<Vec<Quiz>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM quizzes WHERE user_id = $1 AND document_id = $2 ORDER BY created_at DESC",
            QUIZ_COLUMNS
        ))
        .bind(user_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list quizzes")?;

        Ok(rows.iter().map(quiz_from_row).collect())
    }

    async fn list_quizzes(&self, user_id: &Id) -> Result<Vec<Quiz>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM quizzes WHERE user_id = $1 ORDER BY created_at DESC",
            QUIZ_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list quizzes")?;

        Ok(rows.iter().map(quiz_from_row).collect())
    }

    async fn insert_quiz(&self, quiz: Quiz) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start quiz transaction")?;

        if !lock_document(&mut tx, &quiz.user_id, &quiz.document_id).await? {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO quizzes (id, user_id, document_id, title, difficulty, questions, answers,
                                 score, completed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&quiz.id)
        .bind(&quiz.user_id)
        .bind(&quiz.document_id)
        .bind(&quiz.title)
        .bind(quiz.difficulty.as_str())
        .bind(Json(&quiz.questions))
        .bind(quiz.answers.as_ref().map(Json))
        .bind(quiz.score)
        .bind(quiz.completed_at)
        .bind(quiz.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert quiz")?;

        tx.commit().await.context("Failed to commit quiz")?;
        Ok(true)
    }

    async fn complete_quiz(&self, quiz: &Quiz) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE quizzes
            SET answers = $3, score = $4, completed_at = $5
            WHERE user_id = $1 AND id = $2 AND completed_at IS NULL
            "#,
        )
        .bind(&quiz.user_id)
        .bind(&quiz.id)
        .bind(quiz.answers.as_ref().map(Json))
        .bind(quiz.score)
        .bind(quiz.completed_at)
        .execute(&self.pool)
        .await
        .context("Failed to complete quiz")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_quiz(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete quiz")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl ChatStore for PostgresStore {
    async fn list_chat_messages(&self, user_id: &Id, document_id: &Id) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, document_id, role, content, created_at
            FROM chat_messages
            WHERE user_id = $1 AND document_id = $2
            ORDER BY seq
            "#,
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list chat messages")?;

        rows.iter().map(chat_message_from_row).collect()
    }

    async fn append_chat_messages(
        &self,
        user_id: &Id,
        document_id: &Id,
        messages: Vec<ChatMessage>,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start chat transaction")?;

        if !lock_document(&mut tx, user_id, document_id).await? {
            return Ok(false);
        }

        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO chat_messages (id, user_id, document_id, role, content, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&message.id)
            .bind(&message.user_id)
            .bind(&message.document_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await
            .context("Failed to insert chat message")?;
        }

        tx.commit().await.context("Failed to commit chat messages")?;
        Ok(true)
    }

    async fn clear_chat(&self, user_id: &Id, document_id: &Id) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE user_id = $1 AND document_id = $2")
            .bind(user_id)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .context("Failed to clear chat")?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl ActivityStore for PostgresStore {
    async fn record_activity(&self, activity: Activity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, user_id, kind, document_id, reference_id, xp, score_percent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&activity.id)
        .bind(&activity.user_id)
        .bind(activity.kind.as_str())
        .bind(&activity.document_id)
        .bind(&activity.reference_id)
        .bind(activity.xp)
        .bind(activity.score_percent)
        .bind(activity.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to record activity")?;

        Ok(())
    }

    async fn list_activities(&self, user_id: &Id) -> Result<Vec<Activity>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, document_id, reference_id, xp, score_percent, created_at
            FROM activities
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list activities")?;

        rows.iter().map(activity_from_row).collect()
    }
}

#[async_trait::async_trait]
impl AchievementStore for PostgresStore {
    async fn list_unlocked_achievements(&self, user_id: &Id) -> Result<Vec<UserAchievement>> {
        let rows = sqlx::query(
            "SELECT user_id, achievement_id, unlocked_at FROM user_achievements WHERE user_id = $1 ORDER BY unlocked_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list achievements")?;

        Ok(rows
            .iter()
            .map(|row| UserAchievement {
                user_id: row.get("user_id"),
                achievement_id: row.get("achievement_id"),
                unlocked_at: row.get("unlocked_at"),
            })
            .collect())
    }

    async fn unlock_achievement(&self, achievement: UserAchievement) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_achievements (user_id, achievement_id, unlocked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
            "#,
        )
        .bind(&achievement.user_id)
        .bind(&achievement.achievement_id)
        .bind(achievement.unlocked_at)
        .execute(&self.pool)
        .await
        .context("Failed to unlock achievement")?;

        Ok(result.rows_affected() > 0)
    }
}

impl Store for PostgresStore {}

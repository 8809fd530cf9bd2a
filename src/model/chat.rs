use crate::model::{generate_id, Id, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Id,
    pub user_id: Id,
    pub document_id: Id,
    pub role: ChatRole,
    pub content: String,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(user_id: &Id, document_id: &Id, role: ChatRole, content: String) -> Self {
        Self {
            id: generate_id(),
            user_id: user_id.clone(),
            document_id: document_id.clone(),
            role,
            content,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Input model for POST /documents/:id/chat
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Input model for POST /documents/:id/explain
#[derive(Debug, Clone, Deserialize)]
pub struct ExplainRequest {
    pub concept: String,
}

use crate::model::{Id, Timestamp, UserContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn from_context(ctx: &UserContext) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ctx.user_id.clone(),
            name: ctx.display_name(),
            email: ctx.user_email.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input model for PATCH /me
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserUpdate {
    /// Apply the update, rejecting blank names and addresses without an '@'
    pub fn apply(self, user: &mut User) -> Result<(), String> {
        if let Some(name) = self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err("Name must not be empty".to_string());
            }
            user.name = name.to_string();
        }
        if let Some(email) = self.email {
            let email = email.trim();
            if email.is_empty() {
                user.email = None;
            } else if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
                return Err(format!("Invalid email address '{}'", email));
            } else {
                user.email = Some(email.to_string());
            }
        }
        user.updated_at = chrono::Utc::now();
        Ok(())
    }
}

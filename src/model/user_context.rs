use serde::{Deserialize, Serialize};

/// Identity of the caller, extracted from request headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            user_email: None,
            user_name: None,
        }
    }

    pub fn with_details(user_id: String, email: Option<String>, name: Option<String>) -> Self {
        Self {
            user_id,
            user_email: email,
            user_name: name,
        }
    }

    /// Default learner used when no identity headers are sent (local development)
    pub fn default_user() -> Self {
        Self {
            user_id: "dev-user".to_string(),
            user_email: Some("dev@localhost".to_string()),
            user_name: Some("Development User".to_string()),
        }
    }

    /// Display name to use when provisioning a user record for this identity
    pub fn display_name(&self) -> String {
        self.user_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.user_id.clone())
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::default_user()
    }
}

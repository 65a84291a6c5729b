use serde::{Deserialize, Serialize};

/// Identity resolved from a bearer token by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub username: Option<String>,
    pub user_email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl UserContext {
    /// Create a new UserContext with just a user ID
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            username: None,
            user_email: None,
            given_name: None,
            family_name: None,
        }
    }

    pub fn with_details(
        user_id: String,
        username: Option<String>,
        email: Option<String>,
        given_name: Option<String>,
        family_name: Option<String>,
    ) -> Self {
        Self {
            user_id,
            username,
            user_email: email,
            given_name,
            family_name,
        }
    }

    /// Default user context for development with the static identity provider
    pub fn default_user() -> Self {
        Self {
            user_id: "dev-user".to_string(),
            username: Some("dev".to_string()),
            user_email: Some("dev@localhost".to_string()),
            given_name: Some("Development".to_string()),
            family_name: Some("User".to_string()),
        }
    }

    /// Human-readable name for log lines
    pub fn display_name(&self) -> String {
        match (&self.given_name, &self.family_name) {
            (Some(given), Some(family)) => format!("{} {}", given, family),
            _ => self
                .username
                .clone()
                .unwrap_or_else(|| self.user_id.clone()),
        }
    }
}

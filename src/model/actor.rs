use serde::{Deserialize, Serialize};

/// Acting user resolved by the surrounding system (gateway or session
/// layer) and handed to us in request headers. This service never
/// authenticates; it only stamps audit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

impl ActorContext {
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

    /// System actor for internal operations such as seeding
    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            user_email: None,
            user_name: Some("System".to_string()),
        }
    }

    /// Fallback actor for development and tests when no headers are present
    pub fn default_user() -> Self {
        Self {
            user_id: "dev-user".to_string(),
            user_email: Some("dev@localhost".to_string()),
            user_name: Some("Development User".to_string()),
        }
    }
}

impl Default for ActorContext {
    fn default() -> Self {
        Self::default_user()
    }
}

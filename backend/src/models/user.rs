//! User model: the author identity copied onto requests at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A registered board user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
}

/// Form body for `POST /users/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.author_name.trim().is_empty() {
            return Err(AppError::Validation("Author name is required".to_string()));
        }
        if !self.author_email.contains('@') {
            return Err(AppError::Validation(
                "A valid author email is required".to_string(),
            ));
        }
        Ok(())
    }
}

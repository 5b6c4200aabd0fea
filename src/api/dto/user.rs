//! User-related DTOs for API requests and responses.

use jiff::civil::DateTime;
use serde::{Deserialize, Serialize};

use crate::models::{Audited, User};

// ============================================================================
// Request DTOs
// ============================================================================

/// Request body for registering and for replacing a user.
///
/// Unknown fields such as a client-supplied `id` or `created_at` are ignored.
#[derive(Debug, Deserialize, Serialize)]
pub struct UserRequest {
    pub username: String,
    pub password: String,
}

impl UserRequest {
    /// Converts the request DTO into an unsaved User model.
    pub fn into_user(self) -> User {
        User::new(self.username, self.password)
    }
}

/// Request body for logging in.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Response body for user data (excludes sensitive fields like password).
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at(),
            updated_at: user.updated_at(),
            username: user.username,
        }
    }
}

/// Plain confirmation message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

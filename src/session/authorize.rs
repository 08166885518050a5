//! Authorization collaborator
//!
//! Supplies a room identifier for a lecture given a caller credential.
//! Failure here prevents setup from completing.

use async_trait::async_trait;

use crate::error::SetupError;

/// Issues room tokens for lectures
#[async_trait]
pub trait RoomAuthorizer: Send + Sync {
    /// Exchange a lecture id and caller credential for a room token
    async fn room_token(&self, lecture_id: &str, credential: &str) -> Result<String, SetupError>;
}

/// Authorizer backed by a fixed token, for tests and single-tenant use
#[derive(Debug, Clone)]
pub struct StaticAuthorizer {
    token: Option<String>,
}

impl StaticAuthorizer {
    /// Always issues the given token
    pub fn issuing(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Always denies
    pub fn denying() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl RoomAuthorizer for StaticAuthorizer {
    async fn room_token(&self, lecture_id: &str, _credential: &str) -> Result<String, SetupError> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => Err(SetupError::AuthorizationDenied(format!(
                "no room for lecture {}",
                lecture_id
            ))),
        }
    }
}

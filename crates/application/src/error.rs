use thiserror::Error;

use domain::{DomainError, RepositoryError};

use crate::broadcaster::BroadcastError;
use crate::password::PasswordHasherError;

/// 应用层错误。领域规则违例与存储错误分开携带，
/// 由上层决定各自映射到的状态码。
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error(transparent)]
    Password(#[from] PasswordHasherError),

    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl ApplicationError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }
}

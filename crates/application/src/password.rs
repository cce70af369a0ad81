//! 密码哈希抽象。bcrypt 是 CPU 密集操作，放到阻塞线程池执行。

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("password verification failed: {0}")]
    Verify(String),
}

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plain: &str) -> Result<String, PasswordHasherError>;
    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordHasherError>;
}

#[derive(Debug, Default)]
pub struct BcryptPasswordHasher;

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plain: &str) -> Result<String, PasswordHasherError> {
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| PasswordHasherError::Hash(e.to_string()))?
            .map_err(|e| PasswordHasherError::Hash(e.to_string()))
    }

    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordHasherError> {
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await
            .map_err(|e| PasswordHasherError::Verify(e.to_string()))?
            .map_err(|e| PasswordHasherError::Verify(e.to_string()))
    }
}

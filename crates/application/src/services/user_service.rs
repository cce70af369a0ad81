//! 用户注册、登录与查询。

use std::sync::Arc;

use serde::Deserialize;

use domain::{DomainError, User, UserId, UserPublic, UserRepository, Username};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::password::PasswordHasher;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self {
            user_repository: deps.user_repository,
            password_hasher: deps.password_hasher,
            clock: deps.clock,
        }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(&request.username)?;
        if request.email.trim().is_empty() || !request.email.contains('@') {
            return Err(DomainError::invalid_argument("email", "must be a valid email address").into());
        }
        if request.password.len() < 6 {
            return Err(DomainError::invalid_argument("password", "must be at least 6 characters").into());
        }

        if self
            .user_repository
            .find_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(DomainError::already_exists("user with this email").into());
        }

        let password_hash = self.password_hasher.hash(&request.password).await?;
        let user = User::register(
            UserId::generate(),
            username,
            request.email,
            password_hash,
            request.avatar,
            self.clock.now(),
        );
        Ok(self.user_repository.create(user).await?)
    }

    /// 凭据校验。邮箱不存在与密码错误返回同一个错误，避免枚举账号。
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ApplicationError> {
        let user = self
            .user_repository
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApplicationError::authentication("invalid email or password"))?;

        let valid = self
            .password_hasher
            .verify(password, &user.password_hash)
            .await?;
        if !valid {
            return Err(ApplicationError::authentication("invalid email or password"));
        }
        Ok(user)
    }

    pub async fn get(&self, user_id: UserId) -> Result<User, ApplicationError> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id).into())
    }

    pub async fn get_public(&self, user_id: UserId) -> Result<UserPublic, ApplicationError> {
        Ok(self.get(user_id).await?.public())
    }
}

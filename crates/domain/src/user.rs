use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId, Username};

/// 用户实体。
///
/// 本核心只关心在线状态字段；资料编辑等属于协作方的范畴。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing)] // 密码哈希不暴露给客户端
    pub password_hash: String,
    pub is_online: bool,
    pub last_seen: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// 允许跨越网络边界的用户公开字段投影。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: UserId,
    pub username: Username,
    pub avatar: Option<String>,
    pub is_online: bool,
    pub last_seen: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        email: String,
        password_hash: String,
        avatar: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            email,
            avatar,
            password_hash,
            is_online: false,
            last_seen: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// 在线状态切换；连接和断开都会刷新 last_seen。
    pub fn set_presence(&mut self, is_online: bool, now: Timestamp) {
        self.is_online = is_online;
        self.last_seen = now;
        self.updated_at = now;
    }

    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            avatar: self.avatar.clone(),
            is_online: self.is_online,
            last_seen: self.last_seen,
        }
    }
}

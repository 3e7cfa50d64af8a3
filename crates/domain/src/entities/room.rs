//! 房间实体定义
//!
//! 房间是由创建者显式创建的临时频道，状态只能从 Active 走向 Closed。

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{RoomId, SessionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// 房间状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// 活跃状态
    Active,
    /// 已关闭（终态）
    Closed,
}

/// 房间实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// 房间唯一ID
    pub id: RoomId,
    /// 展示名称
    pub name: String,
    /// 创建者
    pub creator_id: UserId,
    /// 房间状态
    pub status: RoomStatus,
    /// 创建时间
    pub created_at: Timestamp,
}

impl Room {
    pub const MAX_NAME_LEN: usize = 64;

    /// 创建新的活跃房间
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        creator_id: UserId,
        created_at: Timestamp,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_owned();
        Self::validate_name(&name)?;

        Ok(Self {
            id,
            name,
            creator_id,
            status: RoomStatus::Active,
            created_at,
        })
    }

    fn validate_name(name: &str) -> DomainResult<()> {
        if name.is_empty() {
            return Err(DomainError::validation_error("name", "房间名称不能为空"));
        }
        if name.chars().count() > Self::MAX_NAME_LEN {
            return Err(DomainError::validation_error(
                "name",
                format!("房间名称不能超过{}个字符", Self::MAX_NAME_LEN),
            ));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == RoomStatus::Active
    }

    pub fn is_creator(&self, user_id: &UserId) -> bool {
        &self.creator_id == user_id
    }

    /// 关闭房间，只有创建者可以执行
    pub fn close(&mut self, requester: &UserId) -> DomainResult<()> {
        if !self.is_creator(requester) {
            return Err(DomainError::permission_denied("close_room"));
        }
        if !self.is_active() {
            return Err(DomainError::business_rule_violation("房间已关闭"));
        }
        self.status = RoomStatus::Closed;
        Ok(())
    }
}

/// 房间内的一个参与者（会话 + 身份）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    pub session_id: SessionId,
    pub user_id: UserId,
}

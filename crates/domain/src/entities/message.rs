//! 消息信封定义
//!
//! 只保留路由相关字段；持久化与展示字段由外部协作方负责。

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{MessageId, RoomId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// 消息类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// 大厅消息
    Global,
    /// 公告，与大厅消息同样投递给所有会话
    Broadcast,
    /// 私聊
    Direct,
    /// 房间消息
    Room,
}

/// 客户端提交的消息草稿，尚未确定发送者与时间戳
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    #[serde(default)]
    pub id: Option<MessageId>,
    pub content: String,
    #[serde(default)]
    pub receiver_id: Option<UserId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub kind: Option<MessageKind>,
}

/// 路由用的消息信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: Option<UserId>,
    pub room_id: Option<RoomId>,
    pub content: String,
    pub timestamp: Timestamp,
    pub kind: MessageKind,
}

/// 消息的投递目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination<'a> {
    Room(RoomId),
    User(&'a UserId),
    Everyone,
}

impl MessageEnvelope {
    pub const MAX_CONTENT_LEN: usize = 4096;

    /// 由草稿构造信封，同时校验路由字段的一致性
    pub fn from_draft(
        draft: MessageDraft,
        sender_id: UserId,
        timestamp: Timestamp,
    ) -> DomainResult<Self> {
        if draft.content.trim().is_empty() {
            return Err(DomainError::validation_error("content", "消息内容为空"));
        }
        if draft.content.chars().count() > Self::MAX_CONTENT_LEN {
            return Err(DomainError::validation_error(
                "content",
                format!("消息内容过长: > {}", Self::MAX_CONTENT_LEN),
            ));
        }

        let kind = Self::resolve_kind(&draft)?;

        Ok(Self {
            id: draft.id.unwrap_or_default(),
            sender_id,
            receiver_id: draft.receiver_id,
            room_id: draft.room_id,
            content: draft.content,
            timestamp,
            kind,
        })
    }

    fn resolve_kind(draft: &MessageDraft) -> DomainResult<MessageKind> {
        let derived = match (&draft.receiver_id, &draft.room_id) {
            (Some(_), Some(_)) => {
                return Err(DomainError::validation_error(
                    "receiver_id",
                    "receiver_id 与 room_id 不能同时设置",
                ))
            }
            (None, Some(_)) => MessageKind::Room,
            (Some(_), None) => MessageKind::Direct,
            (None, None) => MessageKind::Global,
        };

        match (draft.kind, derived) {
            (None, kind) => Ok(kind),
            (Some(MessageKind::Broadcast), MessageKind::Global) => Ok(MessageKind::Broadcast),
            (Some(requested), kind) if requested == kind => Ok(kind),
            (Some(requested), _) => Err(DomainError::validation_error(
                "kind",
                format!("消息类别 {requested:?} 与投递目标不符"),
            )),
        }
    }

    pub fn destination(&self) -> Destination<'_> {
        match (&self.room_id, &self.receiver_id) {
            (Some(room_id), _) => Destination::Room(*room_id),
            (None, Some(receiver)) => Destination::User(receiver),
            (None, None) => Destination::Everyone,
        }
    }
}

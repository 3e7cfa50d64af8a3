//! WebRTC 信令实体
//!
//! 负载对中枢完全不透明，只携带路由元数据。

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{RoomId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 信令类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// 信令的投递目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTarget {
    /// 指定会话
    Session(SessionId),
    /// 房间内除发送者以外的所有会话
    Room(RoomId),
}

/// 客户端发出的信令请求
///
/// 同时携带 `target_session` 与 `room_id` 时按会话定向投递，
/// `room_id` 仅作为上下文原样转发。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    #[serde(default)]
    pub target_session: Option<SessionId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub payload: Value,
}

impl SignalRequest {
    pub fn target(&self) -> DomainResult<SignalTarget> {
        match (self.target_session, self.room_id) {
            (Some(session), _) => Ok(SignalTarget::Session(session)),
            (None, Some(room)) => Ok(SignalTarget::Room(room)),
            (None, None) => Err(DomainError::validation_error(
                "target_session",
                "信令需要 target_session 或 room_id",
            )),
        }
    }
}

/// 转发给对端的信令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedSignal {
    pub sender_session: SessionId,
    pub sender_id: UserId,
    pub room_id: Option<RoomId>,
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_target_wins_over_room() {
        let session = SessionId::new();
        let request = SignalRequest {
            target_session: Some(session),
            room_id: Some(RoomId::new()),
            payload: json!({"sdp": "v=0"}),
        };
        assert_eq!(request.target().unwrap(), SignalTarget::Session(session));
    }

    #[test]
    fn missing_target_is_rejected() {
        let request = SignalRequest {
            target_session: None,
            room_id: None,
            payload: Value::Null,
        };
        assert!(request.target().is_err());
    }
}

//! 客户端发往服务端的事件

use serde::{Deserialize, Serialize};

use crate::entities::{MessageDraft, SignalRequest};
use crate::value_objects::{RoomId, UserId};

/// 注册会话时提交的身份凭据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationClaim {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub token: Option<String>,
}

/// 入站事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    RegisterSession(RegistrationClaim),
    SendMessage(MessageDraft),
    CreateRoom { name: String },
    JoinRoom { room_id: RoomId },
    LeaveRoom { room_id: RoomId },
    CloseRoom { room_id: RoomId },
    ListRooms,
    SignalOffer(SignalRequest),
    SignalAnswer(SignalRequest),
    SignalCandidate(SignalRequest),
    Ping { timestamp: i64 },
}

impl ClientEvent {
    /// 事件名称，用于日志
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RegisterSession(_) => "register_session",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::CreateRoom { .. } => "create_room",
            ClientEvent::JoinRoom { .. } => "join_room",
            ClientEvent::LeaveRoom { .. } => "leave_room",
            ClientEvent::CloseRoom { .. } => "close_room",
            ClientEvent::ListRooms => "list_rooms",
            ClientEvent::SignalOffer(_) => "signal_offer",
            ClientEvent::SignalAnswer(_) => "signal_answer",
            ClientEvent::SignalCandidate(_) => "signal_candidate",
            ClientEvent::Ping { .. } => "ping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_events() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "register_session",
            "data": {"user_id": "alice"}
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::RegisterSession(RegistrationClaim {
                user_id: Some(UserId::parse("alice").unwrap()),
                token: None,
            })
        );

        let event: ClientEvent = serde_json::from_value(json!({"event": "list_rooms"})).unwrap();
        assert_eq!(event, ClientEvent::ListRooms);

        let event: ClientEvent = serde_json::from_value(json!({
            "event": "send_message",
            "data": {"content": "hi"}
        }))
        .unwrap();
        assert_eq!(event.name(), "send_message");
    }

    #[test]
    fn parses_signal_events() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "signal_candidate",
            "data": {"room_id": "6f1c1c4e-6a4e-4b55-9d2a-4ad1f2b0f5e1", "payload": {"candidate": "c"}}
        }))
        .unwrap();
        match event {
            ClientEvent::SignalCandidate(request) => {
                assert!(request.room_id.is_some());
                assert!(request.target_session.is_none());
                assert_eq!(request.payload, json!({"candidate": "c"}));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_event() {
        let result = serde_json::from_value::<ClientEvent>(json!({"event": "teleport"}));
        assert!(result.is_err());
    }
}

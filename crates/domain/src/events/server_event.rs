//! 服务端推送给客户端的事件

use serde::{Deserialize, Serialize};

use crate::entities::{
    MessageEnvelope, MetricSnapshot, PresenceEntry, RelayedSignal, Room, RoomMember, SignalKind,
};
use crate::value_objects::{RoomId, SessionId, UserId};

/// 出站事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 连接建立后告知客户端自己的会话ID
    Connected { session_id: SessionId },
    /// 完整花名册
    UserStatusUpdate { roster: Vec<PresenceEntry> },
    ReceiveMessage(MessageEnvelope),
    RoomCreated(Room),
    /// 大厅列表更新：房间已关闭
    RoomClosed { room_id: RoomId },
    /// 加入成功，附带当前成员
    RoomJoined {
        room_id: RoomId,
        members: Vec<RoomMember>,
    },
    RoomLeft { room_id: RoomId },
    UserJoinedRoom {
        room_id: RoomId,
        session_id: SessionId,
        user_id: UserId,
    },
    UserLeftRoom {
        room_id: RoomId,
        session_id: SessionId,
        user_id: UserId,
    },
    /// 房间被创建者关闭，成员被强制离开
    RoomDestroyed { room_id: RoomId },
    RoomList { rooms: Vec<Room> },
    SignalOffer(RelayedSignal),
    SignalAnswer(RelayedSignal),
    SignalCandidate(RelayedSignal),
    ServerStats(MetricSnapshot),
    Pong { timestamp: i64 },
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn signal(kind: SignalKind, signal: RelayedSignal) -> Self {
        match kind {
            SignalKind::Offer => ServerEvent::SignalOffer(signal),
            SignalKind::Answer => ServerEvent::SignalAnswer(signal),
            SignalKind::Candidate => ServerEvent::SignalCandidate(signal),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

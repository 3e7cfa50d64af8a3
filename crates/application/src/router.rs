//! 频道路由
//!
//! 根据信封的投递目标计算应当收到消息的会话集合：
//! 1. 房间消息：房间内所有会话，包括发送者；
//! 2. 私聊：接收者的所有会话（可选回显给发送者的其它会话）；
//! 3. 其余：所有已连接会话。
//!
//! 投递即发即忘，稍后才连接的会话不会补收。

use std::collections::BTreeSet;

use domain::{Destination, MessageEnvelope, SessionId};

use crate::registry::ConnectionRegistry;
use crate::rooms::RoomManager;

#[derive(Debug, Clone, Default)]
pub struct ChannelRouter {
    echo_direct_to_sender: bool,
}

impl ChannelRouter {
    pub fn new(echo_direct_to_sender: bool) -> Self {
        Self {
            echo_direct_to_sender,
        }
    }

    pub fn route(
        &self,
        envelope: &MessageEnvelope,
        origin: SessionId,
        registry: &ConnectionRegistry,
        rooms: &RoomManager,
    ) -> BTreeSet<SessionId> {
        match envelope.destination() {
            Destination::Room(room_id) => rooms.members(room_id).into_iter().collect(),
            Destination::User(receiver) => {
                let mut targets: BTreeSet<SessionId> =
                    registry.sessions_for(receiver).into_iter().collect();
                if self.echo_direct_to_sender && receiver != &envelope.sender_id {
                    targets.extend(
                        registry
                            .sessions_for(&envelope.sender_id)
                            .into_iter()
                            .filter(|session| *session != origin),
                    );
                }
                targets
            }
            Destination::Everyone => registry.connected_sessions().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{MessageDraft, RoomId, UserId};

    fn user(name: &str) -> UserId {
        UserId::parse(name).unwrap()
    }

    fn envelope(sender: &str, receiver: Option<&str>, room_id: Option<RoomId>) -> MessageEnvelope {
        MessageEnvelope::from_draft(
            MessageDraft {
                id: None,
                content: "hello".into(),
                receiver_id: receiver.map(user),
                room_id,
                kind: None,
            },
            user(sender),
            Utc::now(),
        )
        .unwrap()
    }

    struct Fixture {
        registry: ConnectionRegistry,
        rooms: RoomManager,
        alice_phone: SessionId,
        alice_laptop: SessionId,
        bob: SessionId,
        carol: SessionId,
        lurker: SessionId,
    }

    fn fixture() -> Fixture {
        let mut registry = ConnectionRegistry::new();
        let (alice_phone, alice_laptop, bob, carol, lurker) = (
            SessionId::new(),
            SessionId::new(),
            SessionId::new(),
            SessionId::new(),
            SessionId::new(),
        );
        registry.register(alice_phone, user("alice"));
        registry.register(alice_laptop, user("alice"));
        registry.register(bob, user("bob"));
        registry.register(carol, user("carol"));
        registry.connect(lurker);

        Fixture {
            registry,
            rooms: RoomManager::new(),
            alice_phone,
            alice_laptop,
            bob,
            carol,
            lurker,
        }
    }

    #[test]
    fn global_reaches_every_connected_session() {
        let f = fixture();
        let targets = ChannelRouter::default().route(
            &envelope("alice", None, None),
            f.alice_phone,
            &f.registry,
            &f.rooms,
        );
        assert_eq!(targets.len(), 5);
        assert!(targets.contains(&f.lurker));
    }

    #[test]
    fn direct_reaches_only_receiver() {
        let f = fixture();
        let targets = ChannelRouter::default().route(
            &envelope("bob", Some("alice"), None),
            f.bob,
            &f.registry,
            &f.rooms,
        );
        assert_eq!(targets, BTreeSet::from([f.alice_phone, f.alice_laptop]));
        assert!(!targets.contains(&f.carol));
        assert!(!targets.contains(&f.bob));
    }

    #[test]
    fn direct_echo_skips_origin_session() {
        let f = fixture();
        let targets = ChannelRouter::new(true).route(
            &envelope("alice", Some("bob"), None),
            f.alice_phone,
            &f.registry,
            &f.rooms,
        );
        assert_eq!(targets, BTreeSet::from([f.bob, f.alice_laptop]));
    }

    #[test]
    fn direct_to_offline_user_is_empty() {
        let f = fixture();
        let targets = ChannelRouter::default().route(
            &envelope("alice", Some("dave"), None),
            f.alice_phone,
            &f.registry,
            &f.rooms,
        );
        assert!(targets.is_empty());
    }

    #[test]
    fn unknown_room_is_empty() {
        let f = fixture();
        let targets = ChannelRouter::default().route(
            &envelope("alice", None, Some(RoomId::new())),
            f.alice_phone,
            &f.registry,
            &f.rooms,
        );
        assert!(targets.is_empty());
    }
}

//! 信令中继
//!
//! 纯转发：offer / answer / candidate 的负载原样送达目标会话，或送达房间内
//! 除发送者以外的所有成员。负载对中枢不透明，不做任何解析。
//!
//! 带房间上下文的信令要求发送者（以及定向时的目标）仍是该房间成员，
//! 被逐出的旧会话因此无法继续与对端协商，避免出现“幽灵”连接。

use domain::{RelayedSignal, ServerEvent, SessionId, SignalKind, SignalRequest, SignalTarget, UserId};

use crate::dispatch::Dispatch;
use crate::error::ApplicationError;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomManager;

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalingRelay;

impl SignalingRelay {
    /// 目标不存在时返回 `Ok(None)`
    pub fn relay(
        &self,
        kind: SignalKind,
        sender_session: SessionId,
        sender_id: &UserId,
        request: SignalRequest,
        registry: &ConnectionRegistry,
        rooms: &RoomManager,
    ) -> Result<Option<Dispatch>, ApplicationError> {
        let target = request.target()?;

        if let Some(room_id) = request.room_id {
            if !rooms.is_member(sender_session, room_id) {
                tracing::debug!(
                    session_id = %sender_session,
                    room_id = %room_id,
                    "发送者不在房间内，丢弃信令"
                );
                return Ok(None);
            }
        }

        let targets: Vec<SessionId> = match target {
            SignalTarget::Session(target) => {
                if target == sender_session || !registry.is_connected(target) {
                    return Ok(None);
                }
                if let Some(room_id) = request.room_id {
                    if !rooms.is_member(target, room_id) {
                        return Ok(None);
                    }
                }
                vec![target]
            }
            SignalTarget::Room(room_id) => rooms
                .members(room_id)
                .into_iter()
                .filter(|member| *member != sender_session)
                .collect(),
        };

        if targets.is_empty() {
            return Ok(None);
        }

        tracing::debug!(
            session_id = %sender_session,
            kind = ?kind,
            targets = targets.len(),
            "转发信令"
        );

        let signal = RelayedSignal {
            sender_session,
            sender_id: sender_id.clone(),
            room_id: request.room_id,
            payload: request.payload,
        };
        Ok(Some(Dispatch::to_many(
            targets,
            ServerEvent::signal(kind, signal),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{Room, RoomId};
    use serde_json::json;

    fn user(name: &str) -> UserId {
        UserId::parse(name).unwrap()
    }

    struct Fixture {
        registry: ConnectionRegistry,
        rooms: RoomManager,
        room_id: RoomId,
        alice: SessionId,
        bob: SessionId,
        carol: SessionId,
        outsider: SessionId,
    }

    fn fixture() -> Fixture {
        let mut registry = ConnectionRegistry::new();
        let mut rooms = RoomManager::new();
        let [alice, bob, carol, outsider] = [(); 4].map(|_| SessionId::new());
        registry.register(alice, user("alice"));
        registry.register(bob, user("bob"));
        registry.register(carol, user("carol"));
        registry.register(outsider, user("dave"));

        let room = Room::new(RoomId::new(), "call", user("alice"), Utc::now()).unwrap();
        let room_id = room.id;
        rooms.create(room, &registry);
        for session in [alice, bob, carol] {
            rooms.join(session, room_id, &registry);
        }

        Fixture {
            registry,
            rooms,
            room_id,
            alice,
            bob,
            carol,
            outsider,
        }
    }

    #[test]
    fn room_signal_excludes_sender() {
        let f = fixture();
        let request = SignalRequest {
            target_session: None,
            room_id: Some(f.room_id),
            payload: json!({"candidate": "a=1"}),
        };

        let dispatch = SignalingRelay
            .relay(
                SignalKind::Candidate,
                f.alice,
                &user("alice"),
                request,
                &f.registry,
                &f.rooms,
            )
            .unwrap()
            .unwrap();

        let mut expected = vec![f.bob, f.carol];
        expected.sort();
        assert_eq!(dispatch.targets, expected);
        match dispatch.event {
            ServerEvent::SignalCandidate(signal) => {
                assert_eq!(signal.sender_session, f.alice);
                assert_eq!(signal.payload, json!({"candidate": "a=1"}));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn session_signal_is_forwarded_unmodified() {
        let f = fixture();
        let payload = json!({"type": "offer", "sdp": "v=0\r\n"});
        let request = SignalRequest {
            target_session: Some(f.bob),
            room_id: Some(f.room_id),
            payload: payload.clone(),
        };

        let dispatch = SignalingRelay
            .relay(
                SignalKind::Offer,
                f.alice,
                &user("alice"),
                request,
                &f.registry,
                &f.rooms,
            )
            .unwrap()
            .unwrap();

        assert_eq!(dispatch.targets, vec![f.bob]);
        assert_eq!(
            dispatch.event,
            ServerEvent::SignalOffer(RelayedSignal {
                sender_session: f.alice,
                sender_id: user("alice"),
                room_id: Some(f.room_id),
                payload,
            })
        );
    }

    #[test]
    fn unknown_or_foreign_targets_are_dropped() {
        let f = fixture();
        let relay = |sender: SessionId,
                     target_session: Option<SessionId>,
                     room_id: Option<RoomId>| {
            SignalingRelay
                .relay(
                    SignalKind::Answer,
                    sender,
                    &user("x"),
                    SignalRequest {
                        target_session,
                        room_id,
                        payload: json!({}),
                    },
                    &f.registry,
                    &f.rooms,
                )
                .unwrap()
        };

        // 已断开的会话
        assert!(relay(f.alice, Some(SessionId::new()), None).is_none());
        // 发给自己
        assert!(relay(f.alice, Some(f.alice), None).is_none());
        // 房间外的发送者
        assert!(relay(f.outsider, None, Some(f.room_id)).is_none());
        // 房间上下文下目标不在房间
        assert!(relay(f.alice, Some(f.outsider), Some(f.room_id)).is_none());
        // 不带房间上下文的定向信令不检查成员身份
        assert!(relay(f.outsider, Some(f.alice), None).is_some());
    }

    #[test]
    fn missing_target_is_malformed() {
        let f = fixture();
        let result = SignalingRelay.relay(
            SignalKind::Offer,
            f.alice,
            &user("alice"),
            SignalRequest {
                target_session: None,
                room_id: None,
                payload: json!({}),
            },
            &f.registry,
            &f.rooms,
        );
        assert!(matches!(result, Err(ApplicationError::Domain(_))));
    }
}

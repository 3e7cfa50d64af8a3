//! 实时中枢
//!
//! 把注册表、在线状态、路由、房间、信令与指标组合成一个拥有所有可变状态的
//! 结构体。所有操作都是 `&mut self` 的同步调用，不做内部加锁，也不在内部
//! 等待 I/O；调用方负责把它放在单一的串行化点（例如一个独占的任务）上。
//! 每个操作返回零个或多个 [`Dispatch`]，由调用方投递到对应会话。

use std::sync::Arc;

use config::{DedupScope, HubConfig};
use domain::{
    ClientEvent, MessageDraft, MessageEnvelope, MetricSnapshot, PresenceEntry,
    RegistrationClaim, Room, RoomId, ServerEvent, SessionId, SignalKind, SignalRequest, UserId,
};

use crate::archive::MessageArchive;
use crate::clock::Clock;
use crate::dispatch::Dispatch;
use crate::error::ApplicationError;
use crate::identity::IdentityVerifier;
use crate::metrics::MetricsSampler;
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomManager;
use crate::router::ChannelRouter;
use crate::signaling::SignalingRelay;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubSettings {
    pub echo_direct_to_sender: bool,
    pub reconnect_dedup: DedupScope,
}

impl From<&HubConfig> for HubSettings {
    fn from(config: &HubConfig) -> Self {
        Self {
            echo_direct_to_sender: config.echo_direct_to_sender,
            reconnect_dedup: config.reconnect_dedup,
        }
    }
}

/// 中枢依赖的外部协作方
pub struct HubDependencies {
    pub clock: Arc<dyn Clock>,
    pub archive: Arc<dyn MessageArchive>,
    pub identity: Arc<dyn IdentityVerifier>,
}

pub struct Hub {
    registry: ConnectionRegistry,
    presence: PresenceTracker,
    rooms: RoomManager,
    router: ChannelRouter,
    relay: SignalingRelay,
    sampler: MetricsSampler,
    settings: HubSettings,
    clock: Arc<dyn Clock>,
    archive: Arc<dyn MessageArchive>,
    identity: Arc<dyn IdentityVerifier>,
}

impl Hub {
    pub fn new(settings: HubSettings, deps: HubDependencies) -> Self {
        let HubDependencies {
            clock,
            archive,
            identity,
        } = deps;

        Self {
            registry: ConnectionRegistry::new(),
            presence: PresenceTracker::new(),
            rooms: RoomManager::new(),
            router: ChannelRouter::new(settings.echo_direct_to_sender),
            relay: SignalingRelay,
            sampler: MetricsSampler::new(clock.now()),
            settings,
            clock,
            archive,
            identity,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn settings(&self) -> HubSettings {
        self.settings
    }

    /// 传输层连接建立
    pub fn connect(&mut self, session: SessionId) -> Vec<Dispatch> {
        if !self.registry.connect(session) {
            return Vec::new();
        }
        tracing::info!(session_id = %session, "会话已连接");
        vec![Dispatch::to(
            session,
            ServerEvent::Connected {
                session_id: session,
            },
        )]
    }

    /// 传输层连接断开，同步级联到房间、注册表与在线状态
    pub fn disconnect(&mut self, session: SessionId) -> Vec<Dispatch> {
        let mut dispatches = self.rooms.evict_session(session, &self.registry);

        let Some(unregistered) = self.registry.unregister(session) else {
            return compact(dispatches);
        };
        tracing::info!(
            session_id = %session,
            user_id = ?unregistered.user_id,
            "会话已断开"
        );

        let transitions: Vec<_> = unregistered.transition.into_iter().collect();
        if self.presence.apply(&transitions) {
            dispatches.push(self.roster_broadcast());
        }
        compact(dispatches)
    }

    /// 处理一个入站事件；被拒绝的请求转换为仅发给请求者的 `error` 事件
    pub fn handle_or_reject(&mut self, session: SessionId, event: ClientEvent) -> Vec<Dispatch> {
        let name = event.name();
        match self.handle(session, event) {
            Ok(dispatches) => dispatches,
            Err(err) => {
                tracing::warn!(session_id = %session, event = name, error = %err, "请求被拒绝");
                vec![Self::rejection(session, &err)]
            }
        }
    }

    pub fn rejection(session: SessionId, err: &ApplicationError) -> Dispatch {
        Dispatch::to(session, ServerEvent::error(err.code(), err.to_string()))
    }

    pub fn handle(
        &mut self,
        session: SessionId,
        event: ClientEvent,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        match event {
            ClientEvent::RegisterSession(claim) => self.register(session, &claim),
            ClientEvent::SendMessage(draft) => self.send_message(session, draft),
            ClientEvent::CreateRoom { name } => self.create_room(session, name),
            ClientEvent::JoinRoom { room_id } => self.join_room(session, room_id),
            ClientEvent::LeaveRoom { room_id } => self.leave_room(session, room_id),
            ClientEvent::CloseRoom { room_id } => self.close_room(session, room_id),
            ClientEvent::ListRooms => Ok(vec![Dispatch::to(
                session,
                ServerEvent::RoomList {
                    rooms: self.list_rooms(),
                },
            )]),
            ClientEvent::Ping { timestamp } => {
                Ok(vec![Dispatch::to(session, ServerEvent::Pong { timestamp })])
            }
            ClientEvent::SignalOffer(request) => {
                self.relay_signal(session, SignalKind::Offer, request)
            }
            ClientEvent::SignalAnswer(request) => {
                self.relay_signal(session, SignalKind::Answer, request)
            }
            ClientEvent::SignalCandidate(request) => {
                self.relay_signal(session, SignalKind::Candidate, request)
            }
        }
    }

    pub fn register(
        &mut self,
        session: SessionId,
        claim: &RegistrationClaim,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        let user_id = self.identity.resolve(claim)?;
        let mut dispatches = Vec::new();

        match self.registry.user_of(session) {
            Some(current) if current == &user_id => {
                return Ok(vec![self.roster_to(session)]);
            }
            Some(_) => {
                // 换身份等价于先离开所有房间
                dispatches.extend(self.rooms.evict_session(session, &self.registry));
            }
            None => {}
        }

        let transitions = self.registry.register(session, user_id.clone());
        tracing::info!(session_id = %session, user_id = %user_id, "会话已注册");

        if self.settings.reconnect_dedup == DedupScope::Global {
            dispatches.extend(
                self.rooms
                    .evict_other_sessions(&user_id, session, &self.registry),
            );
        }

        if self.presence.apply(&transitions) {
            dispatches.push(self.roster_broadcast());
        } else {
            dispatches.push(self.roster_to(session));
        }
        Ok(compact(dispatches))
    }

    pub fn send_message(
        &mut self,
        session: SessionId,
        draft: MessageDraft,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        let sender_id = self.require_user(session)?;
        let envelope = MessageEnvelope::from_draft(draft, sender_id, self.clock.now())?;

        let targets = self
            .router
            .route(&envelope, session, &self.registry, &self.rooms);
        self.sampler.record_routed();

        tracing::debug!(
            session_id = %session,
            message_id = %envelope.id,
            kind = ?envelope.kind,
            targets = targets.len(),
            "消息已路由"
        );

        let dispatch = Dispatch::to_many(targets, ServerEvent::ReceiveMessage(envelope.clone()));
        self.archive.archive(&envelope);
        Ok(compact(vec![dispatch]))
    }

    pub fn create_room(
        &mut self,
        session: SessionId,
        name: String,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        let creator_id = self.require_user(session)?;
        let room = Room::new(RoomId::new(), name, creator_id, self.clock.now())?;
        Ok(compact(vec![self.rooms.create(room, &self.registry)]))
    }

    pub fn join_room(
        &mut self,
        session: SessionId,
        room_id: RoomId,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        self.require_user(session)?;
        Ok(compact(self.rooms.join(session, room_id, &self.registry)))
    }

    pub fn leave_room(
        &mut self,
        session: SessionId,
        room_id: RoomId,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        self.require_user(session)?;
        Ok(compact(self.rooms.leave(session, room_id, &self.registry)))
    }

    pub fn close_room(
        &mut self,
        session: SessionId,
        room_id: RoomId,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        let requester = self.require_user(session)?;
        let dispatches = self.rooms.close(room_id, &requester, &self.registry)?;
        Ok(compact(dispatches))
    }

    pub fn relay_signal(
        &mut self,
        session: SessionId,
        kind: SignalKind,
        request: SignalRequest,
    ) -> Result<Vec<Dispatch>, ApplicationError> {
        let sender_id = self.require_user(session)?;
        let dispatch = self.relay.relay(
            kind,
            session,
            &sender_id,
            request,
            &self.registry,
            &self.rooms,
        )?;
        Ok(dispatch.into_iter().collect())
    }

    pub fn list_rooms(&self) -> Vec<Room> {
        self.rooms.active_rooms()
    }

    pub fn roster(&self) -> Vec<PresenceEntry> {
        self.presence.roster(&self.registry)
    }

    /// 发布定时器触发：采样并发给所有已连接会话
    pub fn publish_stats(&mut self) -> Vec<Dispatch> {
        let snapshot = self.sampler.sample(
            self.clock.now(),
            self.registry.session_count(),
            self.registry.online_user_count(),
        );
        tracing::debug!(
            throughput = snapshot.throughput,
            window_ms = snapshot.window_ms,
            total_routed = self.sampler.total_routed(),
            "发布指标快照"
        );
        compact(vec![Dispatch::to_many(
            self.registry.connected_sessions(),
            ServerEvent::ServerStats(snapshot),
        )])
    }

    /// 清零定时器触发
    pub fn reset_throughput_window(&mut self) {
        self.sampler.reset_window(self.clock.now());
    }

    pub fn latest_stats(&self) -> Option<MetricSnapshot> {
        self.sampler.latest().cloned()
    }

    fn require_user(&self, session: SessionId) -> Result<UserId, ApplicationError> {
        self.registry
            .user_of(session)
            .cloned()
            .ok_or(ApplicationError::NotRegistered(session))
    }

    fn roster_broadcast(&self) -> Dispatch {
        Dispatch::to_many(
            self.registry.connected_sessions(),
            ServerEvent::UserStatusUpdate {
                roster: self.roster(),
            },
        )
    }

    fn roster_to(&self, session: SessionId) -> Dispatch {
        Dispatch::to(
            session,
            ServerEvent::UserStatusUpdate {
                roster: self.roster(),
            },
        )
    }
}

fn compact(dispatches: Vec<Dispatch>) -> Vec<Dispatch> {
    dispatches
        .into_iter()
        .filter(|dispatch| !dispatch.is_empty())
        .collect()
}

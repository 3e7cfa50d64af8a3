//! 房间成员管理
//!
//! 房间状态机：`Active → Closed`（终态，不可重开）。房间对大厅全局可见，
//! 创建与关闭会通知所有已连接会话；成员变化只通知房间内的其它成员。
//! 成员身份通过注册表解析为用户ID，方便对端展示名称。

use std::collections::{BTreeSet, HashMap, HashSet};

use domain::{DomainError, Room, RoomId, RoomMember, ServerEvent, SessionId, UserId};

use crate::dispatch::Dispatch;
use crate::registry::ConnectionRegistry;

#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: HashMap<RoomId, Room>,
    /// 房间 → 成员会话
    members: HashMap<RoomId, BTreeSet<SessionId>>,
    /// 会话 → 已加入的房间
    memberships: HashMap<SessionId, HashSet<RoomId>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记新房间，并向大厅内所有会话发布 `room_created`
    pub fn create(&mut self, room: Room, registry: &ConnectionRegistry) -> Dispatch {
        tracing::info!(room_id = %room.id, creator_id = %room.creator_id, name = %room.name, "房间已创建");

        let dispatch = Dispatch::to_many(
            registry.connected_sessions(),
            ServerEvent::RoomCreated(room.clone()),
        );
        self.members.insert(room.id, BTreeSet::new());
        self.rooms.insert(room.id, room);
        dispatch
    }

    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    /// 仍然活跃的房间，按创建时间排序
    pub fn active_rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .rooms
            .values()
            .filter(|room| room.is_active())
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rooms
    }

    pub fn members(&self, room_id: RoomId) -> Vec<SessionId> {
        self.members
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, session: SessionId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .memberships
            .get(&session)
            .map(|rooms| rooms.iter().copied().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn is_member(&self, session: SessionId, room_id: RoomId) -> bool {
        self.members
            .get(&room_id)
            .is_some_and(|members| members.contains(&session))
    }

    /// 加入房间
    ///
    /// 房间不存在或已关闭时为空操作。若同一用户已有另一个会话在房间内
    /// （例如刷新页面后旧连接尚未断开），先把旧会话逐出，再完成加入，
    /// 这样对端只会收到一次 `user_joined_room`。
    pub fn join(
        &mut self,
        session: SessionId,
        room_id: RoomId,
        registry: &ConnectionRegistry,
    ) -> Vec<Dispatch> {
        let Some(room) = self.rooms.get(&room_id) else {
            tracing::debug!(session_id = %session, room_id = %room_id, "加入不存在的房间，忽略");
            return Vec::new();
        };
        if !room.is_active() {
            tracing::debug!(session_id = %session, room_id = %room_id, "房间已关闭，忽略加入请求");
            return Vec::new();
        }
        let Some(user_id) = registry.user_of(session).cloned() else {
            return Vec::new();
        };
        if self.is_member(session, room_id) {
            return Vec::new();
        }

        let mut dispatches = Vec::new();

        let stale: Vec<SessionId> = self
            .members(room_id)
            .into_iter()
            .filter(|member| registry.user_of(*member) == Some(&user_id))
            .collect();
        for stale_session in stale {
            tracing::info!(
                room_id = %room_id,
                user_id = %user_id,
                stale_session = %stale_session,
                session_id = %session,
                "同一用户重复加入，逐出旧会话"
            );
            dispatches.extend(self.remove_member(stale_session, room_id, &user_id));
        }

        let peers = self.members(room_id);
        let members = peers
            .iter()
            .filter_map(|peer| {
                registry.user_of(*peer).map(|user_id| RoomMember {
                    session_id: *peer,
                    user_id: user_id.clone(),
                })
            })
            .collect();

        self.members.entry(room_id).or_default().insert(session);
        self.memberships.entry(session).or_default().insert(room_id);

        dispatches.push(Dispatch::to_many(
            peers,
            ServerEvent::UserJoinedRoom {
                room_id,
                session_id: session,
                user_id: user_id.clone(),
            },
        ));
        dispatches.push(Dispatch::to(
            session,
            ServerEvent::RoomJoined { room_id, members },
        ));

        tracing::info!(session_id = %session, user_id = %user_id, room_id = %room_id, "会话加入房间");
        dispatches
    }

    /// 离开房间，不是成员时为空操作
    pub fn leave(
        &mut self,
        session: SessionId,
        room_id: RoomId,
        registry: &ConnectionRegistry,
    ) -> Vec<Dispatch> {
        if !self.is_member(session, room_id) {
            return Vec::new();
        }
        let Some(user_id) = registry.user_of(session).cloned() else {
            self.detach(session, room_id);
            return Vec::new();
        };

        let mut dispatches = self.remove_member(session, room_id, &user_id);
        dispatches.push(Dispatch::to(session, ServerEvent::RoomLeft { room_id }));

        tracing::info!(session_id = %session, user_id = %user_id, room_id = %room_id, "会话离开房间");
        dispatches
    }

    /// 断开级联：等价于对会话加入的每个房间调用一次 leave，
    /// 但不再向已断开的会话发送确认。必须在注册表注销之前调用。
    pub fn evict_session(
        &mut self,
        session: SessionId,
        registry: &ConnectionRegistry,
    ) -> Vec<Dispatch> {
        let user_id = registry.user_of(session).cloned();
        let mut dispatches = Vec::new();

        for room_id in self.rooms_of(session) {
            match &user_id {
                Some(user_id) => dispatches.extend(self.remove_member(session, room_id, user_id)),
                None => self.detach(session, room_id),
            }
        }
        self.memberships.remove(&session);
        dispatches
    }

    /// 把某个用户除 `keep` 以外的会话从所有房间逐出
    pub fn evict_other_sessions(
        &mut self,
        user_id: &UserId,
        keep: SessionId,
        registry: &ConnectionRegistry,
    ) -> Vec<Dispatch> {
        let mut stale: Vec<SessionId> = registry
            .sessions_for(user_id)
            .into_iter()
            .filter(|session| *session != keep && self.memberships.contains_key(session))
            .collect();
        stale.sort();

        let mut dispatches = Vec::new();
        for session in stale {
            tracing::info!(user_id = %user_id, stale_session = %session, "重新注册，逐出旧会话的房间成员身份");
            dispatches.extend(self.evict_session(session, registry));
        }
        dispatches
    }

    /// 关闭房间
    ///
    /// 只有创建者可以关闭；房间不存在或已关闭时返回空。成功后逐出所有成员，
    /// 向被逐出的成员发送 `room_destroyed`，并向所有已连接会话发送 `room_closed`。
    /// 关闭后的房间不再保留，之后对同一ID的加入与关闭都是空操作。
    pub fn close(
        &mut self,
        room_id: RoomId,
        requester: &UserId,
        registry: &ConnectionRegistry,
    ) -> Result<Vec<Dispatch>, DomainError> {
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Ok(Vec::new());
        };
        if !room.is_active() {
            return Ok(Vec::new());
        }
        room.close(requester)?;
        self.rooms.remove(&room_id);

        let evicted = self.members.remove(&room_id).unwrap_or_default();
        for session in &evicted {
            if let Some(rooms) = self.memberships.get_mut(session) {
                rooms.remove(&room_id);
                if rooms.is_empty() {
                    self.memberships.remove(session);
                }
            }
        }

        tracing::info!(room_id = %room_id, requester = %requester, evicted = evicted.len(), "房间已关闭");

        Ok(vec![
            Dispatch::to_many(evicted, ServerEvent::RoomDestroyed { room_id }),
            Dispatch::to_many(
                registry.connected_sessions(),
                ServerEvent::RoomClosed { room_id },
            ),
        ])
    }

    /// 移除成员并通知剩余成员
    fn remove_member(
        &mut self,
        session: SessionId,
        room_id: RoomId,
        user_id: &UserId,
    ) -> Vec<Dispatch> {
        self.detach(session, room_id);
        vec![Dispatch::to_many(
            self.members(room_id),
            ServerEvent::UserLeftRoom {
                room_id,
                session_id: session,
                user_id: user_id.clone(),
            },
        )]
    }

    fn detach(&mut self, session: SessionId, room_id: RoomId) {
        if let Some(members) = self.members.get_mut(&room_id) {
            members.remove(&session);
        }
        if let Some(rooms) = self.memberships.get_mut(&session) {
            rooms.remove(&room_id);
            if rooms.is_empty() {
                self.memberships.remove(&session);
            }
        }
    }
}

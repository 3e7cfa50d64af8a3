//! 连接注册表
//!
//! 维护 会话 → 用户 的映射以及每个用户的会话集合。一个用户可以同时
//! 持有多个会话（多设备），只要至少有一个会话映射到该用户，它就是在线的。
//! 所有操作都不会失败，未知输入退化为空操作。

use std::collections::{HashMap, HashSet};

use domain::{SessionId, UserId};

/// 注册表占用变化引起的在线状态迁移
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceTransition {
    CameOnline(UserId),
    WentOffline(UserId),
}

/// 注销一个会话的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregistered {
    /// 会话原本绑定的用户（未注册的会话为 None）
    pub user_id: Option<UserId>,
    pub transition: Option<PresenceTransition>,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<SessionId, Option<UserId>>,
    user_sessions: HashMap<UserId, HashSet<SessionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 传输层连接建立，登记一个尚未绑定用户的会话
    pub fn connect(&mut self, session: SessionId) -> bool {
        if self.sessions.contains_key(&session) {
            return false;
        }
        self.sessions.insert(session, None);
        true
    }

    /// 将会话绑定到用户；对同一会话重复注册会更新映射
    pub fn register(&mut self, session: SessionId, user_id: UserId) -> Vec<PresenceTransition> {
        let mut transitions = Vec::new();

        let previous = self.sessions.insert(session, Some(user_id.clone())).flatten();
        match previous {
            Some(ref old) if old == &user_id => return transitions,
            Some(old) => {
                if let Some(transition) = self.detach(session, old) {
                    transitions.push(transition);
                }
            }
            None => {}
        }

        let sessions = self.user_sessions.entry(user_id.clone()).or_default();
        let was_offline = sessions.is_empty();
        sessions.insert(session);
        if was_offline {
            transitions.push(PresenceTransition::CameOnline(user_id));
        }

        transitions
    }

    /// 移除会话；未知会话返回 None
    pub fn unregister(&mut self, session: SessionId) -> Option<Unregistered> {
        let user_id = self.sessions.remove(&session)?;
        let transition = user_id
            .clone()
            .and_then(|user_id| self.detach(session, user_id));

        Some(Unregistered {
            user_id,
            transition,
        })
    }

    /// 从用户的会话集合中摘除会话，集合为空时用户下线
    fn detach(&mut self, session: SessionId, user_id: UserId) -> Option<PresenceTransition> {
        let sessions = self.user_sessions.get_mut(&user_id)?;
        sessions.remove(&session);
        if sessions.is_empty() {
            self.user_sessions.remove(&user_id);
            Some(PresenceTransition::WentOffline(user_id))
        } else {
            None
        }
    }

    pub fn user_of(&self, session: SessionId) -> Option<&UserId> {
        self.sessions.get(&session).and_then(Option::as_ref)
    }

    pub fn sessions_for(&self, user_id: &UserId) -> HashSet<SessionId> {
        self.user_sessions.get(user_id).cloned().unwrap_or_default()
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.user_sessions
            .get(user_id)
            .is_some_and(|sessions| !sessions.is_empty())
    }

    pub fn is_connected(&self, session: SessionId) -> bool {
        self.sessions.contains_key(&session)
    }

    pub fn connected_sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn online_user_count(&self) -> usize {
        self.user_sessions.len()
    }
}

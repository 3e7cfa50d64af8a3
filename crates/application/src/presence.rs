//! 在线状态跟踪
//!
//! 把注册表的占用迁移转换为完整花名册。任何用户状态翻转时都向所有
//! 已连接会话广播整份花名册，而不是增量，规模在几十个并发用户以内。

use std::collections::BTreeSet;

use domain::{PresenceEntry, PresenceStatus, UserId};

use crate::registry::{ConnectionRegistry, PresenceTransition};

#[derive(Debug, Default)]
pub struct PresenceTracker {
    /// 本中枢生命周期内出现过的所有用户
    known_users: BTreeSet<UserId>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录迁移，返回是否需要广播花名册
    pub fn apply(&mut self, transitions: &[PresenceTransition]) -> bool {
        for transition in transitions {
            match transition {
                PresenceTransition::CameOnline(user_id) => {
                    tracing::info!(user_id = %user_id, "用户上线");
                    self.known_users.insert(user_id.clone());
                }
                PresenceTransition::WentOffline(user_id) => {
                    tracing::info!(user_id = %user_id, "用户离线");
                    self.known_users.insert(user_id.clone());
                }
            }
        }
        !transitions.is_empty()
    }

    /// 按用户ID排序的完整花名册，状态以注册表占用为准
    pub fn roster(&self, registry: &ConnectionRegistry) -> Vec<PresenceEntry> {
        self.known_users
            .iter()
            .map(|user_id| PresenceEntry {
                user_id: user_id.clone(),
                status: if registry.is_online(user_id) {
                    PresenceStatus::Online
                } else {
                    PresenceStatus::Offline
                },
            })
            .collect()
    }
}

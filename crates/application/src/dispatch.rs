use domain::{ServerEvent, SessionId};

/// 一次扇出：一个出站事件及其目标会话集合
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub targets: Vec<SessionId>,
    pub event: ServerEvent,
}

impl Dispatch {
    pub fn to(session: SessionId, event: ServerEvent) -> Self {
        Self {
            targets: vec![session],
            event,
        }
    }

    /// 目标会被排序去重
    pub fn to_many(targets: impl IntoIterator<Item = SessionId>, event: ServerEvent) -> Self {
        let mut targets: Vec<SessionId> = targets.into_iter().collect();
        targets.sort();
        targets.dedup();
        Self { targets, event }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn includes(&self, session: SessionId) -> bool {
        self.targets.binary_search(&session).is_ok()
    }
}

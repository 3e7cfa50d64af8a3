//! 指标快照

use crate::value_objects::Timestamp;
use serde::{Deserialize, Serialize};

/// 周期性发布给所有会话的服务指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub timestamp: Timestamp,
    /// 当前活跃会话数
    pub active_sessions: usize,
    /// 当前在线用户数
    pub active_users: usize,
    /// 最近一个计数窗口内路由的消息数
    pub throughput: u64,
    /// 计数窗口长度（毫秒）
    pub window_ms: u64,
}

//! 领域实体定义
//!
//! 包含中枢的核心实体：房间、消息信封、在线状态、信令与指标快照。

pub mod message;
pub mod metrics;
pub mod presence;
pub mod room;
pub mod signal;

// 重新导出核心实体
pub use message::{Destination, MessageDraft, MessageEnvelope, MessageKind};
pub use metrics::MetricSnapshot;
pub use presence::{PresenceEntry, PresenceStatus};
pub use room::{Room, RoomMember, RoomStatus};
pub use signal::{RelayedSignal, SignalKind, SignalRequest, SignalTarget};

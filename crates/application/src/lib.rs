//! 应用层实现。
//!
//! 实时中枢的核心：连接注册表、在线状态、频道路由、房间成员管理、
//! 信令中继与指标采样，以及把它们串成单一串行化入口的 [`Hub`]。
//! 持久化与身份校验通过 trait 抽象为外部协作方。

pub mod archive;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod identity;
pub mod metrics;
pub mod presence;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod signaling;

pub use archive::{MessageArchive, NoopArchive};
pub use clock::{Clock, SystemClock};
pub use dispatch::Dispatch;
pub use error::ApplicationError;
pub use hub::{Hub, HubDependencies, HubSettings};
pub use identity::{IdentityVerifier, TrustingVerifier};
pub use metrics::MetricsSampler;
pub use presence::PresenceTracker;
pub use registry::{ConnectionRegistry, PresenceTransition};
pub use rooms::RoomManager;
pub use router::ChannelRouter;
pub use signaling::SignalingRelay;

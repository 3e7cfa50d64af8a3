//! 基础设施层
//!
//! 中枢的运行时外壳：独占 [`application::Hub`] 的单任务执行器、每个会话的
//! 出站通道、基于 JWT 的身份校验以及异步的消息归档。

pub mod archive;
pub mod auth;
pub mod hub_runtime;
pub mod session_sinks;

pub use archive::ChannelMessageArchive;
pub use auth::{JwtClaims, JwtIdentityVerifier};
pub use hub_runtime::{spawn_hub, HubCommand, HubHandle, RuntimeError};
pub use session_sinks::{SessionSink, SessionSinks};

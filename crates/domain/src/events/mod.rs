//! 中枢事件定义
//!
//! 所有事件都以 `{"event": <名称>, "data": <负载>}` 的 JSON 形式在 WebSocket 上传输。

pub mod client_event;
pub mod server_event;

pub use client_event::*;
pub use server_event::*;

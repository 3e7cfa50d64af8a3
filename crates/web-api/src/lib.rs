//! Web API 层。
//!
//! 提供 Axum 路由：WebSocket 入口把每个连接接入中枢任务，
//! 少量只读的 HTTP 端点用于大厅列表、花名册与指标查询。

mod error;
mod routes;
mod state;
mod ws_connection;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;

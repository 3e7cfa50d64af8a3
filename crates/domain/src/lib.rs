//! 实时中枢核心领域模型
//!
//! 包含会话、用户标识、房间、消息信封、信令与指标快照等实体，
//! 以及客户端 / 服务端之间交换的事件定义。

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use value_objects::*;

//! 会话出站通道
//!
//! 每个已连接会话对应一个无界发送端，由 WebSocket 连接的写任务消费。
//! 扇出时所有目标共享同一个 `Arc<ServerEvent>`。

use std::collections::HashMap;
use std::sync::Arc;

use application::Dispatch;
use domain::{ServerEvent, SessionId};
use tokio::sync::mpsc;

pub type SessionSink = mpsc::UnboundedSender<Arc<ServerEvent>>;

#[derive(Debug, Default)]
pub struct SessionSinks {
    senders: HashMap<SessionId, SessionSink>,
}

impl SessionSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, session: SessionId, sink: SessionSink) {
        self.senders.insert(session, sink);
    }

    pub fn unregister(&mut self, session: SessionId) -> bool {
        self.senders.remove(&session).is_some()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// 投递一个事件，返回投递失败的目标数
    ///
    /// 接收端已关闭说明连接正在断开，断开流程会随后到达，这里只记录日志。
    pub fn deliver(&self, dispatch: Dispatch) -> usize {
        let Dispatch { targets, event } = dispatch;
        let event = Arc::new(event);
        let mut failed = 0;

        for target in targets {
            let Some(sender) = self.senders.get(&target) else {
                tracing::debug!(session_id = %target, "会话没有出站通道，跳过");
                failed += 1;
                continue;
            };
            if sender.send(Arc::clone(&event)).is_err() {
                tracing::warn!(session_id = %target, "出站通道已关闭");
                failed += 1;
            }
        }
        failed
    }

    pub fn deliver_all(&self, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            self.deliver(dispatch);
        }
    }
}

//! 中枢运行时
//!
//! 单个 tokio 任务独占 [`Hub`] 与所有会话的出站通道，按到达顺序逐条处理命令，
//! 同时驱动指标发布与吞吐清零两个定时器。其它任务只持有 [`HubHandle`]，
//! 通过有界命令通道与它交互，因此中枢内部状态无需任何锁。

use std::time::Duration;

use application::{ApplicationError, Hub};
use config::MetricsConfig;
use domain::{ClientEvent, MetricSnapshot, PresenceEntry, Room, SessionId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::session_sinks::{SessionSink, SessionSinks};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("hub runtime has stopped")]
    Stopped,
}

/// 发往中枢任务的命令
#[derive(Debug)]
pub enum HubCommand {
    Connect {
        session: SessionId,
        sink: SessionSink,
    },
    Disconnect {
        session: SessionId,
    },
    Client {
        session: SessionId,
        event: ClientEvent,
    },
    /// 连接层无法解析的入站帧，同样经由中枢回复，保证每个会话的回复顺序
    Reject {
        session: SessionId,
        error: ApplicationError,
    },
    ListRooms {
        reply: oneshot::Sender<Vec<Room>>,
    },
    Roster {
        reply: oneshot::Sender<Vec<PresenceEntry>>,
    },
    Stats {
        reply: oneshot::Sender<Option<MetricSnapshot>>,
    },
}

#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    async fn send(&self, command: HubCommand) -> Result<(), RuntimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }

    async fn query<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply)).await?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    pub async fn connect(&self, session: SessionId, sink: SessionSink) -> Result<(), RuntimeError> {
        self.send(HubCommand::Connect { session, sink }).await
    }

    pub async fn disconnect(&self, session: SessionId) -> Result<(), RuntimeError> {
        self.send(HubCommand::Disconnect { session }).await
    }

    pub async fn submit(&self, session: SessionId, event: ClientEvent) -> Result<(), RuntimeError> {
        self.send(HubCommand::Client { session, event }).await
    }

    pub async fn reject(
        &self,
        session: SessionId,
        error: ApplicationError,
    ) -> Result<(), RuntimeError> {
        self.send(HubCommand::Reject { session, error }).await
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, RuntimeError> {
        self.query(|reply| HubCommand::ListRooms { reply }).await
    }

    pub async fn roster(&self) -> Result<Vec<PresenceEntry>, RuntimeError> {
        self.query(|reply| HubCommand::Roster { reply }).await
    }

    pub async fn stats(&self) -> Result<Option<MetricSnapshot>, RuntimeError> {
        self.query(|reply| HubCommand::Stats { reply }).await
    }
}

struct HubRuntime {
    hub: Hub,
    sinks: SessionSinks,
    commands: mpsc::Receiver<HubCommand>,
    publish_interval: Duration,
    reset_interval: Duration,
}

/// 启动中枢任务
///
/// 所有 [`HubHandle`] 被释放后任务自行退出。
pub fn spawn_hub(
    hub: Hub,
    metrics: &MetricsConfig,
    command_buffer: usize,
) -> (HubHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(command_buffer.max(1));
    let runtime = HubRuntime {
        hub,
        sinks: SessionSinks::new(),
        commands: commands_rx,
        publish_interval: metrics.publish_interval(),
        reset_interval: metrics.reset_interval(),
    };
    let task = tokio::spawn(runtime.run());
    (
        HubHandle {
            commands: commands_tx,
        },
        task,
    )
}

impl HubRuntime {
    async fn run(mut self) {
        // 两个定时器共用起点并按原计划跳过错过的节拍，间隔成倍数时节拍严格重合
        let start = Instant::now();
        let mut publish = interval_at(start + self.publish_interval, self.publish_interval);
        publish.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut reset = interval_at(start + self.reset_interval, self.reset_interval);
        reset.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            publish_interval_ms = self.publish_interval.as_millis() as u64,
            reset_interval_ms = self.reset_interval.as_millis() as u64,
            "中枢任务已启动"
        );

        // 同时就绪时先发布再清零，快照总是覆盖刚结束的窗口；定时器优先于命令
        loop {
            tokio::select! {
                biased;

                _ = publish.tick() => {
                    let dispatches = self.hub.publish_stats();
                    self.sinks.deliver_all(dispatches);
                }
                _ = reset.tick() => self.hub.reset_throughput_window(),
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
            }
        }

        tracing::info!(sessions = self.sinks.len(), "中枢任务已退出");
    }

    fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { session, sink } => {
                self.sinks.register(session, sink);
                let dispatches = self.hub.connect(session);
                self.sinks.deliver_all(dispatches);
            }
            HubCommand::Disconnect { session } => {
                self.sinks.unregister(session);
                let dispatches = self.hub.disconnect(session);
                self.sinks.deliver_all(dispatches);
            }
            HubCommand::Client { session, event } => {
                if !self.hub.registry().is_connected(session) {
                    tracing::debug!(session_id = %session, event = event.name(), "会话已断开，丢弃事件");
                    return;
                }
                let dispatches = self.hub.handle_or_reject(session, event);
                self.sinks.deliver_all(dispatches);
            }
            HubCommand::Reject { session, error } => {
                if !self.hub.registry().is_connected(session) {
                    return;
                }
                tracing::warn!(session_id = %session, error = %error, "请求被拒绝");
                self.sinks.deliver(Hub::rejection(session, &error));
            }
            HubCommand::ListRooms { reply } => {
                let _ = reply.send(self.hub.list_rooms());
            }
            HubCommand::Roster { reply } => {
                let _ = reply.send(self.hub.roster());
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.hub.latest_stats());
            }
        }
    }
}

use std::sync::Arc;

use application::ApplicationError;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{ClientEvent, ServerEvent, SessionId};
use futures_util::{SinkExt, StreamExt};
use infrastructure::HubHandle;
use tokio::sync::mpsc;

use crate::state::AppState;

/// WebSocket 连接
///
/// 每个连接对应中枢里的一个会话：
/// - 建立时向中枢登记出站通道
/// - 入站文本帧解析为 [`ClientEvent`] 后提交给中枢
/// - 中枢推送的事件序列化为 JSON 文本帧写回
/// - 任一方向结束即视为断开，通知中枢清理
pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
    session_id: SessionId,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState) -> Self {
        Self {
            socket,
            state,
            session_id: SessionId::new(),
        }
    }

    pub async fn run(self) {
        let Self {
            socket,
            state,
            session_id,
        } = self;
        let hub = state.hub;

        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Arc<ServerEvent>>();
        if let Err(err) = hub.connect(session_id, events_tx).await {
            tracing::error!(session_id = %session_id, error = %err, "无法接入中枢");
            return;
        }
        tracing::info!(session_id = %session_id, "WebSocket 连接已建立");

        let (mut sender, mut incoming) = socket.split();

        // 创建 mpsc channel 来解耦对 sender 的访问
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let mut send_task = tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    command = cmd_rx.recv() => match command {
                        Some(WsCommand::SendPong(data)) => WsMessage::Pong(data.into()),
                        None => break,
                    },
                    event = events_rx.recv() => match event {
                        Some(event) => match serde_json::to_string(&*event) {
                            Ok(json) => WsMessage::Text(json.into()),
                            Err(err) => {
                                tracing::warn!(error = %err, "failed to serialize websocket payload");
                                continue;
                            }
                        },
                        None => break,
                    },
                };
                if sender.send(frame).await.is_err() {
                    tracing::debug!(session_id = %session_id, "写入 WebSocket 失败");
                    break;
                }
            }
            let _ = sender.close().await;
        });

        // 接收任务：处理来自WebSocket客户端的消息
        let mut recv_task = {
            let hub = hub.clone();
            tokio::spawn(async move {
                while let Some(Ok(message)) = incoming.next().await {
                    if Self::handle_incoming(message, session_id, &hub, &cmd_tx)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            })
        };

        // 等待任意一个任务完成（连接断开）
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        if let Err(err) = hub.disconnect(session_id).await {
            tracing::warn!(session_id = %session_id, error = %err, "中枢已停止，跳过断开清理");
        }
        tracing::info!(session_id = %session_id, "WebSocket 连接已断开");
    }

    async fn handle_incoming(
        message: WsMessage,
        session_id: SessionId,
        hub: &HubHandle,
        cmd_tx: &mpsc::Sender<WsCommand>,
    ) -> Result<(), ()> {
        let parsed = match message {
            WsMessage::Close(_) => {
                tracing::debug!(session_id = %session_id, "WebSocket收到关闭消息");
                return Err(());
            }
            WsMessage::Ping(data) => {
                return cmd_tx
                    .send(WsCommand::SendPong(data.to_vec()))
                    .await
                    .map_err(|_| ());
            }
            WsMessage::Pong(_) => return Ok(()),
            WsMessage::Text(text) => serde_json::from_str::<ClientEvent>(text.as_str()),
            WsMessage::Binary(data) => serde_json::from_slice::<ClientEvent>(&data),
        };

        match parsed {
            Ok(event) => hub.submit(session_id, event).await.map_err(|_| ()),
            Err(err) => {
                tracing::debug!(session_id = %session_id, error = %err, "无法解析客户端事件");
                hub.reject(session_id, ApplicationError::malformed(err.to_string()))
                    .await
                    .map_err(|_| ())
            }
        }
    }
}

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    SendPong(Vec<u8>),
}

//! 消息归档
//!
//! 中枢在扇出后把信封交给归档协作方，这里只把它推入无界通道，
//! 由独立任务消费，中枢任务永远不会因为存储变慢而阻塞。

use application::MessageArchive;
use domain::MessageEnvelope;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct ChannelMessageArchive {
    sender: mpsc::UnboundedSender<MessageEnvelope>,
}

impl ChannelMessageArchive {
    pub fn new(sender: mpsc::UnboundedSender<MessageEnvelope>) -> Self {
        Self { sender }
    }

    /// 创建归档通道并启动一个只记录日志的消费任务
    pub fn spawn_logging() -> (Self, JoinHandle<u64>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<MessageEnvelope>();
        let task = tokio::spawn(async move {
            let mut archived = 0u64;
            while let Some(envelope) = receiver.recv().await {
                archived += 1;
                tracing::debug!(
                    message_id = %envelope.id,
                    sender_id = %envelope.sender_id,
                    kind = ?envelope.kind,
                    "消息已归档"
                );
            }
            archived
        });
        (Self::new(sender), task)
    }
}

impl MessageArchive for ChannelMessageArchive {
    fn archive(&self, envelope: &MessageEnvelope) {
        if self.sender.send(envelope.clone()).is_err() {
            tracing::warn!(message_id = %envelope.id, "归档任务已停止，消息未归档");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{MessageDraft, UserId};

    fn envelope() -> MessageEnvelope {
        MessageEnvelope::from_draft(
            MessageDraft {
                id: None,
                content: "hi".into(),
                receiver_id: None,
                room_id: None,
                kind: None,
            },
            UserId::parse("alice").unwrap(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn archived_envelopes_reach_the_consumer() {
        let (archive, task) = ChannelMessageArchive::spawn_logging();
        archive.archive(&envelope());
        archive.archive(&envelope());
        drop(archive);

        assert_eq!(task.await.unwrap(), 2);
    }

    #[test]
    fn archiving_after_consumer_stops_does_not_panic() {
        let (sender, receiver) = mpsc::unbounded_channel();
        drop(receiver);
        ChannelMessageArchive::new(sender).archive(&envelope());
    }
}

use domain::MessageEnvelope;

/// 持久化协作方
///
/// 中枢在扇出之后调用它，不等待也不依赖其结果。
#[cfg_attr(test, mockall::automock)]
pub trait MessageArchive: Send + Sync {
    fn archive(&self, envelope: &MessageEnvelope);
}

#[derive(Debug, Default)]
pub struct NoopArchive;

impl MessageArchive for NoopArchive {
    fn archive(&self, _envelope: &MessageEnvelope) {}
}

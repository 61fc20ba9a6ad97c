//! 单条消息的分发流水线：分类 → 解码 → 构建 → 写入。
//!
//! 流水线本身无状态、无锁、无重试；唯一共享的是写入端句柄与启动时确定的 organization。
//! 每次调用独立完成，可被多个任务并发调用。

pub use bridge_translate::TranslateError;

use bridge_storage::{PointSink, StorageError};
use bridge_translate::translate_at;
use chrono::{DateTime, Utc};
use domain::{InboundMessage, Point};
use std::sync::Arc;

/// 流水线错误（均为单条消息级别，可恢复）。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("write sink error for bucket {bucket}: {source}")]
    WriteSink {
        bucket: String,
        measurement: String,
        source: StorageError,
    },
}

impl PipelineError {
    /// 用于日志与计数的丢弃原因。
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::Translate(TranslateError::MalformedTopic { .. }) => "malformed_topic",
            PipelineError::Translate(TranslateError::PayloadDecode { .. }) => "decode_error",
            PipelineError::Translate(TranslateError::InvalidMessage { .. }) => "invalid_message",
            PipelineError::WriteSink { .. } => "write_failed",
        }
    }
}

struct PipelineInner {
    sink: Arc<dyn PointSink>,
    org: String,
}

/// 分发流水线入口。
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Pipeline {
    pub fn new(sink: Arc<dyn PointSink>, org: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                sink,
                org: org.into(),
            }),
        }
    }

    pub fn org(&self) -> &str {
        &self.inner.org
    }

    /// 处理一条投递的消息，成功时返回已写入的点。
    ///
    /// payload 未携带时间戳时使用消息的接收时刻。
    pub async fn handle(&self, message: &InboundMessage) -> Result<Point, PipelineError> {
        self.handle_at(&message.topic, &message.payload, message.received_at)
            .await
    }

    /// 处理一条消息，`now` 为缺省时间戳。
    pub async fn handle_at(
        &self,
        topic: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Point, PipelineError> {
        let point = translate_at(topic, payload, now)?;
        self.dispatch(point).await
    }

    /// 将构建好的点写入 organization 下的目标 bucket，失败不重试。
    pub async fn dispatch(&self, point: Point) -> Result<Point, PipelineError> {
        match self.inner.sink.write(&self.inner.org, &point).await {
            Ok(()) => Ok(point),
            Err(source) => Err(PipelineError::WriteSink {
                bucket: point.bucket,
                measurement: point.measurement,
                source,
            }),
        }
    }
}

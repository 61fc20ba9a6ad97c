//! 消息接入：MQTT 订阅与投递。
//!
//! 传输层为每条收到的消息调用一次 `MessageHandler::handle`，每次调用运行在独立任务上，
//! 因此处理器必须可被并发调用。

mod mqtt;

pub use mqtt::{MqttSource, MqttSourceConfig, MqttTlsFiles, qos_from_u8};

use async_trait::async_trait;
use domain::InboundMessage;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::warn;

/// 接入错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("config error: {0}")]
    Config(String),
    #[error("tls error: {0}")]
    Tls(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
}

/// 消息处理器。
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError>;
}

/// 接入源抽象。`shutdown` 变为 true（或发送端被丢弃）时停止接收，等待在途消息处理完后返回。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(
        &self,
        handler: Arc<dyn MessageHandler>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), IngestError>;
}

/// 在途消息处理任务集合。
pub struct InFlight {
    handler: Arc<dyn MessageHandler>,
    tasks: JoinSet<()>,
}

impl InFlight {
    pub fn new(handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            handler,
            tasks: JoinSet::new(),
        }
    }

    /// 在独立任务上投递一条消息。
    pub fn deliver(&mut self, message: InboundMessage) {
        let handler = self.handler.clone();
        self.tasks.spawn(async move {
            let message_id = message.message_id.clone();
            if let Err(err) = handler.handle(message).await {
                warn!(target: "bridge.ingest", message_id = %message_id, error = %err, "message_handler_failed");
            }
        });
    }

    /// 回收已结束的任务。
    pub fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join_error(result);
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 等待所有在途任务结束。
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join_error(result);
        }
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        warn!(target: "bridge.ingest", error = %err, "message_task_aborted");
    }
}

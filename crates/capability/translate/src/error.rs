//! 翻译错误类型
//!
//! 所有错误都是单条消息级别的：上层记录后丢弃该消息，不影响进程。

/// 翻译错误。
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("malformed topic `{topic}`: {reason}")]
    MalformedTopic { topic: String, reason: String },
    #[error("payload could not be decoded ({}): {source}", String::from_utf8_lossy(.payload))]
    PayloadDecode {
        payload: Vec<u8>,
        source: serde_json::Error,
    },
    #[error("invalid message on `{topic}`: {reason}")]
    InvalidMessage { topic: String, reason: String },
}

impl TranslateError {
    pub(crate) fn malformed(topic: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTopic {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(topic: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}

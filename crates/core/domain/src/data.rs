use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 传输层投递的原始消息。
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message_id: String,
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

/// 字段值（JSON 标量）。
///
/// JSON 数字统一按 64 位浮点解码，保证同一字段在存储端类型一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Bool(bool),
    String(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// 标签集合（按 key 有序，key 唯一）。
pub type TagSet = BTreeMap<String, String>;

/// 字段集合（按 key 有序，key 唯一）。
pub type FieldSet = BTreeMap<String, FieldValue>;

/// 规范化后的时序点，写入端唯一接收的实体。
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub bucket: String,
    pub measurement: String,
    pub tags: TagSet,
    pub fields: FieldSet,
    pub timestamp: DateTime<Utc>,
}

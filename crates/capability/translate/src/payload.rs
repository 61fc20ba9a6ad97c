//! Payload 解码
//!
//! 严格 JSON：未知字段忽略，缺少必填字段解码失败。
//! 时间戳缺失、为 null 或为零值（`0001-01-01T00:00:00Z`）时，使用解码时刻的时间。

use crate::error::TranslateError;
use crate::topic::TopicRoute;
use chrono::{DateTime, Utc};
use domain::{FieldSet, TagSet};
use serde::{Deserialize, Serialize};

/// 零值时间戳对应的 Unix 秒（公元 1 年 1 月 1 日 UTC）。
const ZERO_INSTANT_UNIX_SECS: i64 = -62_135_596_800;

/// 自带完整点结构的消息（2 段 topic）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreFormedMessage {
    pub measurement: String,
    #[serde(default)]
    pub tags: TagSet,
    pub fields: FieldSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// 单个传感器读数（4 段 topic）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub unit: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// 解码结果，时间戳已确定。
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    PreFormed {
        message: PreFormedMessage,
        timestamp: DateTime<Utc>,
    },
    Sensor {
        reading: SensorReading,
        timestamp: DateTime<Utc>,
    },
}

impl DecodedMessage {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DecodedMessage::PreFormed { timestamp, .. } | DecodedMessage::Sensor { timestamp, .. } => {
                *timestamp
            }
        }
    }
}

/// 按 topic 形态解码 payload；`now` 为解码时刻，用于补齐缺失的时间戳。
pub fn decode_payload(
    route: &TopicRoute<'_>,
    payload: &[u8],
    now: DateTime<Utc>,
) -> Result<DecodedMessage, TranslateError> {
    match route {
        TopicRoute::PreFormed { .. } => {
            let message: PreFormedMessage = parse(payload)?;
            let timestamp = resolve_timestamp(message.time, now);
            Ok(DecodedMessage::PreFormed { message, timestamp })
        }
        TopicRoute::Sensor { .. } => {
            let reading: SensorReading = parse(payload)?;
            let timestamp = resolve_timestamp(reading.timestamp, now);
            Ok(DecodedMessage::Sensor { reading, timestamp })
        }
    }
}

fn parse<T>(payload: &[u8]) -> Result<T, TranslateError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(payload).map_err(|source| TranslateError::PayloadDecode {
        payload: payload.to_vec(),
        source,
    })
}

fn resolve_timestamp(value: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match value {
        Some(ts) if !is_zero_instant(&ts) => ts,
        _ => now,
    }
}

/// 是否为零值时间戳。
pub fn is_zero_instant(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == ZERO_INSTANT_UNIX_SECS && ts.timestamp_subsec_nanos() == 0
}

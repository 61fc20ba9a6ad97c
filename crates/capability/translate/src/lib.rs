//! MQTT 消息 → 时序点的翻译核心。
//!
//! 处理顺序：topic 分类 → payload 解码 → Point 构建。
//! 全部为纯函数，不持有任何跨消息状态，可被并发调用。

pub mod error;
pub mod payload;
pub mod point;
pub mod topic;

pub use error::TranslateError;
pub use payload::{DecodedMessage, PreFormedMessage, SensorReading, decode_payload, is_zero_instant};
pub use point::{TAG_LOCATION, TAG_UNIT, build_point};
pub use topic::{TopicRoute, classify_topic};

use chrono::{DateTime, Utc};
use domain::Point;

/// 翻译一条消息，缺失的时间戳取当前时间。
pub fn translate(topic: &str, payload: &[u8]) -> Result<Point, TranslateError> {
    translate_at(topic, payload, Utc::now())
}

/// 翻译一条消息，`now` 为解码时刻。
pub fn translate_at(
    topic: &str,
    payload: &[u8],
    now: DateTime<Utc>,
) -> Result<Point, TranslateError> {
    let route = classify_topic(topic)?;
    let decoded = decode_payload(&route, payload, now)?;
    build_point(topic, &route, decoded)
}

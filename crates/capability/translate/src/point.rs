//! Point 构建
//!
//! 一条消息恰好产出一个点，不做聚合与拆分。

use crate::error::TranslateError;
use crate::payload::DecodedMessage;
use crate::topic::TopicRoute;
use domain::{FieldSet, FieldValue, Point, TagSet};

pub const TAG_UNIT: &str = "unit";
pub const TAG_LOCATION: &str = "location";

/// 由 topic 上下文与解码结果构建 Point。
pub fn build_point(
    topic: &str,
    route: &TopicRoute<'_>,
    decoded: DecodedMessage,
) -> Result<Point, TranslateError> {
    let point = match (route, decoded) {
        (TopicRoute::PreFormed { bucket, .. }, DecodedMessage::PreFormed { message, timestamp }) => {
            if message.measurement.trim().is_empty() {
                return Err(TranslateError::invalid(topic, "measurement is empty"));
            }
            Point {
                bucket: bucket.to_string(),
                measurement: message.measurement,
                tags: message.tags,
                fields: message.fields,
                timestamp,
            }
        }
        (
            TopicRoute::Sensor {
                bucket,
                measurement,
                location,
                sensor_id,
            },
            DecodedMessage::Sensor { reading, timestamp },
        ) => {
            let mut tags = TagSet::new();
            tags.insert(TAG_UNIT.to_string(), reading.unit);
            tags.insert(TAG_LOCATION.to_string(), location.to_string());
            let mut fields = FieldSet::new();
            fields.insert(sensor_id.to_string(), FieldValue::Float(reading.value));
            Point {
                bucket: bucket.to_string(),
                measurement: measurement.to_string(),
                tags,
                fields,
                timestamp,
            }
        }
        (route, _) => {
            return Err(TranslateError::invalid(
                topic,
                format!("payload does not match {} topic", route.kind()),
            ));
        }
    };

    if point.fields.is_empty() {
        return Err(TranslateError::invalid(topic, "field set is empty"));
    }
    Ok(point)
}

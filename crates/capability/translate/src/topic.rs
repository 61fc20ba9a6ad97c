//! Topic 分类
//!
//! 分类规则只看分段数量，两种形态互斥：
//! - 2 段 `{bucket}/{measurement}`：payload 自带完整的点
//! - 4 段 `{bucket}/{measurement}/{location}/{sensorId}`：payload 是单个传感器读数
//!
//! 其余分段数、以及任何空分段，一律视为非法 topic。

use crate::error::TranslateError;

/// 分类后的 topic，分段借用自原始 topic 字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRoute<'a> {
    PreFormed {
        bucket: &'a str,
        measurement: &'a str,
    },
    Sensor {
        bucket: &'a str,
        measurement: &'a str,
        location: &'a str,
        sensor_id: &'a str,
    },
}

impl<'a> TopicRoute<'a> {
    /// 目标 bucket（始终是第一段）。
    pub fn bucket(&self) -> &'a str {
        match self {
            TopicRoute::PreFormed { bucket, .. } | TopicRoute::Sensor { bucket, .. } => bucket,
        }
    }

    /// topic 中的 measurement 段（第二段）。
    pub fn measurement(&self) -> &'a str {
        match self {
            TopicRoute::PreFormed { measurement, .. }
            | TopicRoute::Sensor { measurement, .. } => measurement,
        }
    }

    /// 用于日志的形态名称。
    pub fn kind(&self) -> &'static str {
        match self {
            TopicRoute::PreFormed { .. } => "pre_formed",
            TopicRoute::Sensor { .. } => "sensor",
        }
    }
}

/// 对 topic 进行分类。纯函数，无副作用。
pub fn classify_topic(topic: &str) -> Result<TopicRoute<'_>, TranslateError> {
    let segments: Vec<&str> = topic.split('/').collect();
    if let Some(index) = segments.iter().position(|segment| segment.is_empty()) {
        return Err(TranslateError::malformed(
            topic,
            format!("segment {} is empty", index),
        ));
    }
    match segments.as_slice() {
        &[bucket, measurement] => Ok(TopicRoute::PreFormed {
            bucket,
            measurement,
        }),
        &[bucket, measurement, location, sensor_id] => Ok(TopicRoute::Sensor {
            bucket,
            measurement,
            location,
            sensor_id,
        }),
        other => Err(TranslateError::malformed(
            topic,
            format!("expected 2 or 4 segments, got {}", other.len()),
        )),
    }
}

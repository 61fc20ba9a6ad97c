//! 追踪初始化、消息 ID 生成与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub points_written: u64,
    pub dropped_malformed_topic: u64,
    pub dropped_decode_error: u64,
    pub write_failures: u64,
    pub connection_errors: u64,
}

/// 进程级计数器（仅由桥接装配层更新，翻译核心不持有任何状态）。
pub struct TelemetryMetrics {
    messages_received: AtomicU64,
    points_written: AtomicU64,
    dropped_malformed_topic: AtomicU64,
    dropped_decode_error: AtomicU64,
    write_failures: AtomicU64,
    connection_errors: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            points_written: AtomicU64::new(0),
            dropped_malformed_topic: AtomicU64::new(0),
            dropped_decode_error: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            dropped_malformed_topic: self.dropped_malformed_topic.load(Ordering::Relaxed),
            dropped_decode_error: self.dropped_decode_error.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing：优先 RUST_LOG，否则 info；debug 开启时输出协议层详细日志。
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 message_id。
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录收到的消息数。
pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入成功的点数。
pub fn record_point_written() {
    metrics().points_written.fetch_add(1, Ordering::Relaxed);
}

/// 记录 topic 非法丢弃次数。
pub fn record_dropped_malformed_topic() {
    metrics()
        .dropped_malformed_topic
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录 payload 解码失败丢弃次数。
pub fn record_dropped_decode_error() {
    metrics()
        .dropped_decode_error
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录写入失败次数。
pub fn record_write_failure() {
    metrics().write_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录 MQTT 连接错误次数。
pub fn record_connection_error() {
    metrics().connection_errors.fetch_add(1, Ordering::Relaxed);
}

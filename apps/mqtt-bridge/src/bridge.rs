//! 桥接链路装配模块
//!
//! 将接入源（MQTT）、分发流水线（翻译 + 写入）与写入端组装在一起。
//! 单条消息的任何错误都只记录并丢弃，不会影响后续消息，也不会终止进程。

use bridge_config::{BridgeConfig, SessionMode};
use bridge_ingest::{IngestError, MessageHandler, MqttSourceConfig, MqttTlsFiles, Source};
use bridge_pipeline::{Pipeline, PipelineError, TranslateError};
use bridge_storage::{InfluxSinkConfig, PointSink};
use bridge_telemetry::{
    record_dropped_decode_error, record_dropped_malformed_topic, record_message_received,
    record_point_written, record_write_failure,
};
use domain::InboundMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Instrument, debug, info, warn};

/// MQTT 断开连接的最长等待时间
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// 桥接消息处理器
///
/// 实现 `MessageHandler`，每条消息调用一次分发流水线，并负责日志与计数。
pub struct BridgeHandler {
    pipeline: Pipeline,
}

impl BridgeHandler {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait::async_trait]
impl MessageHandler for BridgeHandler {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError> {
        record_message_received();
        let span = tracing::info_span!(
            "message",
            message_id = %message.message_id,
            topic = %message.topic
        );
        async {
            debug!(
                target: "bridge.pipeline",
                payload_size = message.payload.len(),
                received_at = %message.received_at,
                "message_received"
            );

            match self.pipeline.handle(&message).await {
                Ok(point) => {
                    record_point_written();
                    info!(
                        target: "bridge.pipeline",
                        org = %self.pipeline.org(),
                        bucket = %point.bucket,
                        measurement = %point.measurement,
                        fields = point.fields.len(),
                        timestamp = %point.timestamp,
                        "point_written"
                    );
                }
                Err(err) => {
                    match &err {
                        PipelineError::Translate(TranslateError::MalformedTopic { .. }) => {
                            record_dropped_malformed_topic()
                        }
                        PipelineError::Translate(_) => record_dropped_decode_error(),
                        PipelineError::WriteSink { .. } => record_write_failure(),
                    }
                    // 记录后丢弃，继续处理后续消息
                    warn!(
                        target: "bridge.pipeline",
                        reason = err.reason(),
                        error = %err,
                        "message_dropped"
                    );
                }
            }
        }
        .instrument(span)
        .await;
        Ok(())
    }
}

/// 由运行配置生成 MQTT 接入源配置
pub fn mqtt_source_config(config: &BridgeConfig) -> MqttSourceConfig {
    MqttSourceConfig {
        broker_url: config.broker_url.clone(),
        client_id: config.client_id.clone(),
        topic: config.topic.clone(),
        qos: config.qos,
        username: config.username.clone(),
        password: config.password.clone(),
        tls: config.tls.as_ref().map(|files| MqttTlsFiles {
            ca: files.ca.clone(),
            cert: files.cert.clone(),
            key: files.key.clone(),
        }),
        keep_alive: config.keep_alive,
        reconnect_delay: config.connect_retry_delay,
        session_dir: match &config.session {
            SessionMode::InMemory => None,
            SessionMode::Durable(dir) => Some(dir.clone()),
        },
        disconnect_timeout: DISCONNECT_TIMEOUT,
    }
}

/// 由运行配置生成 InfluxDB 写入端配置
pub fn influx_sink_config(config: &BridgeConfig) -> InfluxSinkConfig {
    InfluxSinkConfig {
        url: config.influx.url.clone(),
        token: config.influx.token.clone(),
        request_timeout: config.influx.request_timeout,
    }
}

/// 启动桥接任务
///
/// 返回的任务在 `shutdown` 触发后结束：先断开接入源，再等待在途消息处理完成。
/// 写入端的关闭由调用方在任务结束后负责。
pub fn spawn_bridge(
    source: Arc<dyn Source>,
    sink: Arc<dyn PointSink>,
    org: &str,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<Result<(), IngestError>> {
    let pipeline = Pipeline::new(sink, org);
    let handler = Arc::new(BridgeHandler::new(pipeline));
    tokio::spawn(async move {
        let result = source.run(handler, shutdown).await;
        match &result {
            Ok(()) => info!(target: "bridge.ingest", "source_stopped"),
            Err(err) => warn!(target: "bridge.ingest", error = %err, "source_failed"),
        }
        result
    })
}

//! MQTT → InfluxDB 桥接进程。
//!
//! 启动顺序：加载配置 → 初始化日志 → 构建写入端与接入源 → 运行，
//! 收到 SIGINT/SIGTERM 后断开 MQTT、等待在途消息、关闭写入端并以 0 退出。

mod bridge;

use bridge::{influx_sink_config, mqtt_source_config, spawn_bridge};
use bridge_config::BridgeConfig;
use bridge_ingest::MqttSource;
use bridge_storage::{InfluxPointSink, PointSink};
use bridge_telemetry::{init_tracing, metrics};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置，失败则在建立任何连接之前退出
    let config = BridgeConfig::from_env()?;
    // 初始化结构化日志
    init_tracing(config.debug);

    // InfluxDB 写入端（进程生命周期内唯一）
    let sink = Arc::new(InfluxPointSink::new(influx_sink_config(&config))?);
    // MQTT 接入源（TLS 证书在此读取）
    let source = Arc::new(MqttSource::new(mqtt_source_config(&config))?);
    info!(
        broker = %config.broker_url,
        client_id = %config.client_id,
        topic = %config.topic,
        qos = config.qos,
        influx = %sink.write_url(),
        org = %config.influx.org,
        "bridge starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sink_handle: Arc<dyn PointSink> = sink.clone();
    let bridge = spawn_bridge(source, sink_handle, &config.influx.org, shutdown_rx);

    shutdown_signal().await?;
    info!("signal caught - exiting");

    // 停止接收新消息；接入源负责断开连接并等待在途消息处理完成
    let _ = shutdown_tx.send(true);
    match bridge.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "bridge stopped with error"),
        Err(err) => warn!(error = %err, "bridge task aborted"),
    }
    sink.close().await;

    let snapshot = metrics().snapshot();
    info!(
        messages_received = snapshot.messages_received,
        points_written = snapshot.points_written,
        dropped_malformed_topic = snapshot.dropped_malformed_topic,
        dropped_decode_error = snapshot.dropped_decode_error,
        write_failures = snapshot.write_failures,
        connection_errors = snapshot.connection_errors,
        "shutdown complete"
    );
    Ok(())
}

/// 等待 Ctrl-C 或 SIGTERM。
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

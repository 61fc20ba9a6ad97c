use crate::{InFlight, IngestError, MessageHandler, Source};
use async_trait::async_trait;
use bridge_telemetry::{new_message_id, record_connection_error};
use chrono::Utc;
use domain::InboundMessage;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeReasonCode, Transport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// MQTT 3.1.1 剩余长度可编码的最大值。超限报文无法被确认，会在重连后被 broker 反复重投。
const MAX_PACKET_SIZE: usize = 268_435_455;
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// 双向 TLS 证书文件。
#[derive(Debug, Clone)]
pub struct MqttTlsFiles {
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// MQTT 接入源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub broker_url: Url,
    pub client_id: String,
    pub topic: String,
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<MqttTlsFiles>,
    pub keep_alive: Duration,
    pub reconnect_delay: Duration,
    /// 会话目录；None 表示会话只保存在内存中。
    pub session_dir: Option<PathBuf>,
    pub disconnect_timeout: Duration,
}

/// MQTT 接入源。
///
/// 连接参数（含 TLS 证书）在构造时读取并校验，运行期只处理连接断开与重连。
pub struct MqttSource {
    config: MqttSourceConfig,
    options: MqttOptions,
    qos: QoS,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Result<Self, IngestError> {
        let qos = qos_from_u8(config.qos)?;
        if let Some(dir) = config.session_dir.as_ref() {
            std::fs::create_dir_all(dir).map_err(|err| {
                IngestError::Session(format!("cannot create {}: {}", dir.display(), err))
            })?;
        }
        let options = build_mqtt_options(&config)?;
        Ok(Self {
            config,
            options,
            qos,
        })
    }

    pub fn config(&self) -> &MqttSourceConfig {
        &self.config
    }

    pub fn options(&self) -> &MqttOptions {
        &self.options
    }

    fn subscribe(&self, client: &AsyncClient) {
        match client.try_subscribe(self.config.topic.clone(), self.qos) {
            Ok(()) => debug!(target: "bridge.ingest", topic = %self.config.topic, "mqtt_subscribe_sent"),
            Err(err) => warn!(
                target: "bridge.ingest",
                topic = %self.config.topic,
                error = %err,
                "mqtt_subscribe_failed; no messages will be received"
            ),
        }
    }

    /// 处理一个事件循环事件；收到的消息交给在途任务集合。
    fn on_event(&self, event: Event, client: &AsyncClient, in_flight: &mut InFlight) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code != ConnectReturnCode::Success {
                    warn!(target: "bridge.ingest", code = ?ack.code, "mqtt_connection_refused");
                    return;
                }
                info!(
                    target: "bridge.ingest",
                    session_present = ack.session_present,
                    "mqtt_connection_up"
                );
                self.subscribe(client);
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    warn!(
                        target: "bridge.ingest",
                        topic = %self.config.topic,
                        "mqtt_subscription_rejected; no messages will be received"
                    );
                } else {
                    info!(target: "bridge.ingest", topic = %self.config.topic, "mqtt_subscription_made");
                }
            }
            Event::Incoming(Packet::Publish(publish)) => {
                in_flight.deliver(InboundMessage {
                    message_id: new_message_id(),
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                    received_at: Utc::now(),
                });
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!(target: "bridge.ingest", "mqtt_server_requested_disconnect");
            }
            _ => {}
        }
    }

    /// 发送 DISCONNECT，并在限定时间内推动事件循环把它发出去。
    ///
    /// 期间读到的消息已被自动确认，仍然投递给处理器。
    async fn disconnect(
        &self,
        client: &AsyncClient,
        eventloop: &mut EventLoop,
        in_flight: &mut InFlight,
    ) {
        if let Err(err) = client.try_disconnect() {
            warn!(target: "bridge.ingest", error = %err, "mqtt_disconnect_request_failed");
            return;
        }
        let flushed = tokio::time::timeout(self.config.disconnect_timeout, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return true,
                    Ok(event @ Event::Incoming(Packet::Publish(_))) => {
                        self.on_event(event, client, in_flight)
                    }
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
        })
        .await;
        match flushed {
            Ok(true) => info!(target: "bridge.ingest", "mqtt_disconnected"),
            Ok(false) => warn!(target: "bridge.ingest", "mqtt_disconnect_connection_lost"),
            Err(_) => warn!(
                target: "bridge.ingest",
                timeout_ms = self.config.disconnect_timeout.as_millis() as u64,
                "mqtt_disconnect_timeout"
            ),
        }
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(
        &self,
        handler: Arc<dyn MessageHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), IngestError> {
        let (client, mut eventloop) =
            AsyncClient::new(self.options.clone(), REQUEST_CHANNEL_CAPACITY);
        let mut in_flight = InFlight::new(handler);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                event = eventloop.poll() => match event {
                    Ok(event) => self.on_event(event, &client, &mut in_flight),
                    Err(err) => {
                        record_connection_error();
                        warn!(
                            target: "bridge.ingest",
                            error = %err,
                            retry_in_ms = self.config.reconnect_delay.as_millis() as u64,
                            "mqtt_connection_error"
                        );
                        tokio::select! {
                            _ = shutdown.changed() => break,
                            _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                        }
                    }
                },
            }
            in_flight.reap();
        }

        info!(target: "bridge.ingest", in_flight = in_flight.len(), "mqtt_source_stopping");
        self.disconnect(&client, &mut eventloop, &mut in_flight).await;
        in_flight.drain().await;
        Ok(())
    }
}

/// QoS 数值转换（0..=2）。
pub fn qos_from_u8(qos: u8) -> Result<QoS, IngestError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(IngestError::Config(format!("unsupported mqtt qos `{}`", other))),
    }
}

fn build_mqtt_options(config: &MqttSourceConfig) -> Result<MqttOptions, IngestError> {
    let url = &config.broker_url;
    let host = url
        .host_str()
        .ok_or_else(|| IngestError::Config(format!("mqtt url must specify host: {}", url)))?;
    let scheme = url.scheme().to_ascii_lowercase();
    let secure = match scheme.as_str() {
        "mqtt" | "tcp" => false,
        "mqtts" | "ssl" | "tls" => true,
        other => {
            return Err(IngestError::Config(format!(
                "unsupported mqtt url scheme `{}`",
                other
            )));
        }
    };
    let port = url.port().unwrap_or(if secure { 8883 } else { 1883 });

    let mut options = MqttOptions::new(config.client_id.clone(), host, port);
    options.set_keep_alive(config.keep_alive);
    // 保留 broker 侧会话，重连后继续接收离线期间的 QoS 1/2 消息。
    options.set_clean_session(false);
    options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

    let username = config
        .username
        .clone()
        .or_else(|| Some(url.username().to_string()).filter(|name| !name.is_empty()));
    if let Some(username) = username {
        let password = config
            .password
            .clone()
            .or_else(|| url.password().map(str::to_string))
            .unwrap_or_default();
        options.set_credentials(username, password);
    }

    if let Some(files) = config.tls.as_ref() {
        options.set_transport(transport_from_files(files)?);
    } else if secure {
        options.set_transport(Transport::tls_with_default_config());
    }
    Ok(options)
}

fn transport_from_files(files: &MqttTlsFiles) -> Result<Transport, IngestError> {
    let ca = read_file(&files.ca, "ca")?;
    let cert = read_file(&files.cert, "cert")?;
    let key = read_file(&files.key, "key")?;
    Ok(Transport::tls(ca, Some((cert, key)), None))
}

fn read_file(path: &Path, kind: &str) -> Result<Vec<u8>, IngestError> {
    std::fs::read(path).map_err(|err| {
        IngestError::Tls(format!(
            "failed to read mqtt tls {} `{}`: {}",
            kind,
            path.display(),
            err
        ))
    })
}

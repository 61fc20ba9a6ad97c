//! InfluxDB v2 写入端
//!
//! 通过 HTTP `/api/v2/write` 逐点写入（每个点一次请求，不在进程内缓冲）。
//! 超时由 HTTP 客户端控制，失败不重试。

use crate::error::StorageError;
use crate::line_protocol::encode_point;
use crate::traits::PointSink;
use async_trait::async_trait;
use domain::Point;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// InfluxDB 写入端配置。
#[derive(Debug, Clone)]
pub struct InfluxSinkConfig {
    pub url: Url,
    pub token: String,
    pub request_timeout: Duration,
}

/// InfluxDB v2 HTTP 写入端。
pub struct InfluxPointSink {
    client: reqwest::Client,
    write_url: Url,
    authorization: String,
    closed: AtomicBool,
}

impl InfluxPointSink {
    pub fn new(config: InfluxSinkConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("mqtt-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| StorageError::Client(err.to_string()))?;
        Ok(Self {
            client,
            write_url: write_url(&config.url)?,
            authorization: format!("Token {}", config.token),
            closed: AtomicBool::new(false),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

/// 在基础地址后追加 `api/v2/write`（保留已有路径前缀）。
fn write_url(base: &Url) -> Result<Url, StorageError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StorageError::Client(format!("influx url cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(["api", "v2", "write"]);
    url.set_query(None);
    Ok(url)
}

#[async_trait]
impl PointSink for InfluxPointSink {
    async fn write(&self, org: &str, point: &Point) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        let line = encode_point(point)?;
        let response = self
            .client
            .post(self.write_url.clone())
            .query(&[
                ("org", org),
                ("bucket", point.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(
            target: "bridge.storage",
            bucket = %point.bucket,
            measurement = %point.measurement,
            status = status.as_u16(),
            "influx_write_ok"
        );
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_url_appends_api_path() {
        let base = Url::parse("http://influx.local:8086").expect("url");
        assert_eq!(
            write_url(&base).expect("write url").as_str(),
            "http://influx.local:8086/api/v2/write"
        );

        let base = Url::parse("https://proxy.local/influx/").expect("url");
        assert_eq!(
            write_url(&base).expect("write url").as_str(),
            "https://proxy.local/influx/api/v2/write"
        );
    }

    #[test]
    fn non_base_url_is_rejected() {
        let base = Url::parse("mailto:ops@example.com").expect("url");
        assert!(matches!(write_url(&base), Err(StorageError::Client(_))));
    }

    #[test]
    fn https_sink_loads_trust_roots() {
        let sink = InfluxPointSink::new(InfluxSinkConfig {
            url: Url::parse("https://influx.internal:8086").expect("url"),
            token: "token".to_string(),
            request_timeout: Duration::from_secs(1),
        })
        .expect("https client with bundled and native roots");
        assert_eq!(sink.write_url().scheme(), "https");
    }

    #[tokio::test]
    async fn closed_sink_rejects_writes() {
        let sink = InfluxPointSink::new(InfluxSinkConfig {
            url: Url::parse("http://127.0.0.1:9").expect("url"),
            token: "token".to_string(),
            request_timeout: Duration::from_millis(100),
        })
        .expect("sink");
        sink.close().await;
        let point = Point {
            bucket: "b".to_string(),
            measurement: "m".to_string(),
            tags: Default::default(),
            fields: [("f".to_string(), domain::FieldValue::Float(1.0))]
                .into_iter()
                .collect(),
            timestamp: chrono::Utc::now(),
        };
        let err = sink.write("org", &point).await.expect_err("closed");
        assert!(matches!(err, StorageError::Closed));
    }
}

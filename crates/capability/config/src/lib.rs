//! 桥接进程运行配置加载。
//!
//! 所有配置在启动时从环境变量读取并校验一次，错误信息中始终包含出错的 key。

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const ENV_BROKER_URL: &str = "MQTTBROKERURL";
pub const ENV_CLIENT_ID: &str = "CLIENTID";
pub const ENV_TOPIC: &str = "TOPIC";
pub const ENV_QOS: &str = "QOS";
pub const ENV_CA_FILE: &str = "CAFILE";
pub const ENV_CERT_FILE: &str = "CERTFILE";
pub const ENV_KEY_FILE: &str = "KEYFILE";
pub const ENV_KEEP_ALIVE: &str = "KEEPALIVE";
pub const ENV_RETRY_INTERVAL: &str = "RETRYINTERVAL";
pub const ENV_SESSION_FOLDER: &str = "SESSIONFOLDER";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_MQTT_USERNAME: &str = "MQTTUSERNAME";
pub const ENV_MQTT_PASSWORD: &str = "MQTTPASSWORD";
pub const ENV_INFLUX_URL: &str = "INFLUXURL";
pub const ENV_INFLUX_TOKEN: &str = "INFLUXTOKEN";
pub const ENV_INFLUX_ORG: &str = "INFLUXORG";
pub const ENV_INFLUX_TIMEOUT_MS: &str = "INFLUXTIMEOUTMS";

const DEFAULT_INFLUX_TIMEOUT_MS: u64 = 10_000;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 双向 TLS 证书文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// MQTT 会话状态的保存方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    InMemory,
    Durable(PathBuf),
}

/// InfluxDB 写入端配置。
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: Url,
    pub token: String,
    pub org: String,
    pub request_timeout: Duration,
}

/// 桥接进程运行配置。
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub broker_url: Url,
    pub client_id: String,
    pub topic: String,
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<TlsFiles>,
    pub keep_alive: Duration,
    pub connect_retry_delay: Duration,
    pub session: SessionMode,
    pub debug: bool,
    pub influx: InfluxConfig,
}

impl BridgeConfig {
    /// 从进程环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意 key 查找函数读取配置（测试可传入 HashMap）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let broker_url = env.url(ENV_BROKER_URL)?;
        let client_id = env.required(ENV_CLIENT_ID)?;
        let topic = env.required(ENV_TOPIC)?;
        let qos = env.qos(ENV_QOS)?;
        let username = env.optional(ENV_MQTT_USERNAME);
        let password = env.optional(ENV_MQTT_PASSWORD);
        let tls = env.tls_files()?;
        let keep_alive = Duration::from_secs(env.keep_alive(ENV_KEEP_ALIVE)?);
        let connect_retry_delay = Duration::from_millis(env.positive(ENV_RETRY_INTERVAL)?);
        let session = match env.optional(ENV_SESSION_FOLDER) {
            Some(folder) => SessionMode::Durable(PathBuf::from(folder)),
            None => SessionMode::InMemory,
        };
        let debug = env.boolean(ENV_DEBUG)?;

        let influx = InfluxConfig {
            url: env.url(ENV_INFLUX_URL)?,
            token: env.required(ENV_INFLUX_TOKEN)?,
            org: env.required(ENV_INFLUX_ORG)?,
            request_timeout: Duration::from_millis(
                env.positive_with_default(ENV_INFLUX_TIMEOUT_MS, DEFAULT_INFLUX_TIMEOUT_MS)?,
            ),
        };

        Ok(Self {
            broker_url,
            client_id,
            topic,
            qos,
            username,
            password,
            tls,
            keep_alive,
            connect_retry_delay,
            session,
            debug,
            influx,
        })
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 读取值，空白视为未设置。
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        let value = self.required(key)?;
        Url::parse(value.trim()).map_err(|err| {
            ConfigError::Invalid(key.to_string(), format!("{} ({})", value, err))
        })
    }

    fn qos(&self, key: &str) -> Result<u8, ConfigError> {
        let value = self.required(key)?;
        match value.trim().parse::<u8>() {
            Ok(qos) if qos <= 2 => Ok(qos),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }

    fn positive(&self, key: &str) -> Result<u64, ConfigError> {
        let value = self.required(key)?;
        parse_positive(key, value)
    }

    /// MQTT keep-alive 在协议中是 u16 秒。
    fn keep_alive(&self, key: &str) -> Result<u64, ConfigError> {
        let value = self.required(key)?;
        match value.trim().parse::<u16>() {
            Ok(seconds) if seconds > 0 => Ok(u64::from(seconds)),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }

    fn positive_with_default(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.optional(key) {
            Some(value) => parse_positive(key, value),
            None => Ok(default),
        }
    }

    fn boolean(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.required(key)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }

    /// CA 为空时不启用双向 TLS；CA 非空时证书与私钥必填。
    fn tls_files(&self) -> Result<Option<TlsFiles>, ConfigError> {
        let Some(ca) = self.optional(ENV_CA_FILE) else {
            return Ok(None);
        };
        let cert = self.required(ENV_CERT_FILE)?;
        let key = self.required(ENV_KEY_FILE)?;
        Ok(Some(TlsFiles {
            ca: PathBuf::from(ca),
            cert: PathBuf::from(cert),
            key: PathBuf::from(key),
        }))
    }
}

fn parse_positive(key: &str, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

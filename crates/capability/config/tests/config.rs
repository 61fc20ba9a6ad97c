use bridge_config::{BridgeConfig, ConfigError, SessionMode};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn base_env() -> HashMap<&'static str, String> {
    let mut env = HashMap::new();
    env.insert("MQTTBROKERURL", "mqtt://broker.local:1883".to_string());
    env.insert("CLIENTID", "bridge-1".to_string());
    env.insert("TOPIC", "sensors/#".to_string());
    env.insert("QOS", "1".to_string());
    env.insert("KEEPALIVE", "30".to_string());
    env.insert("RETRYINTERVAL", "1500".to_string());
    env.insert("DEBUG", "false".to_string());
    env.insert("INFLUXURL", "https://influx.local:8086".to_string());
    env.insert("INFLUXTOKEN", "token-1".to_string());
    env.insert("INFLUXORG", "home".to_string());
    env
}

fn load(env: &HashMap<&'static str, String>) -> Result<BridgeConfig, ConfigError> {
    BridgeConfig::from_lookup(|key| env.get(key).cloned())
}

fn assert_invalid(result: Result<BridgeConfig, ConfigError>, expected_key: &str) {
    match result {
        Err(ConfigError::Invalid(key, _)) => assert_eq!(key, expected_key),
        other => panic!("expected invalid {}, got {:?}", expected_key, other),
    }
}

fn assert_missing(result: Result<BridgeConfig, ConfigError>, expected_key: &str) {
    match result {
        Err(ConfigError::Missing(key)) => assert_eq!(key, expected_key),
        other => panic!("expected missing {}, got {:?}", expected_key, other),
    }
}

#[test]
fn load_config_from_lookup() {
    let config = load(&base_env()).expect("config");
    assert_eq!(config.broker_url.host_str(), Some("broker.local"));
    assert_eq!(config.client_id, "bridge-1");
    assert_eq!(config.topic, "sensors/#");
    assert_eq!(config.qos, 1);
    assert_eq!(config.keep_alive, Duration::from_secs(30));
    assert_eq!(config.connect_retry_delay, Duration::from_millis(1500));
    assert_eq!(config.session, SessionMode::InMemory);
    assert!(config.tls.is_none());
    assert!(!config.debug);
    assert_eq!(config.influx.org, "home");
    assert_eq!(config.influx.request_timeout, Duration::from_millis(10_000));
}

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        for (key, value) in base_env() {
            std::env::set_var(key, value);
        }
        std::env::set_var("SESSIONFOLDER", "/var/lib/bridge");
    }

    let config = BridgeConfig::from_env().expect("config");
    assert_eq!(config.client_id, "bridge-1");
    assert_eq!(
        config.session,
        SessionMode::Durable(PathBuf::from("/var/lib/bridge"))
    );
}

#[test]
fn missing_key_is_named() {
    let mut env = base_env();
    env.remove("INFLUXTOKEN");
    assert_missing(load(&env), "INFLUXTOKEN");

    let mut env = base_env();
    env.insert("CLIENTID", "   ".to_string());
    assert_missing(load(&env), "CLIENTID");
}

#[test]
fn broker_url_must_parse() {
    let mut env = base_env();
    env.insert("MQTTBROKERURL", "not a url".to_string());
    assert_invalid(load(&env), "MQTTBROKERURL");
}

#[test]
fn qos_outside_range_is_rejected() {
    for value in ["3", "-1", "one"] {
        let mut env = base_env();
        env.insert("QOS", value.to_string());
        assert_invalid(load(&env), "QOS");
    }
}

#[test]
fn timers_must_be_positive() {
    let mut env = base_env();
    env.insert("KEEPALIVE", "0".to_string());
    assert_invalid(load(&env), "KEEPALIVE");

    let mut env = base_env();
    env.insert("KEEPALIVE", "70000".to_string());
    assert_invalid(load(&env), "KEEPALIVE");

    let mut env = base_env();
    env.insert("RETRYINTERVAL", "soon".to_string());
    assert_invalid(load(&env), "RETRYINTERVAL");
}

#[test]
fn debug_flag_accepts_short_forms() {
    for (value, expected) in [("T", true), ("1", true), ("True", true), ("f", false), ("0", false)] {
        let mut env = base_env();
        env.insert("DEBUG", value.to_string());
        assert_eq!(load(&env).expect("config").debug, expected, "{}", value);
    }

    let mut env = base_env();
    env.insert("DEBUG", "yes".to_string());
    assert_invalid(load(&env), "DEBUG");
}

#[test]
fn ca_file_requires_client_pair() {
    let mut env = base_env();
    env.insert("CAFILE", "/certs/ca.pem".to_string());
    env.insert("CERTFILE", "/certs/client.pem".to_string());
    assert_missing(load(&env), "KEYFILE");

    env.insert("KEYFILE", "/certs/client.key".to_string());
    let tls = load(&env).expect("config").tls.expect("tls");
    assert_eq!(tls.ca, PathBuf::from("/certs/ca.pem"));
    assert_eq!(tls.key, PathBuf::from("/certs/client.key"));
}

#[test]
fn blank_ca_disables_mutual_tls() {
    let mut env = base_env();
    env.insert("CAFILE", "".to_string());
    env.insert("CERTFILE", "/certs/client.pem".to_string());
    assert!(load(&env).expect("config").tls.is_none());
}

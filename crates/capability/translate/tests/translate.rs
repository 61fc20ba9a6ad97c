use bridge_translate::{
    DecodedMessage, PreFormedMessage, TopicRoute, TranslateError, classify_topic,
    decode_payload, translate, translate_at,
};
use chrono::{DateTime, Duration, Utc};
use domain::{FieldValue, TagSet};

fn ts(value: &str) -> DateTime<Utc> {
    value.parse().expect("timestamp")
}

#[test]
fn topics_with_wrong_segment_count_are_malformed() {
    let topics = [
        "single",
        "a/b/c",
        "a/b/c/d/e",
        "a/b/c/d/e/f",
        "sensors/temperature/kitchen",
    ];
    for topic in topics {
        let err = classify_topic(topic).expect_err(topic);
        assert!(matches!(err, TranslateError::MalformedTopic { .. }), "{}", topic);
        let err = translate(topic, br#"{"unit":"C","value":1}"#).expect_err(topic);
        assert!(matches!(err, TranslateError::MalformedTopic { .. }), "{}", topic);
    }
}

#[test]
fn topics_with_empty_segments_are_malformed() {
    let topics = ["", "/", "main/", "/sub", "a//c/d", "a/b/c/", "/b/c/d"];
    for topic in topics {
        let err = classify_topic(topic).expect_err(topic);
        assert!(matches!(err, TranslateError::MalformedTopic { .. }), "{:?}", topic);
    }
}

#[test]
fn classification_is_by_segment_count() {
    assert_eq!(
        classify_topic("main/sub").expect("pre-formed"),
        TopicRoute::PreFormed {
            bucket: "main",
            measurement: "sub",
        }
    );
    assert_eq!(
        classify_topic("sensors/temperature/kitchen/dht22").expect("sensor"),
        TopicRoute::Sensor {
            bucket: "sensors",
            measurement: "temperature",
            location: "kitchen",
            sensor_id: "dht22",
        }
    );
}

#[test]
fn pre_formed_message_translates_verbatim() {
    let payload = br#"{"measurement":"testMeasurement","tags":{"tag1":"value1"},"fields":{"field1":10},"time":"2024-01-01T00:00:00Z"}"#;
    let point = translate("main/sub", payload).expect("point");

    assert_eq!(point.bucket, "main");
    assert_eq!(point.measurement, "testMeasurement");
    assert_eq!(point.tags.get("tag1").map(String::as_str), Some("value1"));
    assert_eq!(point.fields.get("field1"), Some(&FieldValue::Float(10.0)));
    assert_eq!(point.timestamp, ts("2024-01-01T00:00:00Z"));
}

#[test]
fn sensor_reading_translates_to_single_field_point() {
    let point = translate(
        "sensors/temperature/kitchen/dht22",
        br#"{"unit":"C","value":21.5}"#,
    )
    .expect("point");

    assert_eq!(point.bucket, "sensors");
    assert_eq!(point.measurement, "temperature");
    let mut expected_tags = TagSet::new();
    expected_tags.insert("unit".to_string(), "C".to_string());
    expected_tags.insert("location".to_string(), "kitchen".to_string());
    assert_eq!(point.tags, expected_tags);
    assert_eq!(point.fields.len(), 1);
    assert_eq!(point.fields.get("dht22"), Some(&FieldValue::Float(21.5)));
}

#[test]
fn sensor_timestamp_is_kept_when_present() {
    let point = translate(
        "sensors/temperature/kitchen/dht22",
        br#"{"unit":"C","value":21.5,"timestamp":"2024-03-10T08:30:00+01:00"}"#,
    )
    .expect("point");
    assert_eq!(point.timestamp, ts("2024-03-10T07:30:00Z"));
}

#[test]
fn absent_or_zero_sensor_timestamp_defaults_to_decode_time() {
    let payloads: [&[u8]; 3] = [
        br#"{"unit":"C","value":21.5}"#,
        br#"{"unit":"C","value":21.5,"timestamp":null}"#,
        br#"{"unit":"C","value":21.5,"timestamp":"0001-01-01T00:00:00Z"}"#,
    ];
    for payload in payloads {
        let before = Utc::now();
        let point = translate("sensors/temperature/kitchen/dht22", payload).expect("point");
        let after = Utc::now();
        assert!(point.timestamp >= before && point.timestamp <= after);
        assert!(after - point.timestamp < Duration::seconds(5));
    }
}

#[test]
fn pre_formed_without_time_uses_decode_time() {
    let now = ts("2025-06-01T10:00:00Z");
    let point = translate_at(
        "home/energy",
        br#"{"measurement":"power","fields":{"watts":230.5}}"#,
        now,
    )
    .expect("point");
    assert_eq!(point.timestamp, now);
    assert!(point.tags.is_empty());
}

#[test]
fn pre_formed_message_round_trips_through_json() {
    let mut tags = TagSet::new();
    tags.insert("meter".to_string(), "p1".to_string());
    tags.insert("phase".to_string(), "l2".to_string());
    let message = PreFormedMessage {
        measurement: "electricity".to_string(),
        tags,
        fields: [
            ("delivered".to_string(), FieldValue::Float(1234.5)),
            ("tariff_high".to_string(), FieldValue::Bool(true)),
            ("state".to_string(), FieldValue::from("ok")),
        ]
        .into_iter()
        .collect(),
        time: Some(ts("2024-01-01T00:00:00.123456789Z")),
    };

    let encoded = serde_json::to_vec(&message).expect("encode");
    let route = classify_topic("p1/electricity").expect("route");
    let decoded = decode_payload(&route, &encoded, Utc::now()).expect("decode");
    match decoded {
        DecodedMessage::PreFormed { message: back, timestamp } => {
            assert_eq!(back, message);
            assert_eq!(Some(timestamp), message.time);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn translation_is_idempotent() {
    let topic = "main/sub";
    let payload = br#"{"measurement":"m","tags":{"a":"b"},"fields":{"f":1.5},"time":"2024-01-01T00:00:00Z"}"#;
    let first = translate(topic, payload).expect("first");
    let second = translate(topic, payload).expect("second");
    assert_eq!(first, second);

    let topic = "sensors/temperature/kitchen/dht22";
    let payload = br#"{"unit":"C","value":21.5}"#;
    let mut first = translate(topic, payload).expect("first");
    let second = translate(topic, payload).expect("second");
    first.timestamp = second.timestamp;
    assert_eq!(first, second);
}

#[test]
fn invalid_json_is_a_decode_error_carrying_payload() {
    let payload = b"{not json";
    let err = translate("sensors/temperature/kitchen/dht22", payload).expect_err("decode");
    match err {
        TranslateError::PayloadDecode { payload: kept, .. } => assert_eq!(kept, payload.to_vec()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn missing_required_fields_fail_decode() {
    let cases: [(&str, &[u8]); 4] = [
        ("sensors/temperature/kitchen/dht22", br#"{"value":21.5}"#),
        ("sensors/temperature/kitchen/dht22", br#"{"unit":"C"}"#),
        ("main/sub", br#"{"fields":{"f":1}}"#),
        ("main/sub", br#"{"measurement":"m"}"#),
    ];
    for (topic, payload) in cases {
        let err = translate(topic, payload).expect_err(topic);
        assert!(matches!(err, TranslateError::PayloadDecode { .. }), "{:?}", err);
    }
}

#[test]
fn unknown_fields_are_ignored() {
    let point = translate(
        "sensors/temperature/kitchen/dht22",
        br#"{"unit":"C","value":21.5,"battery":87,"rssi":-60}"#,
    )
    .expect("point");
    assert_eq!(point.fields.len(), 1);
}

#[test]
fn empty_measurement_or_fields_are_invalid() {
    let err = translate("main/sub", br#"{"measurement":"","fields":{"f":1}}"#).expect_err("measurement");
    assert!(matches!(err, TranslateError::InvalidMessage { .. }));

    let err = translate("main/sub", br#"{"measurement":"m","fields":{}}"#).expect_err("fields");
    assert!(matches!(err, TranslateError::InvalidMessage { .. }));
}

#[test]
fn non_scalar_field_values_fail_decode() {
    let err = translate("main/sub", br#"{"measurement":"m","fields":{"f":null}}"#).expect_err("null");
    assert!(matches!(err, TranslateError::PayloadDecode { .. }));
}

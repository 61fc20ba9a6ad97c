//! InfluxDB 行协议编码
//!
//! `measurement[,tag=value...] field=value[,field=value...] timestamp_ns`
//!
//! - measurement 转义 `\`、`,` 与空格
//! - tag key/value 与 field key 转义 `\`、`,`、`=` 与空格
//! - 字符串字段值使用双引号，转义 `"` 与 `\`
//! - tag 按 key 排序，空 key/空 value 的 tag 被省略

use crate::error::StorageError;
use domain::{FieldValue, Point};
use std::fmt::Write;

/// 将点编码为一行行协议（不含换行）。
pub fn encode_point(point: &Point) -> Result<String, StorageError> {
    if point.measurement.is_empty() {
        return Err(StorageError::Encode("measurement is empty".to_string()));
    }
    if point.fields.is_empty() {
        return Err(StorageError::Encode("field set is empty".to_string()));
    }
    let timestamp_ns = point.timestamp.timestamp_nanos_opt().ok_or_else(|| {
        StorageError::Encode(format!("timestamp {} out of range", point.timestamp))
    })?;

    let mut line = escape_measurement(single_line(&point.measurement)?);

    for (key, value) in &point.tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_tag_key(single_line(key)?));
        line.push('=');
        line.push_str(&escape_tag_value(single_line(value)?));
    }

    line.push(' ');
    for (index, (key, value)) in point.fields.iter().enumerate() {
        if key.is_empty() {
            return Err(StorageError::Encode("field key is empty".to_string()));
        }
        if index > 0 {
            line.push(',');
        }
        line.push_str(&escape_field_key(single_line(key)?));
        line.push('=');
        push_field_value(&mut line, key, value)?;
    }

    let _ = write!(line, " {}", timestamp_ns);
    Ok(line)
}

/// 行协议以换行分隔记录，标识符中不能出现换行。
fn single_line(value: &str) -> Result<&str, StorageError> {
    if value.contains(['\n', '\r']) {
        return Err(StorageError::Encode(format!(
            "line break not allowed in `{}`",
            value.escape_debug()
        )));
    }
    Ok(value)
}

/// measurement：`\`、`,` 与空格。
fn escape_measurement(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(' ', "\\ ")
}

/// tag key：`\`、`,`、`=` 与空格。
fn escape_tag_key(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// tag value：同 tag key。
fn escape_tag_value(s: &str) -> String {
    escape_tag_key(s)
}

/// field key：同 tag key。
fn escape_field_key(s: &str) -> String {
    escape_tag_key(s)
}

fn push_field_value(line: &mut String, key: &str, value: &FieldValue) -> Result<(), StorageError> {
    match value {
        FieldValue::Float(v) if !v.is_finite() => {
            return Err(StorageError::Encode(format!(
                "field {} is not a finite number",
                key
            )));
        }
        FieldValue::Float(v) => {
            let _ = write!(line, "{}", v);
        }
        FieldValue::Bool(v) => {
            let _ = write!(line, "{}", v);
        }
        FieldValue::String(v) => {
            line.push('"');
            for ch in v.chars() {
                if ch == '"' || ch == '\\' {
                    line.push('\\');
                }
                line.push(ch);
            }
            line.push('"');
        }
    }
    Ok(())
}

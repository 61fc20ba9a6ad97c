//! 写入端错误类型
//!
//! 定义统一的写入错误类型，用于封装底层错误：
//! - HTTP 客户端构建/请求错误
//! - InfluxDB 拒绝写入
//! - 行协议编码错误

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("client error: {0}")]
    Client(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("write rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("encode error: {0}")]
    Encode(String),
    #[error("sink closed")]
    Closed,
}

//! # 写入端模块
//!
//! 时序数据库写入的统一抽象层。
//!
//! ## 模块说明
//!
//! - [`traits`]：`PointSink` 写入接口（可并发调用）
//! - [`error`]：写入错误类型
//! - [`line_protocol`]：InfluxDB 行协议编码
//! - [`influx`]：InfluxDB v2 HTTP 写入实现（生产环境使用）
//! - [`in_memory`]：内存写入实现（测试与 dry-run）
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use bridge_storage::{InfluxPointSink, InfluxSinkConfig, PointSink};
//!
//! let sink = InfluxPointSink::new(InfluxSinkConfig {
//!     url: "http://localhost:8086".parse()?,
//!     token: "token".to_string(),
//!     request_timeout: std::time::Duration::from_secs(10),
//! })?;
//! sink.write("home", &point).await?;
//! sink.close().await;
//! ```

pub mod error;
pub mod in_memory;
pub mod influx;
pub mod line_protocol;
pub mod traits;

pub use error::*;
pub use in_memory::{InMemoryPointSink, WrittenPoint};
pub use influx::{InfluxPointSink, InfluxSinkConfig};
pub use line_protocol::encode_point;
pub use traits::*;

//! 写入端接口 Trait 定义
//!
//! 设计原则：
//! - 写入端可被多个消息处理任务并发调用（`Send + Sync`）
//! - organization 由调用方传入，目标 bucket 由 Point 自带
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use async_trait::async_trait;
use domain::Point;

/// 时序点写入端。
#[async_trait]
pub trait PointSink: Send + Sync {
    /// 写入单个点到 `org` 下的 `point.bucket`。
    async fn write(&self, org: &str, point: &Point) -> Result<(), StorageError>;

    /// 关闭写入端，之后的写入返回 `StorageError::Closed`。
    async fn close(&self);
}

use crate::error::StorageError;
use crate::traits::PointSink;
use domain::Point;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// 已写入的点及其 organization。
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPoint {
    pub org: String,
    pub point: Point,
}

/// 内存写入端
pub struct InMemoryPointSink {
    points: RwLock<Vec<WrittenPoint>>,
    closed: AtomicBool,
}

impl InMemoryPointSink {
    /// 创建新的内存写入端
    pub fn new() -> Self {
        Self {
            points: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// 获取当前累计的点数量（用于测试）
    pub fn len(&self) -> usize {
        self.points.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取已写入点的副本（用于测试）
    pub fn points(&self) -> Vec<WrittenPoint> {
        self.points.read().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for InMemoryPointSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PointSink for InMemoryPointSink {
    async fn write(&self, org: &str, point: &Point) -> Result<(), StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        let mut points = self
            .points
            .write()
            .map_err(|_| StorageError::Client("lock failed".to_string()))?;
        points.push(WrittenPoint {
            org: org.to_string(),
            point: point.clone(),
        });
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

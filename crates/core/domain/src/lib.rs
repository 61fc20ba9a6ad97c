//! 桥接进程共享的领域模型。

pub mod data;

pub use data::{FieldSet, FieldValue, InboundMessage, Point, TagSet};

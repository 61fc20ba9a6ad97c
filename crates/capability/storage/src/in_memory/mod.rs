//! 内存写入端实现模块
//!
//! 用于测试和 dry-run：记录所有写入的点，不做任何网络 I/O。

pub mod sink;

pub use sink::*;

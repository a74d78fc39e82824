//! 主机指标导出器 - 公共库
//!
//! 提供错误处理、工具函数等共享代码

pub mod errors;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};

//! # tao-core
//!
//! Tao 格式嗅探核心库, 提供统一错误类型与按位读取工具.
//!
//! 上层的 `tao-typefind` 依赖本 crate 解析帧头中的位字段, 并用统一错误类型向调用方报告.

pub mod bitreader;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use error::{TaoError, TaoResult};

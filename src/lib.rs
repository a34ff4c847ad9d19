//! # Tao Sniff
//!
//! 纯 Rust 实现的媒体格式嗅探库: 给定一段字节流, 判断它最可能是什么格式.
//!
//! - **探测器库**: 音频, 视频, 容器, 图像, 压缩包, 文本等八十种左右的格式
//! - **置信度排序**: 按置信度, 注册等级与扩展名提示给出确定的结果
//! - **数据源**: 内存, 文件, 带缓存的任意数据源, HTTP 流
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use tao_sniff::typefind::FileSource;
//!
//! let registry = tao_sniff::default_typefind_registry()?;
//! let mut source = FileSource::open("song.mp3")?;
//! if let Some(best) = registry.identify_best(&mut source, Some("song.mp3")) {
//!     println!("{} ({})", best.caps, best.probability);
//! }
//! # Ok::<(), tao_sniff::core::TaoError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tao-core` | 错误类型与按位读取 |
//! | `tao-typefind` | 数据窗口, 扫描工具, 探测器与注册表 |

/// 错误类型与按位读取
pub use tao_core as core;

/// 格式嗅探引擎
pub use tao_typefind as typefind;

pub mod logging;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置探测器的注册表
pub fn default_typefind_registry() -> tao_core::TaoResult<tao_typefind::TypeFindRegistry> {
    let mut registry = tao_typefind::TypeFindRegistry::new();
    tao_typefind::register_all(&mut registry)?;
    Ok(registry)
}

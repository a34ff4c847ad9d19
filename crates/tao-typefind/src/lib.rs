//! # tao-typefind
//!
//! Tao 格式嗅探引擎: 根据字节流的内容判断其格式.
//!
//! 每种格式由一个探测器负责, 探测器只通过 [`TypeFind`] 打开数据窗口,
//! 给出 "格式描述 + 置信度" 形式的建议. [`TypeFindRegistry`] 按等级调度全部探测器,
//! 再按置信度, 等级与扩展名提示排序结果.
//!
//! 探测器共享的底层工具:
//! - [`scanner`]: 同步帧扫描, 跟踪帧链并校验相邻帧的一致性
//! - [`vint`]: 变长字段解码 (EBML 变长整数, ISO box 大小, WavPack 子块头)
//! - [`walker`]: 链式子块遍历, 带数量与范围上限

pub mod caps;
pub mod probability;
pub mod probe;
pub mod probes;
pub mod rank;
pub mod registry;
pub mod scanner;
pub mod source;
pub mod vint;
pub mod walker;
pub mod window;

// 重导出常用类型
pub use caps::{FormatDescriptor, ParamValue};
pub use probability::Probability;
pub use probe::{BytePattern, Probe, ProbeFn, Suggestion};
pub use rank::Rank;
pub use registry::{ProbeDescriptor, RankedSuggestion, TypeFindConfig, TypeFindRegistry};
pub use source::{ByteSource, CachedSource, FileSource, MemorySource};
pub use window::{TypeFind, Window};

#[cfg(feature = "http")]
pub use source::HttpSource;

/// 注册所有内置探测器
pub fn register_all(registry: &mut TypeFindRegistry) -> tao_core::TaoResult<()> {
    probes::register_all_probes(registry)
}

//! 探测器.
//!
//! 探测器是无状态的启发式函数: 读取若干数据窗口, 给出零到多条带置信度的建议.
//! 三种形态覆盖全部内置探测器:
//! - [`Probe::Pattern`]: 固定偏移处的字节模式 (可带掩码)
//! - [`Probe::ContainerTag`]: 带长度前缀的容器魔数 + 偏移 8 处的类型标签 (RIFF/FORM)
//! - [`Probe::Algorithmic`]: 任意探测函数

use serde::Serialize;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::window::TypeFind;

/// 探测函数类型
pub type ProbeFn = fn(&mut TypeFind<'_>);

/// 一条探测建议
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// 建议的格式
    pub caps: FormatDescriptor,
    /// 置信度
    pub probability: Probability,
}

/// 字节模式
#[derive(Debug, Clone, Copy)]
pub struct BytePattern {
    /// 起始偏移 (负值相对流末尾)
    pub offset: i64,
    /// 期望的字节
    pub bytes: &'static [u8],
    /// 掩码, 与 `bytes` 等长; `None` 表示逐字节精确比较
    pub mask: Option<&'static [u8]>,
}

impl BytePattern {
    /// 精确匹配的模式
    pub const fn new(offset: i64, bytes: &'static [u8]) -> Self {
        Self {
            offset,
            bytes,
            mask: None,
        }
    }

    /// 带掩码的模式: `data[i] & mask[i] == bytes[i]`
    pub const fn masked(offset: i64, bytes: &'static [u8], mask: &'static [u8]) -> Self {
        Self {
            offset,
            bytes,
            mask: Some(mask),
        }
    }

    /// 在数据上检查模式
    pub fn matches_bytes(&self, data: &[u8]) -> bool {
        if data.len() < self.bytes.len() {
            return false;
        }
        match self.mask {
            None => &data[..self.bytes.len()] == self.bytes,
            Some(mask) => self
                .bytes
                .iter()
                .zip(mask)
                .zip(data)
                .all(|((b, m), d)| d & m == *b),
        }
    }

    /// 在流上检查模式
    pub fn matches(&self, tf: &mut TypeFind<'_>) -> bool {
        tf.peek(self.offset, self.bytes.len())
            .is_some_and(|data| self.matches_bytes(&data))
    }
}

/// 模式规则: 全部模式都匹配时给出 `probability`
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    /// 需要同时匹配的模式
    pub patterns: &'static [BytePattern],
    /// 匹配时的置信度
    pub probability: Probability,
}

/// 固定模式探测器
///
/// 按顺序尝试规则, 第一条完全匹配的规则给出建议.
#[derive(Debug, Clone, Copy)]
pub struct PatternProbe {
    /// 规则列表
    pub rules: &'static [PatternRule],
}

impl PatternProbe {
    fn run(&self, tf: &mut TypeFind<'_>, caps: &FormatDescriptor) {
        for rule in self.rules {
            if rule.patterns.iter().all(|p| p.matches(tf)) {
                tf.suggest(rule.probability, caps.clone());
                return;
            }
        }
    }
}

/// 容器标签探测器
///
/// 偏移 0 处是容器魔数 (如 `RIFF`, `FORM`), 偏移 4 处是 32 位长度, 偏移 8 处是类型标签.
#[derive(Debug, Clone, Copy)]
pub struct ContainerTagProbe {
    /// 容器魔数
    pub magic: &'static [u8; 4],
    /// 可接受的类型标签
    pub forms: &'static [&'static [u8; 4]],
    /// 匹配时的置信度
    pub probability: Probability,
}

impl ContainerTagProbe {
    fn run(&self, tf: &mut TypeFind<'_>, caps: &FormatDescriptor) {
        let Some(data) = tf.peek(0, 12) else {
            return;
        };
        if &data[..4] == self.magic && self.forms.iter().any(|f| &data[8..12] == *f) {
            tf.suggest(self.probability, caps.clone());
        }
    }
}

/// 探测器
#[derive(Debug, Clone)]
pub enum Probe {
    /// 固定模式
    Pattern(PatternProbe),
    /// 容器魔数 + 类型标签
    ContainerTag(ContainerTagProbe),
    /// 探测函数
    Algorithmic(ProbeFn),
}

impl Probe {
    /// 对流运行探测器
    ///
    /// `caps` 是注册时声明的格式描述, 数据驱动的探测器直接以它作为建议.
    pub fn run(&self, tf: &mut TypeFind<'_>, caps: &FormatDescriptor) {
        match self {
            Self::Pattern(p) => p.run(tf, caps),
            Self::ContainerTag(c) => c.run(tf, caps),
            Self::Algorithmic(f) => f(tf),
        }
    }
}

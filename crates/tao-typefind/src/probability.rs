//! 探测置信度.
//!
//! 置信度是 0..=100 的整数, 数值越高, 探测器对格式判断越有信心.
//! 超出范围的值在构造时被钳位.

use std::fmt;

use serde::Serialize;

/// 探测置信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Probability(u8);

impl Probability {
    /// 无任何把握, 注册表会丢弃此等级的建议
    pub const NONE: Self = Self(0);
    /// 最低可用置信度
    pub const MINIMUM: Self = Self(1);
    /// 可能是
    pub const POSSIBLE: Self = Self(50);
    /// 很可能是
    pub const LIKELY: Self = Self(80);
    /// 几乎可以确定
    pub const NEARLY_CERTAIN: Self = Self(99);
    /// 完全确定
    pub const MAXIMUM: Self = Self(100);

    /// 创建置信度, 大于 100 的值钳位到 100
    pub const fn new(value: u32) -> Self {
        if value > 100 {
            Self::MAXIMUM
        } else {
            Self(value as u8)
        }
    }

    /// 获取数值
    pub const fn value(self) -> u8 {
        self.0
    }

    /// 加上 n (饱和到 MAXIMUM)
    pub const fn plus(self, n: u32) -> Self {
        Self::new(self.0 as u32 + n)
    }

    /// 减去 n (饱和到 NONE)
    pub const fn minus(self, n: u32) -> Self {
        Self(self.0.saturating_sub(if n > 100 { 100 } else { n as u8 }))
    }

    /// 按比例缩放: `self * num / den`
    pub const fn scale(self, num: u32, den: u32) -> Self {
        if den == 0 {
            return Self::NONE;
        }
        Self::new(self.0 as u32 * num / den)
    }

    /// 两个置信度的算术平均 (向下取整)
    pub const fn average(a: Self, b: Self) -> Self {
        Self(((a.0 as u16 + b.0 as u16) / 2) as u8)
    }

    /// 是否为 NONE
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<Probability> for u32 {
    fn from(p: Probability) -> Self {
        u32::from(p.0)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

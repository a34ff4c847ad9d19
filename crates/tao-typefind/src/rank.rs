//! 探测器优先级.

use std::fmt;

use serde::Serialize;

/// 探测器注册优先级
///
/// 决定扫描顺序, 并在置信度相同时作为第一决胜条件.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Rank(u32);

impl Rank {
    /// 不参与自动探测的偏好
    pub const NONE: Self = Self(0);
    /// 边缘格式 (文本, 裸流)
    pub const MARGINAL: Self = Self(64);
    /// 次要
    pub const SECONDARY: Self = Self(128);
    /// 主要
    pub const PRIMARY: Self = Self(256);

    /// 从原始数值创建
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// 在当前等级上加 n, 用于 "PRIMARY+2" 这类细分
    pub const fn plus(self, n: u32) -> Self {
        Self(self.0.saturating_add(n))
    }

    /// 获取数值
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base, name) = match self.0 {
            v if v >= Self::PRIMARY.0 => (Self::PRIMARY.0, "primary"),
            v if v >= Self::SECONDARY.0 => (Self::SECONDARY.0, "secondary"),
            v if v >= Self::MARGINAL.0 => (Self::MARGINAL.0, "marginal"),
            _ => (0, "none"),
        };
        if self.0 == base {
            write!(f, "{}", name)
        } else {
            write!(f, "{}+{}", name, self.0 - base)
        }
    }
}

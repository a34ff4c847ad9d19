//! 链式子块遍历.
//!
//! box 容器, WavPack 块与 EBML 头部都由 "头部 + 载荷" 的单元首尾相接组成.
//! [`BlockWalker`] 维护游标与当前缓冲窗口: 游标落在缓冲窗口内时直接从中取头部,
//! 否则重新打开窗口; 每一步都检查单元预算, 边界与算术溢出.

use bytes::Bytes;
use log::trace;

use crate::window::TypeFind;

/// 链式子块遍历器
#[derive(Debug, Clone)]
pub struct BlockWalker {
    /// 当前单元的起始偏移
    offset: u64,
    /// 遍历的结束边界 (不含)
    limit: Option<u64>,
    /// 剩余可前进的单元数
    units_left: usize,
    /// 当前缓冲窗口: (起始偏移, 数据)
    buffered: Option<(u64, Bytes)>,
}

impl BlockWalker {
    /// 从 `offset` 开始遍历
    pub fn new(offset: u64) -> Self {
        Self {
            offset,
            limit: None,
            units_left: usize::MAX,
            buffered: None,
        }
    }

    /// 设置结束边界
    pub fn with_limit(mut self, end: u64) -> Self {
        self.limit = Some(end);
        self
    }

    /// 设置单元预算
    pub fn with_max_units(mut self, units: usize) -> Self {
        self.units_left = units;
        self
    }

    /// 以已读取的数据作为初始缓冲窗口
    pub fn with_buffer(mut self, start: u64, data: Bytes) -> Self {
        self.buffered = Some((start, data));
        self
    }

    /// 当前单元的起始偏移
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 尝试从缓冲窗口中取出 `[offset, offset + min)` 起的数据 (至多 `want` 字节)
    fn from_buffer(&self, min: usize, want: usize) -> Option<Bytes> {
        let (start, data) = self.buffered.as_ref()?;
        let end = start + data.len() as u64;
        if self.offset < *start || self.offset + min as u64 > end {
            return None;
        }
        let from = (self.offset - start) as usize;
        let to = (from + want).min(data.len());
        Some(data.slice(from..to))
    }

    /// 读取当前单元的头部
    ///
    /// 至少需要 `min` 字节, 至多返回 `want` 字节. 越过边界或数据不足时返回 `None`.
    pub fn header(&mut self, tf: &mut TypeFind<'_>, min: usize, want: usize) -> Option<Bytes> {
        if self
            .limit
            .is_some_and(|limit| self.offset.saturating_add(min as u64) > limit)
        {
            return None;
        }
        if let Some(data) = self.from_buffer(min, want) {
            return Some(data);
        }
        let window = tf.peek_window_at(self.offset, want.max(min));
        let data = window.into_data()?;
        if data.len() < min {
            return None;
        }
        self.buffered = Some((self.offset, data.clone()));
        Some(data)
    }

    /// 读取整个单元
    ///
    /// 先请求 `total` 字节; 失败时按 3/4 递减请求长度, 直到低于 `floor`.
    /// 返回的数据可能短于 `total`, 调用方据此判断是否拿到了完整单元.
    pub fn unit(&mut self, tf: &mut TypeFind<'_>, total: usize, floor: usize) -> Option<Bytes> {
        if let Some(data) = self.from_buffer(total, total) {
            return Some(data);
        }
        let mut len = total;
        loop {
            if let Some(data) = tf.peek_at(self.offset, len) {
                self.buffered = Some((self.offset, data.clone()));
                return Some(data);
            }
            let next = len / 4 * 3;
            if next < floor || next == len {
                trace!("单元读取失败: offset={}, total={}", self.offset, total);
                return None;
            }
            len = next;
        }
    }

    /// 越过长度为 `total` 的单元
    ///
    /// 预算用尽, 单元长度为 0, 超出边界或偏移溢出时返回 `false`.
    pub fn advance(&mut self, total: u64) -> bool {
        if self.units_left == 0 || total == 0 {
            return false;
        }
        let Some(next) = self.offset.checked_add(total) else {
            return false;
        };
        if self.limit.is_some_and(|limit| next > limit) {
            return false;
        }
        self.units_left -= 1;
        self.offset = next;
        true
    }
}

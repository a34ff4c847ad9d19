//! 数据窗口与探测上下文.
//!
//! 每个探测器在一次调用中得到一个 [`TypeFind`] 上下文, 通过它按需打开数据窗口,
//! 并把结论以建议的形式交回注册表.
//!
//! 窗口的约定:
//! - 负偏移相对流末尾, 仅在长度已知时可用
//! - 窗口永远不会越过流末尾, 只有跨越末尾的请求才会得到短窗口
//! - 超过单次读取上限, 越界或数据源失败时窗口为空 (`data == None`), 从不 panic

use bytes::Bytes;
use log::trace;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::probe::Suggestion;
use crate::source::ByteSource;

/// 默认单次读取上限 (1 MB)
pub const DEFAULT_MAX_PEEK: usize = 1024 * 1024;

/// 数据窗口: 流中一段只读快照
#[derive(Debug, Clone)]
pub struct Window {
    /// 请求的起始偏移 (负值相对流末尾)
    base_offset: i64,
    /// 请求的长度
    requested_len: usize,
    /// 实际数据, 不可读时为 `None`
    data: Option<Bytes>,
}

impl Window {
    /// 请求的起始偏移
    pub fn base_offset(&self) -> i64 {
        self.base_offset
    }

    /// 请求的长度
    pub fn requested_len(&self) -> usize {
        self.requested_len
    }

    /// 实际数据
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    /// 实际可用字节数
    pub fn available(&self) -> usize {
        self.data.as_ref().map_or(0, Bytes::len)
    }

    /// 是否拿到了完整的请求长度
    pub fn is_full(&self) -> bool {
        self.data
            .as_ref()
            .is_some_and(|d| d.len() == self.requested_len)
    }

    /// 取出数据
    pub fn into_data(self) -> Option<Bytes> {
        self.data
    }
}

/// 探测上下文
///
/// 持有数据源的可变借用, 提供窗口读取, 并收集探测器给出的建议.
pub struct TypeFind<'a> {
    source: &'a mut dyn ByteSource,
    length: Option<u64>,
    max_peek: usize,
    suggestions: Vec<Suggestion>,
}

impl<'a> TypeFind<'a> {
    /// 以默认读取上限创建上下文
    pub fn new(source: &'a mut dyn ByteSource) -> Self {
        Self::with_max_peek(source, DEFAULT_MAX_PEEK)
    }

    /// 指定单次读取上限创建上下文
    pub fn with_max_peek(source: &'a mut dyn ByteSource, max_peek: usize) -> Self {
        let length = source.size();
        Self {
            source,
            length,
            max_peek,
            suggestions: Vec::new(),
        }
    }

    /// 流总长度 (未知时为 `None`)
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// 单次读取上限
    pub fn max_peek(&self) -> usize {
        self.max_peek
    }

    /// 把请求偏移换算为绝对偏移
    fn resolve(&self, offset: i64) -> Option<u64> {
        if offset >= 0 {
            return Some(offset as u64);
        }
        let back = offset.unsigned_abs();
        self.length?.checked_sub(back)
    }

    /// 打开数据窗口
    ///
    /// 跨越流末尾时返回短窗口; 其余任何无法满足的请求返回空窗口.
    pub fn peek_window(&mut self, offset: i64, len: usize) -> Window {
        let data = self.fetch(offset, len);
        Window {
            base_offset: offset,
            requested_len: len,
            data,
        }
    }

    fn fetch(&mut self, offset: i64, len: usize) -> Option<Bytes> {
        if len > self.max_peek {
            trace!("读取超过上限: offset={}, len={}", offset, len);
            return None;
        }
        let start = self.resolve(offset)?;
        if self.length.is_some_and(|total| start > total) {
            return None;
        }
        let data = self.source.peek(start, len)?;
        if data.len() > len {
            return Some(data.slice(..len));
        }
        if data.len() < len {
            // 长度已知时, 只有跨越末尾的请求允许变短
            let spans_eof = self
                .length
                .is_none_or(|total| start.saturating_add(len as u64) > total);
            if !spans_eof || (data.is_empty() && len > 0) {
                return None;
            }
        }
        Some(data)
    }

    /// 精确读取 `len` 字节, 不足时返回 `None`
    pub fn peek(&mut self, offset: i64, len: usize) -> Option<Bytes> {
        let data = self.fetch(offset, len)?;
        (data.len() == len).then_some(data)
    }

    /// 以无符号绝对偏移精确读取
    pub fn peek_at(&mut self, offset: u64, len: usize) -> Option<Bytes> {
        let offset = i64::try_from(offset).ok()?;
        self.peek(offset, len)
    }

    /// 以无符号绝对偏移打开窗口
    pub fn peek_window_at(&mut self, offset: u64, len: usize) -> Window {
        match i64::try_from(offset) {
            Ok(offset) => self.peek_window(offset, len),
            Err(_) => Window {
                base_offset: i64::MAX,
                requested_len: len,
                data: None,
            },
        }
    }

    /// 提交一条建议
    pub fn suggest(&mut self, probability: Probability, caps: FormatDescriptor) {
        trace!("建议: {} (置信度 {})", caps, probability);
        self.suggestions.push(Suggestion { caps, probability });
    }

    /// 已提交的建议
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// 取出已提交的建议
    pub fn into_suggestions(self) -> Vec<Suggestion> {
        self.suggestions
    }
}

/// 逐字节游标
///
/// 在一系列分块窗口上逐字节推进, 总扫描量受预算限制.
/// 文本类探测器用它扫描行首, 元素名等.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    /// 当前绝对偏移
    offset: u64,
    /// 起始偏移
    start: u64,
    /// 最多扫描的字节数
    budget: u64,
    /// 当前缓冲块的起始偏移
    chunk_start: u64,
    /// 当前缓冲块
    chunk: Bytes,
    /// 每次读取的块大小
    chunk_size: usize,
}

impl ByteCursor {
    /// 默认块大小
    pub const CHUNK_SIZE: usize = 4096;

    /// 从 `offset` 开始, 最多扫描 `budget` 字节
    pub fn new(offset: u64, budget: u64) -> Self {
        Self {
            offset,
            start: offset,
            budget,
            chunk_start: offset,
            chunk: Bytes::new(),
            chunk_size: Self::CHUNK_SIZE,
        }
    }

    /// 当前偏移
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 前进 n 字节
    pub fn advance(&mut self, n: u64) {
        self.offset = self.offset.saturating_add(n);
    }

    /// 确保游标处至少有 `n` 字节可读, 返回从游标开始的数据
    ///
    /// 超出预算或流末尾时返回 `None`.
    pub fn ensure(&mut self, tf: &mut TypeFind<'_>, n: usize) -> Option<Bytes> {
        if self.offset - self.start + n as u64 > self.budget {
            return None;
        }
        let chunk_end = self.chunk_start + self.chunk.len() as u64;
        if self.offset >= self.chunk_start && self.offset + n as u64 <= chunk_end {
            let from = (self.offset - self.chunk_start) as usize;
            return Some(self.chunk.slice(from..));
        }

        // 读取失败时减半重试, 以适应单次读取受限的宿主
        let mut size = self.chunk_size.max(n);
        loop {
            let window = tf.peek_window_at(self.offset, size);
            match window.into_data() {
                Some(data) if data.len() >= n => {
                    self.chunk_start = self.offset;
                    self.chunk = data.clone();
                    self.chunk_size = size;
                    return Some(data);
                }
                // 短窗口说明已到达流末尾
                Some(_) => return None,
                None if size / 2 >= n.max(1) => size /= 2,
                None => return None,
            }
        }
    }

    /// 读取游标处的字节 (不前进)
    pub fn current(&mut self, tf: &mut TypeFind<'_>) -> Option<u8> {
        self.ensure(tf, 1).map(|d| d[0])
    }

    /// 读取游标处的字节并前进一位
    pub fn next_byte(&mut self, tf: &mut TypeFind<'_>) -> Option<u8> {
        let b = self.current(tf)?;
        self.offset += 1;
        Some(b)
    }

    /// 游标处是否以 `pattern` 开头
    pub fn starts_with(&mut self, tf: &mut TypeFind<'_>, pattern: &[u8]) -> bool {
        self.ensure(tf, pattern.len())
            .is_some_and(|d| d.starts_with(pattern))
    }
}

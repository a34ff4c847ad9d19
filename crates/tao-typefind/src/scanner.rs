//! 同步帧扫描.
//!
//! 裸音频流与系统流没有文件头, 只能靠 "同步码 + 可推算长度的帧头" 识别:
//! 逐字节寻找同步码, 在候选位置解析帧头, 按帧长跳到下一帧继续解析,
//! 连续命中足够多的帧才认为找到了格式.
//!
//! 各格式通过实现 [`FrameFormat`] 接入扫描器, 扫描器本身负责:
//! - 按块缓冲的逐字节同步扫描 ([`SyncWindow`])
//! - 帧链跟踪, 自由格式帧长推断
//! - 接受条件判定
//! - 流起始与中部的交叉验证 ([`corroborate`])

use std::fmt;

use bytes::Bytes;
use log::{debug, trace};

use crate::probability::Probability;
use crate::window::TypeFind;

/// 帧头解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderParse<H> {
    /// 有效帧头及其帧长
    Valid {
        /// 解析出的帧头
        header: H,
        /// 帧长 (含帧头, 必须大于 0)
        length: u64,
    },
    /// 字段合法但比特率为 "自由格式", 帧长需要从相邻帧推断
    FreeFormat,
    /// 不是帧头 (同步码不符, 保留值或禁用值)
    Invalid,
    /// 数据不足, 无法读完帧头
    NeedData,
}

/// 可被同步扫描的帧格式
pub trait FrameFormat {
    /// 帧头信息
    type Header: Clone + fmt::Debug;

    /// 格式名 (用于日志)
    const NAME: &'static str;
    /// 最多扫描的字节数
    const TRY_SYNC: u64;
    /// 需要连续命中的帧数
    const TRY_HEADERS: u32;
    /// 流结束时可接受的最少帧数
    const MIN_HEADERS: u32;
    /// 同步扫描的缓冲块大小
    const SYNC_SIZE: usize = 2048;
    /// 判断同步码需要的字节数
    const SYNC_LEN: usize;

    /// `data` 开头是否是同步码 (`data.len() >= SYNC_LEN`)
    fn is_sync(&self, data: &[u8]) -> bool;

    /// 解析 `offset` 处的帧头
    ///
    /// `free_len` 是已推断出的自由格式帧长.
    fn parse_header(
        &self,
        tf: &mut TypeFind<'_>,
        offset: u64,
        free_len: Option<u64>,
    ) -> HeaderParse<Self::Header>;

    /// 相邻两帧是否属于同一条流 (层, 采样率, 声道等关键字段一致)
    fn same_stream(&self, _prev: &Self::Header, _cur: &Self::Header) -> bool {
        true
    }
}

/// 帧链匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatch<H> {
    /// 帧链中第一个计入的帧的绝对偏移
    pub offset: u64,
    /// 找到同步前跳过的字节数
    pub skipped: u64,
    /// 计入的帧数
    pub found: u32,
    /// 帧链中第一个计入的帧头
    pub header: H,
}

/// 同步扫描缓冲
///
/// 按块读取数据, 游标在块内时直接切片; 读取失败时减半重试, 以适应单次读取受限的宿主.
#[derive(Debug, Clone)]
pub struct SyncWindow {
    start: u64,
    data: Bytes,
    size: usize,
    min: usize,
}

impl SyncWindow {
    /// 创建缓冲, `size` 为块大小, `min` 为每个位置至少需要的字节数
    pub fn new(size: usize, min: usize) -> Self {
        Self {
            start: 0,
            data: Bytes::new(),
            size: size.max(min),
            min,
        }
    }

    /// 返回从 `offset` 开始的数据 (至少 `min` 字节)
    ///
    /// 剩余数据不足 `min` 字节时返回 `None`.
    pub fn get(&mut self, tf: &mut TypeFind<'_>, offset: u64) -> Option<Bytes> {
        let end = self.start + self.data.len() as u64;
        if offset >= self.start && offset + self.min as u64 <= end {
            return Some(self.data.slice((offset - self.start) as usize..));
        }
        let mut size = self.size;
        loop {
            match tf.peek_window_at(offset, size).into_data() {
                Some(data) if data.len() >= self.min => {
                    self.start = offset;
                    self.data = data.clone();
                    return Some(data);
                }
                // 短窗口: 已到达流末尾
                Some(_) => return None,
                None if size > 10 && size / 2 >= self.min => size /= 2,
                None => return None,
            }
        }
    }
}

/// 跨候选位置保留的自由格式状态
#[derive(Debug, Default)]
struct FreeFormatState {
    /// 上一个自由格式帧头的位置
    last_offset: Option<u64>,
    /// 推断出的自由格式帧长
    last_len: Option<u64>,
}

/// 从 `start` 开始扫描帧链
///
/// 在 `F::TRY_SYNC` 字节内逐字节寻找同步码; 对每个候选跟踪帧链,
/// 满足以下任一条件即接受:
/// - 计入 `F::TRY_HEADERS` 帧
/// - 计入至少 `F::MIN_HEADERS` 帧, 且帧链因数据耗尽而中断
///
/// 与前一帧关键字段不一致的帧不计入, 但帧链继续; 帧链总长度限制为 `2 * F::TRY_HEADERS`.
pub fn scan_chain<F: FrameFormat>(
    tf: &mut TypeFind<'_>,
    format: &F,
    start: u64,
) -> Option<ChainMatch<F::Header>> {
    let mut window = SyncWindow::new(F::SYNC_SIZE, F::SYNC_LEN);
    let mut free = FreeFormatState::default();
    let mut skipped = 0u64;

    while skipped < F::TRY_SYNC {
        let offset = start.checked_add(skipped)?;
        let data = window.get(tf, offset)?;
        if format.is_sync(&data[..F::SYNC_LEN]) {
            if let Some((found, first_offset, header)) =
                follow_chain(tf, format, offset, &mut free)
            {
                debug!(
                    "{}: 在偏移 {} 找到 {} 帧 (跳过 {} 字节)",
                    F::NAME,
                    first_offset,
                    found,
                    skipped
                );
                return Some(ChainMatch {
                    offset: first_offset,
                    skipped,
                    found,
                    header,
                });
            }
        }
        skipped += 1;
    }
    None
}

/// 跟踪一条帧链, 满足接受条件时返回 (计入帧数, 首帧偏移, 首帧头)
fn follow_chain<F: FrameFormat>(
    tf: &mut TypeFind<'_>,
    format: &F,
    start: u64,
    free: &mut FreeFormatState,
) -> Option<(u32, u64, F::Header)> {
    let mut offset = start;
    let mut found = 0u32;
    let mut links = 0u32;
    let mut prev: Option<F::Header> = None;
    let mut first: Option<(u64, F::Header)> = None;
    let mut starved = false;

    while found < F::TRY_HEADERS && links < 2 * F::TRY_HEADERS {
        links += 1;
        match format.parse_header(tf, offset, free.last_len) {
            HeaderParse::Valid { header, length } => {
                if length == 0 {
                    break;
                }
                let consistent = prev
                    .as_ref()
                    .is_none_or(|p| format.same_stream(p, &header));
                if consistent {
                    found += 1;
                    if first.is_none() {
                        first = Some((offset, header.clone()));
                    }
                } else {
                    trace!("{}: 偏移 {} 处帧头字段变化, 不计入", F::NAME, offset);
                }
                prev = Some(header);
                let Some(next) = offset.checked_add(length) else {
                    break;
                };
                offset = next;
            }
            HeaderParse::FreeFormat => match free.last_offset {
                Some(last) if last < offset => {
                    free.last_len = Some(offset - last);
                    trace!("{}: 推断自由格式帧长 {}", F::NAME, offset - last);
                    offset = last;
                }
                Some(_) => break,
                None => {
                    free.last_offset = Some(offset);
                    break;
                }
            },
            HeaderParse::Invalid => {
                free.last_len = None;
                break;
            }
            HeaderParse::NeedData => {
                starved = true;
                break;
            }
        }
    }

    let accepted = found == F::TRY_HEADERS || (found >= F::MIN_HEADERS && starved);
    if !accepted {
        return None;
    }
    first.map(|(at, h)| (found, at, h))
}

/// 可交叉验证的扫描结论
pub trait ScanVerdict {
    /// 结论的置信度
    fn probability(&self) -> Probability;
    /// 两个结论是否描述同一种流
    fn agrees_with(&self, other: &Self) -> bool;
}

/// 流起始与中部交叉验证的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corroboration<T> {
    /// 只依据起始结论 (流长度未知, 或起始结论已经足够可信)
    Start(T),
    /// 只在流中部找到
    Middle(T),
    /// 起始与中部一致, 置信度取两者平均
    Averaged {
        /// 起始结论
        verdict: T,
        /// 平均后的置信度
        probability: Probability,
    },
    /// 起始与中部描述的流不同, 不给出建议
    Conflict,
    /// 中部没有找到, 保留起始结论 (可能为空) 供调用方进一步判断
    Unconfirmed(Option<T>),
    /// 流长度未知且起始处没有找到
    Nothing,
}

/// 对整条流做交叉验证
///
/// - 流长度未知: 只看起始结论
/// - 起始结论达到 [`Probability::LIKELY`]: 直接采用
/// - 否则在 `length / 2` 处再扫描一次, 按两处结论的异同合并
pub fn corroborate<T: ScanVerdict>(
    length: Option<u64>,
    start: Option<T>,
    scan_middle: impl FnOnce(u64) -> Option<T>,
) -> Corroboration<T> {
    let Some(length) = length.filter(|&l| l > 0) else {
        return start.map_or(Corroboration::Nothing, Corroboration::Start);
    };
    if let Some(s) = start.as_ref()
        && s.probability() >= Probability::LIKELY
    {
        return start.map_or(Corroboration::Nothing, Corroboration::Start);
    }

    match (start, scan_middle(length / 2)) {
        (None, Some(mid)) => Corroboration::Middle(mid),
        (Some(s), Some(mid)) if !s.agrees_with(&mid) => Corroboration::Conflict,
        (Some(s), Some(mid)) => {
            let probability = Probability::average(s.probability(), mid.probability());
            Corroboration::Averaged {
                verdict: s,
                probability,
            }
        }
        (start, None) => Corroboration::Unconfirmed(start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    /// 测试用帧格式: `[0xAA][len][kind]...`, len 为整帧长度, len == 0xFF 表示自由格式
    struct ToyFrames;

    impl FrameFormat for ToyFrames {
        type Header = u8;
        const NAME: &'static str = "toy";
        const TRY_SYNC: u64 = 64;
        const TRY_HEADERS: u32 = 4;
        const MIN_HEADERS: u32 = 2;
        const SYNC_SIZE: usize = 16;
        const SYNC_LEN: usize = 1;

        fn is_sync(&self, data: &[u8]) -> bool {
            data[0] == 0xAA
        }

        fn parse_header(
            &self,
            tf: &mut TypeFind<'_>,
            offset: u64,
            free_len: Option<u64>,
        ) -> HeaderParse<u8> {
            let Some(d) = tf.peek_at(offset, 3) else {
                return HeaderParse::NeedData;
            };
            if d[0] != 0xAA || d[1] < 3 {
                return HeaderParse::Invalid;
            }
            if d[1] == 0xFF {
                return match free_len {
                    Some(length) => HeaderParse::Valid {
                        header: d[2],
                        length,
                    },
                    None => HeaderParse::FreeFormat,
                };
            }
            HeaderParse::Valid {
                header: d[2],
                length: u64::from(d[1]),
            }
        }

        fn same_stream(&self, prev: &u8, cur: &u8) -> bool {
            prev == cur
        }
    }

    fn frame(len: u8, kind: u8) -> Vec<u8> {
        let mut f = vec![0xAA, len, kind];
        f.resize(len as usize, 0);
        f
    }

    fn scan(data: Vec<u8>) -> Option<ChainMatch<u8>> {
        let mut src = MemorySource::new(data);
        let mut tf = TypeFind::new(&mut src);
        scan_chain(&mut tf, &ToyFrames, 0)
    }

    #[test]
    fn test_完整帧链() {
        let mut data = vec![0u8; 5];
        for _ in 0..6 {
            data.extend(frame(10, 1));
        }
        let m = scan(data).unwrap();
        assert_eq!(m.offset, 5);
        assert_eq!(m.skipped, 5);
        assert_eq!(m.found, 4);
        assert_eq!(m.header, 1);
    }

    #[test]
    fn test_数据耗尽时接受最少帧数() {
        let mut data = frame(10, 1);
        data.extend(frame(10, 1));
        let m = scan(data).unwrap();
        assert_eq!(m.found, 2);

        // 只有一帧不够
        assert!(scan(frame(10, 1)).is_none());
    }

    #[test]
    fn test_坏帧打断帧链() {
        let mut data = frame(10, 1);
        data.extend(frame(10, 1));
        data.extend(vec![0x55; 10]);
        data.extend(frame(10, 1));
        // 0 与 20 处的帧链都被坏帧打断, 30 处单帧之后数据耗尽
        assert!(scan(data).is_none());
    }

    #[test]
    fn test_字段变化不计入但继续跟踪() {
        let mut data = Vec::new();
        for kind in [1, 1, 2, 2, 2, 2] {
            data.extend(frame(10, kind));
        }
        let m = scan(data).unwrap();
        // 第三帧与前一帧不一致, 不计入; 随后的帧与前一帧一致, 继续计数
        assert_eq!(m.offset, 0);
        assert_eq!(m.found, 4);
        assert_eq!(m.header, 1);
    }

    #[test]
    fn test_字段反复变化时帧链长度受限() {
        let mut data = Vec::new();
        for i in 0..40 {
            data.extend(frame(10, (i % 2) as u8));
        }
        // 每一帧都与前一帧不同, 链上最多计入 1 帧
        assert!(scan(data).is_none());
    }

    #[test]
    fn test_自由格式帧长推断() {
        let mut data = Vec::new();
        for _ in 0..5 {
            data.extend(frame(0xFF, 7).into_iter().take(12));
        }
        let m = scan(data).unwrap();
        // 第二个自由格式帧头推断出帧长后, 从第一个帧头重新跟踪
        assert_eq!(m.offset, 0);
        assert_eq!(m.skipped, 12);
        assert_eq!(m.found, 4);
        assert_eq!(m.header, 7);
    }

    #[test]
    fn test_扫描预算() {
        let mut data = vec![0u8; 64];
        for _ in 0..5 {
            data.extend(frame(10, 1));
        }
        assert!(scan(data).is_none());
    }

    #[test]
    fn test_同步缓冲在受限宿主上减半重试() {
        let mut src = MemorySource::new(vec![1u8; 100]).with_peek_limit(12);
        let mut tf = TypeFind::new(&mut src);
        let mut window = SyncWindow::new(64, 4);
        let d = window.get(&mut tf, 0).unwrap();
        assert!(d.len() >= 4 && d.len() <= 12);
        assert!(window.get(&mut tf, 97).is_none());
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Verdict(u8, Probability);

    impl ScanVerdict for Verdict {
        fn probability(&self) -> Probability {
            self.1
        }
        fn agrees_with(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    #[test]
    fn test_交叉验证() {
        let p = Probability::new;
        let weak = || Some(Verdict(3, p(40)));

        assert_eq!(
            corroborate(None, weak(), |_| unreachable!()),
            Corroboration::Start(Verdict(3, p(40)))
        );
        assert_eq!(
            corroborate::<Verdict>(None, None, |_| unreachable!()),
            Corroboration::Nothing
        );
        assert_eq!(
            corroborate(Some(1000), Some(Verdict(3, p(90))), |_| unreachable!()),
            Corroboration::Start(Verdict(3, p(90)))
        );
        assert_eq!(
            corroborate(Some(1000), weak(), |off| {
                assert_eq!(off, 500);
                Some(Verdict(3, p(60)))
            }),
            Corroboration::Averaged {
                verdict: Verdict(3, p(40)),
                probability: p(50)
            }
        );
        assert_eq!(
            corroborate(Some(1000), weak(), |_| Some(Verdict(2, p(60)))),
            Corroboration::Conflict
        );
        assert_eq!(
            corroborate(Some(1000), None, |_| Some(Verdict(2, p(60)))),
            Corroboration::Middle(Verdict(2, p(60)))
        );
        assert_eq!(
            corroborate(Some(1000), weak(), |_| None),
            Corroboration::Unconfirmed(Some(Verdict(3, p(40))))
        );
    }
}

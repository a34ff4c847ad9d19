//! MPEG 音频 (MPEG-1/2/2.5 Layer I/II/III) 裸流探测.
//!
//! 帧头格式 (32 位, 大端):
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//! A: 同步字 (11 位全 1)    B: 版本 (00=2.5, 10=2, 11=1)
//! C: 层 (01=III, 10=II, 11=I)  D: 无 CRC 保护
//! E: 比特率索引            F: 采样率索引
//! G: 填充                  H: 私有位
//! I: 声道模式 (11=单声道)  J..M: 模式扩展, 版权, 原版, 强调
//! ```

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::scanner::{self, ChainMatch, Corroboration, FrameFormat, HeaderParse, ScanVerdict};
use crate::window::TypeFind;

/// 最多扫描的字节数
pub const TRY_SYNC: u64 = 10_000;
/// 需要连续命中的帧数
pub const TRY_HEADERS: u32 = 5;
/// 流结束时可接受的最少帧数
pub const MIN_HEADERS: u32 = 2;

/// 比特率表 (kbps), 索引: [MPEG-1 / MPEG-2(.5)][层 - 1][比特率索引]
const BITRATES: [[[u32; 15]; 3]; 2] = [
    [
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
    ],
    [
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
    ],
];

/// 采样率表, 索引: [MPEG-2.5 / MPEG-2 / MPEG-1][采样率索引]
const SAMPLE_RATES: [[u32; 3]; 3] = [
    [11025, 12000, 8000],
    [22050, 24000, 16000],
    [44100, 48000, 32000],
];

/// MPEG 音频版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    /// MPEG-1
    V1,
    /// MPEG-2 (LSF)
    V2,
    /// MPEG-2.5
    V25,
}

/// 解析后的帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpegAudioHeader {
    /// 版本
    pub version: MpegVersion,
    /// 层 (1-3)
    pub layer: u32,
    /// 声道数
    pub channels: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 比特率 (kbps)
    pub bitrate: u32,
    /// 帧长 (字节, 含帧头)
    pub frame_length: u32,
}

/// 解析 32 位帧头
///
/// 比特率索引为 0 (自由格式) 时, 帧长取 `free_len` (加上填充); 尚未推断出帧长时返回
/// [`HeaderParse::FreeFormat`]. 保留值与禁用值返回 [`HeaderParse::Invalid`].
pub fn parse_header(header: u32, free_len: Option<u64>) -> HeaderParse<MpegAudioHeader> {
    if (header >> 21) != 0x7FF {
        return HeaderParse::Invalid;
    }

    let version = match (header >> 19) & 0x03 {
        0 => MpegVersion::V25,
        2 => MpegVersion::V2,
        3 => MpegVersion::V1,
        _ => return HeaderParse::Invalid,
    };

    let layer = match (header >> 17) & 0x03 {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => return HeaderParse::Invalid,
    };

    let br_idx = ((header >> 12) & 0x0F) as usize;
    if br_idx == 15 {
        return HeaderParse::Invalid;
    }

    let sr_idx = ((header >> 10) & 0x03) as usize;
    if sr_idx == 3 {
        return HeaderParse::Invalid;
    }
    let sample_rate = match version {
        MpegVersion::V25 => SAMPLE_RATES[0][sr_idx],
        MpegVersion::V2 => SAMPLE_RATES[1][sr_idx],
        MpegVersion::V1 => SAMPLE_RATES[2][sr_idx],
    };

    let padding = (header >> 9) & 1;
    let channels = if (header >> 6) & 0x03 == 3 { 1 } else { 2 };

    // Layer III 的 MPEG-2/2.5 每帧采样数减半
    let coef = if layer == 3 && version != MpegVersion::V1 {
        72_000
    } else {
        144_000
    };

    let (frame_length, bitrate) = if br_idx == 0 {
        let Some(free_len) = free_len.and_then(|l| u32::try_from(l).ok()) else {
            return HeaderParse::FreeFormat;
        };
        if layer == 1 {
            let length = padding * 4 + free_len;
            (length, (u64::from(length) * u64::from(sample_rate) / 48_000) as u32)
        } else {
            let length = padding + free_len;
            (length, (u64::from(length) * u64::from(sample_rate) / coef) as u32)
        }
    } else {
        let table = if version == MpegVersion::V1 { 0 } else { 1 };
        let bitrate = BITRATES[table][layer as usize - 1][br_idx];
        let length = if layer == 1 {
            (12_000 * bitrate / sample_rate + padding) * 4
        } else {
            padding + (coef as u32) * bitrate / sample_rate
        };
        (length, bitrate)
    };

    HeaderParse::Valid {
        header: MpegAudioHeader {
            version,
            layer,
            channels,
            sample_rate,
            bitrate,
            frame_length,
        },
        length: u64::from(frame_length),
    }
}

/// 同步扫描用的帧格式
struct MpegAudioFrames;

impl FrameFormat for MpegAudioFrames {
    type Header = MpegAudioHeader;

    const NAME: &'static str = "audio/mpeg";
    const TRY_SYNC: u64 = TRY_SYNC;
    const TRY_HEADERS: u32 = TRY_HEADERS;
    const MIN_HEADERS: u32 = MIN_HEADERS;
    const SYNC_LEN: usize = 1;

    fn is_sync(&self, data: &[u8]) -> bool {
        data[0] == 0xFF
    }

    fn parse_header(
        &self,
        tf: &mut TypeFind<'_>,
        offset: u64,
        free_len: Option<u64>,
    ) -> HeaderParse<MpegAudioHeader> {
        match tf.peek_at(offset, 4) {
            Some(data) => parse_header(BigEndian::read_u32(&data), free_len),
            None => HeaderParse::NeedData,
        }
    }

    fn same_stream(&self, prev: &MpegAudioHeader, cur: &MpegAudioHeader) -> bool {
        // 比特率允许变化 (VBR)
        prev.layer == cur.layer
            && prev.sample_rate == cur.sample_rate
            && prev.channels == cur.channels
    }
}

/// 一次扫描的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpegAudioMatch {
    /// 帧链信息
    pub chain: ChainMatch<MpegAudioHeader>,
    /// 置信度
    pub probability: Probability,
}

impl ScanVerdict for MpegAudioMatch {
    fn probability(&self) -> Probability {
        self.probability
    }

    fn agrees_with(&self, other: &Self) -> bool {
        self.chain.header.layer == other.chain.header.layer
    }
}

/// 流末尾 128 字节是否以 ID3v1 标签开头
fn has_id3v1_trailer(tf: &mut TypeFind<'_>) -> bool {
    tf.peek(-128, 3).is_some_and(|d| &d[..] == b"TAG")
}

/// 从 `start` 开始扫描 MPEG 音频帧链并计算置信度
///
/// 置信度随跳过的字节数线性下降; 非起始位置的结果减半; 无法检查流末尾时打八折;
/// 流末尾带 ID3v1 标签时结果归零 (返回 `None`), 标签应由 ID3 探测器识别.
pub fn scan_mpeg_audio(tf: &mut TypeFind<'_>, start: u64) -> Option<MpegAudioMatch> {
    let chain = scanner::scan_chain(tf, &MpegAudioFrames, start)?;

    let mut prob = u64::from(chain.found) * u64::from(Probability::MAXIMUM.value())
        * (TRY_SYNC - chain.skipped)
        / u64::from(TRY_HEADERS)
        / TRY_SYNC;
    prob = prob.max(u64::from(Probability::MINIMUM.value()));
    if start > 0 {
        prob /= 2;
    }
    match tf.peek(-128, 3) {
        None => prob = prob * 4 / 5,
        Some(tail) if &tail[..] == b"TAG" => prob = 0,
        Some(_) => {}
    }
    debug!(
        "audio/mpeg: 起点 {}, 帧数 {}, 跳过 {}, 置信度 {}",
        start, chain.found, chain.skipped, prob
    );
    if prob == 0 {
        return None;
    }
    Some(MpegAudioMatch {
        chain,
        probability: Probability::new(prob as u32),
    })
}

fn mpeg_audio_caps(header: &MpegAudioHeader) -> FormatDescriptor {
    FormatDescriptor::new("audio/mpeg")
        .with_int("mpegversion", 1)
        .with_int("layer", i64::from(header.layer))
        .with_int("channels", i64::from(header.channels))
        .with_int("rate", i64::from(header.sample_rate))
}

/// audio/mpeg 探测器
pub(crate) fn mpeg_audio_type_find(tf: &mut TypeFind<'_>) {
    let length = tf.length();
    let start = scan_mpeg_audio(tf, 0);

    let (header, prob) = match scanner::corroborate(length, start, |mid| scan_mpeg_audio(tf, mid))
    {
        Corroboration::Start(m) | Corroboration::Middle(m) => (m.chain.header, m.probability),
        Corroboration::Averaged {
            verdict,
            probability,
        } => (verdict.chain.header, probability),
        Corroboration::Conflict => {
            debug!("audio/mpeg: 起始与中部的层不一致");
            return;
        }
        Corroboration::Nothing => return,
        Corroboration::Unconfirmed(start) => {
            if has_id3v1_trailer(tf) {
                return;
            }
            // 起始处恰好是有效帧头时提高置信度, 帧长为 0 的自由格式帧头不算
            let at_zero = tf.peek(0, 4).and_then(|d| {
                match parse_header(BigEndian::read_u32(&d), Some(0)) {
                    HeaderParse::Valid { header, length } if length > 0 => Some(header),
                    _ => None,
                }
            });
            let floor = Probability::POSSIBLE.minus(10);
            match (at_zero, start) {
                (Some(header), Some(m)) => (header, floor.max(m.probability.plus(10))),
                (Some(header), None) => (header, floor),
                (None, Some(m)) => (m.chain.header, m.probability),
                (None, None) => return,
            }
        }
    };

    tf.suggest(prob, mpeg_audio_caps(&header));
}

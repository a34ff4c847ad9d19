//! AAC 裸流探测: ADTS 帧链与 ADIF 头.
//!
//! ADTS 帧头 (7 字节, 无 CRC):
//! ```text
//! syncword(12) ID(1) layer(2) protection_absent(1)
//! profile(2) sf_index(4) private(1) channel_config(3)
//! original(1) home(1) copyright_id(1) copyright_start(1)
//! frame_length(13) buffer_fullness(11) num_raw_blocks(2)
//! ```
//! 同步字只有 12 位, 因此要求第一帧之后紧跟另一个同步字.

use tao_core::{BitReader, TaoResult};

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::scanner::{self, FrameFormat, HeaderParse};
use crate::window::TypeFind;

/// ADTS 帧头最小长度
const ADTS_HEADER_LEN: usize = 7;

/// ADTS 帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    /// 2 (MPEG-2) 或 4 (MPEG-4)
    pub mpegversion: u32,
    /// 采样率索引
    pub sample_rate_index: u8,
    /// 声道配置
    pub channel_config: u8,
}

/// 同步字: 12 位全 1, layer 为 0
fn is_adts_sync(data: &[u8]) -> bool {
    data.len() >= 2 && (u16::from(data[0]) << 8 | u16::from(data[1])) & 0xFFF6 == 0xFFF0
}

/// 按位读取 ADTS 固定头与帧长
fn read_adts_fields(data: &[u8]) -> TaoResult<(AdtsHeader, u64)> {
    let mut br = BitReader::new(data);
    br.skip_bits(12)?;
    let id = br.read_flag()?;
    // layer, protection_absent, profile
    br.skip_bits(5)?;
    let sample_rate_index = br.read_bits(4)? as u8;
    br.skip_bits(1)?;
    let channel_config = br.read_bits(3)? as u8;
    br.skip_bits(4)?;
    let length = u64::from(br.read_bits(13)?);
    let header = AdtsHeader {
        mpegversion: if id { 2 } else { 4 },
        sample_rate_index,
        channel_config,
    };
    Ok((header, length))
}

/// 解析 ADTS 帧头, 返回帧头与帧长
pub fn parse_adts_header(data: &[u8]) -> HeaderParse<AdtsHeader> {
    if data.len() < ADTS_HEADER_LEN - 1 {
        return HeaderParse::NeedData;
    }
    if !is_adts_sync(data) {
        return HeaderParse::Invalid;
    }
    let Ok((header, length)) = read_adts_fields(data) else {
        return HeaderParse::NeedData;
    };
    // 13-15 为保留值
    if header.sample_rate_index >= 13 || length < ADTS_HEADER_LEN as u64 {
        return HeaderParse::Invalid;
    }
    HeaderParse::Valid { header, length }
}

struct AdtsFrames;

impl FrameFormat for AdtsFrames {
    type Header = AdtsHeader;

    const NAME: &'static str = "adts";
    const TRY_SYNC: u64 = 4096;
    const TRY_HEADERS: u32 = 2;
    const MIN_HEADERS: u32 = 2;
    const SYNC_LEN: usize = 2;

    fn is_sync(&self, data: &[u8]) -> bool {
        is_adts_sync(data)
    }

    fn parse_header(
        &self,
        tf: &mut TypeFind<'_>,
        offset: u64,
        _free_len: Option<u64>,
    ) -> HeaderParse<AdtsHeader> {
        match tf.peek_at(offset, ADTS_HEADER_LEN - 1) {
            Some(data) => parse_adts_header(&data),
            None => HeaderParse::NeedData,
        }
    }

    fn same_stream(&self, prev: &AdtsHeader, cur: &AdtsHeader) -> bool {
        prev.mpegversion == cur.mpegversion && prev.sample_rate_index == cur.sample_rate_index
    }
}

fn aac_caps(mpegversion: u32) -> FormatDescriptor {
    FormatDescriptor::new("audio/mpeg")
        .with_int("mpegversion", i64::from(mpegversion))
        .with_bool("framed", false)
}

/// adts_mpeg_stream 探测器
pub(crate) fn aac_type_find(tf: &mut TypeFind<'_>) {
    if tf.peek(0, 4).is_some_and(|d| &d[..] == b"ADIF") {
        tf.suggest(Probability::LIKELY, aac_caps(4));
        return;
    }
    if let Some(chain) = scanner::scan_chain(tf, &AdtsFrames, 0) {
        tf.suggest(Probability::LIKELY, aac_caps(chain.header.mpegversion));
    }
}

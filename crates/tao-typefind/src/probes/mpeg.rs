//! MPEG 系统流与视频基本流探测.
//!
//! - MPEG-1 系统流: 从 pack 头开始跟踪包链 (pack / 系统头 / 结束码 / 普通包)
//! - MPEG-2 系统流: 起始处 pack 头的版本位, 或 PES 起始码
//! - MPEG-1/2 视频基本流: 统计 "图像头 + 条带头" 组合出现的次数

use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace};
use tao_core::{BitReader, TaoError, TaoResult};

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::scanner::{self, FrameFormat, HeaderParse, SyncWindow};
use crate::window::TypeFind;

/// pack 头起始码
const PACK_START: u8 = 0xBA;
/// 系统头起始码
const SYSTEM_HEADER: u8 = 0xBB;
/// ISO 11172 结束码
const END_CODE: u8 = 0xB9;
/// 视频序列头
const SEQUENCE_HEADER: u8 = 0xB3;
/// GOP 头
const GOP_HEADER: u8 = 0xB8;
/// 图像头
const PICTURE_START: u8 = 0x00;
/// 第一个条带
const SLICE_START: u8 = 0x01;

/// `data` 是否以起始码前缀 `00 00 01` 开头
fn has_start_prefix(data: &[u8]) -> bool {
    data.len() >= 4 && data[..3] == [0x00, 0x00, 0x01]
}

fn is_start_code(data: &[u8], code: u8) -> bool {
    has_start_prefix(data) && data[3] == code
}

fn sys_caps(mpegversion: i64) -> FormatDescriptor {
    FormatDescriptor::new("video/mpeg")
        .with_bool("systemstream", true)
        .with_int("mpegversion", mpegversion)
}

// ========================
// MPEG-1 系统流
// ========================

/// MPEG-1 系统流的包链
struct Mpeg1SystemPackets;

/// MPEG-1 pack 头的 `0010` 前缀与 SCR, mux_rate 之间的标记位
///
/// ```text
/// '0010' SCR[32..30] 1 SCR[29..15] 1 SCR[14..0] 1 1 mux_rate(22) 1
/// ```
fn check_pack_markers(d: &[u8]) -> TaoResult<()> {
    let mut br = BitReader::new(d);
    if br.read_bits(4)? != 0b0010 {
        return Err(TaoError::InvalidData("pack 头前缀不是 0010".into()));
    }
    br.skip_bits(3)?;
    br.read_marker()?;
    br.skip_bits(15)?;
    br.read_marker()?;
    br.skip_bits(15)?;
    br.read_marker()?;
    br.read_marker()?;
    br.skip_bits(22)?;
    br.read_marker()
}

impl Mpeg1SystemPackets {
    /// pack 头: 起始码后 8 字节, 检查 SCR 与 mux_rate 的标记位
    fn parse_pack(tf: &mut TypeFind<'_>, body: u64) -> HeaderParse<u8> {
        let Some(d) = tf.peek_at(body, 8) else {
            return HeaderParse::NeedData;
        };
        if let Err(e) = check_pack_markers(&d) {
            trace!("mpeg1 pack 头无效: {}", e);
            return HeaderParse::Invalid;
        }
        HeaderParse::Valid {
            header: PACK_START,
            length: 12,
        }
    }

    /// 系统头: 长度字段之后是 rate_bound 等字段, 然后是每条流 3 字节的描述
    fn parse_system_header(tf: &mut TypeFind<'_>, body: u64) -> HeaderParse<u8> {
        let Some(len) = tf.peek_at(body, 2) else {
            return HeaderParse::NeedData;
        };
        let len = BigEndian::read_u16(&len) as usize;
        if len < 6 {
            return HeaderParse::Invalid;
        }
        let Some(d) = tf.peek_at(body + 2, len) else {
            return HeaderParse::NeedData;
        };
        if (d[0] & 0x80) != 0x80 || (d[2] & 0x01) != 0x01 || (d[4] & 0x20) != 0x20 {
            return HeaderParse::Invalid;
        }
        // stream_id 必须是流 ID (> 0xBB), 其后两位标记为 11
        let streams_ok = d[6..]
            .chunks_exact(3)
            .all(|s| s[0] > SYSTEM_HEADER && (s[1] & 0xC0) == 0xC0);
        if !streams_ok {
            return HeaderParse::Invalid;
        }
        HeaderParse::Valid {
            header: SYSTEM_HEADER,
            length: len as u64 + 6,
        }
    }
}

impl FrameFormat for Mpeg1SystemPackets {
    type Header = u8;

    const NAME: &'static str = "video/mpeg1";
    const TRY_SYNC: u64 = 100 * 1024;
    const TRY_HEADERS: u32 = 4;
    const MIN_HEADERS: u32 = 2;
    const SYNC_LEN: usize = 4;

    fn is_sync(&self, data: &[u8]) -> bool {
        is_start_code(data, PACK_START)
    }

    fn parse_header(
        &self,
        tf: &mut TypeFind<'_>,
        offset: u64,
        _free_len: Option<u64>,
    ) -> HeaderParse<u8> {
        let Some(code) = tf.peek_at(offset, 4) else {
            return HeaderParse::NeedData;
        };
        if !has_start_prefix(&code) {
            return HeaderParse::Invalid;
        }
        let body = offset + 4;
        match code[3] {
            PACK_START => Self::parse_pack(tf, body),
            END_CODE => HeaderParse::Valid {
                header: END_CODE,
                length: 4,
            },
            SYSTEM_HEADER => Self::parse_system_header(tf, body),
            // 低于 0xB9 的是视频起始码, 不属于系统层
            c if c < END_CODE => HeaderParse::Invalid,
            c => match tf.peek_at(body, 2) {
                Some(len) => HeaderParse::Valid {
                    header: c,
                    length: u64::from(BigEndian::read_u16(&len)) + 6,
                },
                None => HeaderParse::NeedData,
            },
        }
    }
}

/// video/mpeg1 系统流探测器
pub(crate) fn mpeg1_sys_type_find(tf: &mut TypeFind<'_>) {
    if let Some(chain) = scanner::scan_chain(tf, &Mpeg1SystemPackets, 0) {
        tf.suggest(Probability::MAXIMUM.minus(1), sys_caps(1));
        debug!("video/mpeg1: 偏移 {} 起 {} 个包", chain.offset, chain.found);
    }
}

// ========================
// MPEG-2 系统流
// ========================

/// video/mpeg2 系统流探测器
///
/// pack 头中 `01` 开头的是 MPEG-2 (带 SCR 扩展), `0010` 开头的是 MPEG-1;
/// 直接以视频, 音频或私有流 PES 开头的按 MPEG-2 处理.
pub(crate) fn mpeg2_sys_type_find(tf: &mut TypeFind<'_>) {
    let Some(d) = tf.peek(0, 5) else {
        return;
    };
    if !has_start_prefix(&d) {
        return;
    }
    let version = match d[3] {
        PACK_START if d[4] & 0xC0 == 0x40 => 2,
        PACK_START if d[4] & 0xF0 == 0x20 => 1,
        0xE0 | 0xC0 | 0xBD => 2,
        _ => return,
    };
    tf.suggest(Probability::MAXIMUM, sys_caps(version));
}

// ========================
// MPEG 视频基本流
// ========================

/// 需要找到的 "图像 + 条带" 组合数
const TRY_PICTURES: u32 = 6;
/// 最多扫描的字节数
const VIDEO_TRY_SYNC: u64 = 100 * 1024;
/// 扫描缓冲块大小
const VIDEO_SYNC_SIZE: usize = 2048;
/// 每个位置至少需要的字节数
const VIDEO_MIN_BYTES: usize = 5;

/// video/mpeg-stream 探测器
///
/// 序列头与 GOP 头跳过 8 字节, 图像头跳过 8 字节后紧跟 (或错开一个字节的)
/// 条带起始码即计为一帧.
pub(crate) fn mpeg_video_stream_type_find(tf: &mut TypeFind<'_>) {
    let mut window = SyncWindow::new(VIDEO_SYNC_SIZE, VIDEO_MIN_BYTES);
    let mut offset = 0u64;
    let mut found = 0u32;

    loop {
        if found >= TRY_PICTURES {
            tf.suggest(
                Probability::MAXIMUM.minus(2),
                FormatDescriptor::new("video/mpeg")
                    .with_bool("systemstream", false)
                    .with_int("mpegversion", 1),
            );
            return;
        }
        if offset > VIDEO_TRY_SYNC {
            break;
        }
        let Some(mut data) = window.get(tf, offset) else {
            break;
        };

        if is_start_code(&data, SEQUENCE_HEADER) || is_start_code(&data, GOP_HEADER) {
            let code = data[3];
            offset += 8;
            if code == SEQUENCE_HEADER {
                continue;
            }
            // GOP 之后应当是图像头
            match window.get(tf, offset) {
                Some(next) => data = next,
                None => break,
            }
        }

        if is_start_code(&data, PICTURE_START) {
            offset += 8;
            let Some(next) = window.get(tf, offset) else {
                break;
            };
            if is_start_code(&next, SLICE_START) || is_start_code(&next[1..], SLICE_START) {
                offset += 4;
                found += 1;
                continue;
            }
        }

        offset += 1;
    }
    debug!("video/mpeg-stream: 只找到 {} 帧", found);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::run_probe;

    const PACK: [u8; 12] = [
        0x00, 0x00, 0x01, 0xBA, 0x21, 0x00, 0x01, 0x00, 0x01, 0x80, 0x00, 0x01,
    ];

    fn packet(id: u8, payload: usize) -> Vec<u8> {
        let mut p = vec![0x00, 0x00, 0x01, id];
        p.extend_from_slice(&(payload as u16).to_be_bytes());
        p.extend(vec![0xAAu8; payload]);
        p
    }

    #[test]
    fn test_mpeg1_系统流() {
        let mut data = vec![0u8; 17];
        for _ in 0..2 {
            data.extend_from_slice(&PACK);
            data.extend(packet(0xE0, 20));
        }
        data.extend(vec![0u8; 64]);
        let s = run_probe(mpeg1_sys_type_find, &data);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].probability, Probability::new(99));
        assert_eq!(s[0].caps.int_param("mpegversion"), Some(1));
    }

    #[test]
    fn test_mpeg1_系统头() {
        let mut data = PACK.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xBB, 0x00, 0x09]);
        data.extend_from_slice(&[0x80, 0x00, 0x01, 0x00, 0x21, 0xFF, 0xE0, 0xE0, 0xE8]);
        data.extend(packet(0xC0, 10));
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xB9]);
        data.extend(vec![0u8; 16]);
        let s = run_probe(mpeg1_sys_type_find, &data);
        assert_eq!(s.len(), 1);

        // 流描述中的 stream_id 不合法
        let bad_stream = data.len() - 16 - 4 - 16 - 3;
        data[bad_stream] = 0x10;
        assert!(run_probe(mpeg1_sys_type_find, &data).is_empty());
    }

    #[test]
    fn test_mpeg1_标记位错误() {
        let mut pack = PACK;
        // mux_rate 前的标记位
        pack[9] = 0x00;
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&pack);
        }
        assert!(run_probe(mpeg1_sys_type_find, &data).is_empty());
    }

    #[test]
    fn test_mpeg2_系统流() {
        let s = run_probe(mpeg2_sys_type_find, &[0x00, 0x00, 0x01, 0xBA, 0x44]);
        assert_eq!(s[0].caps.int_param("mpegversion"), Some(2));
        let s = run_probe(mpeg2_sys_type_find, &[0x00, 0x00, 0x01, 0xBA, 0x21]);
        assert_eq!(s[0].caps.int_param("mpegversion"), Some(1));
        let s = run_probe(mpeg2_sys_type_find, &[0x00, 0x00, 0x01, 0xE0, 0x07]);
        assert_eq!(s[0].probability, Probability::MAXIMUM);
        assert!(run_probe(mpeg2_sys_type_find, &[0x00, 0x00, 0x01, 0xB3, 0x00]).is_empty());
    }

    fn video_stream(pictures: usize) -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x01, 0xB3, 0x16, 0x00, 0xF0, 0x13, 0xFF, 0xFF, 0xE0, 0x18];
        for _ in 0..pictures {
            data.extend_from_slice(&[0x00, 0x00, 0x01, 0xB8, 0x00, 0x08, 0x00, 0x40]);
            data.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x0F, 0xFF, 0xF8]);
            data.extend_from_slice(&[0x00, 0x00, 0x01, 0x01]);
            data.extend(vec![0x55u8; 40]);
        }
        data
    }

    #[test]
    fn test_视频基本流() {
        let s = run_probe(mpeg_video_stream_type_find, &video_stream(8));
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].probability, Probability::new(98));
        assert_eq!(s[0].caps.int_param("mpegversion"), Some(1));
    }

    #[test]
    fn test_视频帧数不足() {
        assert!(run_probe(mpeg_video_stream_type_find, &video_stream(3)).is_empty());
    }
}

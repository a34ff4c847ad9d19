//! Ogg 容器与 Ogg 内常见逻辑流的头包探测.
//!
//! 头包探测器 (vorbis, speex, skeleton, cmml) 面向已经拆出的第一个包,
//! 因此从偏移 0 开始检查.

use byteorder::{ByteOrder, LittleEndian};

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::window::TypeFind;

/// Ogg 页同步字
const OGG_CAPTURE: &[u8; 4] = b"OggS";
/// Skeleton 头包标识
const FISHEAD: &[u8; 8] = b"fishead\0";
/// 第一页页头 (27 字节) + 1 字节段表之后是第一个包
const FIRST_PACKET_OFFSET: i64 = 28;

/// application/ogg 探测器, 第一个包是 Skeleton 时同时给出 Annodex
pub(crate) fn ogganx_type_find(tf: &mut TypeFind<'_>) {
    let is_annodex = tf
        .peek(FIRST_PACKET_OFFSET, FISHEAD.len())
        .is_some_and(|d| d[..] == FISHEAD[..]);

    if !tf.peek(0, 4).is_some_and(|d| d[..] == OGG_CAPTURE[..]) {
        return;
    }
    if is_annodex {
        tf.suggest(
            Probability::MAXIMUM,
            FormatDescriptor::new("application/x-annodex"),
        );
    }
    tf.suggest(Probability::MAXIMUM, FormatDescriptor::new("application/ogg"));
}

/// Vorbis 标识头是否合法
///
/// ```text
/// 0x01 "vorbis" version:u32(=0) channels:u8 rate:u32 bitrates:3*u32 blocksizes:u8 framing:u8
/// ```
fn is_vorbis_ident(data: &[u8]) -> bool {
    if &data[..11] != b"\x01vorbis\0\0\0\0" {
        return false;
    }
    if data[11] == 0 || LittleEndian::read_u32(&data[12..16]) == 0 {
        return false;
    }
    let blocksize_0 = data[28] & 0x0F;
    let blocksize_1 = data[28] >> 4;
    if blocksize_0 > blocksize_1 {
        return false;
    }
    if !(6..=13).contains(&blocksize_0) || !(6..=13).contains(&blocksize_1) {
        return false;
    }
    data[29] & 0x01 == 1
}

/// audio/x-vorbis 探测器
pub(crate) fn vorbis_type_find(tf: &mut TypeFind<'_>) {
    if tf.peek(0, 30).is_some_and(|d| is_vorbis_ident(&d)) {
        tf.suggest(Probability::MAXIMUM, FormatDescriptor::new("audio/x-vorbis"));
    }
}

/// audio/x-speex 探测器
///
/// 80 字节头: 8 字节 "Speex   ", 24 字节版本, 之后依次是头长度, 采样率, 模式.
pub(crate) fn speex_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 80) else {
        return;
    };
    if &data[..8] != b"Speex   " {
        return;
    }
    let header_size = LittleEndian::read_u32(&data[32..36]);
    let rate = LittleEndian::read_u32(&data[36..40]);
    let mode = LittleEndian::read_u32(&data[40..44]);
    if header_size < 80 || rate > 48000 || mode > 3 {
        return;
    }
    tf.suggest(Probability::MAXIMUM, FormatDescriptor::new("audio/x-speex"));
}

/// application/x-ogg-skeleton 探测器, 只接受 3.0 版本
pub(crate) fn oggskel_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 12) else {
        return;
    };
    if data[..8] != FISHEAD[..] {
        return;
    }
    let major = LittleEndian::read_u16(&data[8..10]);
    let minor = LittleEndian::read_u16(&data[10..12]);
    if (major, minor) == (3, 0) {
        tf.suggest(
            Probability::MAXIMUM,
            FormatDescriptor::new("application/x-ogg-skeleton").with_bool("parsed", false),
        );
    }
}

/// text/x-cmml 探测器, 主版本至少为 2
pub(crate) fn cmml_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 12) else {
        return;
    };
    if &data[..8] == b"CMML\0\0\0\0" && LittleEndian::read_u16(&data[8..10]) >= 2 {
        tf.suggest(Probability::MAXIMUM, FormatDescriptor::new("text/x-cmml"));
    }
}

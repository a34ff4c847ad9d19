//! WavPack 探测.
//!
//! 块头 32 字节 (`wvpk` + ckSize + ...), 之后是一串元数据子块.
//! 第一个非可选的码流子块 (按 ID 低 4 位比较) 决定文件类型:
//! - `ID_WV_BITSTREAM` (0x0a) / `ID_WVX_BITSTREAM` (0x0c): 主文件
//! - `ID_WVC_BITSTREAM` (0x0b): 校正文件

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::vint::{self, SubBlockHeader};
use crate::walker::BlockWalker;
use crate::window::TypeFind;

/// 块头长度
const BLOCK_HEADER_LEN: usize = 32;
/// 块读取失败时缩小请求的下限
const MIN_BLOCK_REQUEST: usize = 512;

const ID_WV_BITSTREAM: u8 = 0x0a;
const ID_WVC_BITSTREAM: u8 = 0x0b;
const ID_WVX_BITSTREAM: u8 = 0x0c;
/// 码流子块比较时只看低 4 位
const BITSTREAM_ID_MASK: u8 = 0x0f;

/// 码流子块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bitstream {
    /// 主文件
    Audio,
    /// 校正文件
    Correction,
}

/// 遍历第一个块的子块, 返回第一个码流子块的类型
fn first_bitstream(tf: &mut TypeFind<'_>) -> Option<Bitstream> {
    let head = tf.peek(0, BLOCK_HEADER_LEN)?;
    if &head[..4] != b"wvpk" {
        return None;
    }
    let block_size = usize::try_from(LittleEndian::read_u32(&head[4..8])).ok()?;

    // 第一个块可能超过宿主的单次读取上限, 读不到完整块时按比例缩小请求
    let block = BlockWalker::new(0).unit(
        tf,
        BLOCK_HEADER_LEN.checked_add(block_size)?,
        MIN_BLOCK_REQUEST,
    )?;
    let available = block.len();
    let body_len = (available - BLOCK_HEADER_LEN) as u64;

    let mut walker = BlockWalker::new(BLOCK_HEADER_LEN as u64)
        .with_limit(available as u64)
        .with_buffer(0, block);
    while let Some(data) = walker.header(tf, 2, 4) {
        let sub = vint::decode_wavpack_subblock(&data).ok()?;
        if sub.total_len > body_len {
            trace!("wavpack: 子块长度 {} 超过块长度", sub.total_len);
            return None;
        }
        if sub.id & SubBlockHeader::ID_OPTIONAL_DATA == 0 {
            match sub.id & BITSTREAM_ID_MASK {
                ID_WV_BITSTREAM | ID_WVX_BITSTREAM => return Some(Bitstream::Audio),
                ID_WVC_BITSTREAM => return Some(Bitstream::Correction),
                _ => {}
            }
        }
        if !walker.advance(sub.total_len) {
            break;
        }
    }
    None
}

/// audio/x-wavpack 探测器
pub(crate) fn wavpack_type_find(tf: &mut TypeFind<'_>) {
    if first_bitstream(tf) == Some(Bitstream::Audio) {
        tf.suggest(
            Probability::LIKELY,
            FormatDescriptor::new("audio/x-wavpack").with_bool("framed", false),
        );
    }
}

/// audio/x-wavpack-correction 探测器
pub(crate) fn wavpack_correction_type_find(tf: &mut TypeFind<'_>) {
    if first_bitstream(tf) == Some(Bitstream::Correction) {
        tf.suggest(
            Probability::LIKELY,
            FormatDescriptor::new("audio/x-wavpack-correction").with_bool("framed", false),
        );
    }
}

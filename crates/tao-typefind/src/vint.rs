//! 变长字段解码.
//!
//! 三种容器用不同方式编码 "后面还有多少字节":
//!
//! # EBML 变长整数 (VINT)
//! ```text
//! 首字节的前导 1 位之前的 0 的数量决定了字节长度:
//!   1xxxxxxx                  → 1 字节 (7 位数据)
//!   01xxxxxx xxxxxxxx         → 2 字节 (14 位数据)
//!   001xxxxx xxxxxxxx ×2      → 3 字节 (21 位数据)
//!   ...依此类推, 最多 8 字节
//! ```
//! 数据位全为 1 表示 "未知大小".
//!
//! # ISO/QuickTime box 大小
//! ```text
//! Size:       4 bytes (big-endian, 含头部本身)
//! Type:       4 bytes (FourCC)
//! [ExtSize]:  8 bytes (仅当 Size==1 时存在, 64-bit 大小)
//! ```
//!
//! # WavPack 元数据子块
//! ```text
//! id:         1 byte  (0x80 = ID_LARGE, 0x40 = ID_ODD_SIZE, 低 6 位为类型)
//! word_size:  1 或 3 bytes (little-endian, 单位为 16 位字)
//! ```

use byteorder::{BigEndian, ByteOrder};
use tao_core::{TaoError, TaoResult};

/// 解码后的变长整数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt {
    /// 数值 (元素 ID 保留标记位, 大小字段去掉标记位)
    pub value: u64,
    /// 编码占用的字节数
    pub width: usize,
}

impl VarInt {
    /// 数据位是否全为 1 ("未知大小")
    pub fn is_unknown(&self) -> bool {
        self.width <= 8 && self.value == (1u64 << (7 * self.width)) - 1
    }
}

/// 从首字节计算 VINT 宽度
fn vint_width(first: u8, max_width: usize) -> TaoResult<usize> {
    if first == 0 {
        return Err(TaoError::InvalidData("VINT: 首字节为 0, 宽度超过 8".into()));
    }
    let width = first.leading_zeros() as usize + 1;
    if width > max_width {
        return Err(TaoError::InvalidData(format!(
            "VINT: 宽度 {} 超过上限 {}",
            width, max_width
        )));
    }
    Ok(width)
}

/// 解码 EBML 变长整数 (大小字段, 去掉标记位)
///
/// `max_width` 不超过 8; 数据不足时返回 [`TaoError::NeedMoreData`].
pub fn decode_vint(data: &[u8], max_width: usize) -> TaoResult<VarInt> {
    let first = *data.first().ok_or(TaoError::NeedMoreData)?;
    let width = vint_width(first, max_width.min(8))?;
    if data.len() < width {
        return Err(TaoError::NeedMoreData);
    }
    let mut value = u64::from(first) & (0xFFu64 >> width);
    for &b in &data[1..width] {
        value = (value << 8) | u64::from(b);
    }
    Ok(VarInt { value, width })
}

/// 解码 EBML 元素 ID (保留标记位, 最多 4 字节)
pub fn decode_element_id(data: &[u8]) -> TaoResult<VarInt> {
    let first = *data.first().ok_or(TaoError::NeedMoreData)?;
    let width = vint_width(first, 4)?;
    if data.len() < width {
        return Err(TaoError::NeedMoreData);
    }
    let value = data[..width]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    Ok(VarInt { value, width })
}

/// 以指定宽度编码 EBML 变长整数
pub fn encode_vint(value: u64, width: usize) -> TaoResult<Vec<u8>> {
    if !(1..=8).contains(&width) {
        return Err(TaoError::InvalidArgument(format!("VINT: 无效宽度 {}", width)));
    }
    let max = (1u64 << (7 * width)) - 1;
    if value > max {
        return Err(TaoError::InvalidArgument(format!(
            "VINT: 值 {} 无法用 {} 字节表示",
            value, width
        )));
    }
    let encoded = (1u64 << (7 * width)) | value;
    Ok(encoded.to_be_bytes()[8 - width..].to_vec())
}

/// box 大小
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxSize {
    /// box 总大小 (含头部)
    pub size: u64,
    /// 头部长度: 8, 或带扩展大小时为 16
    pub header_len: usize,
}

/// 解码 box 头部的大小字段
///
/// `data` 从 box 起始处开始. 大小为 1 时读取类型之后的 64 位扩展大小;
/// 其余小于 8 的值 (包括 "延伸到文件末尾" 的 0) 视为无效.
pub fn decode_box_size(data: &[u8]) -> TaoResult<BoxSize> {
    if data.len() < 8 {
        return Err(TaoError::NeedMoreData);
    }
    let size = BigEndian::read_u32(&data[..4]);
    match size {
        1 => {
            if data.len() < 16 {
                return Err(TaoError::NeedMoreData);
            }
            let size = BigEndian::read_u64(&data[8..16]);
            if size < 16 {
                return Err(TaoError::InvalidData(format!(
                    "box: 扩展大小 {} 小于头部长度",
                    size
                )));
            }
            Ok(BoxSize {
                size,
                header_len: 16,
            })
        }
        s if s < 8 => Err(TaoError::InvalidData(format!("box: 无效大小 {}", s))),
        s => Ok(BoxSize {
            size: u64::from(s),
            header_len: 8,
        }),
    }
}

/// WavPack 元数据子块头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubBlockHeader {
    /// 子块 ID 字节 (含标志位)
    pub id: u8,
    /// 头部长度 (2 或 4)
    pub header_len: usize,
    /// 子块总长度 (含头部)
    pub total_len: u64,
}

impl SubBlockHeader {
    /// ID_LARGE 标志: 长度字段为 3 字节
    pub const ID_LARGE: u8 = 0x80;
    /// ID_OPTIONAL_DATA 标志: 解码器可忽略的子块
    pub const ID_OPTIONAL_DATA: u8 = 0x20;

    /// 去掉标志位后的子块类型
    pub fn kind(&self) -> u8 {
        self.id & 0x3F
    }
}

/// 解码 WavPack 元数据子块头部
pub fn decode_wavpack_subblock(data: &[u8]) -> TaoResult<SubBlockHeader> {
    if data.len() < 2 {
        return Err(TaoError::NeedMoreData);
    }
    let id = data[0];
    let (words, header_len) = if id & SubBlockHeader::ID_LARGE != 0 {
        if data.len() < 4 {
            return Err(TaoError::NeedMoreData);
        }
        let words =
            u64::from(data[1]) | (u64::from(data[2]) << 8) | (u64::from(data[3]) << 16);
        (words, 4)
    } else {
        (u64::from(data[1]), 2)
    };
    Ok(SubBlockHeader {
        id,
        header_len,
        total_len: words * 2 + header_len as u64,
    })
}

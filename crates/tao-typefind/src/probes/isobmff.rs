//! ISO 基础媒体文件格式 / QuickTime 探测.
//!
//! box 结构:
//! ```text
//! Size:       4 bytes (big-endian)
//! Type:       4 bytes (FourCC)
//! [ExtSize]:  8 bytes (仅当 Size==1 时存在)
//! ```

use byteorder::{BigEndian, ByteOrder};
use log::trace;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::vint;
use crate::walker::BlockWalker;
use crate::window::TypeFind;

/// 顶层 box 遍历上限
pub const MAX_TOP_LEVEL_BOXES: usize = 64;
/// ftyp 兼容品牌检查上限
const MAX_COMPATIBLE_BRANDS: usize = 256;

/// 3GPP 系列品牌前缀
fn is_3gp_brand(brand: &[u8]) -> bool {
    matches!(&brand[..3], b"3gp" | b"3gr" | b"3gs" | b"3gg")
}

/// application/x-3gp 探测器
///
/// 主品牌是 3GPP 时给出最高置信度; 否则在兼容品牌列表中查找.
pub(crate) fn q3gp_type_find(tf: &mut TypeFind<'_>) {
    let Some(head) = tf.peek(0, 12) else {
        return;
    };
    if &head[4..8] != b"ftyp" {
        return;
    }
    if is_3gp_brand(&head[8..11]) {
        tf.suggest(
            Probability::MAXIMUM,
            FormatDescriptor::new("application/x-3gp"),
        );
        return;
    }

    // 偏移 12 是 minor_version, 兼容品牌从 16 开始
    let ftyp_size = u64::from(BigEndian::read_u32(&head[..4]));
    for offset in (16..ftyp_size).step_by(4).take(MAX_COMPATIBLE_BRANDS) {
        let Some(brand) = tf.peek_at(offset, 3) else {
            break;
        };
        if is_3gp_brand(&brand) {
            tf.suggest(
                Probability::LIKELY,
                FormatDescriptor::new("application/x-3gp"),
            );
            return;
        }
    }
}

/// ISO 与 QuickTime 共有的顶层 box
fn is_common_box(kind: &[u8]) -> bool {
    matches!(kind, b"moov" | b"mdat" | b"ftyp" | b"free" | b"skip")
}

/// 仅 QuickTime 使用的顶层 box
fn is_quicktime_box(kind: &[u8]) -> bool {
    matches!(kind, b"pnot" | b"PICT" | b"wide")
}

/// video/quicktime 探测器
///
/// 逐个遍历顶层 box: 第一个共有 box 给出 "很可能", 之后的共有 box 提升到 "几乎确定";
/// 遇到 QuickTime 专有 box 直接给出最高置信度; 遇到未知 box 则放弃.
pub(crate) fn qt_type_find(tf: &mut TypeFind<'_>) {
    let mut walker = BlockWalker::new(0).with_max_units(MAX_TOP_LEVEL_BOXES);
    let mut tip = Probability::NONE;

    while let Some(head) = walker.header(tf, 8, 16) {
        let kind = &head[4..8];
        if is_common_box(kind) {
            tip = if tip.is_none() {
                Probability::LIKELY
            } else {
                Probability::NEARLY_CERTAIN
            };
        } else if is_quicktime_box(kind) {
            tip = Probability::MAXIMUM;
            break;
        } else {
            trace!("video/quicktime: 偏移 {} 处未知 box", walker.offset());
            tip = Probability::NONE;
            break;
        }

        let Ok(size) = vint::decode_box_size(&head) else {
            break;
        };
        if !walker.advance(size.size) {
            break;
        }
    }

    if !tip.is_none() {
        tf.suggest(tip, FormatDescriptor::new("video/quicktime"));
    }
}

//! Matroska / WebM 探测.
//!
//! 文件以 EBML 头元素开头:
//! ```text
//! 1A 45 DF A3 <size:vint> { <id:vint> <size:vint> <data> }*
//! ```
//! 头元素的子元素中 DocType (0x4282) 给出文档类型.

use log::trace;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::vint;
use crate::walker::BlockWalker;
use crate::window::TypeFind;

/// EBML 头元素 ID
const EBML_HEADER_ID: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
/// DocType 元素 ID
const DOC_TYPE_ID: u64 = 0x4282;
/// 头元素内最多检查的子元素数
const MAX_HEADER_CHILDREN: usize = 32;
/// DocType 字符串长度上限
const MAX_DOC_TYPE_LEN: u64 = 64;

/// 读取 EBML 头中的 DocType
fn read_doc_type(tf: &mut TypeFind<'_>) -> Option<String> {
    let head = tf.peek_window(0, 12).into_data()?;
    if head.len() < 5 || head[..4] != EBML_HEADER_ID {
        return None;
    }
    let size = vint::decode_vint(&head[4..], 8).ok()?;
    let start = 4 + size.width as u64;

    let mut walker = BlockWalker::new(start).with_max_units(MAX_HEADER_CHILDREN);
    if !size.is_unknown() {
        walker = walker.with_limit(start.checked_add(size.value)?);
    }

    while let Some(child) = walker.header(tf, 2, 12) {
        let id = vint::decode_element_id(&child).ok()?;
        let len = vint::decode_vint(&child[id.width..], 8).ok()?;
        let data_offset = walker.offset() + (id.width + len.width) as u64;
        if id.value == DOC_TYPE_ID {
            if len.value > MAX_DOC_TYPE_LEN {
                return None;
            }
            let data = tf.peek_at(data_offset, len.value as usize)?;
            let doc_type = String::from_utf8_lossy(&data)
                .trim_end_matches('\0')
                .to_string();
            trace!("EBML DocType: {}", doc_type);
            return Some(doc_type);
        }
        if !walker.advance((id.width + len.width) as u64 + len.value) {
            break;
        }
    }
    None
}

/// video/x-matroska 探测器, 同时识别 WebM
pub(crate) fn matroska_type_find(tf: &mut TypeFind<'_>) {
    let Some(doc_type) = read_doc_type(tf) else {
        return;
    };
    let name = match doc_type.as_str() {
        "matroska" => "video/x-matroska",
        "webm" => "video/webm",
        _ => return,
    };
    tf.suggest(Probability::MAXIMUM, FormatDescriptor::new(name));
}

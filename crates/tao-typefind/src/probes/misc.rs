//! 需要少量计算的杂项格式: FLI 动画, 模块音乐, DV, tar, ar, DOS/PE 可执行文件.

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::window::TypeFind;

/// FLI/FLC 文件头魔数 (偏移 4 的帧类型 + 0xAF)
fn is_flx_magic(data: &[u8]) -> bool {
    matches!(data[4], 0x11 | 0x12 | 0x30 | 0x44) && data[5] == 0xAF
}

/// video/x-fli 探测器
///
/// 能读到 134 字节时同时检查第一帧的块类型, 否则只检查魔数.
pub(crate) fn flx_type_find(tf: &mut TypeFind<'_>) {
    let caps = || FormatDescriptor::new("video/x-fli");
    if let Some(data) = tf.peek(0, 134) {
        if is_flx_magic(&data) && matches!(data[132], 0x00 | 0xFA) && data[133] == 0xF1 {
            tf.suggest(Probability::MAXIMUM, caps());
        }
        return;
    }
    if tf.peek(0, 6).is_some_and(|d| is_flx_magic(&d)) {
        tf.suggest(Probability::LIKELY, caps());
    }
}

/// ProTracker 及其衍生格式在偏移 1080 处的标记
fn is_protracker_tag(tag: &[u8]) -> bool {
    let digit = |i: usize| tag[i].is_ascii_digit();
    match tag {
        b"M.K." | b"M!K!" | b"OKTA" | b"CD81" => true,
        [b'F', b'L', b'T', _] | [b'E', b'X', b'O', _] => digit(3),
        [_, b'C', b'H', b'N'] => digit(0),
        [_, _, b'C', b'H'] | [_, _, b'C', b'N'] => digit(0) && digit(1),
        _ => false,
    }
}

/// 检查 `offset` 处是否为 `expected`
fn has_at(tf: &mut TypeFind<'_>, offset: u64, expected: &[u8]) -> Option<bool> {
    tf.peek_at(offset, expected.len())
        .map(|d| d[..] == expected[..])
}

/// 模块音乐的判定结果
fn mod_probability(tf: &mut TypeFind<'_>) -> Option<Probability> {
    const MAX: Option<Probability> = Some(Probability::MAXIMUM);
    const LIKELY: Option<Probability> = Some(Probability::LIKELY);

    if tf.peek_at(1080, 4).is_some_and(|d| is_protracker_tag(&d)) {
        return MAX;
    }
    // FastTracker 2
    if tf
        .peek(0, 38)
        .is_some_and(|d| d.starts_with(b"Extended Module: ") && d[37] == 0x1A)
    {
        return MAX;
    }
    // Oktalyzer
    if has_at(tf, 0, b"OKTASONG") == Some(true) {
        return MAX;
    }

    if let Some(head) = tf.peek(0, 4) {
        let head = &head[..];
        // Composer 669
        if head.starts_with(b"if") || head.starts_with(b"JN") {
            return LIKELY;
        }
        if (head.starts_with(b"AMF") && (11..=13).contains(&head[3]))
            || matches!(head, b"IMPM" | b"MMD0" | b"MMD1")
            || head.starts_with(b"MTM")
        {
            return MAX;
        }
        // DSMI
        if head == b"RIFF" && has_at(tf, 8, b"DSMF") == Some(true) {
            return MAX;
        }
        // Farandole 与 General DigiMusic: 读不到第二个标记时只能给出 "很可能"
        if head == b"FAM\xFE" {
            match has_at(tf, 44, b"com") {
                Some(true) => return MAX,
                None => return LIKELY,
                Some(false) => {}
            }
        }
        if head == b"GDM\xFE" {
            match has_at(tf, 71, b"GMFS") {
                Some(true) => return MAX,
                None => return LIKELY,
                Some(false) => {}
            }
        }
    }

    // Imago Orpheus
    if has_at(tf, 60, b"IM10") == Some(true) {
        return MAX;
    }
    // ScreamTracker 3
    if has_at(tf, 44, b"SCRM") == Some(true) {
        return MAX;
    }
    None
}

/// audio/x-mod 探测器
pub(crate) fn mod_type_find(tf: &mut TypeFind<'_>) {
    if let Some(prob) = mod_probability(tf) {
        tf.suggest(prob, FormatDescriptor::new("audio/x-mod"));
    }
}

/// video/x-dv 探测器
///
/// DIF 头块: `1F 07 00`, 第 4 字节最高位区分 PAL (625 行) 与 NTSC (525 行).
pub(crate) fn dv_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 5) else {
        return;
    };
    if &data[..3] != b"\x1F\x07\x00" || data[4] & 0x01 != 0 {
        return;
    }
    let format = if data[3] & 0x80 != 0 { "PAL" } else { "NTSC" };
    tf.suggest(
        Probability::MAXIMUM,
        FormatDescriptor::new("video/x-dv")
            .with_bool("systemstream", true)
            .with_str("format", format),
    );
}

/// application/x-tar 探测器
///
/// 只给出 "几乎确定", 同时也压住包内文件的格式探测 (例如其中的 MP3).
pub(crate) fn tar_type_find(tf: &mut TypeFind<'_>) {
    let Some(magic) = tf.peek(257, 8) else {
        return;
    };
    // 旧 GNU 格式 "ustar  \0"; POSIX 格式 "ustar\0" + 两位版本号
    let old_gnu = &magic[..] == b"ustar  \0";
    let posix = &magic[..6] == b"ustar\0" && magic[6].is_ascii_digit() && magic[7].is_ascii_digit();
    if old_gnu || posix {
        tf.suggest(
            Probability::NEARLY_CERTAIN,
            FormatDescriptor::new("application/x-tar"),
        );
    }
}

/// application/x-ar 探测器
///
/// 第一个成员头中出现不可打印字符时只给出 "可能".
pub(crate) fn ar_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 24) else {
        return;
    };
    if &data[..7] != b"!<arch>" {
        return;
    }
    let printable = data[7..]
        .iter()
        .all(|&b| b == b'\n' || b.is_ascii_graphic() || b == b' ');
    let prob = if printable {
        Probability::NEARLY_CERTAIN
    } else {
        trace!("ar: 成员头含不可打印字符");
        Probability::POSSIBLE
    };
    tf.suggest(prob, FormatDescriptor::new("application/x-ar"));
}

/// application/x-ms-dos-executable 探测器
///
/// 要求 MZ 头的头部段数为 4, 且偏移 0x3C 指向 PE 签名.
pub(crate) fn msdos_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 64) else {
        return;
    };
    if &data[..2] != b"MZ" || LittleEndian::read_u16(&data[8..10]) != 4 {
        return;
    }
    let pe_offset = u64::from(LittleEndian::read_u32(&data[60..64]));
    if has_at(tf, pe_offset, b"PE") == Some(true) {
        tf.suggest(
            Probability::NEARLY_CERTAIN,
            FormatDescriptor::new("application/x-ms-dos-executable"),
        );
    }
}

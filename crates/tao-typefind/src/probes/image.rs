//! 图像格式探测: JPEG, BMP, TIFF.

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::window::TypeFind;

/// TIFF 字节序参数值, 与常见的 1234/4321 约定一致
const LITTLE_ENDIAN: i64 = 1234;
const BIG_ENDIAN: i64 = 4321;

/// image/jpeg 探测器
///
/// SOI 标记后紧跟 APP0 (JFIF) 或 APP1 (Exif) 时给出最高置信度, 否则只算 "可能".
pub(crate) fn jpeg_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 2) else {
        return;
    };
    if data[..] != [0xFF, 0xD8] {
        return;
    }
    let tagged = tf
        .peek(6, 4)
        .is_some_and(|d| &d[..] == b"JFIF" || &d[..] == b"Exif");
    let prob = if tagged {
        Probability::MAXIMUM
    } else {
        Probability::POSSIBLE
    };
    tf.suggest(prob, FormatDescriptor::new("image/jpeg"));
}

/// image/bmp 探测器
///
/// `BM` 之后, 偏移 14 处的信息头大小只能是 OS/2 (12), Windows (40) 或 OS/2 2.x (240).
pub(crate) fn bmp_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 18) else {
        return;
    };
    if &data[..2] == b"BM"
        && matches!(data[14], 0x0C | 0x28 | 0xF0)
        && data[15..18] == [0, 0, 0]
    {
        tf.suggest(Probability::MAXIMUM, FormatDescriptor::new("image/bmp"));
    }
}

/// image/tiff 探测器
pub(crate) fn tiff_type_find(tf: &mut TypeFind<'_>) {
    let Some(data) = tf.peek(0, 8) else {
        return;
    };
    let endianness = match &data[..4] {
        b"II*\0" => LITTLE_ENDIAN,
        b"MM\0*" => BIG_ENDIAN,
        _ => return,
    };
    tf.suggest(
        Probability::MAXIMUM,
        FormatDescriptor::new("image/tiff").with_int("endianness", endianness),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::run_probe;

    #[test]
    fn test_jpeg() {
        let s = run_probe(jpeg_type_find, b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01");
        assert_eq!(s[0].probability, Probability::MAXIMUM);
        let s = run_probe(jpeg_type_find, b"\xff\xd8\xff\xdb\x00\x43\x00\x01\x02\x03");
        assert_eq!(s[0].probability, Probability::POSSIBLE);
        assert!(run_probe(jpeg_type_find, b"\xff\xd9").is_empty());
    }

    #[test]
    fn test_bmp() {
        let mut data = b"BM".to_vec();
        data.extend(vec![0u8; 12]);
        data.extend_from_slice(&[0x28, 0, 0, 0]);
        assert_eq!(run_probe(bmp_type_find, &data).len(), 1);
        data[14] = 0x30;
        assert!(run_probe(bmp_type_find, &data).is_empty());
    }

    #[test]
    fn test_tiff_字节序() {
        let s = run_probe(tiff_type_find, b"II*\0\x08\0\0\0");
        assert_eq!(s[0].caps.int_param("endianness"), Some(1234));
        let s = run_probe(tiff_type_find, b"MM\0*\0\0\0\x08");
        assert_eq!(s[0].caps.int_param("endianness"), Some(4321));
        assert!(run_probe(tiff_type_find, b"II*\0").is_empty());
    }
}

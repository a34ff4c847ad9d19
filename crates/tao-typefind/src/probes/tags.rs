//! 元数据标签探测: ID3v1/ID3v2, APEv1/APEv2.
//!
//! 标签本身不是媒体格式, 但必须在所承载的音频之前被识别, 因此 rank 高于其他探测器.

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::window::TypeFind;

/// ID3v2 头部是否合法
///
/// ```text
/// "ID3" 主版本 次版本 标志 size[4]
/// 版本字节不能为 0xFF, size 为 4×7 位 syncsafe 整数
/// ```
fn is_id3v2_header(data: &[u8]) -> bool {
    data.len() >= 10
        && &data[..3] == b"ID3"
        && data[3] != 0xFF
        && data[4] != 0xFF
        && data[6..10].iter().all(|b| b & 0x80 == 0)
}

/// application/x-id3 探测器
pub(crate) fn id3_type_find(tf: &mut TypeFind<'_>) {
    if tf.peek(0, 10).is_some_and(|d| is_id3v2_header(&d)) {
        tf.suggest(
            Probability::MAXIMUM,
            FormatDescriptor::new("application/x-id3"),
        );
        return;
    }
    if tf.peek(-128, 3).is_some_and(|d| &d[..] == b"TAG") {
        tf.suggest(
            Probability::MAXIMUM.minus(3),
            FormatDescriptor::new("application/x-id3"),
        );
    }
}

/// application/x-apetag 探测器
pub(crate) fn apetag_type_find(tf: &mut TypeFind<'_>) {
    // APEv2 头部位于文件开头
    if tf.peek(0, 8).is_some_and(|d| &d[..] == b"APETAGEX") {
        tf.suggest(
            Probability::MAXIMUM.minus(1),
            FormatDescriptor::new("application/x-apetag"),
        );
        return;
    }
    // APEv1/APEv2 尾部
    if tf.peek(-32, 8).is_some_and(|d| &d[..] == b"APETAGEX") {
        tf.suggest(
            Probability::MAXIMUM.minus(2),
            FormatDescriptor::new("application/x-apetag"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::run_probe;

    #[test]
    fn test_id3v2_头部() {
        let mut data = b"ID3\x04\x00\x00\x00\x00\x02\x01".to_vec();
        data.extend(vec![0u8; 300]);
        let s = run_probe(id3_type_find, &data);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].probability, Probability::MAXIMUM);

        // size 字节的最高位必须为 0
        data[8] = 0x82;
        assert!(run_probe(id3_type_find, &data).is_empty());
    }

    #[test]
    fn test_id3v1_尾部() {
        let mut data = vec![0x55u8; 500];
        let tail = data.len() - 128;
        data[tail..tail + 3].copy_from_slice(b"TAG");
        let s = run_probe(id3_type_find, &data);
        assert_eq!(s[0].probability, Probability::new(97));
    }

    #[test]
    fn test_ape_标签() {
        let mut data = b"APETAGEX".to_vec();
        data.extend(vec![0u8; 100]);
        assert_eq!(
            run_probe(apetag_type_find, &data)[0].probability,
            Probability::new(99)
        );

        let mut data = vec![0u8; 100];
        data.extend_from_slice(b"APETAGEX");
        data.extend(vec![0u8; 24]);
        assert_eq!(
            run_probe(apetag_type_find, &data)[0].probability,
            Probability::new(98)
        );

        assert!(run_probe(apetag_type_find, b"APETAG").is_empty());
    }
}

//! 文本类格式探测: 纯文本 (UTF-8), URI 列表, XML, SMIL.

use log::trace;

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::window::{ByteCursor, TypeFind};

/// UTF-8 检查的起始窗口
const UTF8_START_SIZE: usize = 32 * 1024;
/// UTF-8 检查的最小窗口
const UTF8_MIN_SIZE: usize = 16;
/// UTF-8 检查的起始置信度
const UTF8_START_PROB: u32 = 95;
/// 窗口每减半一次置信度的降幅
const UTF8_PROB_STEP: u32 = 10;
/// 短于该长度的流只检查起始处
const UTF8_MIDDLE_THRESHOLD: u64 = 64 * 1024;

/// 查找首个元素时最多扫描的字节数
const XML_SCAN_BUDGET: u64 = 16 * 1024;
/// URI 列表最多扫描的字节数 (含注释行)
const URI_SCAN_BUDGET: u64 = 16 * 1024;

/// 数据是否为合法 UTF-8 (不含 NUL), 允许最后一个字符被截断
fn is_text(data: &[u8]) -> bool {
    let valid = match std::str::from_utf8(data) {
        Ok(_) => data.len(),
        Err(e) => e.valid_up_to(),
    };
    let valid = data[..valid]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(valid);
    valid == data.len() || valid + 4 > data.len()
}

/// 从 `offset` 开始检查 UTF-8
///
/// 窗口从 32 KiB 开始, 读不到时减半, 每减半一次置信度降低 10.
/// 拿到窗口后只判定一次, 不合法即返回 `None`.
fn valid_utf8_at(tf: &mut TypeFind<'_>, offset: u64) -> Option<Probability> {
    let mut size = UTF8_START_SIZE;
    let mut prob = UTF8_START_PROB;
    while prob > UTF8_PROB_STEP && size > UTF8_MIN_SIZE {
        if let Some(data) = tf.peek_at(offset, size) {
            return is_text(&data).then(|| Probability::new(prob));
        }
        size /= 2;
        prob -= UTF8_PROB_STEP;
    }
    None
}

/// text/plain 探测器
pub(crate) fn utf8_type_find(tf: &mut TypeFind<'_>) {
    // XML 交给 XML 探测器
    if xml_check_first_element(tf, b"") {
        return;
    }
    let Some(start) = valid_utf8_at(tf, 0) else {
        return;
    };
    trace!("text/plain: 起始处置信度 {}", start);

    let caps = FormatDescriptor::new("text/plain");
    let length = match tf.length() {
        Some(len) if len > 0 => len,
        // 无法检查流中部时最多给出 "可能"
        _ => {
            tf.suggest(start.min(Probability::POSSIBLE), caps);
            return;
        }
    };
    if length < UTF8_MIDDLE_THRESHOLD {
        tf.suggest(start, caps);
        return;
    }
    let Some(middle) = valid_utf8_at(tf, length / 2) else {
        return;
    };
    tf.suggest(Probability::average(start, middle), caps);
}

/// 扫描 URI 列表的首个非注释行, 返回是否以 `scheme://` 开头
fn scan_uri_list(tf: &mut TypeFind<'_>) -> Option<bool> {
    let mut cur = ByteCursor::new(0, URI_SCAN_BUDGET);

    // 跳过 # 注释行
    while cur.current(tf)? == b'#' {
        while cur.next_byte(tf)? != b'\n' {}
    }

    if !cur.next_byte(tf)?.is_ascii_alphabetic() {
        return Some(false);
    }
    while cur.current(tf)?.is_ascii_alphanumeric() {
        cur.advance(1);
    }
    Some(cur.starts_with(tf, b"://"))
}

/// text/uri-list 探测器
pub(crate) fn uri_type_find(tf: &mut TypeFind<'_>) {
    if scan_uri_list(tf) == Some(true) {
        tf.suggest(Probability::MAXIMUM, FormatDescriptor::new("text/uri-list"));
    }
}

/// 检查 XML 文档的首个元素
///
/// 文档必须以 `<?xml` 开头; 跳过处理指令与声明 (`<?...`, `<!...`),
/// 第一个普通元素的名称以 `element` 开头时返回 `true`. `element` 为空时只检查是否为 XML.
fn xml_check_first_element(tf: &mut TypeFind<'_>, element: &[u8]) -> bool {
    let mut cur = ByteCursor::new(0, XML_SCAN_BUDGET);
    if !cur.starts_with(tf, b"<?xml") {
        return false;
    }
    cur.advance(5);

    loop {
        loop {
            match cur.next_byte(tf) {
                Some(b'<') => break,
                Some(_) => {}
                None => return false,
            }
        }
        match cur.current(tf) {
            Some(c) if c.is_ascii_alphabetic() => break,
            Some(_) => cur.advance(1),
            None => return false,
        }
    }

    cur.ensure(tf, element.len() + 1)
        .is_some_and(|d| d.starts_with(element))
}

/// application/xml 探测器
///
/// 几乎任何更具体的探测器都应胜过它, 只给出最低置信度.
pub(crate) fn xml_type_find(tf: &mut TypeFind<'_>) {
    if xml_check_first_element(tf, b"") {
        tf.suggest(
            Probability::MINIMUM,
            FormatDescriptor::new("application/xml"),
        );
    }
}

/// application/smil 探测器
pub(crate) fn smil_type_find(tf: &mut TypeFind<'_>) {
    if xml_check_first_element(tf, b"smil") {
        tf.suggest(
            Probability::MAXIMUM,
            FormatDescriptor::new("application/smil"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::run_probe;
    use crate::source::MemorySource;

    fn text(len: usize) -> Vec<u8> {
        b"The quick brown fox jumps over the lazy dog.\n"
            .iter()
            .copied()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_utf8_置信度随窗口下降() {
        let s = run_probe(utf8_type_find, &text(40_000));
        assert_eq!(s[0].probability, Probability::new(95));

        // 1000 字节只能打开 512 字节的窗口
        let s = run_probe(utf8_type_find, &text(1000));
        assert_eq!(s[0].probability, Probability::new(35));

        // 过短的流不判定
        assert!(run_probe(utf8_type_find, &text(100)).is_empty());
    }

    #[test]
    fn test_utf8_长文本检查中部() {
        let mut data = text(100 * 1024);
        let s = run_probe(utf8_type_find, &data);
        assert_eq!(s[0].probability, Probability::new(95));

        // 中部出现二进制数据
        let mid = data.len() / 2;
        data[mid + 10] = 0xFF;
        assert!(run_probe(utf8_type_find, &data).is_empty());
    }

    #[test]
    fn test_utf8_长度未知() {
        let mut src = MemorySource::new(text(40_000)).without_size();
        let mut tf = TypeFind::new(&mut src);
        utf8_type_find(&mut tf);
        assert_eq!(tf.into_suggestions()[0].probability, Probability::POSSIBLE);
    }

    #[test]
    fn test_utf8_多字节与截断() {
        let mut data = "中文文本测试".repeat(100).into_bytes();
        data.truncate(1024 + 50);
        let s = run_probe(utf8_type_find, &data);
        assert_eq!(s.len(), 1);

        // 窗口末尾截断的多字节字符仍然接受
        assert!(is_text(&"中文".as_bytes()[..5]));
        assert!(!is_text(b"abc\0def"));
        assert!(!is_text(b"\xff\xfeabcdefgh"));
    }

    #[test]
    fn test_uri_列表() {
        let data = b"# playlist\n# comment\nhttp://example.com/a.mp3\n";
        let s = run_probe(uri_type_find, data);
        assert_eq!(s[0].probability, Probability::MAXIMUM);

        assert!(run_probe(uri_type_find, b"mailto:someone@example.com\n").is_empty());
        assert!(run_probe(uri_type_find, b"1http://example.com\n").is_empty());
        assert!(run_probe(uri_type_find, b"# only comments\n").is_empty());
    }

    const SMIL: &[u8] = b"<?xml version=\"1.0\"?>\n\
        <!DOCTYPE smil PUBLIC \"-//W3C//DTD SMIL 2.0//EN\">\n\
        <smil xmlns=\"x\"><body/></smil>\n";

    #[test]
    fn test_xml_与_smil() {
        assert_eq!(run_probe(smil_type_find, SMIL)[0].probability, Probability::MAXIMUM);
        assert_eq!(run_probe(xml_type_find, SMIL)[0].probability, Probability::MINIMUM);

        let other = b"<?xml version=\"1.0\"?>\n<rss version=\"2.0\"></rss>\n";
        assert!(run_probe(smil_type_find, other).is_empty());
        assert_eq!(run_probe(xml_type_find, other).len(), 1);
        assert!(run_probe(xml_type_find, b"<html></html>").is_empty());
    }

    #[test]
    fn test_xml_不算纯文本() {
        let mut data = SMIL.to_vec();
        data.extend(text(2000));
        assert!(run_probe(utf8_type_find, &data).is_empty());
    }
}

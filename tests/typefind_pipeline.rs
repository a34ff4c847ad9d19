//! 端到端集成测试: 完整探测器注册表的识别管线.
//!
//! 测试流程: 构造各格式的字节流 → 交给内置注册表识别 → 验证格式描述, 置信度与排序

use std::sync::Arc;

use tao_sniff::typefind::probes::mpeg_audio;
use tao_sniff::typefind::{
    FormatDescriptor, MemorySource, Probability, Rank, TypeFind, TypeFindRegistry, vint,
};

/// MPEG-1 Layer III, 128 kbps, 44100 Hz, 联合立体声, 帧长 417
const MP3_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x44];
const MP3_FRAME_LEN: usize = 417;

/// 辅助: 创建内置注册表
fn registry() -> TypeFindRegistry {
    match tao_sniff::default_typefind_registry() {
        Ok(registry) => registry,
        Err(err) => panic!("注册内置探测器失败: {}", err),
    }
}

/// 辅助: 生成 `count` 个连续的 MP3 帧
fn mp3_frames(count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(count * MP3_FRAME_LEN);
    for i in 0..count {
        let mut frame = vec![0u8; MP3_FRAME_LEN];
        frame[..4].copy_from_slice(&MP3_HEADER);
        // 帧体填充不含同步字的数据
        for (j, b) in frame[4..].iter_mut().enumerate() {
            *b = ((i + j) % 0x7F) as u8;
        }
        out.extend(frame);
    }
    out
}

/// 辅助: 识别内存数据
fn identify(
    registry: &TypeFindRegistry,
    data: Vec<u8>,
    filename: Option<&str>,
) -> Option<FormatDescriptor> {
    let mut source = MemorySource::new(data);
    registry.identify(&mut source, filename)
}

/// 辅助: 识别结果的格式名
fn identify_name(
    registry: &TypeFindRegistry,
    data: Vec<u8>,
    filename: Option<&str>,
) -> Option<String> {
    identify(registry, data, filename).map(|c| c.name().to_string())
}

#[test]
fn test_mp3_帧链识别() {
    let registry = registry();
    let data = mp3_frames(5);

    let mut source = MemorySource::new(data.clone());
    let best = match registry.identify_best(&mut source, None) {
        Some(best) => best,
        None => panic!("应识别为 MPEG 音频"),
    };
    assert_eq!(best.probe, "audio/mpeg");
    assert_eq!(best.probability, Probability::MAXIMUM);
    assert_eq!(best.rank, Rank::PRIMARY);
    assert_eq!(best.caps.name(), "audio/mpeg");
    assert_eq!(best.caps.int_param("mpegversion"), Some(1));
    assert_eq!(best.caps.int_param("layer"), Some(3));
    assert_eq!(best.caps.int_param("channels"), Some(2));
    assert_eq!(best.caps.int_param("rate"), Some(44100));

    // 扫描器直接报告帧链长度
    let mut source = MemorySource::new(data);
    let mut tf = TypeFind::new(&mut source);
    let m = mpeg_audio::scan_mpeg_audio(&mut tf, 0).expect("应找到帧链");
    assert_eq!(m.chain.offset, 0);
    assert_eq!(m.chain.found, 5);
}

#[test]
fn test_id3v1_尾部压制_mpeg_音频() {
    let registry = registry();
    let mut data = mp3_frames(5);
    let mut tag = vec![0u8; 128];
    tag[..3].copy_from_slice(b"TAG");
    tag[3..14].copy_from_slice(b"Test Title ");
    data.extend(tag);

    let mut source = MemorySource::new(data);
    let all = registry.identify_all(&mut source, Some("song.mp3"));
    assert!(
        all.iter().all(|s| s.caps.name() != "audio/mpeg"),
        "带 ID3v1 尾部时不应给出 MPEG 音频: {:?}",
        all
    );
    assert_eq!(all[0].caps.name(), "application/x-id3");
    assert_eq!(all[0].probability, Probability::MAXIMUM.minus(3));
}

#[test]
fn test_扩展大小_box() {
    let mut data = vec![0, 0, 0, 1];
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&24u64.to_be_bytes());
    data.extend(vec![0u8; 8]);
    let mut moov = 16u32.to_be_bytes().to_vec();
    moov.extend_from_slice(b"moov");
    moov.extend(vec![0u8; 8]);
    data.extend(moov);

    let size = vint::decode_box_size(&data).expect("box 头应可解析");
    assert_eq!(size.size, 24);
    assert_eq!(size.header_len, 16);

    let registry = registry();
    let mut source = MemorySource::new(data);
    let best = registry
        .identify_best(&mut source, Some("clip.mov"))
        .expect("应识别为 QuickTime");
    assert_eq!(best.caps.name(), "video/quicktime");
    assert_eq!(best.probability, Probability::NEARLY_CERTAIN);
}

#[test]
fn test_常见容器与图像() {
    let registry = registry();

    let mut flac = b"fLaC".to_vec();
    flac.extend(vec![0u8; 60]);
    assert_eq!(identify_name(&registry, flac, None).as_deref(), Some("audio/x-flac"));

    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.extend(vec![0u8; 32]);
    assert_eq!(identify_name(&registry, png, None).as_deref(), Some("image/png"));

    let mut wav = b"RIFF".to_vec();
    wav.extend_from_slice(&100u32.to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend(vec![0u8; 100]);
    assert_eq!(identify_name(&registry, wav, None).as_deref(), Some("audio/x-wav"));

    // Ogg 页 + Vorbis 标识头
    let mut ogg = b"OggS\x00\x02".to_vec();
    ogg.extend(vec![0u8; 20]);
    ogg.extend_from_slice(&[1, 30]);
    ogg.extend_from_slice(b"\x01vorbis\0\0\0\0\x02\x44\xac\0\0");
    ogg.extend(vec![0u8; 12]);
    ogg.extend_from_slice(&[0xB8, 0x01]);
    assert_eq!(identify_name(&registry, ogg, Some("a.ogg")).as_deref(), Some("application/ogg"));
}

#[test]
fn test_纯文本与_xml() {
    let registry = registry();
    let text: Vec<u8> = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n"
        .iter()
        .copied()
        .cycle()
        .take(2000)
        .collect();
    let mut source = MemorySource::new(text);
    let best = registry.identify_best(&mut source, Some("notes.txt")).expect("应识别为文本");
    assert_eq!(best.caps.name(), "text/plain");
    // 2000 字节只能打开 1024 字节窗口
    assert_eq!(best.probability, Probability::new(45));

    let smil = b"<?xml version=\"1.0\"?>\n<smil><body></body></smil>\n".to_vec();
    let mut source = MemorySource::new(smil);
    let all = registry.identify_all(&mut source, None);
    let names: Vec<_> = all.iter().map(|s| s.caps.name()).collect();
    assert_eq!(names, vec!["application/smil", "application/xml"]);
}

#[test]
fn test_tar_压住包内文件() {
    let registry = registry();
    let mut data = vec![0u8; 512];
    data[..8].copy_from_slice(b"song.mp3");
    data[100..107].copy_from_slice(b"0000644");
    data[257..265].copy_from_slice(b"ustar  \0");
    data.extend(mp3_frames(8));

    let best = identify(&registry, data, Some("music.tar")).expect("应识别为 tar");
    assert_eq!(best.name(), "application/x-tar");
}

#[test]
fn test_识别结果可重复() {
    let registry = registry();
    let mut data = mp3_frames(6);
    data.extend(vec![0x20u8; 300]);
    let mut source = MemorySource::new(data);
    let first = registry.identify_all(&mut source, None);
    let second = registry.identify_all(&mut source, None);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_多线程共享注册表() {
    let registry = Arc::new(registry());
    let inputs: Vec<(Vec<u8>, &str)> = vec![
        (mp3_frames(5), "audio/mpeg"),
        ([b"fLaC".as_slice(), [0u8; 60].as_slice()].concat(), "audio/x-flac"),
        ([b"GIF89a".as_slice(), [0u8; 32].as_slice()].concat(), "image/gif"),
        ([b"\x1f\x8b".as_slice(), [8u8; 30].as_slice()].concat(), "application/x-gzip"),
    ];

    std::thread::scope(|scope| {
        for (data, expected) in &inputs {
            let registry = Arc::clone(&registry);
            scope.spawn(move || {
                for _ in 0..8 {
                    let caps = identify(&registry, data.clone(), None);
                    assert_eq!(caps.as_ref().map(|c| c.name()), Some(*expected));
                }
            });
        }
    });
}

#[test]
fn test_扩展名提示调整扫描顺序() {
    let registry = registry();
    let order: Vec<_> = registry
        .scan_order(Some("song.MP3"))
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    // 标签探测器优先级更高, 之后是扩展名命中的同级探测器
    assert_eq!(order[0], "application/x-id3");
    assert_eq!(order[1], "application/x-apetag");
    assert_eq!(order[2], "audio/mpeg");

    let order = registry.scan_order(None);
    assert_eq!(order[2].name(), "audio/x-musepack");
    assert_eq!(order.len(), registry.len());
}

#[test]
fn test_无法识别的数据() {
    let registry = registry();
    let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
    let mut source = MemorySource::new(data);
    assert!(registry.identify_all(&mut source, None).is_empty());

    assert!(identify(&registry, Vec::new(), Some("empty.mp3")).is_none());
}

#[test]
fn test_识别文件() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("track.mp3");
    std::fs::write(&path, mp3_frames(5)).expect("写入测试文件失败");

    let caps = registry.identify_file(&path).expect("打开文件失败");
    assert_eq!(caps.map(|c| c.name().to_string()).as_deref(), Some("audio/mpeg"));
}

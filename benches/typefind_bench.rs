//! Tao Sniff 性能基准测试.
//!
//! 覆盖完整注册表的识别路径: 帧链扫描, box 遍历, 文本检查与无法识别的数据.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tao_sniff::typefind::{MemorySource, TypeFindRegistry, vint};

fn registry() -> TypeFindRegistry {
    tao_sniff::default_typefind_registry().unwrap()
}

/// 100 个 MPEG-1 Layer III 帧 (128 kbps, 44100 Hz)
fn mp3_stream() -> Vec<u8> {
    let mut out = Vec::new();
    for _ in 0..100 {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x44]);
        out.extend(frame);
    }
    out
}

/// ftyp + moov + mdat
fn mp4_stream() -> Vec<u8> {
    let mut out = Vec::new();
    for (kind, payload) in [(b"ftyp", 16usize), (b"moov", 1024), (b"mdat", 64 * 1024)] {
        out.extend_from_slice(&((payload + 8) as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend(vec![0u8; payload]);
    }
    out[8..12].copy_from_slice(b"isom");
    out
}

fn bench_identify_mp3(c: &mut Criterion) {
    let registry = registry();
    let data = mp3_stream();
    c.bench_function("identify_mp3_100_frames", |b| {
        b.iter(|| {
            let mut source = MemorySource::new(data.clone());
            black_box(registry.identify(&mut source, None));
        });
    });
}

fn bench_identify_mp4(c: &mut Criterion) {
    let registry = registry();
    let data = mp4_stream();
    c.bench_function("identify_mp4_boxes", |b| {
        b.iter(|| {
            let mut source = MemorySource::new(data.clone());
            black_box(registry.identify(&mut source, Some("clip.mp4")));
        });
    });
}

fn bench_identify_text(c: &mut Criterion) {
    let registry = registry();
    let data: Vec<u8> = b"plain text line for the utf-8 probe\n"
        .iter()
        .copied()
        .cycle()
        .take(128 * 1024)
        .collect();
    c.bench_function("identify_text_128k", |b| {
        b.iter(|| {
            let mut source = MemorySource::new(data.clone());
            black_box(registry.identify(&mut source, None));
        });
    });
}

fn bench_identify_unknown(c: &mut Criterion) {
    let registry = registry();
    let data: Vec<u8> = (0..256 * 1024u32).map(|i| (i * 7 % 251) as u8).collect();
    c.bench_function("identify_all_unknown_256k", |b| {
        b.iter(|| {
            let mut source = MemorySource::new(data.clone());
            black_box(registry.identify_all(&mut source, None));
        });
    });
}

fn bench_decode_vint(c: &mut Criterion) {
    let encoded: Vec<Vec<u8>> = (1..=8)
        .map(|w| vint::encode_vint(0x7F, w).unwrap())
        .collect();
    c.bench_function("decode_vint_widths_1_to_8", |b| {
        b.iter(|| {
            for e in &encoded {
                black_box(vint::decode_vint(black_box(e), 8).unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_identify_mp3,
    bench_identify_mp4,
    bench_identify_text,
    bench_identify_unknown,
    bench_decode_vint,
);
criterion_main!(benches);

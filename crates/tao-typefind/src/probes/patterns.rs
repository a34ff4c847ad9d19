//! 固定模式表.
//!
//! 只需比较固定偏移处字节的格式都以静态规则表的形式描述, 由 [`Probe::Pattern`]
//! 与 [`Probe::ContainerTag`] 统一执行.
//!
//! [`Probe::Pattern`]: crate::probe::Probe::Pattern
//! [`Probe::ContainerTag`]: crate::probe::Probe::ContainerTag

use crate::probability::Probability;
use crate::probe::{BytePattern, ContainerTagProbe, PatternRule};

const MAX: Probability = Probability::MAXIMUM;
const LIKELY: Probability = Probability::LIKELY;

// ========================
// 音频
// ========================

pub(super) static MUSEPACK: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"MP+")],
    probability: LIKELY.plus(10),
}];

pub(super) static AU: &[PatternRule] = &[
    PatternRule {
        patterns: &[BytePattern::new(0, b".snd")],
        probability: MAX,
    },
    PatternRule {
        patterns: &[BytePattern::new(0, b"dns.")],
        probability: MAX,
    },
];

pub(super) static FLAC: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"fLaC")],
    probability: MAX,
}];

pub(super) static TTA: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"TTA")],
    probability: MAX,
}];

/// AC-3 同步字只有 16 位, 只给出 "可能"
pub(super) static AC3: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x0b\x77")],
    probability: Probability::POSSIBLE,
}];

pub(super) static PARIS: &[PatternRule] = &[
    PatternRule {
        patterns: &[BytePattern::new(0, b" paf")],
        probability: MAX,
    },
    PatternRule {
        patterns: &[BytePattern::new(0, b"fap ")],
        probability: MAX,
    },
];

pub(super) static NIST: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"NIST")],
    probability: MAX,
}];

pub(super) static VOC: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"Creative")],
    probability: MAX,
}];

/// MIDI 采样转储: F0 7E <通道> 01
pub(super) static SDS: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::masked(0, b"\xf0\x7e\x00\x01", b"\xff\xff\x80\xff")],
    probability: MAX,
}];

pub(super) static IRCAM: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::masked(0, b"\x64\xa3\x00\x00", b"\xff\xff\xf8\xff")],
    probability: MAX,
}];

pub(super) static W64: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"riff")],
    probability: MAX,
}];

/// Shorten: 文件头魔数, 或 seek 表尾部标记
pub(super) static SHN: &[PatternRule] = &[
    PatternRule {
        patterns: &[BytePattern::new(0, b"ajkg")],
        probability: MAX,
    },
    PatternRule {
        patterns: &[BytePattern::new(-8, b"SHNAMPSK")],
        probability: MAX,
    },
];

pub(super) static APE: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"MAC ")],
    probability: LIKELY.plus(10),
}];

pub(super) static AMR_NB: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"#!AMR")],
    probability: LIKELY,
}];

pub(super) static AMR_WB: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"#!AMR-WB")],
    probability: MAX,
}];

pub(super) static ILBC: &[PatternRule] = &[
    PatternRule {
        patterns: &[BytePattern::new(0, b"#!iLBC30")],
        probability: LIKELY,
    },
    PatternRule {
        patterns: &[BytePattern::new(0, b"#!iLBC20")],
        probability: LIKELY,
    },
];

pub(super) static SID: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"PSID")],
    probability: MAX,
}];

pub(super) static SPC: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"SNES-SPC700 Sound File Data")],
    probability: MAX,
}];

// ========================
// 容器与视频
// ========================

/// ASF 头对象 GUID
pub(super) static ASF: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(
        0,
        b"\x30\x26\xb2\x75\x8e\x66\xcf\x11\xa6\xd9\x00\xaa\x00\x62\xce\x6c",
    )],
    probability: MAX,
}];

pub(super) static VCD: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(
        0,
        b"\x00\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\x00",
    )],
    probability: MAX,
}];

/// MPEG-1/2 视频序列头
pub(super) static MPEG_VIDEO: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x00\x00\x01\xb3")],
    probability: MAX.minus(1),
}];

/// 视频对象起始码 + 视频对象层起始码 (0x20-0x2F)
pub(super) static MPEG4_VIDEO: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::masked(
        0,
        b"\x00\x00\x01\x00\x00\x00\x01\x20",
        b"\xff\xff\xff\xff\xff\xff\xff\xf0",
    )],
    probability: MAX.minus(1),
}];

pub(super) static M4A: &[PatternRule] = &[
    PatternRule {
        patterns: &[BytePattern::new(4, b"ftypM4A ")],
        probability: MAX,
    },
    PatternRule {
        patterns: &[BytePattern::new(4, b"ftypmp42")],
        probability: MAX,
    },
];

pub(super) static REALMEDIA: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b".RMF")],
    probability: MAX,
}];

/// 未压缩 (FWS) 与 zlib 压缩 (CWS) 的 SWF
pub(super) static SWF: &[PatternRule] = &[
    PatternRule {
        patterns: &[BytePattern::new(0, b"FWS")],
        probability: MAX,
    },
    PatternRule {
        patterns: &[BytePattern::new(0, b"CWS")],
        probability: MAX,
    },
];

pub(super) static FLV: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"FLV")],
    probability: MAX,
}];

pub(super) static THEORA: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x80theora")],
    probability: MAX,
}];

pub(super) static OGM_VIDEO: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x01video\x00\x00\x00")],
    probability: MAX,
}];

pub(super) static OGM_AUDIO: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x01audio\x00\x00\x00")],
    probability: MAX,
}];

pub(super) static OGM_TEXT: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x01text\x00\x00\x00\x00")],
    probability: MAX,
}];

pub(super) static DIRAC: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"BBCD")],
    probability: LIKELY,
}];

// ========================
// 图像
// ========================

pub(super) static GIF: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"GIF8")],
    probability: MAX,
}];

pub(super) static PNG: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x89PNG\r\n\x1a\n")],
    probability: MAX,
}];

pub(super) static XCF: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"gimp xcf")],
    probability: MAX,
}];

pub(super) static MNG: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x8aMNG\r\n\x1a\n")],
    probability: MAX,
}];

pub(super) static JNG: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x8bJNG\r\n\x1a\n")],
    probability: MAX,
}];

pub(super) static XPM: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"/* XPM */")],
    probability: MAX,
}];

pub(super) static SUN_RASTER: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x59\xa6\x6a\x95")],
    probability: MAX,
}];

// ========================
// 压缩包与可执行文件
// ========================

pub(super) static BZIP: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"BZh")],
    probability: LIKELY,
}];

pub(super) static GZIP: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x1f\x8b")],
    probability: LIKELY,
}];

pub(super) static ZIP: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"PK\x03\x04")],
    probability: LIKELY,
}];

pub(super) static COMPRESS: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x1f\x9d")],
    probability: LIKELY,
}];

pub(super) static RAR: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"Rar!")],
    probability: LIKELY,
}];

pub(super) static ELF: &[PatternRule] = &[PatternRule {
    patterns: &[BytePattern::new(0, b"\x7fELF")],
    probability: MAX,
}];

// ========================
// RIFF / IFF 容器标签
// ========================

pub(super) const AVI: ContainerTagProbe = ContainerTagProbe {
    magic: b"RIFF",
    forms: &[b"AVI "],
    probability: MAX,
};

pub(super) const CDXA: ContainerTagProbe = ContainerTagProbe {
    magic: b"RIFF",
    forms: &[b"CDXA"],
    probability: MAX,
};

pub(super) const WAV: ContainerTagProbe = ContainerTagProbe {
    magic: b"RIFF",
    forms: &[b"WAVE"],
    probability: MAX,
};

pub(super) const AIFF: ContainerTagProbe = ContainerTagProbe {
    magic: b"FORM",
    forms: &[b"AIFF", b"AIFC"],
    probability: MAX,
};

pub(super) const SVX: ContainerTagProbe = ContainerTagProbe {
    magic: b"FORM",
    forms: &[b"8SVX", b"16SV"],
    probability: MAX,
};

//! 内置探测器.
//!
//! 注册顺序即同 rank 探测器的扫描顺序; rank 与扩展名决定整体扫描顺序与平局处理.

pub mod aac;
pub mod image;
pub mod isobmff;
pub mod matroska;
pub mod misc;
pub mod mpeg;
pub mod mpeg_audio;
pub mod ogg;
mod patterns;
pub mod tags;
pub mod text;
pub mod wavpack;

use tao_core::TaoResult;

use crate::caps::FormatDescriptor;
use crate::probe::{PatternProbe, PatternRule, Probe, ProbeFn};
use crate::rank::Rank;
use crate::registry::TypeFindRegistry;

fn pattern(rules: &'static [PatternRule]) -> Probe {
    Probe::Pattern(PatternProbe { rules })
}

fn func(f: ProbeFn) -> Probe {
    Probe::Algorithmic(f)
}

fn caps(name: &str) -> FormatDescriptor {
    FormatDescriptor::new(name)
}

const MPEG_SYS_EXTS: &[&str] = &["mpe", "mpeg", "mpg"];
const MPEG_VIDEO_EXTS: &[&str] = &["mpv", "mpeg", "mpg"];

/// 注册所有内置探测器
pub fn register_all_probes(registry: &mut TypeFindRegistry) -> TaoResult<()> {
    let primary = Rank::PRIMARY;
    let secondary = Rank::SECONDARY;
    let marginal = Rank::MARGINAL;

    registry.register(
        "video/x-ms-asf",
        secondary,
        pattern(patterns::ASF),
        &["asf", "wm", "wma", "wmv"],
        caps("video/x-ms-asf"),
    )?;
    // 低于 ID3/APE 标签, 使标签优先被识别
    registry.register(
        "audio/x-musepack",
        primary,
        pattern(patterns::MUSEPACK),
        &["mpc"],
        caps("audio/x-musepack"),
    )?;
    registry.register(
        "audio/x-au",
        marginal,
        pattern(patterns::AU),
        &["au", "snd"],
        caps("audio/x-au"),
    )?;
    registry.register(
        "video/x-msvideo",
        primary,
        Probe::ContainerTag(patterns::AVI),
        &["avi"],
        caps("video/x-msvideo"),
    )?;
    registry.register(
        "video/x-cdxa",
        primary,
        Probe::ContainerTag(patterns::CDXA),
        &["dat"],
        caps("video/x-cdxa"),
    )?;
    registry.register(
        "video/x-vcd",
        primary,
        pattern(patterns::VCD),
        &["dat"],
        caps("video/x-vcd"),
    )?;
    registry.register(
        "audio/x-flac",
        primary,
        pattern(patterns::FLAC),
        &["flac"],
        caps("audio/x-flac"),
    )?;
    registry.register(
        "video/x-fli",
        marginal,
        func(misc::flx_type_find),
        &["flc", "fli"],
        caps("video/x-fli"),
    )?;
    registry.register(
        "application/x-id3",
        primary.plus(2),
        func(tags::id3_type_find),
        &["mp3", "mp2", "mp1", "mpga", "ogg", "flac", "tta"],
        caps("application/x-id3"),
    )?;
    registry.register(
        "application/x-apetag",
        primary.plus(1),
        func(tags::apetag_type_find),
        &["ape", "mpc", "wv"],
        caps("application/x-apetag"),
    )?;
    registry.register(
        "audio/x-ttafile",
        primary,
        pattern(patterns::TTA),
        &["tta"],
        caps("audio/x-ttafile"),
    )?;
    registry.register(
        "audio/x-mod",
        secondary,
        func(misc::mod_type_find),
        &[
            "669", "amf", "dsm", "gdm", "far", "imf", "it", "med", "mod", "mtm", "okt", "sam",
            "s3m", "stm", "stx", "ult", "xm",
        ],
        caps("audio/x-mod"),
    )?;
    registry.register(
        "audio/mpeg",
        primary,
        func(mpeg_audio::mpeg_audio_type_find),
        &["mp3", "mp2", "mp1", "mpga"],
        caps("audio/mpeg").with_int("mpegversion", 1),
    )?;
    registry.register(
        "audio/x-ac3",
        primary,
        pattern(patterns::AC3),
        &["ac3"],
        caps("audio/x-ac3"),
    )?;
    registry.register(
        "video/mpeg1",
        primary,
        func(mpeg::mpeg1_sys_type_find),
        MPEG_SYS_EXTS,
        caps("video/mpeg").with_bool("systemstream", true),
    )?;
    registry.register(
        "video/mpeg2",
        secondary,
        func(mpeg::mpeg2_sys_type_find),
        MPEG_SYS_EXTS,
        caps("video/mpeg").with_bool("systemstream", true),
    )?;
    registry.register(
        "application/ogg",
        primary,
        func(ogg::ogganx_type_find),
        &["anx", "ogg", "ogm"],
        caps("application/ogg"),
    )?;
    registry.register(
        "video/mpeg",
        secondary,
        pattern(patterns::MPEG_VIDEO),
        MPEG_VIDEO_EXTS,
        caps("video/mpeg").with_bool("systemstream", false),
    )?;
    registry.register(
        "video/mpeg-stream",
        marginal,
        func(mpeg::mpeg_video_stream_type_find),
        MPEG_VIDEO_EXTS,
        caps("video/mpeg")
            .with_bool("systemstream", false)
            .with_int("mpegversion", 1),
    )?;
    registry.register(
        "video/mpeg4",
        primary,
        pattern(patterns::MPEG4_VIDEO),
        &["m4v"],
        caps("video/mpeg")
            .with_bool("systemstream", false)
            .with_int("mpegversion", 4),
    )?;

    // ISO 系列
    registry.register(
        "audio/x-m4a",
        primary,
        pattern(patterns::M4A),
        &["m4a"],
        caps("audio/x-m4a"),
    )?;
    registry.register(
        "application/x-3gp",
        primary,
        func(isobmff::q3gp_type_find),
        &["3gp"],
        caps("application/x-3gp"),
    )?;
    registry.register(
        "video/quicktime",
        secondary,
        func(isobmff::qt_type_find),
        &["mov"],
        caps("video/quicktime"),
    )?;

    registry.register(
        "application/vnd.rn-realmedia",
        secondary,
        pattern(patterns::REALMEDIA),
        &["ra", "ram", "rm", "rmvb"],
        caps("application/vnd.rn-realmedia"),
    )?;
    registry.register(
        "application/x-shockwave-flash",
        secondary,
        pattern(patterns::SWF),
        &["swf", "swfl"],
        caps("application/x-shockwave-flash"),
    )?;
    registry.register(
        "video/x-flv",
        secondary,
        pattern(patterns::FLV),
        &["flv"],
        caps("video/x-flv"),
    )?;
    registry.register(
        "text/plain",
        marginal,
        func(text::utf8_type_find),
        &["txt"],
        caps("text/plain"),
    )?;
    registry.register(
        "text/uri-list",
        marginal,
        func(text::uri_type_find),
        &["ram"],
        caps("text/uri-list"),
    )?;
    registry.register(
        "application/smil",
        secondary,
        func(text::smil_type_find),
        &["smil"],
        caps("application/smil"),
    )?;
    registry.register(
        "application/xml",
        marginal,
        func(text::xml_type_find),
        &["xml"],
        caps("application/xml"),
    )?;
    registry.register(
        "audio/x-wav",
        primary,
        Probe::ContainerTag(patterns::WAV),
        &["wav"],
        caps("audio/x-wav"),
    )?;
    registry.register(
        "audio/x-aiff",
        secondary,
        Probe::ContainerTag(patterns::AIFF),
        &["aiff", "aif", "aifc"],
        caps("audio/x-aiff"),
    )?;
    registry.register(
        "audio/x-svx",
        secondary,
        Probe::ContainerTag(patterns::SVX),
        &["iff", "svx"],
        caps("audio/x-svx"),
    )?;
    registry.register(
        "audio/x-paris",
        secondary,
        pattern(patterns::PARIS),
        &["paf"],
        caps("audio/x-paris"),
    )?;
    registry.register(
        "audio/x-nist",
        secondary,
        pattern(patterns::NIST),
        &["nist"],
        caps("audio/x-nist"),
    )?;
    registry.register(
        "audio/x-voc",
        secondary,
        pattern(patterns::VOC),
        &["voc"],
        caps("audio/x-voc"),
    )?;
    registry.register(
        "audio/x-sds",
        secondary,
        pattern(patterns::SDS),
        &["sds"],
        caps("audio/x-sds"),
    )?;
    registry.register(
        "audio/x-ircam",
        secondary,
        pattern(patterns::IRCAM),
        &["sf"],
        caps("audio/x-ircam"),
    )?;
    registry.register(
        "audio/x-w64",
        secondary,
        pattern(patterns::W64),
        &["w64"],
        caps("audio/x-w64"),
    )?;
    registry.register(
        "audio/x-shorten",
        secondary,
        pattern(patterns::SHN),
        &["shn"],
        caps("audio/x-shorten"),
    )?;
    registry.register(
        "application/x-ape",
        secondary,
        pattern(patterns::APE),
        &["ape"],
        caps("application/x-ape"),
    )?;

    // 图像
    registry.register(
        "image/jpeg",
        primary,
        func(image::jpeg_type_find),
        &["jpg", "jpe", "jpeg"],
        caps("image/jpeg"),
    )?;
    registry.register(
        "image/gif",
        primary,
        pattern(patterns::GIF),
        &["gif"],
        caps("image/gif"),
    )?;
    registry.register(
        "image/png",
        primary,
        pattern(patterns::PNG),
        &["png"],
        caps("image/png"),
    )?;
    registry.register(
        "image/bmp",
        primary,
        func(image::bmp_type_find),
        &["bmp"],
        caps("image/bmp"),
    )?;
    registry.register(
        "image/tiff",
        primary,
        func(image::tiff_type_find),
        &["tif", "tiff"],
        caps("image/tiff"),
    )?;
    registry.register(
        "video/x-matroska",
        primary,
        func(matroska::matroska_type_find),
        &["mkv", "mka", "webm"],
        caps("video/x-matroska"),
    )?;
    registry.register(
        "video/x-dv",
        secondary,
        func(misc::dv_type_find),
        &["dv", "dif"],
        caps("video/x-dv").with_bool("systemstream", true),
    )?;
    registry.register(
        "audio/x-amr-nb-sh",
        primary,
        pattern(patterns::AMR_NB),
        &["amr"],
        caps("audio/x-amr-nb-sh"),
    )?;
    registry.register(
        "audio/x-amr-wb-sh",
        primary,
        pattern(patterns::AMR_WB),
        &["amr"],
        caps("audio/x-amr-wb-sh"),
    )?;
    registry.register(
        "audio/iLBC-sh",
        primary,
        pattern(patterns::ILBC),
        &["ilbc"],
        caps("audio/iLBC-sh"),
    )?;
    registry.register(
        "audio/x-sid",
        marginal,
        pattern(patterns::SID),
        &["sid"],
        caps("audio/x-sid"),
    )?;
    registry.register(
        "image/x-xcf",
        secondary,
        pattern(patterns::XCF),
        &["xcf"],
        caps("image/x-xcf"),
    )?;
    registry.register(
        "video/x-mng",
        secondary,
        pattern(patterns::MNG),
        &["mng"],
        caps("video/x-mng"),
    )?;
    registry.register(
        "image/x-jng",
        secondary,
        pattern(patterns::JNG),
        &["jng"],
        caps("image/x-jng"),
    )?;
    registry.register(
        "image/x-xpixmap",
        secondary,
        pattern(patterns::XPM),
        &["xpm"],
        caps("image/x-xpixmap"),
    )?;
    registry.register(
        "image/x-sun-raster",
        secondary,
        pattern(patterns::SUN_RASTER),
        &["ras"],
        caps("image/x-sun-raster"),
    )?;

    // 压缩包
    registry.register(
        "application/x-bzip",
        secondary,
        pattern(patterns::BZIP),
        &["bz2"],
        caps("application/x-bzip"),
    )?;
    registry.register(
        "application/x-gzip",
        secondary,
        pattern(patterns::GZIP),
        &["gz"],
        caps("application/x-gzip"),
    )?;
    registry.register(
        "application/zip",
        secondary,
        pattern(patterns::ZIP),
        &["zip"],
        caps("application/zip"),
    )?;
    registry.register(
        "application/x-compress",
        secondary,
        pattern(patterns::COMPRESS),
        &["Z"],
        caps("application/x-compress"),
    )?;

    // Ogg 逻辑流的识别头, 没有扩展名
    registry.register(
        "audio/x-vorbis",
        primary,
        func(ogg::vorbis_type_find),
        &[],
        caps("audio/x-vorbis"),
    )?;
    registry.register(
        "video/x-theora",
        primary,
        pattern(patterns::THEORA),
        &[],
        caps("video/x-theora"),
    )?;
    registry.register(
        "application/x-ogm-video",
        primary,
        pattern(patterns::OGM_VIDEO),
        &[],
        caps("application/x-ogm-video"),
    )?;
    registry.register(
        "application/x-ogm-audio",
        primary,
        pattern(patterns::OGM_AUDIO),
        &[],
        caps("application/x-ogm-audio"),
    )?;
    registry.register(
        "application/x-ogm-text",
        primary,
        pattern(patterns::OGM_TEXT),
        &[],
        caps("application/x-ogm-text"),
    )?;
    registry.register(
        "audio/x-speex",
        primary,
        func(ogg::speex_type_find),
        &[],
        caps("audio/x-speex"),
    )?;
    registry.register(
        "application/x-ogg-skeleton",
        primary,
        func(ogg::oggskel_type_find),
        &[],
        caps("application/x-ogg-skeleton").with_bool("parsed", false),
    )?;
    registry.register(
        "text/x-cmml",
        primary,
        func(ogg::cmml_type_find),
        &[],
        caps("text/x-cmml"),
    )?;

    registry.register(
        "application/x-executable",
        marginal,
        pattern(patterns::ELF),
        &[],
        caps("application/x-executable"),
    )?;
    registry.register(
        "adts_mpeg_stream",
        secondary,
        func(aac::aac_type_find),
        &["aac"],
        caps("audio/mpeg").with_bool("framed", false),
    )?;
    registry.register(
        "audio/x-spc",
        secondary,
        pattern(patterns::SPC),
        &["spc"],
        caps("audio/x-spc"),
    )?;
    registry.register(
        "audio/x-wavpack",
        secondary,
        func(wavpack::wavpack_type_find),
        &["wv", "wvp"],
        caps("audio/x-wavpack").with_bool("framed", false),
    )?;
    registry.register(
        "audio/x-wavpack-correction",
        secondary,
        func(wavpack::wavpack_correction_type_find),
        &["wvc"],
        caps("audio/x-wavpack-correction").with_bool("framed", false),
    )?;
    registry.register(
        "application/x-rar",
        secondary,
        pattern(patterns::RAR),
        &["rar"],
        caps("application/x-rar"),
    )?;
    registry.register(
        "application/x-tar",
        secondary,
        func(misc::tar_type_find),
        &["tar"],
        caps("application/x-tar"),
    )?;
    registry.register(
        "application/x-ar",
        secondary,
        func(misc::ar_type_find),
        &["a"],
        caps("application/x-ar"),
    )?;
    registry.register(
        "application/x-ms-dos-executable",
        secondary,
        func(misc::msdos_type_find),
        &["dll", "exe", "ocx", "sys", "scr", "msstyles", "cpl"],
        caps("application/x-ms-dos-executable"),
    )?;
    registry.register(
        "video/x-dirac",
        primary,
        pattern(patterns::DIRAC),
        &[],
        caps("video/x-dirac"),
    )?;

    Ok(())
}

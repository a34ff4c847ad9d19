//! 历史日志维护: 压缩前几天的日志, 删除超过保留期的日志.
//!
//! 滚动本身由 tracing-appender 完成, 这里只处理已经不再写入的文件.

use super::LoggingConfig;
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, warn};

/// 启动维护线程: 立即清理一次, 之后按配置的间隔重复
pub(super) fn spawn_log_maintenance(config: LoggingConfig) -> Result<()> {
    let interval = Duration::from_secs(config.cleanup_interval_seconds.max(1));
    std::thread::Builder::new()
        .name("tao-log-maintenance".into())
        .spawn(move || {
            loop {
                if let Err(err) = cleanup_logs(&config, Local::now().date_naive()) {
                    error!("清理日志失败: {}", err);
                }
                std::thread::sleep(interval);
            }
        })
        .context("启动日志维护线程失败")?;
    Ok(())
}

/// 以 `today` 为当天执行一次清理
fn cleanup_logs(config: &LoggingConfig, today: NaiveDate) -> Result<()> {
    let Some(directory) = config.directory.as_deref().map(Path::new) else {
        return Ok(());
    };
    if !directory.exists() {
        return Ok(());
    }

    let cutoff = today - ChronoDuration::days(config.retention_days);

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let file_path = entry.path();

        let Some((date, compressed)) = parse_rotated_log_name(&file_name, &config.file_prefix)
        else {
            continue;
        };

        if date < cutoff {
            debug!("删除过期日志: {}", file_path.display());
            if let Err(err) = fs::remove_file(&file_path) {
                warn!("删除过期日志失败: {}, 错误: {}", file_path.display(), err);
            }
            continue;
        }

        if config.compress_history && !compressed && date < today {
            if let Err(err) = compress_to_gz(&file_path) {
                error!("压缩日志失败: {}", err);
            }
        }
    }

    Ok(())
}

/// 压缩为同名 `.gz` 文件并删除原文件
fn compress_to_gz(path: &Path) -> Result<()> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    if gz_path.exists() {
        return Ok(());
    }

    let mut input =
        File::open(path).with_context(|| format!("打开待压缩日志失败, path={}", path.display()))?;
    let output = File::create(&gz_path)
        .with_context(|| format!("创建压缩日志失败, path={}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
        .with_context(|| format!("删除已压缩日志失败, path={}", path.display()))?;
    Ok(())
}

/// 解析 `<prefix>.<YYYY-MM-DD>.log[.gz]`, 返回日期与是否已压缩
fn parse_rotated_log_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('.')?;

    if let Some(date_part) = rest.strip_suffix(".log") {
        return Some((parse_date(date_part)?, false));
    }
    if let Some(date_part) = rest.strip_suffix(".log.gz") {
        return Some((parse_date(date_part)?, true));
    }
    None
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

use anyhow::{Context, Result};
use std::fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル (trace, debug, info, warn, error); `RUST_LOG` が優先
    pub level: String,
    /// ログファイル (None ならコンソールのみ)
    pub file: Option<PathBuf>,
    /// ファイルローテーション設定
    pub rotation: LogRotation,
    /// JSON形式で出力
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// 日次ローテーション
    Daily,
    /// 時間毎ローテーション
    Hourly,
    /// ローテーションなし
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            rotation: LogRotation::Never,
            json: false,
        }
    }
}

impl LogConfig {
    /// ベンチマーク設定からログ設定を作成
    pub fn from_bench_config(config: &crate::config::BenchConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            file: config.log_file.clone(),
            rotation: config.log_rotation,
            json: config.log_json,
        }
    }

    /// EnvFilterを作成
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    Ok(())
}

/// ログシステムを初期化
///
/// ログは stderr に出力し、stdout はレポート行のみとする。
/// ログファイル指定時は返されたガードを終了まで保持すること（非同期ライタのフラッシュ）。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = config.env_filter();

    let Some(file) = &config.file else {
        init_console_only_logging(env_filter, config.json)?;
        return Ok(None);
    };

    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_log_dir(dir)?;
    let name = file
        .file_name()
        .context("log file path has no file name")?;

    let file_appender = match config.rotation {
        LogRotation::Daily => rolling::daily(dir, name),
        LogRotation::Hourly => rolling::hourly(dir, name),
        LogRotation::Never => rolling::never(dir, name),
    };
    let (non_blocking, guard) = non_blocking(file_appender);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr.and(non_blocking))
        .with_ansi(false)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))?;

    tracing::debug!(file = %file.display(), level = %config.level, "logging initialized");
    Ok(Some(guard))
}

/// コンソールのみログ初期化
fn init_console_only_logging(env_filter: EnvFilter, json: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

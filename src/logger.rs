use std::{fs, path::Path};

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// ログファイル名。
const LOG_FILE: &str = "trackify.log";

/// ログの出力先を設定する。
///
/// 警告以上は色付きで標準エラーへ、それ以外はログファイルへ出力する。
/// 対話中の表示を崩さないよう、標準エラーへは詳細なログを出さない。
///
/// # Arguments
///
/// * `log_dir` - ログファイルを出力するディレクトリ
/// * `verbose` - `true`の場合はdebugレベルまでファイルに出力する
pub fn init(log_dir: &Path, verbose: bool) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    let log_path = log_dir.join(LOG_FILE);
    let file_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%:z"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(file_level)
        .chain(
            fern::log_file(&log_path)
                .with_context(|| format!("Failed to open log file: {}", log_path.display()))?,
        );
    let stderr = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!("[{}] {}", colors.color(record.level()), message))
        })
        .level(LevelFilter::Warn)
        .chain(std::io::stderr());

    fern::Dispatch::new()
        .level(file_level)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn)
        .chain(file)
        .chain(stderr)
        .apply()
        .context("Failed to initialize logger")?;

    Ok(())
}

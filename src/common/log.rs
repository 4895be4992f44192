use std::fs::{create_dir_all, File};
use std::path::Path;
use tracing::{Level, Metadata};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};
use crate::common::utils::parse_level;
use crate::model::LoggingConfig;

/// 初始化日志：文件记录 `RUST_LOG`（或 `file_level`）允许的全部事件，
/// 控制台只输出 `console_levels` 中列出的级别。
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let log_dir = Path::new(&config.dir);
    create_dir_all(log_dir)?;

    let allowed_levels: Vec<Level> = config
        .console_levels
        .iter()
        .filter_map(|lvl_str| parse_level(lvl_str))
        .collect();

    let file_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.file_level)?,
    };

    let file = File::create(log_dir.join("studymap.log"))?;
    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_filter(file_filter);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(filter_fn(move |metadata: &Metadata| {
            allowed_levels.contains(metadata.level())
        }));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(())
}

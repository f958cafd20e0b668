use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::OpenOptions;
use std::path::Path;

pub const LOG_LEVEL_ENV: &str = "RELAUNCH_LOG";
pub const MAX_LOG_SIZE: u64 = 1024 * 1024;

pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|raw| raw.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Keeps the newer half of the log, cut at a line boundary, once it grows
/// past `max_log_size`.
fn trim_log_file_if_oversized(log_path: &Path, max_log_size: u64) {
    if let Ok(metadata) = std::fs::metadata(log_path)
        && metadata.len() > max_log_size
        && let Ok(contents) = std::fs::read(log_path)
    {
        let half = contents.len() / 2;
        let keep_from = contents[half..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(half, |pos| half + pos + 1);
        let _ = std::fs::write(log_path, &contents[keep_from..]);
    }
}

/// Terminal output for the user plus an optional log file. Failing to open
/// the file only loses the file sink.
pub fn init_logging(level: LevelFilter, log_path: Option<&Path>) {
    let term_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_location_level(LevelFilter::Off)
        .add_filter_allow_str("relaunch")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        term_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(log_path) = log_path {
        trim_log_file_if_oversized(log_path, MAX_LOG_SIZE);
        let file_config = ConfigBuilder::new()
            .set_time_format_rfc3339()
            .add_filter_allow_str("relaunch")
            .build();
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(log_path) {
            loggers.push(WriteLogger::new(LevelFilter::Debug.max(level), file_config, file));
        }
    }

    let _ = CombinedLogger::init(loggers);
}

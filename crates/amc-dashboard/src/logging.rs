use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "dashboard.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Terminal,
    File(PathBuf),
    Sink,
}

/// Installs the global subscriber. The TUI owns the terminal, so logs only
/// reach stderr for headless commands with `AMC_LOG_STDOUT` set.
pub fn init_logging(log_dir: &Path, headless: bool) -> LogTarget {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("AMC_LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_enabled = std::env::var("AMC_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false);

    if headless && stdout_enabled {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
        return LogTarget::Terminal;
    }

    match open_log_file(log_dir) {
        Ok((path, file)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            LogTarget::File(path)
        }
        Err(_) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
            LogTarget::Sink
        }
    }
}

fn open_log_file(log_dir: &Path) -> io::Result<(PathBuf, fs::File)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Tracing setup. The terminal belongs to the TUI, so log output always goes
//! to a file.

use anyhow::{Context, Result, bail};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::Config;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => bail!("unknown log format {other:?}; use compact or json"),
        }
    }
}

pub fn parse_level(raw: &str) -> Result<Level> {
    match raw.to_ascii_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        other => bail!("unknown log level {other:?}; use error, warn, info, debug, or trace"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub log_file: PathBuf,
}

impl LogConfig {
    /// `-v` raises the configured level to debug, `-vv` to trace. Verbosity
    /// never lowers a level set in the config.
    pub fn from_config(config: &Config, verbosity: u8) -> Result<Self> {
        let configured = parse_level(config.log_level())?;
        let from_flags = match verbosity {
            0 => Level::ERROR,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Ok(Self {
            level: configured.max(from_flags),
            format: config.log_format()?,
            log_file: config.log_file()?,
        })
    }
}

pub fn init_logging(config: &LogConfig) -> Result<()> {
    if let Some(parent) = config.log_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("open log file {}", config.log_file.display()))?;

    let filter = build_env_filter(config.level);
    let writer = SharedFileWriter::new(file);
    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(writer).with_target(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .context("install tracing subscriber")?;
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .context("install tracing subscriber")?;
        }
    }
    Ok(())
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl SharedFileWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

/// `RUST_LOG` wins over the configured level. Dependencies stay at warn.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!(
            "warn,holocron={level},holocron_app={level},holocron_api={level},holocron_tui={level}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{LogConfig, LogFormat, parse_level};
    use crate::config::Config;
    use anyhow::Result;
    use tracing::Level;

    #[test]
    fn levels_parse_case_insensitively() -> Result<()> {
        assert_eq!(parse_level("INFO")?, Level::INFO);
        assert_eq!(parse_level("trace")?, Level::TRACE);
        assert!(parse_level("verbose").is_err());
        Ok(())
    }

    #[test]
    fn formats_parse() -> Result<()> {
        assert_eq!(LogFormat::parse("json")?, LogFormat::Json);
        assert_eq!(LogFormat::parse("Compact")?, LogFormat::Compact);
        assert!(LogFormat::parse("pretty").is_err());
        Ok(())
    }

    #[test]
    fn verbosity_only_raises_configured_level() -> Result<()> {
        let mut config = Config::default();
        config.logging.file = Some("/tmp/holocron.log".to_owned());

        assert_eq!(LogConfig::from_config(&config, 0)?.level, Level::INFO);
        assert_eq!(LogConfig::from_config(&config, 1)?.level, Level::DEBUG);
        assert_eq!(LogConfig::from_config(&config, 2)?.level, Level::TRACE);

        config.logging.level = Some("debug".to_owned());
        assert_eq!(LogConfig::from_config(&config, 0)?.level, Level::DEBUG);
        Ok(())
    }
}

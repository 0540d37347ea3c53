// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use holocron_app::DEFAULT_CATALOG_BASE_URL;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::logging::{LogFormat, parse_level};

pub const APP_NAME: &str = "holocron";
const CONFIG_VERSION: i64 = 1;
const CONFIG_PATH_ENV: &str = "HOLOCRON_CONFIG_PATH";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_PROBE_INTERVAL: &str = "5s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub connectivity: Connectivity,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            catalog: Catalog::default(),
            connectivity: Connectivity::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_CATALOG_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connectivity {
    pub probe: Option<bool>,
    pub interval: Option<String>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self {
            probe: Some(true),
            interval: Some(DEFAULT_PROBE_INTERVAL.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and place values under [catalog], [connectivity], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let base_url = self.catalog_base_url();
        if base_url.is_empty() {
            bail!("catalog.base_url in {} must not be empty", path.display());
        }
        let parsed = Url::parse(base_url).with_context(|| {
            format!(
                "catalog.base_url in {} is not a valid URL: {base_url:?}",
                path.display()
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "catalog.base_url in {} must use http or https, got {:?}",
                path.display(),
                parsed.scheme()
            );
        }

        let timeout = self
            .catalog_timeout()
            .with_context(|| format!("catalog.timeout in {}", path.display()))?;
        if timeout.is_zero() {
            bail!("catalog.timeout in {} must be positive", path.display());
        }

        let interval = self
            .probe_interval()
            .with_context(|| format!("connectivity.interval in {}", path.display()))?;
        if interval.is_zero() {
            bail!(
                "connectivity.interval in {} must be positive",
                path.display()
            );
        }

        parse_level(self.log_level())
            .with_context(|| format!("logging.level in {}", path.display()))?;
        self.log_format()
            .with_context(|| format!("logging.format in {}", path.display()))?;
        Ok(())
    }

    pub fn catalog_base_url(&self) -> &str {
        self.catalog
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_CATALOG_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn catalog_timeout(&self) -> Result<Duration> {
        parse_duration(self.catalog.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn probe_enabled(&self) -> bool {
        self.connectivity.probe.unwrap_or(true)
    }

    pub fn probe_interval(&self) -> Result<Duration> {
        parse_duration(
            self.connectivity
                .interval
                .as_deref()
                .unwrap_or(DEFAULT_PROBE_INTERVAL),
        )
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        LogFormat::parse(self.logging.format.as_deref().unwrap_or("compact"))
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.logging.file {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set logging.file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join("holocron.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# holocron config\n# Place this file at: {}\n\nversion = 1\n\n[catalog]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[connectivity]\n# Probe the catalog host to detect going offline and coming back.\nprobe = true\ninterval = \"{}\"\n\n[logging]\nlevel = \"{}\"\nformat = \"compact\"\n# Optional. Default is the platform data dir (for example ~/.local/share/holocron/holocron.log)\n# file = \"/absolute/path/to/holocron.log\"\n",
            path.display(),
            DEFAULT_CATALOG_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_PROBE_INTERVAL,
            DEFAULT_LOG_LEVEL,
        )
    }
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

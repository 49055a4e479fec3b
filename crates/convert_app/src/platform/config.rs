//! Run configuration: an optional RON file merged under the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use convert_core::SourceSpec;
use convert_engine::{ClientSettings, PollSettings};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::cli::Cli;
use super::logging::LogDestination;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("invalid config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("no source given; pass --source or set `source` in the config file")]
    MissingSource,
    #[error("no formats given; pass --format at least once or set `formats` in the config file")]
    MissingFormats,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("invalid server url '{url}': {message}")]
    InvalidServer { url: String, message: String },
    #[error("unknown log level '{0}'")]
    InvalidLogLevel(String),
}

/// Defaults read from `--config <file.ron>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<String>,
    pub source: Option<String>,
    pub formats: Vec<String>,
    pub output_name: Option<String>,
    pub verification_token: Option<String>,
    pub session_token: Option<String>,
    pub interval_ms: Option<u64>,
    pub max_polls: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub save_dir: Option<PathBuf>,
    pub log: Option<LogDestination>,
    pub log_level: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientSettings,
    pub poll: PollSettings,
    pub source: SourceSpec,
    pub formats: Vec<String>,
    pub save_dir: Option<PathBuf>,
    pub log: LogDestination,
    pub log_level: LevelFilter,
    pub list_formats: bool,
}

pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Merge flags over file values and validate the result.
pub fn resolve(cli: Cli, file: FileConfig) -> Result<AppConfig, ConfigError> {
    let defaults = ClientSettings::default();

    let base_url = cli
        .server
        .or(file.server)
        .unwrap_or_else(|| defaults.base_url.clone());
    validate_server(&base_url)?;

    let request_timeout = match cli.request_timeout_secs.or(file.request_timeout_secs) {
        Some(0) => return Err(ConfigError::Zero("request timeout")),
        Some(secs) => Duration::from_secs(secs),
        None => defaults.request_timeout,
    };
    let interval = match cli.interval_ms.or(file.interval_ms) {
        Some(0) => return Err(ConfigError::Zero("poll interval")),
        Some(ms) => Duration::from_millis(ms),
        None => PollSettings::default().interval,
    };
    let max_polls = cli.max_polls.or(file.max_polls);
    if max_polls == Some(0) {
        return Err(ConfigError::Zero("max polls"));
    }

    let source_ref = cli
        .source
        .or(file.source)
        .map(|source| source.trim().to_string())
        .filter(|source| !source.is_empty())
        .ok_or(ConfigError::MissingSource)?;

    let formats: Vec<String> = if cli.formats.is_empty() {
        file.formats
    } else {
        cli.formats
    }
    .into_iter()
    .map(|format| format.trim().to_string())
    .filter(|format| !format.is_empty())
    .collect();
    if formats.is_empty() && !cli.list_formats {
        return Err(ConfigError::MissingFormats);
    }

    let log_level = match cli.log_level.or(file.log_level) {
        Some(name) => engine_logging::parse_level(&name).ok_or(ConfigError::InvalidLogLevel(name))?,
        None => LevelFilter::Info,
    };

    let mut source = SourceSpec::new(source_ref);
    source.verification_token = cli.verification_token.or(file.verification_token);
    source.output_name = cli.output_name.or(file.output_name);

    Ok(AppConfig {
        client: ClientSettings {
            base_url,
            request_timeout,
            session_token: cli.session_token.or(file.session_token),
            ..defaults
        },
        poll: PollSettings {
            interval,
            max_polls,
        },
        source,
        formats,
        save_dir: cli.save_dir.or(file.save_dir),
        log: cli.log.or(file.log).unwrap_or_default(),
        log_level,
        list_formats: cli.list_formats,
    })
}

fn validate_server(raw: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidServer {
        url: raw.to_string(),
        message,
    };
    let url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) url".to_string()));
    }
    Ok(())
}

//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use reqwest::header::HeaderName;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, Overrides, TargetArgs};

use crate::cache::DEFAULT_EVENT_CAPACITY;
use crate::domain::text::DEFAULT_MAX_TEXT_CHARS;
use crate::infra::transport::{
    DEFAULT_CSRF_COOKIE_NAME, DEFAULT_CSRF_HEADER_NAME, TransportConfig,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "netfeed";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub validation: ValidationSettings,
    pub viewer: ViewerSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    /// Raw `Cookie` header carrying the session and the CSRF token.
    pub cookie: Option<String>,
    pub csrf_cookie_name: String,
    pub csrf_header_name: String,
    pub connect_timeout: Duration,
}

impl From<&ApiSettings> for TransportConfig {
    fn from(api: &ApiSettings) -> Self {
        Self {
            base_url: api.base_url.to_string(),
            cookie: api.cookie.clone(),
            csrf_cookie_name: api.csrf_cookie_name.clone(),
            csrf_header_name: api.csrf_header_name.clone(),
            connect_timeout: api.connect_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub event_capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct ValidationSettings {
    pub max_text_chars: NonZeroUsize,
}

#[derive(Debug, Clone, Default)]
pub struct ViewerSettings {
    pub username: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("NETFEED").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    validation: RawValidationSettings,
    viewer: RawViewerSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = overrides.base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.connect_timeout_seconds {
            self.api.connect_timeout_seconds = Some(seconds);
        }
        if let Some(username) = overrides.username.as_ref() {
            self.viewer.username = Some(username.clone());
        }
        if let Some(max) = overrides.max_text_chars {
            self.validation.max_text_chars = Some(max);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            logging,
            cache,
            validation,
            viewer,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            validation: build_validation_settings(validation)?,
            viewer: build_viewer_settings(viewer),
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("api.base_url", format!("invalid URL: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            format!("unsupported scheme `{}`", base_url.scheme()),
        ));
    }

    let cookie = non_blank(api.cookie);

    let csrf_cookie_name = non_blank(api.csrf_cookie_name)
        .unwrap_or_else(|| DEFAULT_CSRF_COOKIE_NAME.to_string());

    let csrf_header_name = non_blank(api.csrf_header_name)
        .unwrap_or_else(|| DEFAULT_CSRF_HEADER_NAME.to_string());
    HeaderName::from_str(&csrf_header_name).map_err(|err| {
        LoadError::invalid("api.csrf_header_name", format!("invalid header name: {err}"))
    })?;

    let timeout_secs = api
        .connect_timeout_seconds
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.connect_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        cookie,
        csrf_cookie_name,
        csrf_header_name,
        connect_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let event_capacity = non_zero_usize(
        cache
            .event_capacity
            .unwrap_or(DEFAULT_EVENT_CAPACITY.get()),
        "cache.event_capacity",
    )?;
    Ok(CacheSettings { event_capacity })
}

fn build_validation_settings(
    validation: RawValidationSettings,
) -> Result<ValidationSettings, LoadError> {
    let max_text_chars = non_zero_usize(
        validation.max_text_chars.unwrap_or(DEFAULT_MAX_TEXT_CHARS),
        "validation.max_text_chars",
    )?;
    Ok(ValidationSettings { max_text_chars })
}

fn build_viewer_settings(viewer: RawViewerSettings) -> ViewerSettings {
    ViewerSettings {
        username: non_blank(viewer.username),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    cookie: Option<String>,
    csrf_cookie_name: Option<String>,
    csrf_header_name: Option<String>,
    connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    event_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawValidationSettings {
    max_text_chars: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawViewerSettings {
    username: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;

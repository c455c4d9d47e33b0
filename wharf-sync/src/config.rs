//! Layered configuration for dataset synchronisation.
//!
//! [`SyncSettings`] gathers optional values from configuration files,
//! `WHARF_*` environment variables, and explicit overrides.
//! [`SyncConfig::try_from`] fills the gaps with defaults and validates the
//! result.

use std::{sync::Arc, time::Duration};

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wharf_core::Credentials;

/// Default ceiling on the uncompressed size of an export archive (20 GiB).
pub const DEFAULT_EXPORT_SIZE_LIMIT: u64 = 20 * 1024 * 1024 * 1024;

/// Default lifetime of shared URLs handed to import jobs.
pub const DEFAULT_SHARED_URL_TTL: Duration = Duration::from_secs(3600);

/// Default connect timeout for archive downloads.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const CACHE_SUBDIR: [&str; 3] = [".wharf", "cache", "dataset"];

/// Unresolved synchronisation settings.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    about = "Configure the local dataset cache and transfer limits",
    long_about = "Settings can come from configuration files, WHARF_* \
                 environment variables, or explicit overrides."
)]
#[ortho_config(prefix = "WHARF")]
pub struct SyncSettings {
    /// Root directory of the local dataset cache.
    #[arg(long = "cache-dir", value_name = "dir")]
    #[serde(default)]
    pub cache_dir: Option<Utf8PathBuf>,
    /// Largest uncompressed export size accepted, in bytes.
    #[arg(long = "export-size-limit", value_name = "bytes")]
    #[serde(default)]
    pub export_size_limit: Option<u64>,
    /// Lifetime of shared URLs passed to import jobs, in seconds.
    #[arg(long = "shared-url-ttl-secs", value_name = "secs")]
    #[serde(default)]
    pub shared_url_ttl_secs: Option<u64>,
    /// Connect timeout for archive downloads, in seconds.
    #[arg(long = "connect-timeout-secs", value_name = "secs")]
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Process-wide access key used when a source supplies none.
    #[arg(long = "access-key", value_name = "key")]
    #[serde(default)]
    pub access_key: Option<String>,
    /// Process-wide secret key used when a source supplies none.
    #[arg(long = "secret-key", value_name = "key")]
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl SyncSettings {
    /// Merge configuration files and environment into these settings, then
    /// resolve them.
    pub fn into_config(self) -> Result<SyncConfig, ConfigError> {
        let merged = self.load_and_merge().map_err(ConfigError::Configuration)?;
        SyncConfig::try_from(merged)
    }
}

/// Resolved synchronisation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Root directory of the local dataset cache.
    pub cache_root: Utf8PathBuf,
    /// Largest uncompressed export size accepted, in bytes.
    pub export_size_limit: u64,
    /// Lifetime of shared URLs passed to import jobs.
    pub shared_url_ttl: Duration,
    /// Connect timeout for archive downloads.
    pub connect_timeout: Duration,
    /// Process-wide access key.
    pub access_key: Option<String>,
    /// Process-wide secret key.
    pub secret_key: Option<String>,
}

impl SyncConfig {
    /// Configuration rooted at `cache_root` with every other value defaulted.
    pub fn with_cache_root(cache_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            export_size_limit: DEFAULT_EXPORT_SIZE_LIMIT,
            shared_url_ttl: DEFAULT_SHARED_URL_TTL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            access_key: None,
            secret_key: None,
        }
    }

    /// Resolve credentials, preferring explicit values over process-wide ones.
    #[must_use]
    pub fn resolve_credentials(
        &self,
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> Option<Credentials> {
        Credentials::resolve(
            access_key,
            secret_key,
            self.access_key.as_deref(),
            self.secret_key.as_deref(),
        )
    }
}

fn default_cache_root() -> Result<Utf8PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDirectory)?;
    let root = CACHE_SUBDIR
        .iter()
        .fold(home, |path, segment| path.join(segment));
    Utf8PathBuf::from_path_buf(root).map_err(|path| ConfigError::NonUtf8CacheDir { path })
}

fn positive(field: &'static str, value: Option<u64>, fallback: u64) -> Result<u64, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero",
        }),
        Some(value) => Ok(value),
        None => Ok(fallback),
    }
}

impl TryFrom<SyncSettings> for SyncConfig {
    type Error = ConfigError;

    fn try_from(settings: SyncSettings) -> Result<Self, Self::Error> {
        let cache_root = match settings.cache_dir {
            Some(dir) => dir,
            None => default_cache_root()?,
        };
        let export_size_limit = positive(
            "export-size-limit",
            settings.export_size_limit,
            DEFAULT_EXPORT_SIZE_LIMIT,
        )?;
        let shared_url_ttl = positive(
            "shared-url-ttl-secs",
            settings.shared_url_ttl_secs,
            DEFAULT_SHARED_URL_TTL.as_secs(),
        )?;
        let connect_timeout = positive(
            "connect-timeout-secs",
            settings.connect_timeout_secs,
            DEFAULT_CONNECT_TIMEOUT.as_secs(),
        )?;
        Ok(Self {
            cache_root,
            export_size_limit,
            shared_url_ttl: Duration::from_secs(shared_url_ttl),
            connect_timeout: Duration::from_secs(connect_timeout),
            access_key: settings.access_key.filter(|key| !key.is_empty()),
            secret_key: settings.secret_key.filter(|key| !key.is_empty()),
        })
    }
}

/// Errors raised while resolving [`SyncConfig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration layering failed (files, environment, overrides).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// No cache directory was configured and the home directory is unknown.
    #[error("cannot locate the home directory; set --cache-dir or WHARF_CACHE_DIR")]
    MissingHomeDirectory,
    /// The default cache directory is not valid UTF-8.
    #[error("default cache directory {path:?} is not valid UTF-8")]
    NonUtf8CacheDir {
        /// Offending path.
        path: std::path::PathBuf,
    },
    /// A numeric setting was out of range.
    #[error("{field} {reason}")]
    InvalidValue {
        /// Setting name.
        field: &'static str,
        /// Violated constraint.
        reason: &'static str,
    },
}

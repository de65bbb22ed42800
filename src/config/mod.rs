//! Runtime configuration
//!
//! One [`Settings`] value is built at startup and handed to every component.
//! Each setting is taken from the first source that has it:
//! command-line flag, environment, YAML config file, built-in default.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::api_root;
use crate::policy::OverwritePolicy;

pub const ENV_HOST: &str = "NSX_HOST";
pub const ENV_USERNAME: &str = "NSX_USERNAME";
pub const ENV_PASSWORD: &str = "NSX_PASSWORD";
pub const ENV_SITE: &str = "NSX_SITE";
pub const ENV_ENFORCEMENT_POINT: &str = "NSX_ENFORCEMENT_POINT";
pub const ENV_DEBUG: &str = "NSX_DEBUG";
pub const ENV_DEBUG_LOG: &str = "NSX_DEBUG_LOG";
pub const ENV_INSECURE: &str = "NSX_INSECURE";
pub const ENV_TIMEOUT: &str = "NSX_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "NSX_MAX_RETRIES";
pub const ENV_OVERWRITE_POLICY: &str = "NSX_OVERWRITE_POLICY";

pub const DEFAULT_HOST: &str = "nsx-manager.lab.local";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_SITE: &str = "default";
pub const DEFAULT_ENFORCEMENT_POINT: &str = "default";
pub const DEFAULT_DEBUG_LOG: &str = "t1edge-debug.log";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Default config file location: ~/.t1edge/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".t1edge")
        .join("config.yaml")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No password configured: set NSX_PASSWORD, --password or `password` in the config")]
    MissingPassword,

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Contents of the YAML config file; every key is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub site: Option<String>,
    pub enforcement_point: Option<String>,
    pub debug: Option<bool>,
    pub debug_log: Option<PathBuf>,
    pub insecure: Option<bool>,
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub overwrite_policy: Option<OverwritePolicy>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub site: Option<String>,
    pub enforcement_point: Option<String>,
    pub debug: bool,
    pub debug_log: Option<PathBuf>,
    pub insecure: bool,
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Clone)]
pub struct Settings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub site: String,
    pub enforcement_point: String,
    /// Record every request/response pair in `debug_log`
    pub debug: bool,
    pub debug_log: PathBuf,
    /// Skip TLS certificate verification
    pub insecure: bool,
    pub timeout: Duration,
    /// Extra attempts for GET calls; mutating calls are never retried
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub overwrite_policy: OverwritePolicy,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("site", &self.site)
            .field("enforcement_point", &self.enforcement_point)
            .field("debug", &self.debug)
            .field("debug_log", &self.debug_log)
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("overwrite_policy", &self.overwrite_policy)
            .finish()
    }
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Parse config from YAML string
pub fn parse_file_config(content: &str) -> Result<FileConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Interpret the usual spellings of a boolean environment value
pub fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(
    env: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    env.get(name)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value: value.clone(),
            })
        })
        .transpose()
}

fn env_bool(env: &HashMap<String, String>, name: &str) -> Result<Option<bool>, ConfigError> {
    env.get(name).map(|value| parse_bool(name, value)).transpose()
}

fn pick(
    cli: Option<&String>,
    env: Option<&String>,
    file: Option<&String>,
    default: &str,
) -> String {
    cli.or(env)
        .or(file)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

impl Settings {
    /// Settings for `host` with every other value at its default
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            site: DEFAULT_SITE.to_string(),
            enforcement_point: DEFAULT_ENFORCEMENT_POINT.to_string(),
            debug: false,
            debug_log: PathBuf::from(DEFAULT_DEBUG_LOG),
            insecure: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            overwrite_policy: OverwritePolicy::default(),
        }
    }

    /// Merge the sources in precedence order
    pub fn resolve(
        cli: &Overrides,
        env: &HashMap<String, String>,
        file: &FileConfig,
    ) -> Result<Self, ConfigError> {
        let password = cli
            .password
            .as_ref()
            .or(env.get(ENV_PASSWORD))
            .or(file.password.as_ref())
            .filter(|p| !p.is_empty())
            .cloned()
            .ok_or(ConfigError::MissingPassword)?;

        let debug = cli.debug || env_bool(env, ENV_DEBUG)?.or(file.debug).unwrap_or(false);
        let insecure =
            cli.insecure || env_bool(env, ENV_INSECURE)?.or(file.insecure).unwrap_or(false);

        let debug_log = cli
            .debug_log
            .clone()
            .or_else(|| env.get(ENV_DEBUG_LOG).map(PathBuf::from))
            .or_else(|| file.debug_log.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEBUG_LOG));

        let timeout = match cli.timeout {
            Some(t) => t,
            None => parse_env(env, ENV_TIMEOUT)?
                .or(file.timeout)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        let max_retries = match cli.max_retries {
            Some(r) => r,
            None => parse_env(env, ENV_MAX_RETRIES)?
                .or(file.max_retries)
                .unwrap_or(0),
        };
        let overwrite_policy = parse_env(env, ENV_OVERWRITE_POLICY)?
            .or(file.overwrite_policy)
            .unwrap_or_default();

        Ok(Self {
            host: pick(cli.host.as_ref(), env.get(ENV_HOST), file.host.as_ref(), DEFAULT_HOST),
            username: pick(
                cli.username.as_ref(),
                env.get(ENV_USERNAME),
                file.username.as_ref(),
                DEFAULT_USERNAME,
            ),
            password,
            site: pick(cli.site.as_ref(), env.get(ENV_SITE), file.site.as_ref(), DEFAULT_SITE),
            enforcement_point: pick(
                cli.enforcement_point.as_ref(),
                env.get(ENV_ENFORCEMENT_POINT),
                file.enforcement_point.as_ref(),
                DEFAULT_ENFORCEMENT_POINT,
            ),
            debug,
            debug_log,
            insecure,
            timeout: Duration::from_secs(timeout),
            max_retries,
            retry_delay: Duration::from_millis(
                file.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
            overwrite_policy,
        })
    }

    pub fn api_root(&self) -> String {
        api_root(&self.host)
    }
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

/// Load the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            (PathBuf::from(expanded), true)
        }
        None => (default_config_path(), false),
    };

    if !path.exists() {
        return if required {
            Err(ConfigError::ConfigNotFound(path))
        } else {
            Ok(FileConfig::default())
        };
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_file_config(&content)
}

//! Configuration for the camlink CLI.
//!
//! TOML file + `CAMLINK_` environment overrides, credential resolution
//! (env var, system keyring, plaintext), and translation to
//! `camlink_core::RegistryConfig`. Core never reads config files; the CLI
//! builds everything through this crate.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use camlink_core::{Credentials, RegistryConfig, RetryPolicy, TlsVerification};

const KEYRING_SERVICE: &str = "camlink";
const DEFAULT_ONVIF_PORT: u16 = 80;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no camera named '{name}' in the config file")]
    UnknownCamera { name: String },

    #[error("no credentials configured for camera '{camera}'")]
    NoCredentials { camera: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Camera used when a command names none.
    pub default_camera: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Named cameras.
    #[serde(default)]
    pub cameras: BTreeMap<String, CameraProfile>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Accept self-signed device certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Custom CA certificate for HTTPS device services.
    pub ca_cert: Option<PathBuf>,

    /// SOAP request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// Local UDP port for discovery. 0 picks an ephemeral port.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,

    #[serde(default = "default_health_concurrency")]
    pub health_concurrency: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: default_insecure(),
            ca_cert: None,
            timeout: default_timeout(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            bind_port: default_bind_port(),
            health_interval_secs: default_health_interval_secs(),
            health_concurrency: default_health_concurrency(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    10
}
fn default_discovery_timeout_ms() -> u64 {
    3000
}
fn default_bind_port() -> u16 {
    3702
}
fn default_health_interval_secs() -> u64 {
    60
}
fn default_health_concurrency() -> usize {
    1
}

/// Backoff schedule for health probes.
#[derive(Debug, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    5000
}

/// A named camera entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CameraProfile {
    /// `ip` or `ip:port`. Port defaults to 80.
    pub address: String,

    /// Device-service URL, when the camera uses a non-standard path.
    pub service_url: Option<String>,

    pub username: Option<String>,

    /// Plaintext password. Prefer the keyring or `password_env`.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Default media profile token for stream / PTZ commands.
    pub profile: Option<String>,
}

impl CameraProfile {
    pub fn socket_addr(&self) -> Result<(IpAddr, u16), ConfigError> {
        parse_address(&self.address)
    }
}

impl Config {
    pub fn camera(&self, name: &str) -> Result<&CameraProfile, ConfigError> {
        self.cameras
            .get(name)
            .ok_or_else(|| ConfigError::UnknownCamera { name: name.into() })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "camlink", "camlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("camlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file yields
/// the defaults.
///
/// Environment keys use `__` as the section separator, e.g.
/// `CAMLINK_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAMLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning the defaults if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Addresses ───────────────────────────────────────────────────────

/// Parse `ip`, `ip:port`, or `[v6]:port`.
pub fn parse_address(address: &str) -> Result<(IpAddr, u16), ConfigError> {
    let trimmed = address.trim();
    if let Ok(sock) = trimmed.parse::<SocketAddr>() {
        return Ok((sock.ip(), sock.port()));
    }
    trimmed
        .parse::<IpAddr>()
        .map(|ip| (ip, DEFAULT_ONVIF_PORT))
        .map_err(|_| ConfigError::Validation {
            field: "address".into(),
            reason: format!("expected an IP address with optional port, got '{address}'"),
        })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a camera's credentials: `password_env` → keyring → plaintext.
pub fn resolve_credentials(camera: &CameraProfile, name: &str) -> Result<Credentials, ConfigError> {
    let username = camera.username.clone().ok_or_else(|| ConfigError::NoCredentials {
        camera: name.into(),
    })?;

    // 1. Env var named by the profile
    if let Some(ref env_name) = camera.password_env {
        if let Ok(pw) = std::env::var(env_name) {
            return Ok(credentials(username, SecretString::from(pw)));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(name)) {
        if let Ok(pw) = entry.get_password() {
            return Ok(credentials(username, SecretString::from(pw)));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = camera.password {
        return Ok(credentials(username, SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        camera: name.into(),
    })
}

/// Store a camera password in the system keyring.
pub fn store_password(name: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(name))
        .map_err(|e| ConfigError::Keyring(e.to_string()))?;
    entry
        .set_password(password.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_user(name: &str) -> String {
    format!("{name}/password")
}

fn credentials(username: String, password: SecretString) -> Credentials {
    Credentials { username, password }
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `RegistryConfig` from the file settings.
pub fn registry_config(cfg: &Config) -> Result<RegistryConfig, ConfigError> {
    let d = &cfg.defaults;
    if d.health_concurrency == 0 {
        return Err(ConfigError::Validation {
            field: "defaults.health_concurrency".into(),
            reason: "must be at least 1".into(),
        });
    }
    if cfg.retry.max_delay_ms < cfg.retry.initial_delay_ms {
        return Err(ConfigError::Validation {
            field: "retry.max_delay_ms".into(),
            reason: "must not be smaller than retry.initial_delay_ms".into(),
        });
    }

    let tls = if let Some(ref ca_path) = d.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if d.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };

    let mut registry = RegistryConfig {
        tls,
        timeout: Duration::from_secs(d.timeout),
        discovery_timeout: Duration::from_millis(d.discovery_timeout_ms),
        retry: RetryPolicy {
            max_attempts: cfg.retry.attempts,
            initial_delay: Duration::from_millis(cfg.retry.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.retry.max_delay_ms),
        },
        health_concurrency: d.health_concurrency,
        ..RegistryConfig::default()
    };
    registry.discovery.bind_addr.set_port(d.bind_port);
    Ok(registry)
}

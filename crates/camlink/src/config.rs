//! CLI configuration: thin wrapper around `camlink_config` shared types.
//!
//! Adds the resolution steps that respect `GlobalOpts` flag overrides
//! (--camera, --address, --username, --insecure, --timeout, --output).

use std::net::IpAddr;
use std::time::Duration;

use clap::ValueEnum;

use camlink_core::{Credentials, RegistryConfig, TlsVerification};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use camlink_config::{CameraProfile, Config, config_path, load_config, save_config};

/// Where and as whom a device command connects.
#[derive(Debug)]
pub struct Target {
    /// Config entry name, when the target came from the config file.
    pub name: Option<String>,
    pub ip: IpAddr,
    pub port: u16,
    pub service_url: Option<String>,
    /// Preferred media profile from the config entry.
    pub profile: Option<String>,
    pub credentials: Credentials,
}

/// Resolve the active camera name from CLI flags and config.
pub fn active_camera_name(global: &GlobalOpts, cfg: &Config) -> Option<String> {
    global.camera.clone().or_else(|| cfg.default_camera.clone())
}

/// `--output` wins; otherwise the config default, falling back to table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

/// `--color` wins unless left at `auto`, in which case the config decides.
pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> ColorMode {
    if global.color != ColorMode::Auto {
        return global.color;
    }
    ColorMode::from_str(&cfg.defaults.color, true).unwrap_or(ColorMode::Auto)
}

/// Translate the config file plus global flags into a `RegistryConfig`.
pub fn registry_config(global: &GlobalOpts, cfg: &Config) -> Result<RegistryConfig, CliError> {
    let mut registry = camlink_config::registry_config(cfg)?;
    if global.insecure {
        registry.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        registry.timeout = Duration::from_secs(secs);
    }
    Ok(registry)
}

/// Work out which camera to talk to and with which credentials.
///
/// `--address` overrides the named camera's address but keeps its
/// credentials and profile; `--username` / `--password` override the
/// stored credentials.
pub fn resolve_target(global: &GlobalOpts, cfg: &Config) -> Result<Target, CliError> {
    let name = active_camera_name(global, cfg);
    let camera = match name.as_deref() {
        Some(n) => Some(cfg.camera(n).map_err(|_| CliError::CameraNotFound {
            name: n.to_owned(),
            available: available_cameras(cfg),
        })?),
        None => None,
    };

    let (ip, port) = match (global.address.as_deref(), camera) {
        (Some(addr), _) => camlink_config::parse_address(addr)?,
        (None, Some(cam)) => cam.socket_addr()?,
        (None, None) => {
            return Err(CliError::NoCamera {
                path: config_path().display().to_string(),
            });
        }
    };

    let label = name.clone().unwrap_or_else(|| ip.to_string());
    let credentials = resolve_credentials(global, camera, &label)?;

    // A configured service URL only applies when the address came from the
    // same entry.
    let service_url = if global.address.is_none() {
        camera.and_then(|c| c.service_url.clone())
    } else {
        None
    };

    Ok(Target {
        name,
        ip,
        port,
        service_url,
        profile: camera.and_then(|c| c.profile.clone()),
        credentials,
    })
}

/// Flags first, then the camera entry's password sources.
fn resolve_credentials(
    global: &GlobalOpts,
    camera: Option<&CameraProfile>,
    label: &str,
) -> Result<Credentials, CliError> {
    if let (Some(user), Some(pass)) = (&global.username, &global.password) {
        return Ok(Credentials::new(user.clone(), pass.clone()));
    }

    let Some(camera) = camera else {
        return Err(CliError::NoCredentials {
            camera: label.to_owned(),
        });
    };
    let mut credentials = camlink_config::resolve_credentials(camera, label)?;
    if let Some(ref user) = global.username {
        credentials.username.clone_from(user);
    }
    Ok(credentials)
}

pub fn available_cameras(cfg: &Config) -> String {
    if cfg.cameras.is_empty() {
        return "(none)".into();
    }
    cfg.cameras.keys().cloned().collect::<Vec<_>>().join(", ")
}

//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use camlink_core::{DeviceRegistry, DiscoveredDevice, ManagedDevice};

use crate::config;
use crate::error::CliError;

use super::Ctx;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A registry holding one configured camera.
pub struct Connected {
    pub registry: DeviceRegistry,
    pub device: Arc<ManagedDevice>,
    preferred_profile: Option<String>,
}

impl Connected {
    pub fn id(&self) -> &str {
        &self.device.id
    }

    /// `--profile` wins, then the camera entry's profile, then the first
    /// profile the camera reported.
    pub fn profile_token(&self, flag: Option<String>) -> Result<String, CliError> {
        flag.or_else(|| self.preferred_profile.clone())
            .or_else(|| self.device.profiles.first().map(|p| p.token.clone()))
            .ok_or_else(|| CliError::NotFound {
                resource_type: "media profile".into(),
                identifier: "(any)".into(),
                hint: format!("Camera {} reported no media profiles", self.device.ip),
            })
    }
}

/// Register the target camera and open an authenticated session to it.
pub async fn connect(ctx: &Ctx<'_>) -> Result<Connected, CliError> {
    let target = config::resolve_target(ctx.global, ctx.cfg)?;
    let registry = DeviceRegistry::new(config::registry_config(ctx.global, ctx.cfg)?);

    let device = match target.service_url {
        Some(url) => {
            let mut manual = DiscoveredDevice::manual(target.ip, target.port);
            manual.service_url = Some(url.clone());
            manual.service_urls = vec![url];
            registry.process_discovered_device(manual)
        }
        None => registry.register_address(target.ip, target.port),
    };

    let pb = spinner(&format!("Connecting to {}...", device.ip), ctx.global.quiet);
    let result = registry.configure_device(&device.id, target.credentials).await;
    pb.finish_and_clear();

    let device = match result {
        Ok(device) => device,
        Err(camlink_core::CoreError::AuthenticationFailed { message }) => {
            return Err(match target.name {
                Some(camera) => CliError::AuthFailed {
                    message: format!("{message} (camera '{camera}')"),
                },
                None => CliError::AuthFailed { message },
            });
        }
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(id = %device.id, capabilities = %device.capabilities, "camera ready");

    Ok(Connected {
        registry,
        device,
        preferred_profile: target.profile,
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the action is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Create a spinner for indefinite operations. Hidden in quiet mode.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style.tick_strings(SPINNER_FRAMES));
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

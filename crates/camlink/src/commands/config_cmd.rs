//! Config subcommand handlers.

use std::fmt::Write as _;

use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_camera {
        let _ = writeln!(out, "default_camera = \"{default}\"");
        let _ = writeln!(out);
    }
    let d = &cfg.defaults;
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "insecure = {}", d.insecure);
    if let Some(ref ca) = d.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "discovery_timeout_ms = {}", d.discovery_timeout_ms);
    let _ = writeln!(out, "bind_port = {}", d.bind_port);
    let _ = writeln!(out, "health_interval_secs = {}", d.health_interval_secs);
    let _ = writeln!(out, "health_concurrency = {}", d.health_concurrency);

    let _ = writeln!(out);
    let _ = writeln!(out, "[retry]");
    let _ = writeln!(out, "attempts = {}", cfg.retry.attempts);
    let _ = writeln!(out, "initial_delay_ms = {}", cfg.retry.initial_delay_ms);
    let _ = writeln!(out, "max_delay_ms = {}", cfg.retry.max_delay_ms);

    for (name, cam) in &cfg.cameras {
        let _ = writeln!(out);
        let _ = writeln!(out, "[cameras.{name}]");
        let _ = writeln!(out, "address = \"{}\"", cam.address);
        if let Some(ref url) = cam.service_url {
            let _ = writeln!(out, "service_url = \"{url}\"");
        }
        if let Some(ref u) = cam.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if cam.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = cam.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref p) = cam.profile {
            let _ = writeln!(out, "profile = \"{p}\"");
        }
    }

    out
}

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { name } => {
            let mut cfg = config::load_config()?;
            let available = config::available_cameras(&cfg);
            let camera = cfg
                .cameras
                .get_mut(&name)
                .ok_or_else(|| CliError::CameraNotFound {
                    name: name.clone(),
                    available,
                })?;

            let password = match global.password {
                Some(ref pw) => pw.clone(),
                None => rpassword::prompt_password(format!("Password for {name}: "))
                    .map_err(prompt_err)?,
            };
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }

            camlink_config::store_password(&name, &SecretString::from(password))?;

            // The keyring now holds the secret; drop any plaintext copy.
            if camera.password.take().is_some() {
                config::save_config(&cfg)?;
            }
            if !global.quiet {
                eprintln!("Password for '{name}' stored in system keyring");
            }
            Ok(())
        }
    }
}

//! Device command handlers.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;

use camlink_core::ManagedDevice;

use crate::cli::{DevicesArgs, DevicesCommand};
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::{Ctx, util};

#[derive(Debug, Serialize)]
struct UriOutput {
    device: String,
    profile: String,
    uri: String,
}

fn detail(d: &Arc<ManagedDevice>, color: bool) -> String {
    let info = d.device_info.as_ref();
    let mut out = [
        format!("ID:           {}", d.id),
        format!("Name:         {}", d.name),
        format!("Address:      {}:{}", d.ip, d.port),
        format!("Status:       {}", output::status_label(d.status, color)),
        format!("Type:         {}", d.vendor),
        format!(
            "Manufacturer: {}",
            or_dash(d.manufacturer.as_deref().or(info.and_then(|i| i.manufacturer.as_deref())))
        ),
        format!(
            "Model:        {}",
            or_dash(d.model.as_deref().or(info.and_then(|i| i.model.as_deref())))
        ),
        format!(
            "Firmware:     {}",
            or_dash(info.and_then(|i| i.firmware_version.as_deref()))
        ),
        format!(
            "Serial:       {}",
            or_dash(info.and_then(|i| i.serial_number.as_deref()))
        ),
        format!("Services:     {}", d.capabilities),
    ]
    .join("\n");

    if d.profiles.is_empty() {
        out.push_str("\nProfiles:     -");
        return out;
    }
    out.push_str("\nProfiles:");
    for p in &d.profiles {
        let video = p.video_encoder.as_ref().map_or_else(String::new, |v| {
            match (v.width, v.height) {
                (Some(w), Some(h)) => format!(" {} {w}x{h}", v.encoding),
                _ => format!(" {}", v.encoding),
            }
        });
        let ptz = if p.ptz.is_some() { " ptz" } else { "" };
        let _ = write!(out, "\n  {} ({}){video}{ptz}", p.token, p.name);
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DevicesArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let conn = util::connect(ctx).await?;

    match args.command {
        DevicesCommand::Probe => {
            let out = output::render_single(
                ctx.format,
                &conn.device,
                |d| detail(d, ctx.color),
                |d| d.id.clone(),
            );
            ctx.print(&out);
            Ok(())
        }

        DevicesCommand::StreamUri(p) => {
            let profile = conn.profile_token(p.profile)?;
            let uri = conn.registry.get_stream_uri(conn.id(), &profile).await?;
            print_uri(ctx, &conn, profile, uri);
            Ok(())
        }

        DevicesCommand::SnapshotUri(p) => {
            let profile = conn.profile_token(p.profile)?;
            let uri = conn.registry.get_snapshot_uri(conn.id(), &profile).await?;
            print_uri(ctx, &conn, profile, uri);
            Ok(())
        }

        DevicesCommand::Reboot => {
            let prompt = format!("Reboot camera {} ({})?", conn.device.name, conn.device.ip);
            if !util::confirm(&prompt, "reboot", ctx.global.yes)? {
                return Err(CliError::Cancelled {
                    action: "reboot".into(),
                });
            }
            let message = conn.registry.reboot_device(conn.id()).await?;
            match message {
                Some(m) if !m.is_empty() => ctx.note(&format!("Camera rebooting: {m}")),
                _ => ctx.note("Camera rebooting"),
            }
            Ok(())
        }
    }
}

fn print_uri(ctx: &Ctx<'_>, conn: &util::Connected, profile: String, uri: String) {
    let data = UriOutput {
        device: conn.id().to_owned(),
        profile,
        uri,
    };
    // The URI is the useful part; a table would only wrap it.
    let out = output::render_single(ctx.format, &data, |d| d.uri.clone(), |d| d.uri.clone());
    ctx.print(&out);
}

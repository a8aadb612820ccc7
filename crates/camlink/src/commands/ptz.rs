//! PTZ command handlers.

use std::time::Duration;

use camlink_core::{PtzCommand as CoreCommand, PtzOutcome, PtzStatus, PtzVector};

use crate::cli::{PtzArgs, PtzCommand};
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::{Ctx, util};

fn status_detail(s: &PtzStatus) -> String {
    let position = s.position.map_or_else(
        || "-".into(),
        |p| format!("pan {:.3}  tilt {:.3}  zoom {:.3}", p.pan, p.tilt, p.zoom),
    );
    [
        format!("Position:  {position}"),
        format!("Pan/Tilt:  {}", or_dash(s.pan_tilt_status.as_deref())),
        format!("Zoom:      {}", or_dash(s.zoom_status.as_deref())),
        format!("Error:     {}", or_dash(s.error.as_deref())),
        format!("UTC time:  {}", or_dash(s.utc_time.as_deref())),
    ]
    .join("\n")
}

fn move_timeout(secs: Option<f64>) -> Result<Option<Duration>, CliError> {
    secs.map(|s| {
        Duration::try_from_secs_f64(s).map_err(|e| CliError::Validation {
            field: "duration".into(),
            reason: e.to_string(),
        })
    })
    .transpose()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: PtzArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    // Reject bad input before spending a round trip on the handshake.
    let (profile, command) = match args.command {
        PtzCommand::Move {
            profile,
            pan,
            tilt,
            zoom,
            duration,
        } => (
            profile,
            CoreCommand::Move {
                velocity: PtzVector { pan, tilt, zoom },
                timeout: move_timeout(duration)?,
            },
        ),
        PtzCommand::Stop {
            profile,
            pan_tilt_only,
            zoom_only,
        } => (
            profile,
            CoreCommand::Stop {
                pan_tilt: !zoom_only,
                zoom: !pan_tilt_only,
            },
        ),
        PtzCommand::Status(profile) => (profile, CoreCommand::Status),
    };
    command.validate()?;

    let conn = util::connect(ctx).await?;
    let token = conn.profile_token(profile.profile)?;
    let outcome = conn.registry.control_ptz(conn.id(), &token, command).await?;

    match outcome {
        PtzOutcome::Status(status) => {
            let out = output::render_single(ctx.format, &status, status_detail, |s| {
                s.position.map_or_else(String::new, |p| {
                    format!("{} {} {}", p.pan, p.tilt, p.zoom)
                })
            });
            ctx.print(&out);
        }
        PtzOutcome::Done => ctx.note("OK"),
    }
    Ok(())
}

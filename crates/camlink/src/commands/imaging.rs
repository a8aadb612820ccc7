//! Imaging command handlers.

use camlink_core::ImagingSettings;

use crate::cli::{ImagingArgs, ImagingCommand};
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::{Ctx, util};

fn fmt_level(v: Option<f32>) -> String {
    v.map_or_else(|| "-".into(), |v| format!("{v:.1}"))
}

fn detail(s: &ImagingSettings) -> String {
    [
        format!("Brightness: {}", fmt_level(s.brightness)),
        format!("Contrast:   {}", fmt_level(s.contrast)),
        format!("Saturation: {}", fmt_level(s.color_saturation)),
        format!("Sharpness:  {}", fmt_level(s.sharpness)),
        format!("IR cut:     {}", or_dash(s.ir_cut_filter.as_deref())),
    ]
    .join("\n")
}

pub async fn handle(args: ImagingArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    match args.command {
        ImagingCommand::Get(p) => {
            let conn = util::connect(ctx).await?;
            let token = conn.profile_token(p.profile)?;
            let settings = conn.registry.get_imaging_settings(conn.id(), &token).await?;
            let out = output::render_single(ctx.format, &settings, detail, detail);
            ctx.print(&out);
            Ok(())
        }

        ImagingCommand::Set {
            profile,
            brightness,
            contrast,
            saturation,
            sharpness,
            ir_cut,
        } => {
            let settings = ImagingSettings {
                brightness,
                color_saturation: saturation,
                contrast,
                sharpness,
                ir_cut_filter: ir_cut.map(|m| m.as_onvif().to_owned()),
            };
            if settings.is_empty() {
                return Err(CliError::Validation {
                    field: "settings".into(),
                    reason: "pass at least one of --brightness, --contrast, --saturation, \
                             --sharpness, --ir-cut"
                        .into(),
                });
            }

            let conn = util::connect(ctx).await?;
            let token = conn.profile_token(profile.profile)?;
            conn.registry
                .update_imaging_settings(conn.id(), &token, &settings)
                .await?;
            ctx.note("Imaging settings updated");
            Ok(())
        }
    }
}

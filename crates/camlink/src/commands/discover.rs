//! `camlink discover`: one WS-Discovery probe, results as a table.

use std::sync::Arc;
use std::time::Duration;

use tabled::Tabled;

use camlink_core::{DeviceRegistry, ManagedDevice};

use crate::cli::DiscoverArgs;
use crate::config;
use crate::error::CliError;
use crate::output;

use super::{Ctx, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DiscoveredRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    vendor: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Arc<ManagedDevice>> for DiscoveredRow {
    fn from(d: &Arc<ManagedDevice>) -> Self {
        Self {
            ip: d.ip.to_string(),
            port: d.port,
            name: d.name.clone(),
            vendor: d.vendor.to_string(),
            manufacturer: d.manufacturer.clone().unwrap_or_default(),
            model: d.model.clone().unwrap_or_default(),
            location: d.location.clone().unwrap_or_default(),
            id: d.id.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DiscoverArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let mut registry_config = config::registry_config(ctx.global, ctx.cfg)?;
    if let Some(port) = args.bind_port {
        registry_config.discovery.bind_addr.set_port(port);
    }
    let timeout = args
        .timeout_ms
        .map_or(registry_config.discovery_timeout, Duration::from_millis);
    if timeout.is_zero() {
        return Err(CliError::Validation {
            field: "timeout-ms".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let registry = DeviceRegistry::new(registry_config);
    let pb = util::spinner(
        &format!("Probing for ONVIF cameras ({}ms)...", timeout.as_millis()),
        ctx.global.quiet,
    );
    let result = registry.start_discovery(Some(timeout)).await;
    pb.finish_and_clear();
    result?;

    let devices = registry.get_device_list();
    if devices.is_empty() {
        ctx.note("No cameras answered the probe.");
        return Ok(());
    }

    let out = output::render_list(
        ctx.format,
        &devices,
        |d| DiscoveredRow::from(d),
        |d| d.ip.to_string(),
    );
    ctx.print(&out);
    Ok(())
}

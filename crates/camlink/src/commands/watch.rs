//! `camlink watch`: discover, connect every configured camera, and stream
//! registry events while the health monitor runs.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use camlink_core::{DeviceRegistry, DiscoveredDevice, RegistryEvent};

use crate::cli::{OutputFormat, WatchArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::Ctx;

pub async fn handle(args: WatchArgs, ctx: &Ctx<'_>) -> Result<(), CliError> {
    let interval_secs = args
        .interval
        .unwrap_or(ctx.cfg.defaults.health_interval_secs);
    if interval_secs == 0 {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let registry = DeviceRegistry::new(config::registry_config(ctx.global, ctx.cfg)?);
    let mut events = registry.subscribe();

    // Setup runs in the background so its events print as they happen.
    let setup = tokio::spawn(bring_up(
        registry.clone(),
        configured_cameras(ctx.cfg),
        !args.no_discovery,
    ));
    let monitor = registry.start_health_monitor(Duration::from_secs(interval_secs))?;
    ctx.note(&format!(
        "Watching cameras (health check every {interval_secs}s). Press Ctrl-C to stop."
    ));

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(ctx, &event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    setup.abort();
    monitor.stop().await;
    registry.shutdown();
    ctx.note(&format!("Stopped. {} device(s) known.", registry.device_count()));
    Ok(())
}

/// A config entry ready to register: name, manual device, credentials.
type Planned = (String, DiscoveredDevice, Option<camlink_core::Credentials>);

fn configured_cameras(cfg: &Config) -> Vec<Planned> {
    cfg.cameras
        .iter()
        .filter_map(|(name, cam)| {
            let (ip, port) = match cam.socket_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    warn!(camera = %name, error = %e, "skipping camera");
                    return None;
                }
            };
            let mut device = DiscoveredDevice::manual(ip, port);
            device.name.clone_from(name);
            if let Some(ref url) = cam.service_url {
                device.service_url = Some(url.clone());
                device.service_urls = vec![url.clone()];
            }
            let credentials = camlink_config::resolve_credentials(cam, name).ok();
            Some((name.clone(), device, credentials))
        })
        .collect()
}

async fn bring_up(registry: DeviceRegistry, cameras: Vec<Planned>, discover: bool) {
    for (name, device, credentials) in cameras {
        let device = registry.process_discovered_device(device);
        let Some(credentials) = credentials else {
            debug!(camera = %name, "no credentials; registered without a session");
            continue;
        };
        // Failures surface as registry events.
        let _ = registry.configure_device(&device.id, credentials).await;
    }

    if discover {
        // Errors are already reported on the event channel.
        let _ = registry.start_discovery(None).await;
    }
}

fn print_event(ctx: &Ctx<'_>, event: &RegistryEvent) {
    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            ctx.print(&serde_json::to_string(event).unwrap_or_default());
        }
        OutputFormat::Yaml => ctx.print(&format!(
            "---\n{}",
            serde_yaml::to_string(event).unwrap_or_default()
        )),
        OutputFormat::Table | OutputFormat::Plain => ctx.print(&event_line(event, ctx.color)),
    }
}

fn event_line(event: &RegistryEvent, color: bool) -> String {
    let now = Utc::now().format("%H:%M:%S");
    match event {
        RegistryEvent::DeviceAdded { device } => format!(
            "{now} + {} {} ({})",
            device.ip,
            device.name,
            output::status_label(device.status, color)
        ),
        RegistryEvent::DeviceUpdated { device } => {
            let err = device
                .last_error
                .as_deref()
                .map_or_else(String::new, |e| format!(": {e}"));
            format!(
                "{now} ~ {} {}{err}",
                device.ip,
                output::status_label(device.status, color)
            )
        }
        RegistryEvent::DeviceRemoved { id, ip } => format!("{now} - {ip} {id}"),
        RegistryEvent::Error { device_id, message } => format!(
            "{now} ! {}{message}",
            device_id
                .as_deref()
                .map_or_else(String::new, |id| format!("{id}: "))
        ),
    }
}

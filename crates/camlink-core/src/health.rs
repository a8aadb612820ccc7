// ── Health monitoring ──
//
// Liveness probing for connected devices. A check calls
// GetSystemDateAndTime on every connected device, retrying per the
// registry's `RetryPolicy`, and records the outcome on the device record.
// A failed probe never tears the session down.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{FutureExt, StreamExt, future, stream};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::ManagedDevice;
use crate::registry::{DeviceRegistry, RegistryInner};

const LIVENESS_OPERATION: &str = "GetSystemDateAndTime";

/// Outcome of one health check pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthReport {
    /// Devices probed (connected devices only).
    pub checked: usize,
    pub healthy: Vec<String>,
    pub failed: Vec<HealthFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthFailure {
    pub id: String,
    pub error: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.failed.is_empty()
    }
}

fn is_retryable(err: &camlink_api::Error) -> bool {
    !err.is_auth_failure()
}

/// Probe every connected device once and record the results.
pub(crate) async fn run_check(
    registry: &DeviceRegistry,
    cancel: &CancellationToken,
) -> HealthReport {
    let targets: Vec<Arc<ManagedDevice>> = registry
        .snapshot()
        .iter()
        .filter(|d| d.is_connected())
        .cloned()
        .collect();

    let policy = registry.config().retry;
    let concurrency = registry.config().health_concurrency.max(1);

    // Each probe owns its session handle and token so the fan-out stays
    // `Send` inside the spawned monitor task.
    let results: Vec<_> = stream::iter(targets)
        .filter_map(|device| future::ready(device.session.clone().map(|s| (device, s))))
        .map(|(device, session)| {
            let cancel = cancel.clone();
            async move {
                let outcome = policy
                    .run(&cancel, is_retryable, move || {
                        let session = Arc::clone(&session);
                        async move { session.get_system_date_and_time().await }
                    })
                    .await;
                (device, outcome)
            }
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .boxed()
        .await;

    let mut report = HealthReport {
        checked: results.len(),
        ..HealthReport::default()
    };
    for (device, outcome) in results {
        let key = device.key();
        match outcome {
            Ok(_) => {
                registry.mark_alive(&key);
                report.healthy.push(device.id.clone());
            }
            Err(e) => {
                let err = CoreError::remote(&device.id, LIVENESS_OPERATION, &e);
                registry.mark_unhealthy(&key, &err);
                report.failed.push(HealthFailure {
                    id: device.id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    debug!(
        checked = report.checked,
        failed = report.failed.len(),
        "health check complete"
    );
    report
}

// ── HealthMonitor ────────────────────────────────────────────────────

/// Owned handle to a periodic health check task.
///
/// Dropping the handle cancels the task. `stop()` cancels and waits for it
/// to finish.
#[derive(Debug)]
pub struct HealthMonitor {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl HealthMonitor {
    pub(crate) fn spawn(registry: &DeviceRegistry, interval: Duration) -> Self {
        let cancel = registry.cancel_token().child_token();
        let handle = tokio::spawn(health_task(registry.downgrade(), interval, cancel.clone()));
        info!(
            interval_secs = interval.as_secs_f64(),
            "health monitor started"
        );
        Self {
            cancel,
            handle: Some(handle),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The task holds only a weak reference, so an abandoned registry is not
/// kept alive by its monitor.
async fn health_task(registry: Weak<RegistryInner>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(registry) = DeviceRegistry::upgrade(&registry) else {
                    debug!("registry dropped; health monitor exiting");
                    break;
                };
                run_check(&registry, &cancel).await;
            }
        }
    }
    debug!("health monitor stopped");
}

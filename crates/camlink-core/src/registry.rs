// ── Device registry ──
//
// Authoritative in-memory map of cameras. Ingests discovery results, drives
// each device through its lifecycle, and dispatches capability-checked
// operations to the device's session. Every failure is captured per device;
// nothing here is fatal to the process.

use std::net::IpAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use camlink_api::{Credentials, DiscoveredDevice, DiscoveryEngine, ImagingSettings, ServiceKind};

use crate::command::{PtzCommand, PtzOutcome};
use crate::config::RegistryConfig;
use crate::error::CoreError;
use crate::health::{self, HealthMonitor, HealthReport};
use crate::model::{DeviceStatus, ManagedDevice, RegistryEvent};
use crate::session::{CameraSession, OnvifSessionFactory, SessionFactory};
use crate::store::EntityCollection;
use crate::stream::DeviceStream;

const EVENT_CHANNEL_SIZE: usize = 256;

// ── DeviceRegistry ───────────────────────────────────────────────────

/// Registry of managed cameras, keyed by IP address.
///
/// Cheaply cloneable via `Arc<RegistryInner>`. Callers must not run
/// overlapping `configure_device` / `reboot_device` / `remove_device` on the
/// same device; the registry does not serialize them.
#[derive(Clone)]
pub struct DeviceRegistry {
    inner: Arc<RegistryInner>,
}

pub(crate) struct RegistryInner {
    config: RegistryConfig,
    store: EntityCollection<ManagedDevice>,
    factory: Arc<dyn SessionFactory>,
    event_tx: broadcast::Sender<RegistryEvent>,
    /// Serializes discovery runs so two probes never fight over port 3702.
    discovery_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl DeviceRegistry {
    /// Registry that builds real ONVIF sessions.
    pub fn new(config: RegistryConfig) -> Self {
        let factory = Arc::new(OnvifSessionFactory::new(config.transport()));
        Self::with_factory(config, factory)
    }

    /// Registry with a custom session factory.
    pub fn with_factory(config: RegistryConfig, factory: Arc<dyn SessionFactory>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(RegistryInner {
                config,
                store: EntityCollection::new(),
                factory,
                event_tx,
                discovery_lock: Mutex::new(()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Subscribe to registry events. Lagging subscribers lose events; they
    /// never slow the registry down.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Reactive view of the device list.
    pub fn devices(&self) -> DeviceStream {
        DeviceStream::new(self.inner.store.subscribe())
    }

    pub fn device_count(&self) -> usize {
        self.inner.store.len()
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Run one WS-Discovery probe and ingest every reply.
    ///
    /// `None` uses the configured discovery timeout. Concurrent calls queue
    /// behind each other. Returns the records touched by this run.
    pub async fn start_discovery(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Vec<Arc<ManagedDevice>>, CoreError> {
        let _running = self.inner.discovery_lock.lock().await;
        let timeout = timeout.unwrap_or(self.inner.config.discovery_timeout);

        let tx = self.inner.event_tx.clone();
        let mut engine =
            DiscoveryEngine::new(self.inner.config.discovery.clone()).on_error(move |err| {
                let _ = tx.send(RegistryEvent::Error {
                    device_id: None,
                    message: err.to_string(),
                });
            });

        info!(timeout_ms = timeout.as_millis(), "starting discovery");
        let result = tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => {
                return Err(CoreError::Discovery {
                    message: "registry is shutting down".into(),
                });
            }
            result = engine.discover(timeout) => result,
        };

        let found = match result {
            Ok(found) => found,
            Err(e) => {
                let err = CoreError::from(e);
                self.emit_error(None, &err);
                return Err(err);
            }
        };

        Ok(found
            .into_iter()
            .map(|d| self.process_discovered_device(d))
            .collect())
    }

    /// Create a record for an unknown IP, or merge into the existing one.
    ///
    /// A merge keeps the record's id, lifecycle state, credentials, and
    /// session, and refreshes `last_seen`.
    pub fn process_discovered_device(&self, discovered: DiscoveredDevice) -> Arc<ManagedDevice> {
        let key = discovered.ip.to_string();
        let id = discovered.id.clone();
        let (device, is_new) = self.inner.store.merge_or_insert(
            key,
            id,
            discovered,
            ManagedDevice::merge_discovered,
            ManagedDevice::from_discovered,
        );

        if is_new {
            info!(id = %device.id, ip = %device.ip, name = %device.name, "device added");
            self.emit(RegistryEvent::DeviceAdded {
                device: Arc::clone(&device),
            });
        } else {
            debug!(id = %device.id, ip = %device.ip, "device updated from discovery");
            self.emit(RegistryEvent::DeviceUpdated {
                device: Arc::clone(&device),
            });
        }
        device
    }

    /// Add a device by address, for cameras multicast cannot reach.
    pub fn register_address(&self, ip: IpAddr, port: u16) -> Arc<ManagedDevice> {
        self.process_discovered_device(DiscoveredDevice::manual(ip, port))
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Every device, ordered by IP address.
    pub fn get_device_list(&self) -> Vec<Arc<ManagedDevice>> {
        let mut devices: Vec<_> = self.inner.store.snapshot().iter().cloned().collect();
        devices.sort_by_key(|d| d.ip);
        devices
    }

    /// Look up a device by id, falling back to its IP address.
    pub fn get_device(&self, id: &str) -> Option<Arc<ManagedDevice>> {
        let key = self.resolve_key(id)?;
        self.inner.store.get_by_key(&key)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Build and initialize a session with `credentials`.
    ///
    /// Any previous session is disposed first. On failure the device moves to
    /// `error` with `last_error` set and the error is returned.
    pub async fn configure_device(
        &self,
        id: &str,
        credentials: Credentials,
    ) -> Result<Arc<ManagedDevice>, CoreError> {
        let device = self.require(id)?;
        let key = device.key();

        let mut previous = None;
        if let Some(updated) = self.inner.store.update(&key, |dev| {
            previous = dev.session.take();
            dev.status = DeviceStatus::Configuring;
            dev.configured = false;
        }) {
            self.emit(RegistryEvent::DeviceUpdated { device: updated });
        }
        if let Some(session) = previous {
            session.disconnect().await;
        }

        info!(id = %device.id, address = %device.ip, user = %credentials.username, "configuring device");
        let session = match self
            .inner
            .factory
            .create(device.session_target(), credentials.clone())
        {
            Ok(session) => session,
            Err(e) => return Err(self.fail_configure(&device, &e)),
        };
        if let Err(e) = session.initialize().await {
            session.disconnect().await;
            return Err(self.fail_configure(&device, &e));
        }

        let snapshot = session.snapshot().await;
        let connected = self.inner.store.update(&key, |dev| {
            if dev.manufacturer.is_none() {
                dev.manufacturer = snapshot
                    .device_info
                    .as_ref()
                    .and_then(|i| i.manufacturer.clone());
            }
            if dev.model.is_none() {
                dev.model = snapshot.device_info.as_ref().and_then(|i| i.model.clone());
            }
            dev.status = DeviceStatus::Connected;
            dev.configured = true;
            dev.credentials = Some(credentials);
            dev.session = Some(Arc::clone(&session));
            dev.capabilities = snapshot.capabilities;
            dev.profiles = snapshot.profiles;
            dev.device_info = snapshot.device_info;
            dev.last_error = None;
            dev.last_seen = Utc::now();
        });

        // Removed while the handshake was in flight.
        let Some(device) = connected else {
            session.disconnect().await;
            return Err(CoreError::DeviceNotFound { id: id.to_owned() });
        };

        info!(
            id = %device.id,
            capabilities = %device.capabilities,
            profiles = device.profiles.len(),
            "device connected"
        );
        self.emit(RegistryEvent::DeviceUpdated {
            device: Arc::clone(&device),
        });
        Ok(device)
    }

    /// Ask the camera to reboot, then tear the session down.
    ///
    /// Credentials are kept so the device can be reconfigured once it is
    /// back. Returns the device's reboot message, if it sent one.
    pub async fn reboot_device(&self, id: &str) -> Result<Option<String>, CoreError> {
        let (device, session) = self.require_connected(id, None)?;
        let message = session
            .system_reboot()
            .await
            .map_err(|e| self.remote_failure(&device, "SystemReboot", &e))?;

        session.disconnect().await;
        if let Some(updated) = self.inner.store.update(&device.key(), |dev| {
            dev.session = None;
            dev.configured = false;
            dev.status = DeviceStatus::Rebooting;
        }) {
            info!(id = %updated.id, "device rebooting");
            self.emit(RegistryEvent::DeviceUpdated { device: updated });
        }
        Ok(message)
    }

    /// Dispose the device's session and forget it. Returns `false` for an
    /// unknown id.
    pub async fn remove_device(&self, id: &str) -> bool {
        let Some(key) = self.resolve_key(id) else {
            return false;
        };
        let Some(device) = self.inner.store.remove(&key) else {
            return false;
        };
        if let Some(session) = &device.session {
            session.disconnect().await;
        }
        info!(id = %device.id, ip = %device.ip, "device removed");
        self.emit(RegistryEvent::DeviceRemoved {
            id: device.id.clone(),
            ip: device.ip,
        });
        true
    }

    // ── Device operations ────────────────────────────────────────────

    /// Run a PTZ command against `profile_token`.
    pub async fn control_ptz(
        &self,
        id: &str,
        profile_token: &str,
        command: PtzCommand,
    ) -> Result<PtzOutcome, CoreError> {
        let (device, session) = self.require_connected(id, Some(ServiceKind::Ptz))?;
        command.validate()?;
        require_profile(&device, profile_token)?;

        let operation = command.operation();
        debug!(id = %device.id, profile = profile_token, operation, "PTZ command");
        let result = match command {
            PtzCommand::Move { velocity, timeout } => session
                .continuous_move(profile_token, velocity, timeout)
                .await
                .map(|()| PtzOutcome::Done),
            PtzCommand::Stop { pan_tilt, zoom } => session
                .stop_ptz(profile_token, pan_tilt, zoom)
                .await
                .map(|()| PtzOutcome::Done),
            PtzCommand::Status => session
                .get_ptz_status(profile_token)
                .await
                .map(PtzOutcome::Status),
        };
        result.map_err(|e| self.remote_failure(&device, operation, &e))
    }

    /// Apply the set fields of `settings` to the video source behind
    /// `profile_token`. A token that names no profile is used as the video
    /// source token directly.
    pub async fn update_imaging_settings(
        &self,
        id: &str,
        profile_token: &str,
        settings: &ImagingSettings,
    ) -> Result<(), CoreError> {
        let (device, session) = self.require_connected(id, Some(ServiceKind::Imaging))?;
        if settings.is_empty() {
            return Err(CoreError::Validation {
                message: "no imaging settings to apply".into(),
            });
        }
        let source = video_source(&device, profile_token);
        session
            .set_imaging_settings(&source, settings)
            .await
            .map_err(|e| self.remote_failure(&device, "SetImagingSettings", &e))
    }

    pub async fn get_imaging_settings(
        &self,
        id: &str,
        profile_token: &str,
    ) -> Result<ImagingSettings, CoreError> {
        let (device, session) = self.require_connected(id, Some(ServiceKind::Imaging))?;
        let source = video_source(&device, profile_token);
        session
            .get_imaging_settings(&source)
            .await
            .map_err(|e| self.remote_failure(&device, "GetImagingSettings", &e))
    }

    /// RTSP URI for a profile, exactly as the camera reports it.
    pub async fn get_stream_uri(&self, id: &str, profile_token: &str) -> Result<String, CoreError> {
        let (device, session) = self.require_connected(id, Some(ServiceKind::Media))?;
        require_profile(&device, profile_token)?;
        session
            .get_stream_uri(profile_token)
            .await
            .map_err(|e| self.remote_failure(&device, "GetStreamUri", &e))
    }

    /// JPEG snapshot URI for a profile, exactly as the camera reports it.
    pub async fn get_snapshot_uri(
        &self,
        id: &str,
        profile_token: &str,
    ) -> Result<String, CoreError> {
        let (device, session) = self.require_connected(id, Some(ServiceKind::Media))?;
        require_profile(&device, profile_token)?;
        session
            .get_snapshot_uri(profile_token)
            .await
            .map_err(|e| self.remote_failure(&device, "GetSnapshotUri", &e))
    }

    // ── Health ───────────────────────────────────────────────────────

    /// Probe every connected device once.
    pub async fn health_check(&self) -> HealthReport {
        health::run_check(self, &self.inner.cancel).await
    }

    /// Spawn a periodic health check. The returned handle owns the task;
    /// dropping it or calling `shutdown` stops it.
    pub fn start_health_monitor(&self, interval: Duration) -> Result<HealthMonitor, CoreError> {
        if interval.is_zero() {
            return Err(CoreError::Validation {
                message: "health interval must be greater than zero".into(),
            });
        }
        Ok(HealthMonitor::spawn(self, interval))
    }

    /// Stop background work: health monitors, pending retries, and any
    /// discovery run in progress.
    pub fn shutdown(&self) {
        debug!("registry shutting down");
        self.inner.cancel.cancel();
    }

    // ── Crate-internal plumbing ──────────────────────────────────────

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<RegistryInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<ManagedDevice>>> {
        self.inner.store.snapshot()
    }

    /// Record a successful liveness probe.
    pub(crate) fn mark_alive(&self, key: &str) {
        self.inner
            .store
            .update(key, |dev| dev.last_seen = Utc::now());
    }

    /// Record a failed liveness probe. Only a device that is still
    /// connected moves to `error`; its session and capabilities are kept.
    pub(crate) fn mark_unhealthy(&self, key: &str, err: &CoreError) {
        let message = err.to_string();
        let mut changed = false;
        let updated = self.inner.store.update(key, |dev| {
            if dev.status == DeviceStatus::Connected {
                dev.status = DeviceStatus::Error;
                dev.last_error = Some(message.clone());
                changed = true;
            }
        });
        if let (Some(device), true) = (updated, changed) {
            warn!(id = %device.id, error = %message, "health check failed");
            self.emit_error(Some(device.id.as_str()), err);
            self.emit(RegistryEvent::DeviceUpdated { device });
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn resolve_key(&self, id: &str) -> Option<String> {
        self.inner
            .store
            .key_for_id(id)
            .or_else(|| self.inner.store.get_by_key(id).map(|_| id.to_owned()))
    }

    fn require(&self, id: &str) -> Result<Arc<ManagedDevice>, CoreError> {
        self.get_device(id)
            .ok_or_else(|| CoreError::DeviceNotFound { id: id.to_owned() })
    }

    /// Preconditions for every remote operation, checked before any I/O.
    fn require_connected(
        &self,
        id: &str,
        service: Option<ServiceKind>,
    ) -> Result<(Arc<ManagedDevice>, Arc<dyn CameraSession>), CoreError> {
        let device = self.require(id)?;
        let session = match (&device.session, device.status) {
            (Some(session), DeviceStatus::Connected) => Arc::clone(session),
            _ => {
                return Err(CoreError::DeviceNotConfigured {
                    id: device.id.clone(),
                    status: device.status,
                });
            }
        };
        if let Some(kind) = service {
            if !device.capabilities.supports(kind) {
                return Err(CoreError::Capability {
                    id: device.id.clone(),
                    service: kind,
                });
            }
        }
        Ok((device, session))
    }

    fn fail_configure(&self, device: &ManagedDevice, err: &camlink_api::Error) -> CoreError {
        let err = match err {
            camlink_api::Error::ServiceConnection {
                service,
                address,
                reason,
            } => CoreError::ServiceConnection {
                service: *service,
                address: address.clone(),
                reason: reason.clone(),
            },
            other => CoreError::remote(&device.id, "Initialize", other),
        };
        let message = err.to_string();
        warn!(id = %device.id, error = %message, "configuration failed");

        if let Some(updated) = self.inner.store.update(&device.key(), |dev| {
            dev.status = DeviceStatus::Error;
            dev.configured = false;
            dev.last_error = Some(message);
        }) {
            self.emit(RegistryEvent::DeviceUpdated { device: updated });
        }
        self.emit_error(Some(device.id.as_str()), &err);
        err
    }

    fn remote_failure(
        &self,
        device: &ManagedDevice,
        operation: &str,
        err: &camlink_api::Error,
    ) -> CoreError {
        let err = CoreError::remote(&device.id, operation, err);
        debug!(id = %device.id, operation, error = %err, "remote operation failed");
        self.emit_error(Some(device.id.as_str()), &err);
        err
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_tx.send(event);
    }

    fn emit_error(&self, device_id: Option<&str>, err: &CoreError) {
        self.emit(RegistryEvent::Error {
            device_id: device_id.map(str::to_owned),
            message: err.to_string(),
        });
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.inner.store.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// A non-empty profile list must contain `token`. Devices that reported no
/// profiles get the token passed through untouched.
fn require_profile(device: &ManagedDevice, token: &str) -> Result<(), CoreError> {
    if device.profiles.is_empty() || device.profile(token).is_some() {
        Ok(())
    } else {
        Err(CoreError::ProfileNotFound {
            id: device.id.clone(),
            token: token.to_owned(),
        })
    }
}

fn video_source(device: &ManagedDevice, profile_token: &str) -> String {
    device
        .profile(profile_token)
        .and_then(|p| p.video_source_token.clone())
        .unwrap_or_else(|| profile_token.to_owned())
}

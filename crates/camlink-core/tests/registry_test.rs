#![allow(clippy::unwrap_used)]
// Registry behaviour against call-counting session stubs.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use camlink_api::{
    Capabilities, Credentials, DiscoveredDevice, Error as ApiError, ImagingSettings, MediaProfile,
    PtzStatus, PtzVector, ServiceKind, SessionTarget, SystemDateTime,
};
use camlink_core::{
    CameraSession, CoreError, DeviceRegistry, DeviceStatus, PtzCommand, PtzOutcome, RegistryConfig,
    RegistryEvent, RetryPolicy, SessionFactory, SessionSnapshot,
};

const RTSP: &str = "rtsp://192.168.1.50:554/Streaming/Channels/101?transportmode=unicast";

// ── Stubs ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StubSession {
    capabilities: Capabilities,
    fail_init: bool,
    alive: AtomicBool,
    remote_calls: AtomicUsize,
    disconnects: AtomicUsize,
}

impl StubSession {
    fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            alive: AtomicBool::new(true),
            ..Self::default()
        }
    }

    fn count(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }
}

fn main_profile() -> MediaProfile {
    MediaProfile {
        token: "Profile_1".into(),
        name: "mainStream".into(),
        video_source_token: Some("VideoSource_1".into()),
        video_encoder: None,
        audio_encoder: None,
        ptz: None,
    }
}

#[async_trait]
impl CameraSession for StubSession {
    async fn initialize(&self) -> Result<(), ApiError> {
        if self.fail_init {
            return Err(ApiError::ServiceConnection {
                service: ServiceKind::Device,
                address: "192.168.1.50:80".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }

    async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            capabilities: self.capabilities,
            profiles: vec![main_profile()],
            device_info: None,
        }
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn get_system_date_and_time(&self) -> Result<SystemDateTime, ApiError> {
        self.count();
        if self.alive.load(Ordering::SeqCst) {
            Ok(SystemDateTime::default())
        } else {
            Err(ApiError::HttpStatus {
                status: 503,
                url: "http://192.168.1.50/onvif/device_service".into(),
            })
        }
    }

    async fn get_stream_uri(&self, _profile_token: &str) -> Result<String, ApiError> {
        self.count();
        Ok(RTSP.into())
    }

    async fn get_snapshot_uri(&self, _profile_token: &str) -> Result<String, ApiError> {
        self.count();
        Ok("http://192.168.1.50/snap.jpg".into())
    }

    async fn continuous_move(
        &self,
        _profile_token: &str,
        _velocity: PtzVector,
        _timeout: Option<Duration>,
    ) -> Result<(), ApiError> {
        self.count();
        Ok(())
    }

    async fn stop_ptz(
        &self,
        _profile_token: &str,
        _pan_tilt: bool,
        _zoom: bool,
    ) -> Result<(), ApiError> {
        self.count();
        Ok(())
    }

    async fn get_ptz_status(&self, _profile_token: &str) -> Result<PtzStatus, ApiError> {
        self.count();
        Ok(PtzStatus::default())
    }

    async fn get_imaging_settings(
        &self,
        video_source_token: &str,
    ) -> Result<ImagingSettings, ApiError> {
        self.count();
        assert_eq!(video_source_token, "VideoSource_1");
        Ok(ImagingSettings::default())
    }

    async fn set_imaging_settings(
        &self,
        _video_source_token: &str,
        _settings: &ImagingSettings,
    ) -> Result<(), ApiError> {
        self.count();
        Ok(())
    }

    async fn system_reboot(&self) -> Result<Option<String>, ApiError> {
        self.count();
        Ok(Some("Rebooting in 30 seconds".into()))
    }
}

/// Hands out one shared stub so the test can inspect it afterwards.
struct StubFactory {
    session: Arc<StubSession>,
    created: AtomicUsize,
}

impl StubFactory {
    fn new(session: StubSession) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(session),
            created: AtomicUsize::new(0),
        })
    }
}

impl SessionFactory for StubFactory {
    fn create(
        &self,
        _target: SessionTarget,
        _credentials: Credentials,
    ) -> Result<Arc<dyn CameraSession>, ApiError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.session) as Arc<dyn CameraSession>)
    }
}

fn registry(factory: &Arc<StubFactory>) -> DeviceRegistry {
    let config = RegistryConfig {
        retry: RetryPolicy::none(),
        ..RegistryConfig::default()
    };
    DeviceRegistry::with_factory(config, Arc::clone(factory) as Arc<dyn SessionFactory>)
}

fn discovered(ip: &str, id: &str, name: &str) -> DiscoveredDevice {
    let ip: IpAddr = ip.parse().unwrap();
    let mut d = DiscoveredDevice::manual(ip, 80);
    d.id = id.into();
    d.name = name.into();
    d
}

fn creds() -> Credentials {
    Credentials::new("admin", "admin123")
}

fn no_ptz() -> Capabilities {
    Capabilities {
        device: true,
        media: true,
        ptz: false,
        imaging: true,
        events: false,
    }
}

fn full() -> Capabilities {
    Capabilities {
        ptz: true,
        ..no_ptz()
    }
}

// ── Discovery ingestion ──────────────────────────────────────────────

#[tokio::test]
async fn same_ip_twice_merges_into_one_record() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    let mut events = registry.subscribe();

    let first = registry.process_discovered_device(discovered("192.168.1.50", "uuid-a", "Lobby"));
    let second =
        registry.process_discovered_device(discovered("192.168.1.50", "uuid-b", "Lobby PTZ"));

    assert_eq!(registry.get_device_list().len(), 1);
    assert_eq!(second.id, "uuid-a");
    assert_eq!(second.name, "Lobby PTZ");
    assert!(second.last_seen >= first.last_seen);
    assert!(registry.get_device("uuid-a").is_some());
    assert!(registry.get_device("192.168.1.50").is_some());

    assert!(matches!(
        events.recv().await.unwrap(),
        RegistryEvent::DeviceAdded { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        RegistryEvent::DeviceUpdated { .. }
    ));
}

#[tokio::test]
async fn merge_preserves_a_live_session() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    let merged = registry.process_discovered_device(discovered("192.168.1.50", "other", "Renamed"));
    assert_eq!(merged.status, DeviceStatus::Connected);
    assert!(merged.session.is_some());
    assert!(merged.credentials.is_some());
}

#[tokio::test]
async fn device_list_is_ordered_by_ip() {
    let factory = StubFactory::new(StubSession::default());
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.60", "b", "B"));
    registry.process_discovered_device(discovered("192.168.1.5", "a", "A"));
    registry.register_address("10.0.0.9".parse().unwrap(), 8000);

    let ips: Vec<String> = registry
        .get_device_list()
        .iter()
        .map(|d| d.ip.to_string())
        .collect();
    assert_eq!(ips, ["10.0.0.9", "192.168.1.5", "192.168.1.60"]);
    assert_eq!(registry.get_device("onvif-10-0-0-9").unwrap().port, 8000);
}

// ── Configuration ────────────────────────────────────────────────────

#[tokio::test]
async fn configure_unknown_id_fails_without_creating_a_record() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);

    let err = registry
        .configure_device("ghost", creds())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DeviceNotFound { .. }));
    assert_eq!(registry.device_count(), 0);
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn configure_success_copies_session_results() {
    let factory = StubFactory::new(StubSession::with_capabilities(no_ptz()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));

    let device = registry.configure_device("cam", creds()).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Connected);
    assert!(device.configured);
    assert_eq!(device.capabilities, no_ptz());
    assert_eq!(device.profiles, vec![main_profile()]);
    assert!(device.last_error.is_none());
}

#[tokio::test]
async fn configure_failure_records_the_error() {
    let factory = StubFactory::new(StubSession {
        fail_init: true,
        ..StubSession::default()
    });
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    let mut events = registry.subscribe();

    let err = registry.configure_device("cam", creds()).await.unwrap_err();
    assert!(matches!(err, CoreError::ServiceConnection { .. }));

    let device = registry.get_device("cam").unwrap();
    assert_eq!(device.status, DeviceStatus::Error);
    assert!(device.session.is_none());
    assert!(device.credentials.is_none());
    assert!(
        device
            .last_error
            .as_deref()
            .unwrap()
            .contains("connection refused")
    );

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        saw_error |= matches!(event, RegistryEvent::Error { .. });
    }
    assert!(saw_error);
}

#[tokio::test]
async fn reconfigure_disposes_the_previous_session() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));

    registry.configure_device("cam", creds()).await.unwrap();
    registry.configure_device("cam", creds()).await.unwrap();
    assert_eq!(factory.session.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
}

// ── Operations ───────────────────────────────────────────────────────

#[tokio::test]
async fn ptz_without_capability_fails_before_any_remote_call() {
    let factory = StubFactory::new(StubSession::with_capabilities(no_ptz()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    let err = registry
        .control_ptz("cam", "Profile_1", PtzCommand::stop_all())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Capability {
            service: ServiceKind::Ptz,
            ..
        }
    ));
    assert_eq!(factory.session.calls(), 0);
}

#[tokio::test]
async fn ptz_commands_reach_the_session() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    let moved = registry
        .control_ptz(
            "cam",
            "Profile_1",
            PtzCommand::Move {
                velocity: PtzVector {
                    pan: 0.5,
                    tilt: 0.0,
                    zoom: 0.0,
                },
                timeout: Some(Duration::from_secs(2)),
            },
        )
        .await
        .unwrap();
    assert!(matches!(moved, PtzOutcome::Done));

    let status = registry
        .control_ptz("cam", "Profile_1", PtzCommand::Status)
        .await
        .unwrap();
    assert!(matches!(status, PtzOutcome::Status(_)));
    assert_eq!(factory.session.calls(), 2);
}

#[tokio::test]
async fn invalid_requests_are_rejected_locally() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    let out_of_range = PtzCommand::Move {
        velocity: PtzVector {
            pan: 2.0,
            tilt: 0.0,
            zoom: 0.0,
        },
        timeout: None,
    };
    assert!(matches!(
        registry.control_ptz("cam", "Profile_1", out_of_range).await,
        Err(CoreError::Validation { .. })
    ));
    assert!(matches!(
        registry.get_stream_uri("cam", "Profile_9").await,
        Err(CoreError::ProfileNotFound { .. })
    ));
    assert!(matches!(
        registry
            .update_imaging_settings("cam", "Profile_1", &ImagingSettings::default())
            .await,
        Err(CoreError::Validation { .. })
    ));
    assert_eq!(factory.session.calls(), 0);
}

#[tokio::test]
async fn stream_uri_is_passed_through_verbatim() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    let uri = registry.get_stream_uri("cam", "Profile_1").await.unwrap();
    assert_eq!(uri, RTSP);
}

#[tokio::test]
async fn imaging_addresses_the_video_source() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    // The stub asserts it receives the profile's video source token.
    registry
        .get_imaging_settings("cam", "Profile_1")
        .await
        .unwrap();
    let settings = ImagingSettings {
        brightness: Some(60.0),
        ..ImagingSettings::default()
    };
    registry
        .update_imaging_settings("cam", "Profile_1", &settings)
        .await
        .unwrap();
}

#[tokio::test]
async fn operations_on_unconfigured_devices_are_refused() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));

    let err = registry
        .get_snapshot_uri("cam", "Profile_1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::DeviceNotConfigured {
            status: DeviceStatus::Discovered,
            ..
        }
    ));
}

#[tokio::test]
async fn reboot_tears_down_the_session_and_keeps_credentials() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    let message = registry.reboot_device("cam").await.unwrap();
    assert_eq!(message.as_deref(), Some("Rebooting in 30 seconds"));

    let device = registry.get_device("cam").unwrap();
    assert_eq!(device.status, DeviceStatus::Rebooting);
    assert!(!device.configured);
    assert!(device.session.is_none());
    assert!(device.credentials.is_some());

    let err = registry
        .control_ptz("cam", "Profile_1", PtzCommand::Status)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::DeviceNotConfigured {
            status: DeviceStatus::Rebooting,
            ..
        }
    ));
}

#[tokio::test]
async fn remove_disposes_and_is_idempotent() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();
    let mut events = registry.subscribe();

    assert!(registry.remove_device("cam").await);
    assert!(!registry.remove_device("cam").await);
    assert!(!registry.remove_device("never-seen").await);
    assert_eq!(registry.device_count(), 0);
    assert_eq!(factory.session.disconnects.load(Ordering::SeqCst), 1);

    match events.recv().await.unwrap() {
        RegistryEvent::DeviceRemoved { id, ip } => {
            assert_eq!(id, "cam");
            assert_eq!(ip.to_string(), "192.168.1.50");
        }
        other => panic!("expected DeviceRemoved, got {other:?}"),
    }
}

#[tokio::test]
async fn readdressed_camera_keeps_its_id_after_stale_cleanup() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.10", "cam-A", "Lobby"));
    // Same camera after a DHCP renewal.
    registry.process_discovered_device(discovered("192.168.1.20", "cam-A", "Lobby"));
    assert_eq!(registry.device_count(), 2);

    // The id resolves to the most recently registered address.
    let live = registry.get_device("cam-A").unwrap();
    assert_eq!(live.ip.to_string(), "192.168.1.20");

    assert!(registry.remove_device("192.168.1.10").await);
    assert_eq!(registry.device_count(), 1);
    let live = registry.get_device("cam-A").unwrap();
    assert_eq!(live.ip.to_string(), "192.168.1.20");

    let device = registry.configure_device("cam-A", creds()).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Connected);
    assert_eq!(device.ip.to_string(), "192.168.1.20");
}

#[tokio::test]
async fn removing_by_shared_id_falls_back_to_the_older_address() {
    let factory = StubFactory::new(StubSession::default());
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.10", "cam-A", "Lobby"));
    registry.process_discovered_device(discovered("192.168.1.20", "cam-A", "Lobby"));

    assert!(registry.remove_device("cam-A").await);
    let remaining = registry.get_device("cam-A").unwrap();
    assert_eq!(remaining.ip.to_string(), "192.168.1.10");
    assert!(registry.remove_device("cam-A").await);
    assert!(registry.get_device("cam-A").is_none());
    assert_eq!(registry.device_count(), 0);
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check_probes_connected_devices_only() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.process_discovered_device(discovered("192.168.1.51", "idle", "Idle"));
    registry.configure_device("cam", creds()).await.unwrap();

    let report = registry.health_check().await;
    assert_eq!(report.checked, 1);
    assert_eq!(report.healthy, ["cam"]);
    assert!(report.is_healthy());
    assert_eq!(factory.session.calls(), 1);
}

#[tokio::test]
async fn health_check_runs_on_a_spawned_task() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.process_discovered_device(discovered("192.168.1.52", "door", "Door"));
    registry.configure_device("cam", creds()).await.unwrap();
    registry.configure_device("door", creds()).await.unwrap();

    let task = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.health_check().await })
    };
    let report = task.await.unwrap();

    assert_eq!(report.checked, 2);
    assert!(report.is_healthy());
    assert_eq!(factory.session.calls(), 2);
}

#[tokio::test]
async fn failed_probe_sets_error_but_keeps_the_session() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();
    factory.session.alive.store(false, Ordering::SeqCst);

    let report = registry.health_check().await;
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, "cam");

    let device = registry.get_device("cam").unwrap();
    assert_eq!(device.status, DeviceStatus::Error);
    assert!(device.session.is_some());
    assert_eq!(device.capabilities, full());
    assert!(device.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn health_monitor_runs_on_its_interval_until_stopped() {
    let factory = StubFactory::new(StubSession::with_capabilities(full()));
    let registry = registry(&factory);
    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    registry.configure_device("cam", creds()).await.unwrap();

    let monitor = registry
        .start_health_monitor(Duration::from_secs(60))
        .unwrap();
    assert!(monitor.is_running());

    tokio::time::sleep(Duration::from_secs(125)).await;
    assert_eq!(factory.session.calls(), 2);

    monitor.stop().await;
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(factory.session.calls(), 2);
}

#[tokio::test]
async fn zero_health_interval_is_rejected() {
    let factory = StubFactory::new(StubSession::default());
    let registry = registry(&factory);
    assert!(matches!(
        registry.start_health_monitor(Duration::ZERO),
        Err(CoreError::Validation { .. })
    ));
}

#[tokio::test]
async fn device_stream_sees_mutations() {
    let factory = StubFactory::new(StubSession::default());
    let registry = registry(&factory);
    let mut stream = registry.devices();
    assert!(stream.current().is_empty());

    registry.process_discovered_device(discovered("192.168.1.50", "cam", "Lobby"));
    let snap = stream.changed().await.unwrap();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].id, "cam");
}

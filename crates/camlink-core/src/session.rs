// ── Session seam ──
//
// The registry talks to cameras only through `CameraSession`. The real
// implementation wraps `camlink_api::SessionClient`; tests plug in stubs
// through `SessionFactory`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use camlink_api::{
    Capabilities, Credentials, DeviceInformation, Error as ApiError, ImagingSettings, MediaProfile,
    PtzStatus, PtzVector, SessionClient, SessionTarget, SystemDateTime, TransportConfig,
};

/// Results of a successful `initialize`, copied into the device record.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub capabilities: Capabilities,
    pub profiles: Vec<MediaProfile>,
    pub device_info: Option<DeviceInformation>,
}

/// A live, authenticated connection to one camera.
#[async_trait]
pub trait CameraSession: Send + Sync + fmt::Debug {
    async fn initialize(&self) -> Result<(), ApiError>;

    async fn snapshot(&self) -> SessionSnapshot;

    async fn disconnect(&self);

    /// Liveness probe.
    async fn get_system_date_and_time(&self) -> Result<SystemDateTime, ApiError>;

    async fn get_stream_uri(&self, profile_token: &str) -> Result<String, ApiError>;

    async fn get_snapshot_uri(&self, profile_token: &str) -> Result<String, ApiError>;

    async fn continuous_move(
        &self,
        profile_token: &str,
        velocity: PtzVector,
        timeout: Option<Duration>,
    ) -> Result<(), ApiError>;

    async fn stop_ptz(
        &self,
        profile_token: &str,
        pan_tilt: bool,
        zoom: bool,
    ) -> Result<(), ApiError>;

    async fn get_ptz_status(&self, profile_token: &str) -> Result<PtzStatus, ApiError>;

    async fn get_imaging_settings(
        &self,
        video_source_token: &str,
    ) -> Result<ImagingSettings, ApiError>;

    async fn set_imaging_settings(
        &self,
        video_source_token: &str,
        settings: &ImagingSettings,
    ) -> Result<(), ApiError>;

    async fn system_reboot(&self) -> Result<Option<String>, ApiError>;
}

/// Builds (uninitialized) sessions for the registry.
pub trait SessionFactory: Send + Sync {
    fn create(
        &self,
        target: SessionTarget,
        credentials: Credentials,
    ) -> Result<Arc<dyn CameraSession>, ApiError>;
}

// ── ONVIF implementation ─────────────────────────────────────────────

/// `CameraSession` backed by a SOAP `SessionClient`.
///
/// Remote operations take a read lock, so calls to one camera can overlap;
/// `initialize` and `disconnect` take the write lock.
pub struct OnvifSession {
    address: String,
    client: RwLock<SessionClient>,
}

impl OnvifSession {
    pub fn new(client: SessionClient) -> Self {
        Self {
            address: client.address(),
            client: RwLock::new(client),
        }
    }
}

impl fmt::Debug for OnvifSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnvifSession")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CameraSession for OnvifSession {
    async fn initialize(&self) -> Result<(), ApiError> {
        self.client.write().await.initialize().await
    }

    async fn snapshot(&self) -> SessionSnapshot {
        let client = self.client.read().await;
        SessionSnapshot {
            capabilities: client.capabilities(),
            profiles: client.profiles().to_vec(),
            device_info: client.device_info().cloned(),
        }
    }

    async fn disconnect(&self) {
        self.client.write().await.disconnect();
    }

    async fn get_system_date_and_time(&self) -> Result<SystemDateTime, ApiError> {
        self.client.read().await.get_system_date_and_time().await
    }

    async fn get_stream_uri(&self, profile_token: &str) -> Result<String, ApiError> {
        self.client.read().await.get_stream_uri(profile_token).await
    }

    async fn get_snapshot_uri(&self, profile_token: &str) -> Result<String, ApiError> {
        self.client
            .read()
            .await
            .get_snapshot_uri(profile_token)
            .await
    }

    async fn continuous_move(
        &self,
        profile_token: &str,
        velocity: PtzVector,
        timeout: Option<Duration>,
    ) -> Result<(), ApiError> {
        self.client
            .read()
            .await
            .continuous_move(profile_token, velocity, timeout)
            .await
    }

    async fn stop_ptz(
        &self,
        profile_token: &str,
        pan_tilt: bool,
        zoom: bool,
    ) -> Result<(), ApiError> {
        self.client
            .read()
            .await
            .stop_ptz(profile_token, pan_tilt, zoom)
            .await
    }

    async fn get_ptz_status(&self, profile_token: &str) -> Result<PtzStatus, ApiError> {
        self.client.read().await.get_ptz_status(profile_token).await
    }

    async fn get_imaging_settings(
        &self,
        video_source_token: &str,
    ) -> Result<ImagingSettings, ApiError> {
        self.client
            .read()
            .await
            .get_imaging_settings(video_source_token)
            .await
    }

    async fn set_imaging_settings(
        &self,
        video_source_token: &str,
        settings: &ImagingSettings,
    ) -> Result<(), ApiError> {
        self.client
            .read()
            .await
            .set_imaging_settings(video_source_token, settings)
            .await
    }

    async fn system_reboot(&self) -> Result<Option<String>, ApiError> {
        self.client.read().await.system_reboot().await
    }
}

/// Factory producing `OnvifSession`s with a shared transport config.
#[derive(Debug, Clone)]
pub struct OnvifSessionFactory {
    transport: TransportConfig,
}

impl OnvifSessionFactory {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }
}

impl SessionFactory for OnvifSessionFactory {
    fn create(
        &self,
        target: SessionTarget,
        credentials: Credentials,
    ) -> Result<Arc<dyn CameraSession>, ApiError> {
        let client = SessionClient::new(target, credentials, &self.transport)?;
        Ok(Arc::new(OnvifSession::new(client)))
    }
}

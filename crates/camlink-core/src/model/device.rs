// ── Managed device ──

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use url::Url;

use camlink_api::{
    Capabilities, Credentials, DeviceInformation, DiscoveredDevice, MediaProfile, SessionTarget,
    VendorType,
};

use crate::session::CameraSession;

/// Lifecycle state of a managed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    Discovered,
    Configuring,
    Connected,
    Error,
    Rebooting,
}

/// The registry's record for one camera.
///
/// Carries everything discovery reported plus lifecycle state, the cached
/// session results, and (never serialized) the credentials and live
/// session handle.
#[derive(Debug, Clone, Serialize)]
pub struct ManagedDevice {
    pub id: String,
    pub name: String,
    pub ip: IpAddr,
    pub port: u16,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub vendor: VendorType,
    pub service_url: Option<String>,
    pub service_urls: Vec<String>,
    pub scopes: String,
    pub discovered_at: DateTime<Utc>,

    // Lifecycle
    pub status: DeviceStatus,
    pub configured: bool,
    pub last_seen: DateTime<Utc>,
    pub last_error: Option<String>,

    // Cached from the last successful configuration
    pub capabilities: Capabilities,
    pub profiles: Vec<MediaProfile>,
    pub device_info: Option<DeviceInformation>,

    #[serde(skip)]
    pub credentials: Option<Credentials>,
    #[serde(skip)]
    pub session: Option<Arc<dyn CameraSession>>,
}

impl ManagedDevice {
    pub fn from_discovered(d: DiscoveredDevice) -> Self {
        let now = Utc::now();
        Self {
            id: d.id,
            name: d.name,
            ip: d.ip,
            port: d.port,
            manufacturer: d.manufacturer,
            model: d.model,
            location: d.location,
            vendor: d.vendor,
            service_url: d.service_url,
            service_urls: d.service_urls,
            scopes: d.scopes,
            discovered_at: d.discovered_at,
            status: DeviceStatus::Discovered,
            configured: false,
            last_seen: now,
            last_error: None,
            capabilities: d.capabilities,
            profiles: Vec::new(),
            device_info: None,
            credentials: None,
            session: None,
        }
    }

    /// Overwrite discovery-derived fields from a newer probe reply. The
    /// id, lifecycle state, session, and cached session data are kept.
    pub fn merge_discovered(&mut self, d: DiscoveredDevice) {
        self.name = d.name;
        self.port = d.port;
        self.manufacturer = d.manufacturer;
        self.model = d.model;
        self.location = d.location;
        self.vendor = d.vendor;
        self.service_url = d.service_url;
        self.service_urls = d.service_urls;
        self.scopes = d.scopes;
        self.discovered_at = d.discovered_at;
        self.last_seen = Utc::now();
    }

    /// Registry key for this device.
    pub fn key(&self) -> String {
        self.ip.to_string()
    }

    pub fn is_connected(&self) -> bool {
        self.status == DeviceStatus::Connected && self.session.is_some()
    }

    /// Where a session for this device should connect.
    pub fn session_target(&self) -> SessionTarget {
        let target = SessionTarget::new(self.ip, self.port);
        match self.service_url.as_deref().map(Url::parse) {
            Some(Ok(url)) => target.with_service_url(url),
            _ => target,
        }
    }

    pub fn profile(&self, token: &str) -> Option<&MediaProfile> {
        self.profiles.iter().find(|p| p.token == token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn discovered(scopes: &str) -> DiscoveredDevice {
        let mut d = DiscoveredDevice::manual("192.168.1.50".parse().unwrap(), 80);
        d.id = "uuid-1".into();
        d.scopes = scopes.into();
        d
    }

    #[test]
    fn merge_preserves_identity_and_lifecycle() {
        let mut device = ManagedDevice::from_discovered(discovered("a"));
        device.status = DeviceStatus::Connected;
        device.credentials = Some(Credentials::new("admin", "pw"));

        let mut newer = discovered("b");
        newer.id = "uuid-2".into();
        newer.port = 8080;
        device.merge_discovered(newer);

        assert_eq!(device.id, "uuid-1");
        assert_eq!(device.scopes, "b");
        assert_eq!(device.port, 8080);
        assert_eq!(device.status, DeviceStatus::Connected);
        assert!(device.credentials.is_some());
    }

    #[test]
    fn secrets_are_never_serialized() {
        let mut device = ManagedDevice::from_discovered(discovered(""));
        device.credentials = Some(Credentials::new("admin", "hunter2"));

        let json = serde_json::to_string(&device).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("credentials"));
        assert!(!json.contains("\"session\""));
        assert!(json.contains("\"status\":\"discovered\""));
        assert!(json.contains("\"type\":\"generic\""));
    }

    #[test]
    fn session_target_uses_advertised_url() {
        let device = ManagedDevice::from_discovered(discovered(""));
        let target = device.session_target();
        assert_eq!(
            target.service_url.unwrap().as_str(),
            "http://192.168.1.50/onvif/device_service"
        );
    }
}

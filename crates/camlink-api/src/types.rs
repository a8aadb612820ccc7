// ── Shared ONVIF domain types ──
//
// Plain data carried between the discovery engine, SOAP sessions, and the
// registry in camlink-core. Everything here is serializable; nothing here
// holds a secret or a live connection.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// ONVIF service roles a camera may expose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceKind {
    Device,
    Media,
    Ptz,
    Imaging,
    Events,
}

impl ServiceKind {
    /// WSDL namespace used for request bodies addressed to this service.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Device => "http://www.onvif.org/ver10/device/wsdl",
            Self::Media => "http://www.onvif.org/ver10/media/wsdl",
            Self::Ptz => "http://www.onvif.org/ver20/ptz/wsdl",
            Self::Imaging => "http://www.onvif.org/ver20/imaging/wsdl",
            Self::Events => "http://www.onvif.org/ver10/events/wsdl",
        }
    }

    /// Conventional namespace prefix (`tds`, `trt`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Device => "tds",
            Self::Media => "trt",
            Self::Ptz => "tptz",
            Self::Imaging => "timg",
            Self::Events => "tev",
        }
    }

    /// Element name of this service's section in a `GetCapabilities` reply.
    pub(crate) fn capability_element(self) -> &'static str {
        match self {
            Self::Device => "Device",
            Self::Media => "Media",
            Self::Ptz => "PTZ",
            Self::Imaging => "Imaging",
            Self::Events => "Events",
        }
    }
}

/// Which services a device session successfully bound.
///
/// Computed once when a session initializes and consulted before every
/// dispatch; nothing probes for a sub-client at call time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub device: bool,
    pub media: bool,
    pub ptz: bool,
    pub imaging: bool,
    pub events: bool,
}

impl Capabilities {
    /// The initial set for a freshly discovered device.
    pub fn device_only() -> Self {
        Self {
            device: true,
            ..Self::default()
        }
    }

    pub fn supports(&self, kind: ServiceKind) -> bool {
        match kind {
            ServiceKind::Device => self.device,
            ServiceKind::Media => self.media,
            ServiceKind::Ptz => self.ptz,
            ServiceKind::Imaging => self.imaging,
            ServiceKind::Events => self.events,
        }
    }

    pub fn set(&mut self, kind: ServiceKind, enabled: bool) {
        let slot = match kind {
            ServiceKind::Device => &mut self.device,
            ServiceKind::Media => &mut self.media,
            ServiceKind::Ptz => &mut self.ptz,
            ServiceKind::Imaging => &mut self.imaging,
            ServiceKind::Events => &mut self.events,
        };
        *slot = enabled;
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use strum::IntoEnumIterator;

        let names: Vec<String> = ServiceKind::iter()
            .filter(|k| self.supports(*k))
            .map(|k| k.to_string())
            .collect();
        f.write_str(&names.join(","))
    }
}

/// Camera vendor family, classified from the advertised manufacturer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VendorType {
    Hikvision,
    Dahua,
    Axis,
    Hanwha,
    Uniview,
    Reolink,
    Amcrest,
    Bosch,
    Sony,
    Panasonic,
    Tapo,
    #[default]
    Generic,
}

/// One device found by a WS-Discovery probe.
///
/// Identity (`id`) is scoped to a single discovery run; the registry keys
/// on `ip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: String,
    pub ip: IpAddr,
    pub port: u16,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub vendor: VendorType,
    /// Primary device-service address (first XAddr).
    pub service_url: Option<String>,
    /// All advertised XAddrs, in advertised order.
    pub service_urls: Vec<String>,
    /// Raw space-separated scope string.
    pub scopes: String,
    pub discovered_at: DateTime<Utc>,
    pub capabilities: Capabilities,
}

impl DiscoveredDevice {
    /// A device added by address rather than found by probe.
    pub fn manual(ip: IpAddr, port: u16) -> Self {
        let host = match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        let url = format!("http://{host}:{port}/onvif/device_service");
        Self {
            id: fallback_id(ip),
            name: ip.to_string(),
            ip,
            port,
            manufacturer: None,
            model: None,
            location: None,
            vendor: VendorType::Generic,
            service_url: Some(url.clone()),
            service_urls: vec![url],
            scopes: String::new(),
            discovered_at: Utc::now(),
            capabilities: Capabilities::device_only(),
        }
    }

    /// Overwrite every field except `id` with the newer observation.
    pub fn merge_from(&mut self, newer: Self) {
        let id = std::mem::take(&mut self.id);
        *self = Self { id, ..newer };
    }
}

/// Deterministic id for a device that advertised no endpoint reference.
pub fn fallback_id(ip: IpAddr) -> String {
    let flat: String = ip
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("onvif-{flat}")
}

// ── Session payloads ─────────────────────────────────────────────────

/// `GetDeviceInformation` reply. Every field is optional because some
/// firmwares restrict the call or omit elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInformation {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub hardware_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEncoderConfig {
    pub token: String,
    pub encoding: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<f32>,
    pub frame_rate_limit: Option<u32>,
    pub bitrate_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioEncoderConfig {
    pub token: String,
    pub encoding: String,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtzConfig {
    pub token: String,
    pub node_token: Option<String>,
    pub default_timeout: Option<String>,
}

/// A media profile as returned by `GetProfiles`. Read-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProfile {
    pub token: String,
    pub name: String,
    pub video_source_token: Option<String>,
    pub video_encoder: Option<VideoEncoderConfig>,
    pub audio_encoder: Option<AudioEncoderConfig>,
    pub ptz: Option<PtzConfig>,
}

/// Imaging parameters. `None` fields are left untouched on `set`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagingSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_saturation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir_cut_filter: Option<String>,
}

impl ImagingSettings {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Normalized PTZ velocity or position, each axis in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PtzVector {
    pub pan: f32,
    pub tilt: f32,
    pub zoom: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PtzStatus {
    pub position: Option<PtzVector>,
    pub pan_tilt_status: Option<String>,
    pub zoom_status: Option<String>,
    pub error: Option<String>,
    pub utc_time: Option<String>,
}

/// `GetSystemDateAndTime` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDateTime {
    pub date_time_type: Option<String>,
    pub daylight_savings: bool,
    pub timezone: Option<String>,
    pub utc: Option<DateTime<Utc>>,
}

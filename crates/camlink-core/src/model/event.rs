// ── Registry events ──
//
// Fire-and-forget notifications. A lagging or absent subscriber never
// blocks or fails a registry operation.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;

use super::ManagedDevice;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    DeviceAdded {
        device: Arc<ManagedDevice>,
    },
    DeviceUpdated {
        device: Arc<ManagedDevice>,
    },
    DeviceRemoved {
        id: String,
        ip: IpAddr,
    },
    Error {
        device_id: Option<String>,
        message: String,
    },
}

impl RegistryEvent {
    /// Id of the device the event concerns, if any.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::DeviceAdded { device } | Self::DeviceUpdated { device } => Some(&device.id),
            Self::DeviceRemoved { id, .. } => Some(id),
            Self::Error { device_id, .. } => device_id.as_deref(),
        }
    }
}

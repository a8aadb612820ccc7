//! Device registry and session orchestration on top of `camlink-api`.
//!
//! - **[`DeviceRegistry`]**: authoritative in-memory map of cameras, keyed
//!   by IP address. Ingests discovery results, drives the per-device
//!   lifecycle (`discovered → configuring → connected | error`,
//!   `connected → rebooting`), and dispatches capability-checked operations
//!   to each device's session.
//!
//! - **[`HealthMonitor`]**: owned handle to a periodic liveness task.
//!   Dropping the handle stops the task.
//!
//! - **[`CameraSession`] / [`SessionFactory`]**: the seam between the
//!   registry and the SOAP client. [`OnvifSessionFactory`] is the real
//!   implementation; tests substitute stubs.
//!
//! - **[`RegistryEvent`]**: fire-and-forget notifications on a `broadcast`
//!   channel; [`DeviceStream`] gives reactive snapshots of the device list.

pub mod command;
pub mod config;
pub mod error;
pub mod health;
pub mod model;
pub mod registry;
pub mod retry;
pub mod session;
mod store;
pub mod stream;

pub use command::{PtzCommand, PtzOutcome};
pub use config::{RegistryConfig, TlsVerification};
pub use error::CoreError;
pub use health::{HealthFailure, HealthMonitor, HealthReport};
pub use model::{DeviceStatus, ManagedDevice, RegistryEvent};
pub use registry::DeviceRegistry;
pub use retry::RetryPolicy;
pub use session::{
    CameraSession, OnvifSession, OnvifSessionFactory, SessionFactory, SessionSnapshot,
};
pub use stream::{DeviceStream, DeviceWatchStream};

// Re-export the api types that appear in this crate's public signatures.
pub use camlink_api::{
    Capabilities, Credentials, DeviceInformation, DiscoveredDevice, DiscoveryConfig,
    ImagingSettings, MediaProfile, PtzStatus, PtzVector, ServiceKind, SystemDateTime, VendorType,
};

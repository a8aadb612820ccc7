// camlink-api: Async Rust client for ONVIF cameras (WS-Discovery + SOAP sessions)

pub mod auth;
pub mod discovery;
pub mod error;
pub mod session;
pub mod soap;
pub mod transport;
pub mod types;
pub(crate) mod xml;

pub use auth::{Credentials, UsernameToken, password_digest};
pub use discovery::{DiscoveryConfig, DiscoveryEngine};
pub use error::Error;
pub use session::{SessionClient, SessionTarget};
pub use transport::{TlsMode, TransportConfig};
pub use types::{
    AudioEncoderConfig, Capabilities, DeviceInformation, DiscoveredDevice, ImagingSettings,
    MediaProfile, PtzConfig, PtzStatus, PtzVector, ServiceKind, SystemDateTime, VendorType,
    VideoEncoderConfig,
};

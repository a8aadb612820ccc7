// ── Registry domain model ──

pub mod device;
pub mod event;

pub use device::{DeviceStatus, ManagedDevice};
pub use event::RegistryEvent;

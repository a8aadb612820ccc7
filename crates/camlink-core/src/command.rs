// ── PTZ command model ──

use std::time::Duration;

use serde::Serialize;

use camlink_api::{PtzStatus, PtzVector};

use crate::error::CoreError;

/// A pan/tilt/zoom request routed through `DeviceRegistry::control_ptz`.
#[derive(Debug, Clone, PartialEq)]
pub enum PtzCommand {
    /// Continuous move. Velocity components are in `[-1.0, 1.0]`.
    Move {
        velocity: PtzVector,
        timeout: Option<Duration>,
    },
    /// Stop the selected axes.
    Stop { pan_tilt: bool, zoom: bool },
    /// Read the current position and move state.
    Status,
}

impl PtzCommand {
    pub fn stop_all() -> Self {
        Self::Stop {
            pan_tilt: true,
            zoom: true,
        }
    }

    /// Reject malformed commands before any network I/O.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Move { velocity, timeout } => {
                for (axis, value) in [
                    ("pan", velocity.pan),
                    ("tilt", velocity.tilt),
                    ("zoom", velocity.zoom),
                ] {
                    if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                        return Err(CoreError::Validation {
                            message: format!("{axis} velocity {value} is outside [-1, 1]"),
                        });
                    }
                }
                if timeout.is_some_and(|t| t.is_zero()) {
                    return Err(CoreError::Validation {
                        message: "move timeout must be greater than zero".into(),
                    });
                }
                Ok(())
            }
            Self::Stop {
                pan_tilt: false,
                zoom: false,
            } => Err(CoreError::Validation {
                message: "stop must select pan/tilt, zoom, or both".into(),
            }),
            Self::Stop { .. } | Self::Status => Ok(()),
        }
    }

    pub(crate) fn operation(&self) -> &'static str {
        match self {
            Self::Move { .. } => "ContinuousMove",
            Self::Stop { .. } => "Stop",
            Self::Status => "GetStatus",
        }
    }
}

/// Result of a PTZ command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PtzOutcome {
    Done,
    Status(PtzStatus),
}

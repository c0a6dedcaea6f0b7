//! # MoonBot Diagnostics
//!
//! Logging initialisation and host telemetry for MoonBot.

#![warn(clippy::all)]

pub mod error;
pub mod logging;
pub mod telemetry;

// Re-export main types
pub use error::{DiagnosticsError, DiagnosticsResult};
pub use logging::init_logging;
pub use telemetry::{read_thermal_zone, HostSnapshot, HostTelemetry, TelemetrySource};

//! # MoonBot Server
//!
//! HTTP surface of the MoonBot camera controller, together with the capture
//! service and the auto-capture loop it drives.
//!
//! ## Routes
//!
//! | method | path              | response                                  |
//! |--------|-------------------|-------------------------------------------|
//! | GET    | `/`               | landing page                              |
//! | GET    | `/video`          | `multipart/x-mixed-replace` JPEG stream   |
//! | POST   | `/capture`        | `{status, filename}`                      |
//! | POST   | `/burst`          | `{status, files, count}`                  |
//! | GET    | `/gallery`        | `{photos, count, total_size}`             |
//! | GET    | `/photos/:name`   | JPEG bytes                                |
//! | GET    | `/download/:name` | JPEG bytes as an attachment               |
//! | POST   | `/delete/:name`   | `{status}`                                |
//! | POST   | `/delete_all`     | `{status, deleted}`                       |
//! | GET    | `/system`         | host telemetry, store usage, health       |
//! | GET    | `/settings`       | runtime settings                          |
//! | POST   | `/settings`       | `{status, settings}`                      |

#![warn(clippy::all)]

pub mod auto_capture;
pub mod capture;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use auto_capture::{AutoCaptureLoop, AutoCaptureState, AutoCaptureStatus};
pub use capture::CaptureService;
pub use error::{ApiError, ApiResult};
pub use routes::{router, BurstRequest};
pub use server::MoonbotServer;
pub use state::{AppState, ViewerInfo, ViewerStream};

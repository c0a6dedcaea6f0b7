//! # MoonBot - Local Web Camera Controller
//!
//! MoonBot streams a live webcam feed over HTTP, takes single and burst
//! photos on request, auto-captures on a timer, keeps the photo directory
//! under a storage ceiling and reports host telemetry through a small JSON
//! API.
//!
//! ## Key Features
//!
//! - **Single camera owner**: every frame read goes through one capture
//!   gateway, so the live stream and still captures never fight over the device
//! - **Live MJPEG stream**: one paced producer per viewer, stopped as soon as
//!   the viewer disconnects
//! - **Size-based retention**: oldest photos are evicted once the directory
//!   exceeds its byte budget, never below a minimum count
//! - **Resilient capture**: a failed read reopens the camera once; the server
//!   keeps answering while the camera is gone
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use moonbot::{AppConfig, AppState, HostTelemetry, MoonbotServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let device = moonbot::open_camera(&config.camera, config.settings.photo_resolution);
//!     let state = AppState::new(config, device, Arc::new(HostTelemetry::new())).await?;
//!
//!     MoonbotServer::new(state)
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod cli;

// Re-export core types for easy access
pub use moonbot_core::{
    AppConfig, BurstConfig, CameraConfig, MoonbotError, MoonbotResult, PhotoRecord, PhotoStore,
    PhotoTag, Resolution, RetentionConfig, RetentionTrigger, RuntimeSettings, Settings,
    SettingsUpdate, StreamConfig,
};

pub use moonbot_media::{
    open_camera, CameraDevice, CaptureGateway, CaptureStats, EncodeTarget, EncodedImage, Frame,
    MediaError, StreamProducer, TestPatternDevice,
};

pub use moonbot_diagnostics::{init_logging, HostSnapshot, HostTelemetry, TelemetrySource};

pub use moonbot_server::{
    router, ApiError, AppState, AutoCaptureLoop, AutoCaptureStatus, CaptureService,
    MoonbotServer,
};

pub use cli::Cli;

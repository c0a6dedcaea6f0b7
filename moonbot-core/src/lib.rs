//! # MoonBot Core
//!
//! Shared foundation for the MoonBot camera controller: the error taxonomy,
//! static configuration, process-wide runtime settings and the on-disk photo
//! store with its size-based retention policy.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod settings;
pub mod store;

// Re-export main types
pub use config::{
    AppConfig, BurstConfig, CameraConfig, RetentionConfig, RetentionTrigger, StreamConfig,
};
pub use error::{MoonbotError, MoonbotResult};
pub use settings::{Resolution, RuntimeSettings, Settings, SettingsUpdate};
pub use store::{PhotoName, PhotoRecord, PhotoStore, PhotoTag, StoreUsage};

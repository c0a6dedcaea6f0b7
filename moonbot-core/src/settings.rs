//! Runtime settings shared by the stream producer, the capture service and
//! the auto-capture loop.
//!
//! Writes only affect reads that happen after them; a frame that is already
//! being encoded keeps the quality it started with.

use crate::error::{MoonbotError, MoonbotResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Image resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Low-res preview size, small enough for a Bluetooth PAN link
    pub const QVGA: Self = Self::new(320, 240);
    pub const VGA: Self = Self::new(640, 480);
    pub const HD: Self = Self::new(1280, 720);
    pub const FULL_HD: Self = Self::new(1920, 1080);

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Snapshot of the runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between auto-captures
    pub auto_capture_interval: u64,
    /// JPEG quality of streamed frames (1-100)
    pub stream_quality: u8,
    /// JPEG quality of stored photos (1-100)
    pub photo_quality: u8,
    /// Bounding box for streamed frames
    pub stream_resolution: Resolution,
    /// Bounding box for stored photos
    pub photo_resolution: Resolution,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_capture_interval: 10,
            stream_quality: 70,
            photo_quality: 92,
            stream_resolution: Resolution::QVGA,
            photo_resolution: Resolution::FULL_HD,
        }
    }
}

impl Settings {
    /// Auto-capture interval as a duration
    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.auto_capture_interval)
    }

    /// Validate a complete settings record
    pub fn validate(&self) -> MoonbotResult<()> {
        check_interval(self.auto_capture_interval as i64)?;
        check_quality("stream_quality", self.stream_quality as i64)?;
        check_quality("photo_quality", self.photo_quality as i64)?;
        if self.stream_resolution.is_empty() {
            return Err(MoonbotError::validation(
                "stream_resolution",
                "width and height must be non-zero",
            ));
        }
        if self.photo_resolution.is_empty() {
            return Err(MoonbotError::validation(
                "photo_resolution",
                "width and height must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Partial settings write, as received from the settings API.
///
/// Fields are signed so that negative input reaches validation instead of
/// failing deserialization with an unhelpful message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub auto_capture_interval: Option<i64>,
    #[serde(default)]
    pub stream_quality: Option<i64>,
    #[serde(default)]
    pub photo_quality: Option<i64>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.auto_capture_interval.is_none()
            && self.stream_quality.is_none()
            && self.photo_quality.is_none()
    }
}

fn check_interval(value: i64) -> MoonbotResult<u64> {
    if value <= 0 {
        return Err(MoonbotError::validation(
            "auto_capture_interval",
            format!("must be a positive number of seconds, got {value}"),
        ));
    }
    Ok(value as u64)
}

fn check_quality(field: &str, value: i64) -> MoonbotResult<u8> {
    if !(1..=100).contains(&value) {
        return Err(MoonbotError::validation(
            field,
            format!("must be between 1 and 100, got {value}"),
        ));
    }
    Ok(value as u8)
}

/// Process-wide mutable settings, injected where needed
#[derive(Debug, Default)]
pub struct RuntimeSettings {
    inner: RwLock<Settings>,
}

impl RuntimeSettings {
    pub fn new(initial: Settings) -> MoonbotResult<Self> {
        initial.validate()?;
        Ok(Self {
            inner: RwLock::new(initial),
        })
    }

    /// Current settings snapshot
    pub fn get(&self) -> Settings {
        self.inner.read().clone()
    }

    /// Apply a partial update. Every field is validated before anything is
    /// written, so a rejected update leaves the settings untouched.
    pub fn update(&self, update: &SettingsUpdate) -> MoonbotResult<Settings> {
        let interval = update
            .auto_capture_interval
            .map(check_interval)
            .transpose()?;
        let stream_quality = update
            .stream_quality
            .map(|q| check_quality("stream_quality", q))
            .transpose()?;
        let photo_quality = update
            .photo_quality
            .map(|q| check_quality("photo_quality", q))
            .transpose()?;

        let mut settings = self.inner.write();
        if let Some(interval) = interval {
            settings.auto_capture_interval = interval;
        }
        if let Some(quality) = stream_quality {
            settings.stream_quality = quality;
        }
        if let Some(quality) = photo_quality {
            settings.photo_quality = quality;
        }

        info!(
            interval = settings.auto_capture_interval,
            stream_quality = settings.stream_quality,
            photo_quality = settings.photo_quality,
            "Runtime settings updated"
        );
        Ok(settings.clone())
    }
}

//! Configuration types and defaults

use crate::error::{MoonbotError, MoonbotResult};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// When storage retention runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionTrigger {
    /// Only after auto-captures
    AutoOnly,
    /// After every saved photo, manual and burst included
    EverySave,
}

/// Storage ceiling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Byte budget for the photo directory
    pub ceiling_bytes: u64,
    /// Never evict below this many photos
    pub min_keep: usize,
    /// Which saves trigger eviction
    pub trigger: RetentionTrigger,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ceiling_bytes: 512 * 1024 * 1024,
            min_keep: 10,
            trigger: RetentionTrigger::AutoOnly,
        }
    }
}

/// Live stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Frame rate ceiling per viewer
    pub max_fps: f64,
    /// Pause after a failed frame read before trying again
    pub retry_delay: Duration,
    /// Encoded chunks buffered per viewer
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_fps: 30.0,
            retry_delay: Duration::from_millis(100),
            channel_capacity: 2,
        }
    }
}

impl StreamConfig {
    /// Minimum time between two frames sent to one viewer
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_fps)
    }
}

/// Burst request defaults and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstConfig {
    pub default_count: u32,
    pub default_delay: Duration,
    pub max_count: u32,
    pub max_delay: Duration,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            default_count: 5,
            default_delay: Duration::from_millis(200),
            max_count: 50,
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Camera device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Index of the camera to open (0 = first camera)
    pub index: u32,
    /// A single read taking longer than this counts as failed
    pub read_timeout: Duration,
    /// Use the synthetic test pattern instead of a real camera
    pub test_pattern: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            read_timeout: Duration::from_secs(5),
            test_pattern: false,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Directory holding saved photos
    pub photo_dir: PathBuf,
    pub camera: CameraConfig,
    pub stream: StreamConfig,
    pub retention: RetentionConfig,
    pub burst: BurstConfig,
    /// Runtime settings at startup
    pub settings: Settings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 5000),
            photo_dir: PathBuf::from("moon_shots"),
            camera: CameraConfig::default(),
            stream: StreamConfig::default(),
            retention: RetentionConfig::default(),
            burst: BurstConfig::default(),
            settings: Settings::default(),
        }
    }
}

impl AppConfig {
    /// Validate configuration
    pub fn validate(&self) -> MoonbotResult<()> {
        if self.photo_dir.as_os_str().is_empty() {
            return Err(MoonbotError::InvalidConfiguration {
                message: "Photo directory must not be empty".to_string(),
            });
        }

        if !(self.stream.max_fps > 0.0 && self.stream.max_fps <= 120.0) {
            return Err(MoonbotError::InvalidConfiguration {
                message: format!("Invalid stream frame rate: {}", self.stream.max_fps),
            });
        }

        if self.stream.channel_capacity == 0 {
            return Err(MoonbotError::InvalidConfiguration {
                message: "Stream channel capacity must be > 0".to_string(),
            });
        }

        if self.camera.read_timeout.is_zero() {
            return Err(MoonbotError::InvalidConfiguration {
                message: "Camera read timeout must be > 0".to_string(),
            });
        }

        if self.burst.max_count == 0
            || self.burst.default_count == 0
            || self.burst.default_count > self.burst.max_count
        {
            return Err(MoonbotError::InvalidConfiguration {
                message: format!(
                    "Burst default count {} must be within 1..={}",
                    self.burst.default_count, self.burst.max_count
                ),
            });
        }

        if self.burst.default_delay > self.burst.max_delay {
            return Err(MoonbotError::InvalidConfiguration {
                message: "Burst default delay exceeds the maximum delay".to_string(),
            });
        }

        self.settings
            .validate()
            .map_err(|e| MoonbotError::InvalidConfiguration {
                message: e.to_string(),
            })
    }
}

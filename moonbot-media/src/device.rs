//! Camera device handles
//!
//! A [`CameraDevice`] owns the single camera resource. It is `Send` so it can
//! move between threads, but it is not `Sync` and all methods take `&mut self`:
//! callers share it only through the capture gateway.

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;
use moonbot_core::{CameraConfig, Resolution};
use tracing::{debug, info};

/// Platform camera backend
pub trait CameraDevice: Send {
    /// Human-readable device name, used in logs and errors
    fn name(&self) -> &str;
    /// Open (or reopen) the device
    fn open(&mut self) -> MediaResult<()>;
    /// Read one frame. Blocks until the device delivers it.
    fn read(&mut self) -> MediaResult<Frame>;
    /// Release the device. Safe to call when already closed.
    fn close(&mut self);
}

/// Build the camera backend for this configuration
pub fn open_camera(config: &CameraConfig, resolution: Resolution) -> Box<dyn CameraDevice> {
    if config.test_pattern {
        info!("Using synthetic test pattern camera");
        return Box::new(TestPatternDevice::new(resolution));
    }

    #[cfg(feature = "native-camera")]
    {
        Box::new(crate::native::NokhwaDevice::new(
            config.index,
            resolution,
            config.read_timeout,
        ))
    }
    #[cfg(not(feature = "native-camera"))]
    {
        tracing::warn!(
            index = config.index,
            "Built without native camera support, falling back to test pattern"
        );
        Box::new(TestPatternDevice::new(resolution))
    }
}

/// Synthetic camera producing a moving gradient
#[derive(Debug)]
pub struct TestPatternDevice {
    resolution: Resolution,
    frame_count: u64,
    is_open: bool,
}

impl TestPatternDevice {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            frame_count: 0,
            is_open: false,
        }
    }

    pub fn frames_produced(&self) -> u64 {
        self.frame_count
    }
}

impl CameraDevice for TestPatternDevice {
    fn name(&self) -> &str {
        "test-pattern"
    }

    fn open(&mut self) -> MediaResult<()> {
        if self.resolution.is_empty() {
            return Err(MediaError::DeviceOpenFailed {
                device: self.name().to_string(),
                reason: format!("invalid resolution {}", self.resolution),
            });
        }
        self.is_open = true;
        debug!(resolution = %self.resolution, "Test pattern camera opened");
        Ok(())
    }

    fn read(&mut self) -> MediaResult<Frame> {
        if !self.is_open {
            return Err(MediaError::ReadFailed {
                device: self.name().to_string(),
                reason: "device not open".to_string(),
            });
        }

        let Resolution { width, height } = self.resolution;
        let shift = (self.frame_count % 256) as u32;
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                data.push(((x * 255 / width.max(1) + shift) % 256) as u8);
                data.push(((y * 255 / height.max(1)) % 256) as u8);
                data.push(((x + y + shift) % 256) as u8);
            }
        }
        self.frame_count += 1;

        Frame::new(width, height, data)
    }

    fn close(&mut self) {
        self.is_open = false;
    }
}

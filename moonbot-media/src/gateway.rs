//! Capture gateway
//!
//! Every frame read in the process goes through [`CaptureGateway::acquire_frame`].
//! A fair async mutex serializes device access so callers are served in
//! arrival order. The lock covers exactly one device read: the blocking read
//! runs on the blocking pool holding an owned guard, and encoding or file I/O
//! by the caller happens after the guard is released.
//!
//! The device is opened on first use and reused afterwards. A failed read
//! closes and reopens the device, then retries once; a second failure is
//! reported as [`MediaError::CameraUnavailable`].

use crate::device::CameraDevice;
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Gateway counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Frames successfully read
    pub frames_read: u64,
    /// Reads that failed, first attempts and retries alike
    pub failed_reads: u64,
    /// Close-and-reopen cycles after a failed read
    pub reopens: u64,
    /// `acquire_frame` calls that ended in `CameraUnavailable`
    pub unavailable: u64,
    /// Most recent failure message
    pub last_error: Option<String>,
}

struct DeviceSlot {
    device: Box<dyn CameraDevice>,
    is_open: bool,
}

/// Serialized access to the single camera device
pub struct CaptureGateway {
    slot: Arc<Mutex<DeviceSlot>>,
    stats: Arc<RwLock<CaptureStats>>,
    device_name: String,
}

impl std::fmt::Debug for CaptureGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureGateway")
            .field("device", &self.device_name)
            .finish_non_exhaustive()
    }
}

impl CaptureGateway {
    /// Wrap a device. It is not opened until the first frame is requested.
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        let device_name = device.name().to_string();
        Self {
            slot: Arc::new(Mutex::new(DeviceSlot {
                device,
                is_open: false,
            })),
            stats: Arc::new(RwLock::new(CaptureStats::default())),
            device_name,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Read one frame, reopening the device once on failure
    pub async fn acquire_frame(&self) -> MediaResult<Frame> {
        let mut slot = self.slot.clone().lock_owned().await;
        let stats = self.stats.clone();

        tokio::task::spawn_blocking(move || read_with_retry(&mut slot, &stats))
            .await
            .map_err(|e| MediaError::CameraUnavailable {
                reason: format!("capture task failed: {e}"),
            })?
    }

    /// Counters snapshot
    pub fn stats(&self) -> CaptureStats {
        self.stats.read().clone()
    }

    /// Release the device. The next `acquire_frame` reopens it.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if slot.is_open {
            slot.device.close();
            slot.is_open = false;
            debug!(device = %self.device_name, "Camera closed");
        }
    }
}

fn attempt(slot: &mut DeviceSlot) -> MediaResult<Frame> {
    if !slot.is_open {
        slot.device.open()?;
        slot.is_open = true;
        debug!(device = slot.device.name(), "Camera opened");
    }
    slot.device.read()
}

fn read_with_retry(slot: &mut DeviceSlot, stats: &RwLock<CaptureStats>) -> MediaResult<Frame> {
    let first = match attempt(slot) {
        Ok(frame) => {
            stats.write().frames_read += 1;
            return Ok(frame);
        }
        Err(e) => e,
    };

    warn!(device = slot.device.name(), error = %first, "Frame read failed, reopening camera");
    slot.device.close();
    slot.is_open = false;
    {
        let mut stats = stats.write();
        stats.failed_reads += 1;
        stats.reopens += 1;
        stats.last_error = Some(first.to_string());
    }

    match attempt(slot) {
        Ok(frame) => {
            stats.write().frames_read += 1;
            Ok(frame)
        }
        Err(second) => {
            warn!(device = slot.device.name(), error = %second, "Camera unavailable after reopen");
            let mut stats = stats.write();
            stats.failed_reads += 1;
            stats.unavailable += 1;
            stats.last_error = Some(second.to_string());
            Err(MediaError::CameraUnavailable {
                reason: second.to_string(),
            })
        }
    }
}

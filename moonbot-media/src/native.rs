//! Native camera capture via nokhwa
//!
//! `nokhwa::Camera` is `!Send`, so the camera lives on its own device thread
//! for as long as the handle is open. The [`NokhwaDevice`] handle sends read
//! requests over a channel and waits for the reply with a timeout, which keeps
//! a hung driver from stalling the capture gateway forever.

use crate::device::CameraDevice;
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;
use moonbot_core::Resolution;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution as NokhwaResolution,
};
use nokhwa::Camera;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUESTED_FPS: u32 = 30;

enum Command {
    Read(mpsc::Sender<MediaResult<Frame>>),
}

struct Worker {
    commands: mpsc::Sender<Command>,
    thread: JoinHandle<()>,
}

/// Handle to a V4L2 / AVFoundation / MSMF camera
pub struct NokhwaDevice {
    name: String,
    index: u32,
    resolution: Resolution,
    read_timeout: Duration,
    worker: Option<Worker>,
}

impl NokhwaDevice {
    pub fn new(index: u32, resolution: Resolution, read_timeout: Duration) -> Self {
        Self {
            name: format!("camera{index}"),
            index,
            resolution,
            read_timeout,
            worker: None,
        }
    }

    fn spawn_worker(&self) -> MediaResult<Worker> {
        let (commands, command_rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel::<MediaResult<()>>();
        let index = self.index;
        let resolution = self.resolution;
        let name = self.name.clone();

        let thread = std::thread::Builder::new()
            .name(format!("moonbot-{name}"))
            .spawn(move || {
                let mut camera = match open_stream(index, resolution, &name) {
                    Ok(camera) => camera,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                while let Ok(command) = command_rx.recv() {
                    match command {
                        Command::Read(reply) => {
                            let _ = reply.send(read_frame(&mut camera, &name));
                        }
                    }
                }

                if let Err(e) = camera.stop_stream() {
                    warn!(device = %name, error = %e, "Error stopping camera stream");
                }
                debug!(device = %name, "Camera thread exiting");
            })
            .map_err(|e| MediaError::DeviceOpenFailed {
                device: self.name.clone(),
                reason: format!("failed to spawn device thread: {e}"),
            })?;

        match ready_rx.recv_timeout(self.read_timeout) {
            Ok(Ok(())) => Ok(Worker { commands, thread }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MediaError::DeviceOpenFailed {
                device: self.name.clone(),
                reason: format!("camera did not start within {:?}", self.read_timeout),
            }),
        }
    }
}

fn open_stream(index: u32, resolution: Resolution, name: &str) -> MediaResult<Camera> {
    let format = CameraFormat::new(
        NokhwaResolution::new(resolution.width, resolution.height),
        FrameFormat::MJPEG,
        REQUESTED_FPS,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

    let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(|e| {
        MediaError::DeviceOpenFailed {
            device: name.to_string(),
            reason: e.to_string(),
        }
    })?;
    camera
        .open_stream()
        .map_err(|e| MediaError::DeviceOpenFailed {
            device: name.to_string(),
            reason: e.to_string(),
        })?;

    let actual = camera.camera_format().resolution();
    info!(
        device = %name,
        requested = %resolution,
        actual_w = actual.width_x,
        actual_h = actual.height_y,
        "Camera stream opened"
    );
    Ok(camera)
}

fn read_frame(camera: &mut Camera, name: &str) -> MediaResult<Frame> {
    let buffer = camera.frame().map_err(|e| MediaError::ReadFailed {
        device: name.to_string(),
        reason: e.to_string(),
    })?;
    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| MediaError::ReadFailed {
            device: name.to_string(),
            reason: format!("decode failed: {e}"),
        })?;
    let (width, height) = (decoded.width(), decoded.height());
    Frame::new(width, height, decoded.into_raw())
}

impl CameraDevice for NokhwaDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> MediaResult<()> {
        self.close();
        self.worker = Some(self.spawn_worker()?);
        Ok(())
    }

    fn read(&mut self) -> MediaResult<Frame> {
        let worker = self.worker.as_ref().ok_or_else(|| MediaError::ReadFailed {
            device: self.name.clone(),
            reason: "device not open".to_string(),
        })?;

        let (reply_tx, reply_rx) = mpsc::channel();
        worker
            .commands
            .send(Command::Read(reply_tx))
            .map_err(|_| MediaError::ReadFailed {
                device: self.name.clone(),
                reason: "camera thread stopped".to_string(),
            })?;

        match reply_rx.recv_timeout(self.read_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(MediaError::ReadTimeout {
                duration: self.read_timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(MediaError::ReadFailed {
                device: self.name.clone(),
                reason: "camera thread stopped".to_string(),
            }),
        }
    }

    fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Dropping the sender ends the command loop once the thread is idle
        drop(worker.commands);
        if worker.thread.is_finished() {
            let _ = worker.thread.join();
        } else {
            debug!(device = %self.name, "Camera thread still busy, detaching");
        }
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        self.close();
    }
}

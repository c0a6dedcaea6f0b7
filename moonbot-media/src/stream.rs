//! Live MJPEG stream producer
//!
//! Each viewer gets its own producer task feeding a small bounded channel.
//! The receiving half is a [`FrameStream`]; when the viewer disconnects the
//! HTTP layer drops it, the channel closes, and the producer stops before
//! issuing another capture. Every wait in the producer races the
//! channel-closed signal so shutdown is prompt even between frames.

use crate::encoder::encode_blocking;
use crate::frame::EncodeTarget;
use crate::gateway::CaptureGateway;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use moonbot_core::{RuntimeSettings, StreamConfig};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Multipart boundary between frames
pub const BOUNDARY: &str = "frame";

/// Response content type for the live stream
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// One multipart part carrying a JPEG
pub fn frame_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}

/// Spawns one producer per viewer
#[derive(Debug, Clone)]
pub struct StreamProducer {
    gateway: Arc<CaptureGateway>,
    settings: Arc<RuntimeSettings>,
    config: StreamConfig,
    active: Arc<AtomicUsize>,
}

impl StreamProducer {
    pub fn new(
        gateway: Arc<CaptureGateway>,
        settings: Arc<RuntimeSettings>,
        config: StreamConfig,
    ) -> Self {
        Self {
            gateway,
            settings,
            config,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Producer tasks currently running
    pub fn active_producers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Start streaming to one viewer
    pub fn start(&self, viewer: &str) -> FrameStream {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let producer = Producer {
            gateway: self.gateway.clone(),
            settings: self.settings.clone(),
            config: self.config.clone(),
            viewer: viewer.to_string(),
            _active: ActiveGuard::new(self.active.clone()),
        };
        tokio::spawn(producer.run(tx));
        FrameStream { rx }
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Producer {
    gateway: Arc<CaptureGateway>,
    settings: Arc<RuntimeSettings>,
    config: StreamConfig,
    viewer: String,
    _active: ActiveGuard,
}

impl Producer {
    async fn run(self, tx: mpsc::Sender<Bytes>) {
        let frame_interval = self.config.frame_interval();
        let mut frames_sent = 0u64;
        info!(viewer = %self.viewer, "Stream started");

        loop {
            let started = Instant::now();

            let frame = tokio::select! {
                _ = tx.closed() => break,
                frame = self.gateway.acquire_frame() => frame,
            };
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(viewer = %self.viewer, error = %e, "Stream frame unavailable, retrying");
                    tokio::select! {
                        _ = tx.closed() => break,
                        _ = tokio::time::sleep(self.config.retry_delay) => continue,
                    }
                }
            };

            // Settings are read per frame so quality changes apply to the next one
            let settings = self.settings.get();
            let target = EncodeTarget::new(settings.stream_resolution, settings.stream_quality);
            let image = match encode_blocking(frame, target).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(viewer = %self.viewer, error = %e, "Stream frame encoding failed");
                    tokio::select! {
                        _ = tx.closed() => break,
                        _ = tokio::time::sleep(self.config.retry_delay) => continue,
                    }
                }
            };

            if tx.send(frame_part(&image.data)).await.is_err() {
                break;
            }
            frames_sent += 1;

            if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = tokio::time::sleep(remaining) => {}
                }
            }
        }

        info!(viewer = %self.viewer, frames_sent, "Stream ended");
    }
}

/// Receiving half of a viewer's stream. Dropping it stops the producer.
#[derive(Debug)]
pub struct FrameStream {
    rx: mpsc::Receiver<Bytes>,
}

impl FrameStream {
    /// Next multipart chunk, or `None` once the producer has stopped
    pub async fn next_part(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl Stream for FrameStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|part| part.map(Ok))
    }
}

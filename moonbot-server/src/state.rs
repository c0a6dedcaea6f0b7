//! Shared application state handed to every request handler

use crate::auto_capture::AutoCaptureLoop;
use crate::capture::CaptureService;
use bytes::Bytes;
use chrono::{DateTime, Local};
use dashmap::DashMap;
use futures::stream::{BoxStream, StreamExt};
use futures::Stream;
use moonbot_core::{AppConfig, MoonbotResult, PhotoStore, RuntimeSettings};
use moonbot_diagnostics::TelemetrySource;
use moonbot_media::{CameraDevice, CaptureGateway, StreamProducer};
use serde::Serialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

/// One connected `/video` client
#[derive(Debug, Clone, Serialize)]
pub struct ViewerInfo {
    pub id: Uuid,
    pub connected_at: DateTime<Local>,
}

/// Viewer registry keyed by viewer id
pub type Viewers = Arc<DashMap<Uuid, ViewerInfo>>;

/// Everything the handlers and background tasks share
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub settings: Arc<RuntimeSettings>,
    pub gateway: Arc<CaptureGateway>,
    pub store: Arc<PhotoStore>,
    pub capture: Arc<CaptureService>,
    pub auto_capture: Arc<AutoCaptureLoop>,
    pub stream: StreamProducer,
    pub telemetry: Arc<dyn TelemetrySource>,
    viewers: Viewers,
    shutdown: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("photo_dir", &self.store.dir())
            .field("device", &self.gateway.device_name())
            .field("viewers", &self.viewers.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire up every component around one camera device
    pub async fn new(
        config: AppConfig,
        device: Box<dyn CameraDevice>,
        telemetry: Arc<dyn TelemetrySource>,
    ) -> MoonbotResult<Self> {
        config.validate()?;

        let settings = Arc::new(RuntimeSettings::new(config.settings.clone())?);
        let store = Arc::new(PhotoStore::open(&config.photo_dir).await?);
        let gateway = Arc::new(CaptureGateway::new(device));
        let capture = Arc::new(CaptureService::new(
            gateway.clone(),
            store.clone(),
            settings.clone(),
            config.retention.clone(),
        )
        .with_max_burst(config.burst.max_count));
        let auto_capture = Arc::new(AutoCaptureLoop::new(capture.clone(), settings.clone()));
        let stream = StreamProducer::new(gateway.clone(), settings.clone(), config.stream.clone());
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            settings,
            gateway,
            store,
            capture,
            auto_capture,
            stream,
            telemetry,
            viewers: Arc::new(DashMap::new()),
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    pub fn viewers(&self) -> Vec<ViewerInfo> {
        self.viewers.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Register a viewer and start its frame stream. The stream ends when the
    /// client goes away or the server begins shutting down, and the viewer is
    /// deregistered when it is dropped.
    pub fn open_viewer(&self) -> ViewerStream {
        let info = ViewerInfo {
            id: Uuid::new_v4(),
            connected_at: Local::now(),
        };
        let id = info.id;
        self.viewers.insert(id, info);
        info!(viewer = %id, viewers = self.viewers.len(), "Viewer connected");

        let frames = self
            .stream
            .start(&id.to_string())
            .take_until(self.shutdown_signal())
            .boxed();

        ViewerStream {
            frames,
            guard: ViewerGuard {
                id,
                viewers: self.viewers.clone(),
            },
        }
    }

    /// Ask long-running work (auto capture, live streams) to stop
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Resolves once [`AppState::begin_shutdown`] has been called
    pub fn shutdown_signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut shutdown = self.shutdown.subscribe();
        async move {
            loop {
                let stopping = *shutdown.borrow_and_update();
                if stopping || shutdown.changed().await.is_err() {
                    break;
                }
            }
        }
    }
}

struct ViewerGuard {
    id: Uuid,
    viewers: Viewers,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        self.viewers.remove(&self.id);
        info!(viewer = %self.id, viewers = self.viewers.len(), "Viewer disconnected");
    }
}

/// A viewer's multipart body. Dropping it ends the producer and deregisters
/// the viewer.
pub struct ViewerStream {
    frames: BoxStream<'static, Result<Bytes, Infallible>>,
    guard: ViewerGuard,
}

impl ViewerStream {
    pub fn id(&self) -> Uuid {
        self.guard.id
    }
}

impl Stream for ViewerStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames.poll_next_unpin(cx)
    }
}

//! Capture service: single shots and bursts saved to the photo store
//!
//! Frames come from the shared capture gateway and are encoded at the photo
//! resolution and quality, outside the gateway lock.

use moonbot_core::{
    BurstConfig, MoonbotResult, PhotoRecord, PhotoStore, PhotoTag, RetentionConfig, RetentionTrigger,
    RuntimeSettings,
};
use moonbot_media::{encode_blocking, CaptureGateway, EncodeTarget};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Takes photos and hands them to the store
#[derive(Debug)]
pub struct CaptureService {
    gateway: Arc<CaptureGateway>,
    store: Arc<PhotoStore>,
    settings: Arc<RuntimeSettings>,
    retention: RetentionConfig,
    max_burst: u32,
}

impl CaptureService {
    pub fn new(
        gateway: Arc<CaptureGateway>,
        store: Arc<PhotoStore>,
        settings: Arc<RuntimeSettings>,
        retention: RetentionConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
            retention,
            max_burst: BurstConfig::default().max_count,
        }
    }

    /// Largest burst a single call will take
    pub fn with_max_burst(mut self, max_burst: u32) -> Self {
        self.max_burst = max_burst.max(1);
        self
    }

    pub fn store(&self) -> &Arc<PhotoStore> {
        &self.store
    }

    /// Capture, encode and save one photo.
    ///
    /// Retention runs afterwards only under [`RetentionTrigger::EverySave`];
    /// auto captures leave it to the auto-capture loop.
    pub async fn capture_one(&self, tag: PhotoTag) -> MoonbotResult<PhotoRecord> {
        let record = self.capture_and_save(tag, None).await?;
        info!(photo = %record.name, bytes = record.size, "Photo captured");

        if tag != PhotoTag::Auto && self.retention.trigger == RetentionTrigger::EverySave {
            self.enforce_retention_logged().await;
        }
        Ok(record)
    }

    /// Best-effort burst of up to `count` photos, `interval` apart.
    ///
    /// Failed captures are skipped, so a camera that fails every read yields
    /// an empty list rather than an error. `count` is clamped to the burst limit.
    pub async fn capture_burst(&self, count: u32, interval: Duration) -> Vec<PhotoRecord> {
        if count > self.max_burst {
            warn!(requested = count, max = self.max_burst, "Burst count clamped");
        }
        let count = count.min(self.max_burst);
        let mut records = Vec::with_capacity(count as usize);

        for member in 1..=count {
            if member > 1 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            match self.capture_and_save(PhotoTag::Burst, Some(member)).await {
                Ok(record) => records.push(record),
                Err(e) => warn!(member, count, error = %e, "Burst capture skipped"),
            }
        }

        info!(requested = count, saved = records.len(), "Burst finished");
        if !records.is_empty() && self.retention.trigger == RetentionTrigger::EverySave {
            self.enforce_retention_logged().await;
        }
        records
    }

    /// Apply the storage ceiling now. Returns the evicted names.
    pub async fn enforce_retention(&self) -> MoonbotResult<Vec<String>> {
        let evicted = self
            .store
            .enforce_retention(self.retention.ceiling_bytes, self.retention.min_keep)
            .await?;
        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                ceiling_bytes = self.retention.ceiling_bytes,
                "Storage ceiling enforced"
            );
        }
        Ok(evicted)
    }

    async fn enforce_retention_logged(&self) {
        if let Err(e) = self.enforce_retention().await {
            warn!(error = %e, "Retention pass failed");
        }
    }

    async fn capture_and_save(
        &self,
        tag: PhotoTag,
        index: Option<u32>,
    ) -> MoonbotResult<PhotoRecord> {
        let frame = self.gateway.acquire_frame().await?;
        let settings = self.settings.get();
        let image = encode_blocking(
            frame,
            EncodeTarget::new(settings.photo_resolution, settings.photo_quality),
        )
        .await?;
        self.store.save(tag, &image.data, index).await
    }
}

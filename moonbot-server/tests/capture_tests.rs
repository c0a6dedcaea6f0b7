//! Capture service and auto-capture loop tests

use chrono::NaiveDate;
use moonbot_core::{
    PhotoStore, PhotoTag, Resolution, RetentionConfig, RetentionTrigger, RuntimeSettings,
    Settings,
};
use moonbot_media::{CameraDevice, CaptureGateway, Frame, MediaError, MediaResult, TestPatternDevice};
use moonbot_server::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Fails every read whose ordinal is listed
struct SelectiveDevice {
    inner: TestPatternDevice,
    reads: Arc<AtomicUsize>,
    fail_on: Vec<usize>,
}

impl CameraDevice for SelectiveDevice {
    fn name(&self) -> &str {
        "selective"
    }

    fn open(&mut self) -> MediaResult<()> {
        self.inner.open()
    }

    fn read(&mut self) -> MediaResult<Frame> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&n) {
            return Err(MediaError::ReadFailed {
                device: "selective".to_string(),
                reason: "glitch".to_string(),
            });
        }
        self.inner.read()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Camera that never opens
struct DeadDevice {
    opens: Arc<AtomicUsize>,
}

impl CameraDevice for DeadDevice {
    fn name(&self) -> &str {
        "dead"
    }

    fn open(&mut self) -> MediaResult<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Err(MediaError::DeviceOpenFailed {
            device: "dead".to_string(),
            reason: "no such device".to_string(),
        })
    }

    fn read(&mut self) -> MediaResult<Frame> {
        Err(MediaError::ReadFailed {
            device: "dead".to_string(),
            reason: "not open".to_string(),
        })
    }

    fn close(&mut self) {}
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<PhotoStore>,
    settings: Arc<RuntimeSettings>,
    service: Arc<CaptureService>,
}

async fn fixture(device: Box<dyn CameraDevice>, retention: RetentionConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(PhotoStore::open(dir.path()).await.unwrap());
    let settings = Arc::new(
        RuntimeSettings::new(Settings {
            photo_resolution: Resolution::QVGA,
            ..Settings::default()
        })
        .unwrap(),
    );
    let gateway = Arc::new(CaptureGateway::new(device));
    let service = Arc::new(CaptureService::new(
        gateway,
        store.clone(),
        settings.clone(),
        retention,
    ));
    Fixture {
        _dir: dir,
        store,
        settings,
        service,
    }
}

fn test_pattern() -> Box<dyn CameraDevice> {
    Box::new(TestPatternDevice::new(Resolution::VGA))
}

async fn seed_old_photos(store: &PhotoStore, count: u32) {
    let at = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    for i in 0..count {
        store
            .save_at(
                PhotoTag::Shot,
                &[0u8; 1000],
                None,
                at + chrono::Duration::seconds(i as i64),
            )
            .await
            .unwrap();
    }
}

// ============================================================================
// CAPTURE SERVICE TESTS
// ============================================================================

#[tokio::test]
async fn test_capture_one_uses_photo_settings() {
    let fx = fixture(test_pattern(), RetentionConfig::default()).await;

    let record = fx.service.capture_one(PhotoTag::Shot).await.unwrap();
    assert_eq!(record.tag, Some(PhotoTag::Shot));

    let bytes = fx.store.read(&record.name).await.unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 240));
    assert_eq!(bytes.len() as u64, record.size);
    assert_eq!(fx.settings.get().photo_resolution, Resolution::QVGA);
}

#[tokio::test]
async fn test_burst_skips_failed_reads() {
    let reads = Arc::new(AtomicUsize::new(0));
    // Reads 2 and 3 are the first attempt and retry of the second member
    let device = SelectiveDevice {
        inner: TestPatternDevice::new(Resolution::QVGA),
        reads: reads.clone(),
        fail_on: vec![1, 2],
    };
    let fx = fixture(Box::new(device), RetentionConfig::default()).await;

    let records = fx.service.capture_burst(3, Duration::ZERO).await;
    assert_eq!(records.len(), 2);
    assert!(records[0].name.ends_with("_01.jpg"));
    assert!(records[1].name.ends_with("_03.jpg"));
    assert_eq!(reads.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_burst_recovers_from_single_glitch() {
    let device = SelectiveDevice {
        inner: TestPatternDevice::new(Resolution::QVGA),
        reads: Arc::new(AtomicUsize::new(0)),
        fail_on: vec![1],
    };
    let fx = fixture(Box::new(device), RetentionConfig::default()).await;

    let records = fx.service.capture_burst(3, Duration::ZERO).await;
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_burst_with_dead_camera_is_empty() {
    let opens = Arc::new(AtomicUsize::new(0));
    let device = DeadDevice {
        opens: opens.clone(),
    };
    let fx = fixture(Box::new(device), RetentionConfig::default()).await;

    let records = tokio::time::timeout(
        Duration::from_secs(10),
        fx.service.capture_burst(u32::MAX, Duration::ZERO),
    )
    .await
    .unwrap();
    assert!(records.is_empty());
    // Clamped to the default burst limit, two open attempts per member
    assert_eq!(opens.load(Ordering::SeqCst), 2 * 50);
}

#[tokio::test]
async fn test_burst_count_clamped_to_limit() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(PhotoStore::open(dir.path()).await.unwrap());
    let settings = Arc::new(RuntimeSettings::new(Settings::default()).unwrap());
    let gateway = Arc::new(CaptureGateway::new(Box::new(TestPatternDevice::new(
        Resolution::QVGA,
    ))));
    let service = CaptureService::new(gateway, store.clone(), settings, RetentionConfig::default())
        .with_max_burst(2);

    let records = service.capture_burst(1_000, Duration::ZERO).await;
    assert_eq!(records.len(), 2);
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_burst_paces_between_members_only() {
    let fx = fixture(test_pattern(), RetentionConfig::default()).await;

    let started = Instant::now();
    let records = fx.service.capture_burst(3, Duration::from_millis(100)).await;
    assert_eq!(records.len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_manual_capture_skips_retention_by_default() {
    let retention = RetentionConfig {
        ceiling_bytes: 1,
        min_keep: 1,
        trigger: RetentionTrigger::AutoOnly,
    };
    let fx = fixture(test_pattern(), retention).await;
    seed_old_photos(&fx.store, 3).await;

    fx.service.capture_one(PhotoTag::Shot).await.unwrap();
    assert_eq!(fx.store.list().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_manual_capture_enforces_retention_on_every_save() {
    let retention = RetentionConfig {
        ceiling_bytes: 1,
        min_keep: 1,
        trigger: RetentionTrigger::EverySave,
    };
    let fx = fixture(test_pattern(), retention).await;
    seed_old_photos(&fx.store, 3).await;

    let record = fx.service.capture_one(PhotoTag::Shot).await.unwrap();
    let remaining = fx.store.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, record.name);
}

// ============================================================================
// AUTO-CAPTURE LOOP TESTS
// ============================================================================

#[tokio::test]
async fn test_auto_cycle_saves_and_evicts() {
    let retention = RetentionConfig {
        ceiling_bytes: 1,
        min_keep: 1,
        trigger: RetentionTrigger::AutoOnly,
    };
    let fx = fixture(test_pattern(), retention).await;
    seed_old_photos(&fx.store, 3).await;

    let auto = AutoCaptureLoop::new(fx.service.clone(), fx.settings.clone());
    auto.run_cycle().await;

    let status = auto.status();
    assert_eq!(status.cycles, 1);
    assert_eq!(status.failures, 0);
    assert_eq!(status.last_evicted, 3);
    assert_eq!(status.state, AutoCaptureState::Idle);

    let last = status.last_photo.unwrap();
    assert!(last.starts_with("auto_"));
    let remaining = fx.store.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, last);
}

#[tokio::test]
async fn test_auto_cycle_absorbs_camera_failure() {
    let device = SelectiveDevice {
        inner: TestPatternDevice::new(Resolution::QVGA),
        reads: Arc::new(AtomicUsize::new(0)),
        fail_on: (0..100).collect(),
    };
    let fx = fixture(Box::new(device), RetentionConfig::default()).await;
    let auto = AutoCaptureLoop::new(fx.service.clone(), fx.settings.clone());

    auto.run_cycle().await;
    auto.run_cycle().await;

    let status = auto.status();
    assert_eq!(status.cycles, 2);
    assert_eq!(status.failures, 2);
    assert!(status.last_photo.is_none());
    assert!(status.last_error.is_some());
}

#[tokio::test]
async fn test_auto_loop_stops_on_shutdown() {
    let fx = fixture(test_pattern(), RetentionConfig::default()).await;
    let auto = Arc::new(AutoCaptureLoop::new(fx.service.clone(), fx.settings.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = {
        let auto = auto.clone();
        tokio::spawn(async move { auto.run(shutdown_rx).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(auto.status().state, AutoCaptureState::Idle);

    shutdown_tx.send(true).unwrap();
    let joined = tokio::time::timeout(Duration::from_secs(2), task).await;
    tokio_test::assert_ok!(tokio_test::assert_ok!(joined));

    let status = auto.status();
    assert_eq!(status.state, AutoCaptureState::Stopped);
    // Default interval is 10 s, so nothing was captured
    assert_eq!(status.cycles, 0);
}

#[tokio::test]
async fn test_auto_loop_follows_interval() {
    let fx = fixture(test_pattern(), RetentionConfig::default()).await;
    fx.settings
        .update(&moonbot_core::SettingsUpdate {
            auto_capture_interval: Some(1),
            ..Default::default()
        })
        .unwrap();
    let auto = Arc::new(AutoCaptureLoop::new(fx.service.clone(), fx.settings.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = {
        let auto = auto.clone();
        tokio::spawn(async move { auto.run(shutdown_rx).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while auto.status().cycles < 1 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap();
    shutdown_tx.send(true).unwrap();
    task.await.unwrap();

    let photos = fx.store.list().await.unwrap();
    assert!(!photos.is_empty());
    assert!(photos.iter().all(|p| p.tag == Some(PhotoTag::Auto)));
}

//! Timer-driven auto capture
//!
//! The loop alternates between Idle (sleeping the configured interval) and
//! Capturing (one `auto` photo followed by a retention pass). The interval is
//! re-read from the runtime settings at the start of every cycle, so a
//! settings change takes effect after the current sleep. Camera and disk
//! failures are logged and counted; they never stop the loop.

use crate::capture::CaptureService;
use moonbot_core::{PhotoTag, RuntimeSettings};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoCaptureState {
    Idle,
    Capturing,
    Stopped,
}

/// Snapshot of the loop's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoCaptureStatus {
    pub state: AutoCaptureState,
    /// Completed cycles, successful or not
    pub cycles: u64,
    /// Cycles whose capture failed
    pub failures: u64,
    pub last_photo: Option<String>,
    /// Photos removed by the most recent retention pass
    pub last_evicted: usize,
    pub last_error: Option<String>,
}

impl Default for AutoCaptureStatus {
    fn default() -> Self {
        Self {
            state: AutoCaptureState::Idle,
            cycles: 0,
            failures: 0,
            last_photo: None,
            last_evicted: 0,
            last_error: None,
        }
    }
}

/// Periodic capture driver
#[derive(Debug)]
pub struct AutoCaptureLoop {
    service: Arc<CaptureService>,
    settings: Arc<RuntimeSettings>,
    status: RwLock<AutoCaptureStatus>,
}

impl AutoCaptureLoop {
    pub fn new(service: Arc<CaptureService>, settings: Arc<RuntimeSettings>) -> Self {
        Self {
            service,
            settings,
            status: RwLock::new(AutoCaptureStatus::default()),
        }
    }

    pub fn status(&self) -> AutoCaptureStatus {
        self.status.read().clone()
    }

    /// Run until `shutdown` turns true or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Auto-capture loop started");

        loop {
            let stopping = *shutdown.borrow_and_update();
            if stopping {
                break;
            }
            let interval = self.settings.get().capture_interval();
            self.status.write().state = AutoCaptureState::Idle;
            debug!(?interval, "Auto-capture sleeping");

            tokio::select! {
                _ = tokio::time::sleep(interval) => self.run_cycle().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.status.write().state = AutoCaptureState::Stopped;
        info!("Auto-capture loop stopped");
    }

    /// One capture plus retention pass
    pub async fn run_cycle(&self) {
        self.status.write().state = AutoCaptureState::Capturing;

        match self.service.capture_one(PhotoTag::Auto).await {
            Ok(record) => {
                let evicted = match self.service.enforce_retention().await {
                    Ok(evicted) => evicted.len(),
                    Err(e) => {
                        warn!(error = %e, "Retention after auto-capture failed");
                        0
                    }
                };
                let mut status = self.status.write();
                status.last_photo = Some(record.name);
                status.last_evicted = evicted;
                status.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Auto-capture failed");
                let mut status = self.status.write();
                status.failures += 1;
                status.last_error = Some(e.to_string());
            }
        }

        let mut status = self.status.write();
        status.cycles += 1;
        status.state = AutoCaptureState::Idle;
    }
}

//! Host telemetry: CPU temperature and photo-disk usage
//!
//! Readings are best effort. A missing sensor shows up as `None` or zeroed
//! disk figures, never as an error to the caller.

use crate::error::{DiagnosticsError, DiagnosticsResult};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use sysinfo::{Components, Disks};
use tracing::{debug, warn};

/// Default Linux thermal zone, in millidegrees Celsius
pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Point-in-time host readings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostSnapshot {
    /// CPU temperature in degrees Celsius
    pub cpu_temp: Option<f32>,
    /// Size of the filesystem holding the photo directory
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_free: u64,
    /// Used share of `disk_total`, 0-100, one decimal place
    pub disk_percent: f64,
}

impl HostSnapshot {
    /// Fill in disk figures from total and available bytes
    pub fn with_disk_space(mut self, total: u64, free: u64) -> Self {
        let free = free.min(total);
        let used = total - free;
        self.disk_total = total;
        self.disk_used = used;
        self.disk_free = free;
        self.disk_percent = if total == 0 {
            0.0
        } else {
            (used as f64 / total as f64 * 1000.0).round() / 10.0
        };
        self
    }
}

/// Source of host readings
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Current readings for the host holding `photo_dir`
    async fn snapshot(&self, photo_dir: &Path) -> HostSnapshot;
}

/// Reads the local host through sysfs and `sysinfo`
#[derive(Debug, Clone)]
pub struct HostTelemetry {
    thermal_path: PathBuf,
}

impl Default for HostTelemetry {
    fn default() -> Self {
        Self {
            thermal_path: PathBuf::from(THERMAL_ZONE_PATH),
        }
    }
}

impl HostTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the CPU temperature from a different sysfs file
    pub fn with_thermal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.thermal_path = path.into();
        self
    }

    fn collect(&self, photo_dir: &Path) -> HostSnapshot {
        let cpu_temp = match read_thermal_zone(&self.thermal_path) {
            Ok(celsius) => Some(celsius),
            Err(e) => {
                debug!(error = %e, "Thermal zone unreadable, trying hardware components");
                component_temperature()
            }
        };

        let snapshot = HostSnapshot {
            cpu_temp,
            ..HostSnapshot::default()
        };
        match disk_space(photo_dir) {
            Ok((total, free)) => snapshot.with_disk_space(total, free),
            Err(e) => {
                debug!(error = %e, "Disk usage unavailable");
                snapshot
            }
        }
    }
}

#[async_trait]
impl TelemetrySource for HostTelemetry {
    async fn snapshot(&self, photo_dir: &Path) -> HostSnapshot {
        let source = self.clone();
        let photo_dir = photo_dir.to_path_buf();
        match tokio::task::spawn_blocking(move || source.collect(&photo_dir)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Telemetry task failed");
                HostSnapshot::default()
            }
        }
    }
}

/// Parse a sysfs thermal file (integer millidegrees) into degrees Celsius
pub fn read_thermal_zone(path: &Path) -> DiagnosticsResult<f32> {
    let sensor = || path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| DiagnosticsError::SensorUnavailable {
        sensor: sensor(),
        reason: e.to_string(),
    })?;
    let millidegrees: i64 =
        raw.trim()
            .parse()
            .map_err(|e| DiagnosticsError::SensorUnavailable {
                sensor: sensor(),
                reason: format!("unparseable reading {:?}: {e}", raw.trim()),
            })?;
    Ok(millidegrees as f32 / 1000.0)
}

fn component_temperature() -> Option<f32> {
    let components = Components::new_with_refreshed_list();
    let readings: Vec<(&str, f32)> = components
        .list()
        .iter()
        .map(|c| (c.label(), c.temperature()))
        .filter(|(_, temp)| temp.is_finite() && *temp > 0.0)
        .collect();

    readings
        .iter()
        .find(|(label, _)| {
            let label = label.to_ascii_lowercase();
            label.contains("cpu") || label.contains("package") || label.contains("core")
        })
        .or_else(|| readings.first())
        .map(|(_, temp)| *temp)
}

/// Total and available bytes of the filesystem holding `dir`
fn disk_space(dir: &Path) -> DiagnosticsResult<(u64, u64)> {
    let target = match dir.canonicalize() {
        Ok(path) => path,
        Err(_) => std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf()),
    };

    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| (disk.total_space(), disk.available_space()))
        .ok_or_else(|| DiagnosticsError::SensorUnavailable {
            sensor: "disk".to_string(),
            reason: format!("no mounted filesystem contains {}", target.display()),
        })
}

//! Command-line interface

use clap::Parser;
use moonbot_core::{AppConfig, RetentionTrigger};
use std::net::SocketAddr;
use std::path::PathBuf;

const MIB: u64 = 1024 * 1024;

/// MoonBot camera controller
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// Directory for saved photos
    #[arg(long, default_value = "moon_shots")]
    pub photo_dir: PathBuf,

    /// Camera index (0 = first camera)
    #[arg(long, default_value_t = 0)]
    pub camera_index: u32,

    /// Seconds between auto-captures
    #[arg(long, default_value_t = 10)]
    pub interval: u64,

    /// JPEG quality of the live stream (1-100)
    #[arg(long, default_value_t = 70)]
    pub stream_quality: u8,

    /// Storage ceiling for the photo directory, in MiB
    #[arg(long = "storage-ceiling-mb", default_value_t = 512)]
    pub storage_ceiling_mb: u64,

    /// Never evict below this many photos
    #[arg(long, default_value_t = 10)]
    pub min_keep: usize,

    /// Enforce the storage ceiling after manual and burst captures too
    #[arg(long)]
    pub retention_on_every_save: bool,

    /// Use a synthetic test pattern instead of a camera
    #[arg(long)]
    pub test_pattern: bool,

    /// Log filter, e.g. `info` or `moonbot_server=debug` (RUST_LOG wins)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Resolve the configuration these flags describe
    pub fn app_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig {
            bind_addr: self.bind,
            photo_dir: self.photo_dir.clone(),
            ..AppConfig::default()
        };

        config.camera.index = self.camera_index;
        config.camera.test_pattern = self.test_pattern;

        config.settings.auto_capture_interval = self.interval;
        config.settings.stream_quality = self.stream_quality;

        config.retention.ceiling_bytes = self.storage_ceiling_mb.saturating_mul(MIB);
        config.retention.min_keep = self.min_keep;
        if self.retention_on_every_save {
            config.retention.trigger = RetentionTrigger::EverySave;
        }

        config.validate()?;
        Ok(config)
    }
}

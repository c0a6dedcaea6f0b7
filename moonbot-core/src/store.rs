//! On-disk photo store
//!
//! A flat directory of `.jpg` files named `{tag}_{YYYYMMDD}_{HHMMSS}[_{seq}].jpg`.
//! Listing order comes from the `(timestamp, seq)` part of the name, not from
//! file metadata, so the tag prefix never affects chronology. `seq` separates
//! photos taken within the same second: a new name always gets a larger `seq`
//! than every existing photo with the same timestamp.
//!
//! The directory may be read and written concurrently by request handlers and
//! the auto-capture loop. Saves are serialized by a lock so name assignment
//! cannot race; everything else tolerates files appearing or disappearing
//! between a scan and the operation acting on it.

use crate::error::{MoonbotError, MoonbotResult};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const EXTENSION: &str = ".jpg";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Category of a stored photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoTag {
    /// Manual single capture
    Shot,
    /// Timer-driven capture
    Auto,
    /// Member of a burst
    Burst,
}

impl PhotoTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoTag::Shot => "shot",
            PhotoTag::Auto => "auto",
            PhotoTag::Burst => "burst",
        }
    }
}

impl std::str::FromStr for PhotoTag {
    type Err = MoonbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shot" => Ok(PhotoTag::Shot),
            "auto" => Ok(PhotoTag::Auto),
            "burst" => Ok(PhotoTag::Burst),
            other => Err(MoonbotError::validation(
                "tag",
                format!("unknown photo tag '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for PhotoTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed form of a photo file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoName {
    pub tag: PhotoTag,
    /// `YYYYMMDD_HHMMSS`
    pub stamp: String,
    pub seq: u32,
}

impl PhotoName {
    /// Parse `{tag}_{YYYYMMDD}_{HHMMSS}[_{seq}].jpg`
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(EXTENSION)?;
        let mut parts = stem.split('_');
        let tag = parts.next()?.parse().ok()?;
        let date = parts.next()?;
        let time = parts.next()?;
        let seq = match parts.next() {
            Some(seq) if !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()) => {
                seq.parse().ok()?
            }
            Some(_) => return None,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }

        let stamp = format!("{date}_{time}");
        NaiveDateTime::parse_from_str(&stamp, STAMP_FORMAT).ok()?;
        Some(Self { tag, stamp, seq })
    }

    /// File name for this photo. Burst members always carry their sequence
    /// number; other tags only when needed to stay unique.
    pub fn file_name(&self) -> String {
        if self.seq > 0 || self.tag == PhotoTag::Burst {
            format!("{}_{}_{:02}{}", self.tag, self.stamp, self.seq, EXTENSION)
        } else {
            format!("{}_{}{}", self.tag, self.stamp, EXTENSION)
        }
    }

    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.stamp, STAMP_FORMAT).ok()
    }
}

/// Metadata of one stored photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// File name inside the photo directory
    pub name: String,
    /// `None` for `.jpg` files that do not follow the naming scheme
    pub tag: Option<PhotoTag>,
    /// Size in bytes
    pub size: u64,
    /// Capture time encoded in the name
    pub captured_at: Option<NaiveDateTime>,
}

/// Photo count and total bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreUsage {
    pub count: usize,
    pub total_size: u64,
}

/// Chronological sort key. Unparseable names have an empty stamp and so sort
/// as the oldest entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    stamp: String,
    seq: u32,
    name: String,
}

impl OrderKey {
    fn for_name(name: &str) -> Self {
        match PhotoName::parse(name) {
            Some(parsed) => Self {
                stamp: parsed.stamp,
                seq: parsed.seq,
                name: name.to_string(),
            },
            None => Self {
                stamp: String::new(),
                seq: 0,
                name: name.to_string(),
            },
        }
    }
}

/// Plain `.jpg` file name, no directories and no hidden files
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.ends_with(EXTENSION)
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

/// Directory-backed photo store
#[derive(Debug)]
pub struct PhotoStore {
    dir: PathBuf,
    save_lock: Mutex<()>,
}

impl PhotoStore {
    /// Open the store, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> MoonbotResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!("Photo store ready at {}", dir.display());
        Ok(Self {
            dir,
            save_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored photos, newest first
    pub async fn list(&self) -> MoonbotResult<Vec<PhotoRecord>> {
        let mut entries = self.scan().await?;
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }

    /// Save an encoded image under a freshly generated name.
    ///
    /// Names carry local wall-clock time, so photos saved during a DST
    /// fall-back hour sort before those from the first pass of that hour.
    pub async fn save(
        &self,
        tag: PhotoTag,
        jpeg: &[u8],
        index: Option<u32>,
    ) -> MoonbotResult<PhotoRecord> {
        self.save_at(tag, jpeg, index, Local::now().naive_local())
            .await
    }

    /// Save with an explicit capture time
    pub async fn save_at(
        &self,
        tag: PhotoTag,
        jpeg: &[u8],
        index: Option<u32>,
        at: NaiveDateTime,
    ) -> MoonbotResult<PhotoRecord> {
        let _guard = self.save_lock.lock().await;

        let stamp = at.format(STAMP_FORMAT).to_string();
        let highest = self.highest_seq(&stamp).await?;
        let requested = index.unwrap_or(0);
        let seq = match highest {
            Some(highest) => requested.max(highest + 1),
            None => requested,
        };

        let photo = PhotoName { tag, stamp, seq };
        let name = photo.file_name();
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!(".{name}.tmp"));

        tokio::fs::write(&tmp, jpeg).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(photo = %name, bytes = jpeg.len(), "Photo saved");
        Ok(PhotoRecord {
            name,
            tag: Some(tag),
            size: jpeg.len() as u64,
            captured_at: photo.captured_at(),
        })
    }

    /// Raw bytes of one photo
    pub async fn read(&self, name: &str) -> MoonbotResult<Vec<u8>> {
        if !is_valid_name(name) {
            return Err(MoonbotError::NotFound {
                name: name.to_string(),
            });
        }
        tokio::fs::read(self.dir.join(name))
            .await
            .map_err(|e| map_not_found(e, name))
    }

    /// Delete one photo
    pub async fn delete(&self, name: &str) -> MoonbotResult<()> {
        if !is_valid_name(name) {
            return Err(MoonbotError::NotFound {
                name: name.to_string(),
            });
        }
        tokio::fs::remove_file(self.dir.join(name))
            .await
            .map_err(|e| map_not_found(e, name))?;
        debug!(photo = %name, "Photo deleted");
        Ok(())
    }

    /// Delete every photo, returning how many were removed
    pub async fn delete_all(&self) -> MoonbotResult<usize> {
        let mut deleted = 0;
        for (_, record) in self.scan().await? {
            match self.delete(&record.name).await {
                Ok(()) => deleted += 1,
                Err(MoonbotError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        info!(deleted, "Deleted all photos");
        Ok(deleted)
    }

    /// Total bytes used by stored photos
    pub async fn total_size(&self) -> MoonbotResult<u64> {
        Ok(self.usage().await?.total_size)
    }

    /// Photo count and total size from a single scan
    pub async fn usage(&self) -> MoonbotResult<StoreUsage> {
        let entries = self.scan().await?;
        Ok(StoreUsage {
            count: entries.len(),
            total_size: entries.iter().map(|(_, r)| r.size).sum(),
        })
    }

    /// Evict the oldest photos while the store is above `ceiling_bytes` and
    /// holds more than `min_keep` photos. Returns the evicted names.
    pub async fn enforce_retention(
        &self,
        ceiling_bytes: u64,
        min_keep: usize,
    ) -> MoonbotResult<Vec<String>> {
        let mut entries = self.scan().await?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut total: u64 = entries.iter().map(|(_, r)| r.size).sum();
        let mut count = entries.len();
        let mut evicted = Vec::new();
        let mut oldest_first = entries.into_iter();

        while total > ceiling_bytes && count > min_keep {
            let Some((_, oldest)) = oldest_first.next() else {
                break;
            };
            match self.delete(&oldest.name).await {
                Ok(()) => evicted.push(oldest.name),
                // Removed by someone else in the meantime
                Err(MoonbotError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
            total = total.saturating_sub(oldest.size);
            count -= 1;
        }

        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                remaining = count,
                total_bytes = total,
                ceiling_bytes,
                "Storage ceiling enforced"
            );
        }
        Ok(evicted)
    }

    /// Highest sequence number already used for a timestamp
    async fn highest_seq(&self, stamp: &str) -> MoonbotResult<Option<u32>> {
        let mut highest = None;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(parsed) = PhotoName::parse(name) {
                if parsed.stamp == stamp {
                    highest = highest.max(Some(parsed.seq));
                }
            }
        }
        Ok(highest)
    }

    /// All photo files with their sort keys, in directory order
    async fn scan(&self) -> MoonbotResult<Vec<(OrderKey, PhotoRecord)>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !is_valid_name(name) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(photo = %name, error = %e, "Skipping unreadable photo");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let parsed = PhotoName::parse(name);
            let record = PhotoRecord {
                name: name.to_string(),
                tag: parsed.as_ref().map(|p| p.tag),
                size: metadata.len(),
                captured_at: parsed.as_ref().and_then(PhotoName::captured_at),
            };
            entries.push((OrderKey::for_name(name), record));
        }

        Ok(entries)
    }
}

fn map_not_found(err: std::io::Error, name: &str) -> MoonbotError {
    if err.kind() == ErrorKind::NotFound {
        MoonbotError::NotFound {
            name: name.to_string(),
        }
    } else {
        MoonbotError::Io { source: err }
    }
}

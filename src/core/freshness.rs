use crate::domain::model::{Freshness, RefreshReason};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::path::Path;
use walkdir::WalkDir;

/// GRIB2 檔名標記（不分大小寫）
const GRIB_MARKERS: [&str; 2] = ["grb2", "grib2"];

pub fn is_grib_file_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    GRIB_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Newest modification time among GRIB files anywhere under `dir`.
///
/// Returns `None` when the directory is missing or holds no GRIB file.
pub fn latest_grib_mtime(dir: &Path) -> Result<Option<DateTime<Utc>>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<DateTime<Utc>> = None;
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if !is_grib_file_name(&entry.file_name().to_string_lossy()) {
            continue;
        }

        // 符號連結以目標檔案的 mtime 計算
        let metadata = if entry.path_is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Ignoring dangling link {}: {}", entry.path().display(), e);
                    continue;
                }
            }
        } else {
            entry.metadata()?
        };
        if !metadata.is_file() {
            continue;
        }

        let modified: DateTime<Utc> = metadata.modified()?.into();
        tracing::trace!("GRIB candidate {} ({})", entry.path().display(), modified);
        latest = Some(latest.map_or(modified, |current| current.max(modified)));
    }

    Ok(latest)
}

/// 新鮮度判斷：在 `max_age_hours` 內，或與 `now` 同一個 UTC 日期，即視為最新。
pub fn is_fresh(latest: DateTime<Utc>, now: DateTime<Utc>, max_age_hours: u64) -> bool {
    let elapsed = now.signed_duration_since(latest).num_seconds() as i128;
    let fresh_enough = elapsed < max_age_hours as i128 * 3600;
    let same_day = latest.date_naive() == now.date_naive();
    fresh_enough || same_day
}

#[derive(Debug, Clone, Copy)]
pub struct FreshnessGate {
    max_age_hours: u64,
    force: bool,
}

impl FreshnessGate {
    pub fn new(max_age_hours: u64, force: bool) -> Self {
        Self {
            max_age_hours,
            force,
        }
    }

    pub fn check(&self, dir: &Path, now: DateTime<Utc>) -> Result<Freshness> {
        if self.force {
            return Ok(Freshness::RefreshNeeded(RefreshReason::Forced));
        }

        let decision = match latest_grib_mtime(dir)? {
            None => Freshness::RefreshNeeded(RefreshReason::NoData),
            Some(latest) if is_fresh(latest, now, self.max_age_hours) => {
                Freshness::UpToDate { latest }
            }
            Some(latest) => Freshness::RefreshNeeded(RefreshReason::Stale { latest }),
        };

        tracing::debug!("Freshness of {}: {}", dir.display(), decision);
        Ok(decision)
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rank::model::{ConsolidatedReport, RankRecord};
use crate::rank::selector::SelectionPolicy;
use crate::rank::util::{now_epoch_secs, sanitize_slug};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub project: String,
    pub content_hash: String,
    pub min_gap_days: i64,
    pub max_count: usize,
}

impl CacheKey {
    pub fn new(project: &str, records: &[RankRecord], policy: &SelectionPolicy) -> Self {
        Self {
            project: project.to_string(),
            content_hash: records_hash(records),
            min_gap_days: policy.min_gap_days(),
            max_count: policy.max_count(),
        }
    }

    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.project.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.content_hash.as_bytes());
        hasher.update(self.min_gap_days.to_le_bytes());
        hasher.update((self.max_count as u64).to_le_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn file_name(&self) -> String {
        let slug = sanitize_slug(&self.project);
        let digest = self.digest();
        format!("{slug}-{}.json", &digest[..16])
    }
}

/// Order-independent hash of a project's records.
pub fn records_hash(records: &[RankRecord]) -> String {
    let mut sorted: Vec<&RankRecord> = records.iter().collect();
    sorted.sort();
    let mut hasher = Sha256::new();
    for record in sorted {
        hasher.update(record.keyword.as_bytes());
        hasher.update([0u8]);
        hasher.update(record.url.as_bytes());
        hasher.update([0u8]);
        hasher.update(record.location.as_bytes());
        hasher.update([0u8]);
        hasher.update(record.search_volume.to_le_bytes());
        hasher.update(record.tags.as_bytes());
        hasher.update([0u8]);
        hasher.update(record.snapshot_date.format("%Y-%m-%d").to_string().as_bytes());
        match record.rank {
            Some(rank) => {
                hasher.update([1u8]);
                hasher.update(rank.to_le_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(record.project.as_bytes());
        hasher.update([0xFFu8]);
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: CacheKey,
    stored_at_epoch_secs: u64,
    report: ConsolidatedReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(ConsolidatedReport),
    Miss,
    /// The entry exists but could not be parsed; it has been removed.
    Corrupt { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct ReportCache {
    dir: PathBuf,
}

impl ReportCache {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, key: &CacheKey) -> Result<CacheLookup> {
        let path = self.dir.join(key.file_name());
        if !path.exists() {
            return Ok(CacheLookup::Miss);
        }
        let raw =
            fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.key == *key => Ok(CacheLookup::Hit(entry.report)),
            Ok(_) => Ok(CacheLookup::Miss),
            Err(err) => {
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
                Ok(CacheLookup::Corrupt {
                    path,
                    reason: err.to_string(),
                })
            }
        }
    }

    pub fn put(&self, key: &CacheKey, report: &ConsolidatedReport) -> Result<PathBuf> {
        let path = self.dir.join(key.file_name());
        let entry = CacheEntry {
            key: key.clone(),
            stored_at_epoch_secs: now_epoch_secs()?,
            report: report.clone(),
        };
        let data = serde_json::to_string(&entry)?;
        fs::write(&path, format!("{data}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        let read_dir = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?;
        for entry in read_dir {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Remove every entry stored for `project`. Returns the number removed.
    pub fn invalidate_project(&self, project: &str) -> Result<usize> {
        let mut removed = 0usize;
        for path in self.entries()? {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let belongs = match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => entry.key.project == project,
                // unreadable entries are dropped along with the project
                Err(_) => true,
            };
            if belongs {
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize> {
        let entries = self.entries()?;
        for path in &entries {
            fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(entries.len())
    }
}

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConsolidationWarning;
use crate::rank::cache::{CacheKey, CacheLookup, ReportCache};
use crate::rank::config::RankConfig;
use crate::rank::consolidate::{Consolidation, consolidate, dropped_dates};
use crate::rank::export::{self, SkippedExport};
use crate::rank::model::{ConsolidatedReport, RankRecord};
use crate::rank::report_writer::write_report;

/// Every project's records from one raw export tree.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub projects: BTreeMap<String, Vec<RankRecord>>,
    pub files_read: usize,
    pub duplicates_dropped: usize,
    pub skipped: Vec<SkippedExport>,
}

impl Batch {
    pub fn project_dates(&self, project: &str) -> BTreeSet<NaiveDate> {
        self.projects
            .get(project)
            .map(|records| records.iter().map(|r| r.snapshot_date).collect())
            .unwrap_or_default()
    }
}

pub fn load_batch(raw_dir: &Path, delimiter: u8) -> Result<Batch> {
    let discovery = export::discover_exports(raw_dir)?;
    let mut batch = Batch {
        skipped: discovery.skipped,
        ..Batch::default()
    };

    let mut by_project: BTreeMap<String, BTreeSet<RankRecord>> = BTreeMap::new();
    let mut total = 0usize;
    for file in &discovery.exports {
        let Some(loaded) = export::read_export(file, delimiter)? else {
            batch.skipped.push(SkippedExport::NoProjectUrl {
                path: file.path.clone(),
            });
            continue;
        };
        batch.files_read += 1;
        total += loaded.records.len();
        by_project
            .entry(loaded.project)
            .or_default()
            .extend(loaded.records);
    }

    let mut kept = 0usize;
    for (project, records) in by_project {
        kept += records.len();
        batch.projects.insert(project, records.into_iter().collect());
    }
    batch.duplicates_dropped = total - kept;
    Ok(batch)
}

#[derive(Debug, Clone)]
pub struct ProjectOutcome {
    pub project: String,
    pub report_path: PathBuf,
    pub selected_dates: Vec<NaiveDate>,
    pub dropped_dates: Vec<NaiveDate>,
    pub rows: usize,
    pub cache_hit: bool,
    pub cache_note: Option<String>,
    pub warnings: Vec<ConsolidationWarning>,
}

/// Consolidate one project and write its report to `report_path`.
///
/// A failing project leaves no report behind, so a stale file from an
/// earlier run is never mistaken for the current one.
pub fn run_project(
    cfg: &RankConfig,
    cache: Option<&ReportCache>,
    project: &str,
    records: &[RankRecord],
    report_path: &Path,
) -> Result<ProjectOutcome> {
    let policy = cfg.selection_policy()?;

    let key = CacheKey::new(project, records, &policy);
    let mut cache_note = None;
    let cached = match cache {
        Some(cache) => match cache.get(&key)? {
            CacheLookup::Hit(report) => Some(report),
            CacheLookup::Miss => None,
            CacheLookup::Corrupt { path, reason } => {
                cache_note = Some(format!(
                    "discarded corrupt cache entry {}: {reason}",
                    path.display()
                ));
                None
            }
        },
        None => None,
    };

    let cache_hit = cached.is_some();
    let out = match cached {
        Some(report) => from_cached_report(project, records, report),
        None => match consolidate(project, records, &policy) {
            Ok(out) => {
                if let Some(cache) = cache {
                    cache.put(&key, &out.report)?;
                }
                out
            }
            Err(err) => {
                if report_path.exists() {
                    fs::remove_file(report_path).with_context(|| {
                        format!("failed to remove stale {}", report_path.display())
                    })?;
                }
                return Err(err).with_context(|| format!("failed to consolidate {project}"));
            }
        },
    };

    write_report(&out.report, report_path, &cfg.output)?;

    Ok(ProjectOutcome {
        project: project.to_string(),
        report_path: report_path.to_path_buf(),
        selected_dates: out.selected_dates,
        dropped_dates: out.dropped_dates,
        rows: out.report.rows.len(),
        cache_hit,
        cache_note,
        warnings: out.warnings,
    })
}

/// Rebuild what a fresh consolidation would have reported alongside a
/// cached report, warnings included.
fn from_cached_report(
    project: &str,
    records: &[RankRecord],
    report: ConsolidatedReport,
) -> Consolidation {
    let available: BTreeSet<NaiveDate> = records.iter().map(|r| r.snapshot_date).collect();
    let warnings = if records.is_empty() {
        vec![ConsolidationWarning::EmptyInput {
            project: project.to_string(),
        }]
    } else {
        Vec::new()
    };
    Consolidation {
        selected_dates: report.dates.clone(),
        dropped_dates: dropped_dates(&available, &report.dates),
        report,
        warnings,
    }
}

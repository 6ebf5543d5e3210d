use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::rank::archive::extract_upload;
use crate::rank::audit;
use crate::rank::cache::ReportCache;
use crate::rank::config::{ConfigOverrides, load_config};
use crate::rank::lock::RunLock;
use crate::rank::paths::resolve_paths;
use crate::rank::pipeline::{load_batch, run_project};
use crate::rank::util::sanitize_slug;
use crate::rank::warn::{self, WarnEvent};

#[derive(Debug, Clone, Default)]
pub struct ConsolidateOptions {
    pub zip: Option<PathBuf>,
    pub projects: Vec<String>,
    pub overrides: ConfigOverrides,
}

fn join_dates(dates: &[chrono::NaiveDate]) -> String {
    if dates.is_empty() {
        return "none".to_string();
    }
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn run(opts: &ConsolidateOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&opts.overrides)?;
    let mut report = CommandReport::new("consolidate");

    let lock = RunLock::acquire(&paths.data_dir)?;
    report.detail(format!("lock={}", lock.path().display()));
    report.detail(format!(
        "selection.min_gap_days={} selection.max_count={}",
        cfg.selection.min_gap_days, cfg.selection.max_count
    ));

    if let Some(zip) = &opts.zip {
        let outcome = extract_upload(zip, &paths.raw_dir)?;
        report.detail(format!(
            "extracted {} entries from {} into {} (skipped {})",
            outcome.extracted,
            zip.display(),
            outcome.raw_dir.display(),
            outcome.skipped
        ));
        audit::append_event(
            &paths,
            "extract",
            None,
            "ok",
            &format!("{} entries from {}", outcome.extracted, zip.display()),
        )?;
    }

    if !paths.raw_dir.exists() {
        report.issue(format!(
            "no exports found: {} does not exist; pass --zip to import an upload",
            paths.raw_dir.display()
        ));
        return Ok(report);
    }

    let batch = load_batch(&paths.raw_dir, cfg.export_delimiter()?)?;
    report.detail(format!(
        "loaded {} export files, {} projects, dropped {} duplicate rows",
        batch.files_read,
        batch.projects.len(),
        batch.duplicates_dropped
    ));
    for skipped in &batch.skipped {
        let source = skipped.path().display().to_string();
        warn::emit(WarnEvent {
            code: skipped.code(),
            stage: "discover",
            project: "",
            source: &source,
            reason: skipped.reason(),
        });
        report.detail(format!("skipped {source}: {}", skipped.reason()));
    }

    let cache = if cfg.cache.enabled {
        Some(ReportCache::open(&paths.cache_dir)?)
    } else {
        report.detail("cache disabled");
        None
    };

    let targets: Vec<String> = if opts.projects.is_empty() {
        batch.projects.keys().cloned().collect()
    } else {
        opts.projects.clone()
    };

    let mut slug_owners: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for known in batch.projects.keys() {
        slug_owners
            .entry(sanitize_slug(known))
            .or_default()
            .push(known.as_str());
    }

    for project in &targets {
        let report_path = paths.report_path(project);
        let owners: Vec<&str> = slug_owners
            .get(&sanitize_slug(project))
            .into_iter()
            .flatten()
            .copied()
            .filter(|owner| *owner != project.as_str())
            .collect();
        if !owners.is_empty() {
            let known = if batch.projects.contains_key(project) {
                "project"
            } else {
                "unknown project"
            };
            let message = format!(
                "{known} {project} shares report {} with {}; nothing written",
                report_path.display(),
                owners.join(",")
            );
            report.issue(format!("project={project}: {message}"));
            audit::append_event(&paths, "consolidate", Some(project), "failed", &message)?;
            continue;
        }

        let records = batch
            .projects
            .get(project)
            .map(Vec::as_slice)
            .unwrap_or_default();
        match run_project(&cfg, cache.as_ref(), project, records, &report_path) {
            Ok(outcome) => {
                if let Some(note) = &outcome.cache_note {
                    warn::emit(WarnEvent {
                        code: "W004_CACHE_CORRUPT",
                        stage: "cache",
                        project,
                        source: "",
                        reason: note,
                    });
                    report.detail(note.clone());
                }
                for warning in &outcome.warnings {
                    let message = warning.message();
                    warn::emit(WarnEvent {
                        code: warning.code(),
                        stage: "consolidate",
                        project,
                        source: "",
                        reason: &message,
                    });
                    report.detail(message);
                }
                report.detail(format!(
                    "project={} rows={} kept={} dropped={} cache={} report={}",
                    outcome.project,
                    outcome.rows,
                    join_dates(&outcome.selected_dates),
                    join_dates(&outcome.dropped_dates),
                    if outcome.cache_hit { "hit" } else { "miss" },
                    outcome.report_path.display()
                ));
                audit::append_event(
                    &paths,
                    "consolidate",
                    Some(project),
                    "ok",
                    &format!("{} rows, dates {}", outcome.rows, join_dates(&outcome.selected_dates)),
                )?;
            }
            Err(err) => {
                let message = format!("{err:#}");
                report.issue(format!("project={project}: {message}"));
                audit::append_event(&paths, "consolidate", Some(project), "failed", &message)?;
            }
        }
    }

    Ok(report)
}

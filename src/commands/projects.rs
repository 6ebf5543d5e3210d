use anyhow::Result;

use crate::commands::CommandReport;
use crate::rank::config::{ConfigOverrides, load_config};
use crate::rank::paths::resolve_paths;
use crate::rank::pipeline::load_batch;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&ConfigOverrides::default())?;
    let mut report = CommandReport::new("projects");

    report.detail(format!("raw_dir={}", paths.raw_dir.display()));
    if !paths.raw_dir.exists() {
        report.issue("raw export dir does not exist; run `rankroll consolidate --zip <file>`");
        return Ok(report);
    }

    let batch = load_batch(&paths.raw_dir, cfg.export_delimiter()?)?;
    if batch.projects.is_empty() {
        report.detail("no projects found");
    }
    for (project, records) in &batch.projects {
        let dates = batch.project_dates(project);
        let newest = dates
            .iter()
            .next_back()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "none".to_string());
        let report_path = paths.report_path(project);
        report.detail(format!(
            "project={project} records={} snapshots={} newest={newest} report={}",
            records.len(),
            dates.len(),
            if report_path.exists() { "present" } else { "missing" },
        ));
    }
    for skipped in &batch.skipped {
        report.detail(format!("skipped {}: {}", skipped.path().display(), skipped.reason()));
    }

    Ok(report)
}

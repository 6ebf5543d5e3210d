use anyhow::Result;

use crate::commands::CommandReport;
use crate::rank::audit;
use crate::rank::cache::ReportCache;
use crate::rank::paths::resolve_paths;

#[derive(Debug, Clone, Default)]
pub struct CacheClearOptions {
    pub project: Option<String>,
}

pub fn run(opts: &CacheClearOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("cache-clear");
    let cache = ReportCache::open(&paths.cache_dir)?;
    report.detail(format!("cache_dir={}", cache.dir().display()));

    let removed = match opts.project.as_deref() {
        Some(project) => {
            let removed = cache.invalidate_project(project)?;
            report.detail(format!("project={project} removed={removed}"));
            removed
        }
        None => {
            let removed = cache.clear()?;
            report.detail(format!("removed={removed}"));
            removed
        }
    };

    audit::append_event(
        &paths,
        "cache-clear",
        opts.project.as_deref(),
        "ok",
        &format!("removed {removed} entries"),
    )?;
    Ok(report)
}

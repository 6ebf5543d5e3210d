use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::rank::config::{ConfigOverrides, load_config, resolve_config_path};
use crate::rank::paths::resolve_paths;

include!(concat!(env!("OUT_DIR"), "/rankroll_env_allowlist.rs"));

pub const BUILD_ID: &str = env!("BUILD_ID");

/// Environment variables from the allowlist that are currently set.
fn active_env_vars() -> Vec<&'static str> {
    GENERATED_RANKROLL_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|key| env::var_os(key).is_some())
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={BUILD_ID}"));
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("data_dir={}", paths.data_dir.display()));
    report.detail(format!("raw_dir={}", paths.raw_dir.display()));
    report.detail(format!("projects_dir={}", paths.projects_dir.display()));
    report.detail(format!("cache_dir={}", paths.cache_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    match resolve_config_path() {
        Some(path) if path.exists() => report.detail(format!("config_file={}", path.display())),
        Some(path) => report.detail(format!("config_file={} (absent, defaults used)", path.display())),
        None => report.detail("config_file=none"),
    }

    match load_config(&ConfigOverrides::default()) {
        Ok(cfg) => {
            report.detail(format!("selection.min_gap_days={}", cfg.selection.min_gap_days));
            report.detail(format!("selection.max_count={}", cfg.selection.max_count));
            report.detail(format!("export.delimiter={:?}", cfg.export.delimiter));
            report.detail(format!("output.delimiter={:?}", cfg.output.delimiter));
            report.detail(format!("output.encoding={}", cfg.output.encoding.as_str()));
            report.detail(format!("output.missing_marker={}", cfg.output.missing_marker));
            report.detail(format!("cache.enabled={}", cfg.cache.enabled));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    let active = active_env_vars();
    if active.is_empty() {
        report.detail("env_overrides=none");
    } else {
        report.detail(format!("env_overrides={}", active.join(",")));
    }

    if !paths.raw_dir.exists() {
        report.detail("raw exports not imported yet");
    }

    Ok(report)
}

use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

use crate::rank::util::sanitize_slug;

#[derive(Debug, Clone)]
pub struct RankPaths {
    pub home: PathBuf,
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub projects_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl RankPaths {
    pub fn report_path(&self, project: &str) -> PathBuf {
        report_path_in(&self.projects_dir, project)
    }
}

pub fn report_path_in(projects_dir: &Path, project: &str) -> PathBuf {
    projects_dir.join(format!("{}.csv", sanitize_slug(project)))
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<RankPaths> {
    let home = match env::var("RANKROLL_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join("rankroll"),
    };

    let data_dir = env_or_default_path("RANKROLL_DATA_DIR", home.join("data"));
    let raw_dir = data_dir.join("raw");
    let projects_dir = env_or_default_path("RANKROLL_PROJECTS_DIR", data_dir.join("projects"));
    let cache_dir = env_or_default_path("RANKROLL_CACHE_DIR", home.join("cache"));
    let logs_dir = env_or_default_path("RANKROLL_LOGS_DIR", home.join("logs"));

    Ok(RankPaths {
        home,
        data_dir,
        raw_dir,
        projects_dir,
        cache_dir,
        logs_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::report_path_in;
    use std::path::Path;

    #[test]
    fn report_names_are_slugged() {
        assert_eq!(
            report_path_in(Path::new("/data/projects"), "Example"),
            Path::new("/data/projects/example.csv")
        );
    }
}

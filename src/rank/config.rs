use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::rank::selector::SelectionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub min_gap_days: i64,
    pub max_count: i64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_gap_days: 10,
            max_count: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub delimiter: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: "\t".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "utf-16")]
    Utf16,
}

impl OutputEncoding {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-16" | "utf16" | "utf-16le" => Some(Self::Utf16),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16 => "utf-16",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub delimiter: String,
    pub encoding: OutputEncoding,
    pub missing_marker: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: "\t".to_string(),
            encoding: OutputEncoding::Utf8,
            missing_marker: "-".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        delimiter_byte(&self.delimiter, "output delimiter")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RankConfig {
    pub selection: SelectionConfig,
    pub export: ExportConfig,
    pub output: OutputConfig,
    pub cache: CacheConfig,
}

impl RankConfig {
    pub fn selection_policy(&self) -> Result<SelectionPolicy> {
        Ok(SelectionPolicy::new(
            self.selection.min_gap_days,
            self.selection.max_count,
        )?)
    }

    pub fn export_delimiter(&self) -> Result<u8> {
        delimiter_byte(&self.export.delimiter, "export delimiter")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialRankConfig {
    selection: Option<SelectionConfig>,
    export: Option<ExportConfig>,
    output: Option<OutputConfig>,
    cache: Option<CacheConfig>,
}

fn delimiter_byte(raw: &str, what: &str) -> Result<u8> {
    let unescaped = match raw {
        "\\t" | "tab" => "\t",
        other => other,
    };
    match unescaped.as_bytes() {
        [b] if b.is_ascii() && *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(*b),
        _ => Err(anyhow!(
            "invalid {what} `{raw}`: must be a single ASCII character"
        )),
    }
}

fn env_or_i64(var: &str, fallback: i64) -> i64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<i64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &RankConfig) -> Result<()> {
    cfg.selection_policy()?;
    cfg.export_delimiter()?;
    cfg.output.delimiter_byte()?;
    let marker = cfg.output.missing_marker.trim();
    if marker.is_empty() {
        return Err(anyhow!(
            "invalid missing marker: cannot be empty (empty cells mean unranked)"
        ));
    }
    if marker.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!(
            "invalid missing marker `{marker}`: must not look like a rank"
        ));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("RANKROLL_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("rankroll").join("rankroll.toml"))
}

fn merge_file_config(base: &mut RankConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialRankConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse rankroll config {}: {err}", path.display()))?;
    if let Some(selection) = parsed.selection {
        base.selection = selection;
    }
    if let Some(export) = parsed.export {
        base.export = export;
    }
    if let Some(output) = parsed.output {
        base.output = output;
    }
    if let Some(cache) = parsed.cache {
        base.cache = cache;
    }
    Ok(())
}

fn merge_env(cfg: &mut RankConfig) -> Result<()> {
    cfg.selection.min_gap_days =
        env_or_i64("RANKROLL_MIN_GAP_DAYS", cfg.selection.min_gap_days);
    cfg.selection.max_count = env_or_i64("RANKROLL_MAX_COUNT", cfg.selection.max_count);
    cfg.export.delimiter = env_or_string("RANKROLL_DELIMITER", &cfg.export.delimiter);
    cfg.output.delimiter = env_or_string("RANKROLL_OUTPUT_DELIMITER", &cfg.output.delimiter);
    if let Ok(raw) = env::var("RANKROLL_OUTPUT_ENCODING") {
        cfg.output.encoding = OutputEncoding::parse(&raw).ok_or_else(|| {
            anyhow!("invalid RANKROLL_OUTPUT_ENCODING `{raw}`: use `utf-8` or `utf-16`")
        })?;
    }
    cfg.output.missing_marker =
        env_or_string("RANKROLL_MISSING_MARKER", &cfg.output.missing_marker);
    cfg.cache.enabled = env_or_bool("RANKROLL_CACHE_ENABLED", cfg.cache.enabled);
    Ok(())
}

/// Values given on the command line; they win over file and env layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub min_gap_days: Option<i64>,
    pub max_count: Option<i64>,
    pub no_cache: bool,
}

pub fn load_config(overrides: &ConfigOverrides) -> Result<RankConfig> {
    let mut cfg = RankConfig::default();
    merge_file_config(&mut cfg)?;
    merge_env(&mut cfg)?;

    if let Some(days) = overrides.min_gap_days {
        cfg.selection.min_gap_days = days;
    }
    if let Some(count) = overrides.max_count {
        cfg.selection.max_count = count;
    }
    if overrides.no_cache {
        cfg.cache.enabled = false;
    }

    validate(&cfg)?;
    Ok(cfg)
}

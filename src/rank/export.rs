use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::rank::model::RankRecord;
use crate::rank::schema::{self, ColumnMap, Field};

/// An export file together with the scrape date taken from its folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub path: PathBuf,
    pub snapshot_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedExport {
    NoDateFolder { path: PathBuf },
    NoProjectUrl { path: PathBuf },
}

impl SkippedExport {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoDateFolder { .. } => "W002_NO_DATE_FOLDER",
            Self::NoProjectUrl { .. } => "W003_NO_PROJECT_URL",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::NoDateFolder { path } | Self::NoProjectUrl { path } => path,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoDateFolder { .. } => "parent folder is not a scrape date",
            Self::NoProjectUrl { .. } => "no http URL to derive a project from",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub exports: Vec<ExportFile>,
    pub skipped: Vec<SkippedExport>,
}

#[derive(Debug, Clone)]
pub struct LoadedExport {
    pub project: String,
    pub records: Vec<RankRecord>,
}

/// Scrape folders are named `YYYY-MM-DD`, `MM-DD-YYYY` or `YYYYMMDD`,
/// with `_` accepted in place of `-`.
pub fn parse_snapshot_folder(folder: &str) -> Option<NaiveDate> {
    let normalized = folder.trim().replace('_', "-");
    for fmt in ["%Y-%m-%d", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, fmt) {
            return Some(date);
        }
    }
    if normalized.len() == 8 && normalized.bytes().all(|b| b.is_ascii_digit()) {
        let year = normalized[0..4].parse::<i32>().ok()?;
        let month = normalized[4..6].parse::<u32>().ok()?;
        let day = normalized[6..8].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

fn is_export_name(name: &str) -> bool {
    if name.starts_with("._") {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".csv") || lower.ends_with(".tsv")
}

pub fn discover_exports(raw_dir: &Path) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    if !raw_dir.exists() {
        return Ok(discovery);
    }

    let walker = WalkDir::new(raw_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != "__MACOSX");
    for entry in walker {
        let entry =
            entry.with_context(|| format!("failed to walk {}", raw_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_export_name(name) {
            continue;
        }

        let path = entry.into_path();
        let folder_date = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .and_then(parse_snapshot_folder);
        match folder_date {
            Some(snapshot_date) => discovery.exports.push(ExportFile {
                path,
                snapshot_date,
            }),
            None => discovery.skipped.push(SkippedExport::NoDateFolder { path }),
        }
    }
    Ok(discovery)
}

/// Rank tracker exports are UTF-16 with a BOM; anything else is read as
/// UTF-8.
pub fn decode_export(bytes: &[u8]) -> Result<String> {
    let utf16 = |body: &[u8], little_endian: bool| -> Result<String> {
        let pairs = body.chunks_exact(2);
        if !pairs.remainder().is_empty() {
            bail!("export is not valid UTF-16: odd trailing byte");
        }
        let units = pairs.map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        });
        char::decode_utf16(units)
            .collect::<Result<String, _>>()
            .context("export is not valid UTF-16")
    };

    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, true),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, false),
        [0xEF, 0xBB, 0xBF, rest @ ..] => {
            String::from_utf8(rest.to_vec()).context("export is not valid UTF-8")
        }
        _ => String::from_utf8(bytes.to_vec()).context("export is not valid UTF-8"),
    }
}

/// Registrable domain label of a URL: `https://www.blog.example.co.uk/x`
/// yields `example`.
pub fn project_from_url(url: &str) -> Option<String> {
    let without_scheme = url.trim().split_once("://").map_or(url.trim(), |(_, rest)| rest);
    let authority = without_scheme.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    let labels: Vec<&str> = host
        .split('.')
        .filter(|label| !label.is_empty())
        .collect();
    match labels.len() {
        0 => None,
        1 => Some(labels[0].to_ascii_lowercase()),
        n => {
            let second_level = labels[n - 2].to_ascii_lowercase();
            let country_code = labels[n - 1].len() == 2;
            let generic_second_level =
                matches!(second_level.as_str(), "co" | "com" | "org" | "net" | "ac" | "gov" | "edu");
            if country_code && generic_second_level && n >= 3 {
                Some(labels[n - 3].to_ascii_lowercase())
            } else {
                Some(second_level)
            }
        }
    }
}

pub fn read_export(export: &ExportFile, delimiter: u8) -> Result<Option<LoadedExport>> {
    let bytes = fs::read(&export.path)
        .with_context(|| format!("failed to read {}", export.path.display()))?;
    let text = decode_export(&bytes)
        .with_context(|| format!("failed to decode {}", export.path.display()))?;
    parse_export(&text, export, delimiter)
}

fn parse_export(text: &str, export: &ExportFile, delimiter: u8) -> Result<Option<LoadedExport>> {
    let source_name = export.path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header row of {source_name}"))?
        .clone();
    let columns = ColumnMap::resolve(headers.iter(), &source_name)?;

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("failed to read row of {source_name}"))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }

    let project = rows
        .iter()
        .map(|row| columns.cell(row, Field::Url))
        .find(|url| url.contains("http"))
        .and_then(project_from_url);
    let Some(project) = project else {
        return Ok(None);
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(RankRecord {
            keyword: columns.cell(row, Field::Keyword).to_string(),
            url: columns.cell(row, Field::Url).to_string(),
            location: columns.cell(row, Field::Location).to_string(),
            search_volume: schema::parse_search_volume(
                columns.cell(row, Field::SearchVolume),
                &source_name,
            )?,
            tags: columns.cell(row, Field::Tags).to_string(),
            snapshot_date: export.snapshot_date,
            rank: schema::parse_rank(columns.cell(row, Field::Rank), &source_name)?,
            project: project.clone(),
        });
    }

    Ok(Some(LoadedExport { project, records }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    #[test]
    fn snapshot_folders_accept_common_layouts() {
        let want = NaiveDate::from_ymd_opt(2024, 1, 28);
        assert_eq!(parse_snapshot_folder("2024-01-28"), want);
        assert_eq!(parse_snapshot_folder("01-28-2024"), want);
        assert_eq!(parse_snapshot_folder("2024_01_28"), want);
        assert_eq!(parse_snapshot_folder("20240128"), want);
        assert_eq!(parse_snapshot_folder("exports"), None);
    }

    #[test]
    fn project_names_use_registrable_domain() {
        assert_eq!(project_from_url("https://www.example.com/a?b=1"), Some("example".into()));
        assert_eq!(project_from_url("http://blog.example.co.uk/"), Some("example".into()));
        assert_eq!(project_from_url("https://Shop.Acme.io:8443/x"), Some("acme".into()));
        assert_eq!(project_from_url("https://"), None);
    }

    #[test]
    fn decodes_utf16_and_utf8_exports() {
        assert_eq!(decode_export(&utf16le_with_bom("Keyword\tRank")).unwrap(), "Keyword\tRank");
        assert_eq!(decode_export(b"\xEF\xBB\xBFKeyword").unwrap(), "Keyword");
        assert_eq!(decode_export(b"Keyword").unwrap(), "Keyword");
    }

    #[test]
    fn odd_length_utf16_body_is_rejected() {
        let mut bytes = utf16le_with_bom("Keyword\tRank");
        bytes.push(0x41);
        let err = decode_export(&bytes).unwrap_err();
        assert!(format!("{err:#}").contains("odd trailing byte"));
    }

    #[test]
    fn reads_export_into_records() {
        let tmp = tempdir().expect("tempdir");
        let folder = tmp.path().join("2024-01-28");
        fs::create_dir_all(&folder).expect("mkdir");
        let path = folder.join("export.csv");
        let body = "#\tKeyword\tLocation\tVolume\tTags\tURL\tPosition\n\
                    1\tseo tools\tUS\t1,300\tcore\thttps://www.example.com/seo\t4\n\
                    2\trank check\tUS\t90\t\thttps://www.example.com/rank\t\n";
        fs::write(&path, utf16le_with_bom(body)).expect("write export");

        let export = ExportFile {
            path,
            snapshot_date: NaiveDate::from_ymd_opt(2024, 1, 28).unwrap(),
        };
        let loaded = read_export(&export, b'\t').unwrap().expect("project found");
        assert_eq!(loaded.project, "example");
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].search_volume, 1300);
        assert_eq!(loaded.records[0].rank, Some(4));
        assert_eq!(loaded.records[1].tags, "");
        assert_eq!(loaded.records[1].rank, None);
    }

    #[test]
    fn export_without_http_urls_has_no_project() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("a.csv");
        fs::write(&path, "Keyword\tLocation\tVolume\tTags\tURL\tRank\nseo\tUS\t1\t\t\t\n")
            .expect("write");
        let export = ExportFile {
            path,
            snapshot_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert!(read_export(&export, b'\t').unwrap().is_none());
    }

    #[test]
    fn discovery_skips_metadata_and_undated_folders() {
        let tmp = tempdir().expect("tempdir");
        let raw = tmp.path();
        for dir in ["2024-01-01", "__MACOSX/2024-01-01", "misc"] {
            fs::create_dir_all(raw.join(dir)).expect("mkdir");
        }
        fs::write(raw.join("2024-01-01/a.csv"), "x").expect("write");
        fs::write(raw.join("2024-01-01/._a.csv"), "x").expect("write");
        fs::write(raw.join("2024-01-01/notes.txt"), "x").expect("write");
        fs::write(raw.join("__MACOSX/2024-01-01/a.csv"), "x").expect("write");
        fs::write(raw.join("misc/b.csv"), "x").expect("write");

        let found = discover_exports(raw).unwrap();
        assert_eq!(found.exports.len(), 1);
        assert_eq!(found.exports[0].path, raw.join("2024-01-01/a.csv"));
        assert_eq!(
            found.skipped,
            vec![SkippedExport::NoDateFolder {
                path: raw.join("misc/b.csv")
            }]
        );
    }
}

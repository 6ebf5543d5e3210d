use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::rank::config::{OutputConfig, OutputEncoding};
use crate::rank::export::decode_export;
use crate::rank::model::{ConsolidatedReport, RankCell};

/// A written report read back as plain text cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn render_cell(cell: RankCell, missing_marker: &str) -> String {
    match cell {
        RankCell::Missing => missing_marker.to_string(),
        RankCell::Unranked => String::new(),
        RankCell::Ranked(rank) => rank.to_string(),
    }
}

pub fn render_report(report: &ConsolidatedReport, cfg: &OutputConfig) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(cfg.delimiter_byte()?)
        .from_writer(Vec::new());
    writer.write_record(report.column_labels())?;
    for row in &report.rows {
        let mut fields = vec![
            row.key.keyword.clone(),
            row.key.location.clone(),
            row.key.url.clone(),
            row.key.search_volume.to_string(),
            row.key.tags.clone(),
        ];
        fields.extend(
            row.cells
                .iter()
                .map(|cell| render_cell(*cell, &cfg.missing_marker)),
        );
        writer.write_record(&fields)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush report: {err}"))?;
    String::from_utf8(bytes).context("rendered report is not UTF-8")
}

fn encode(text: &str, encoding: OutputEncoding) -> Vec<u8> {
    match encoding {
        OutputEncoding::Utf8 => text.as_bytes().to_vec(),
        OutputEncoding::Utf16 => {
            let mut out = Vec::with_capacity(2 + text.len() * 2);
            out.extend_from_slice(&[0xFF, 0xFE]);
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
    }
}

/// Write the report next to its final path and rename it into place.
pub fn write_report(report: &ConsolidatedReport, path: &Path, cfg: &OutputConfig) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("report path {} has no parent", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let body = encode(&render_report(report, cfg)?, cfg.encoding);
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(&body)?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_report(path: &Path, cfg: &OutputConfig) -> Result<ReportTable> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = decode_export(&bytes)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(cfg.delimiter_byte()?)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?
        .iter()
        .map(ToOwned::to_owned)
        .collect();
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("failed to read row of {}", path.display()))?;
        rows.push(row.iter().map(ToOwned::to_owned).collect());
    }
    Ok(ReportTable { headers, rows })
}

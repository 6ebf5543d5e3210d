use anyhow::Result;

use crate::commands::CommandReport;
use crate::rank::config::{ConfigOverrides, load_config};
use crate::rank::paths::resolve_paths;
use crate::rank::report_writer::{ReportTable, read_report};

#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub project: String,
}

/// Pad every column to its widest cell so the table reads in a terminal.
fn aligned_lines(table: &ReportTable) -> Vec<String> {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (idx, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(idx) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }

    let mut out = Vec::with_capacity(table.rows.len() + 1);
    out.push(render_line(&table.headers, &widths));
    for row in &table.rows {
        out.push(render_line(row, &widths));
    }
    out
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

pub fn run(opts: &ShowOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&ConfigOverrides::default())?;
    let mut report = CommandReport::new("show");

    let path = paths.report_path(&opts.project);
    if !path.exists() {
        report.issue(format!(
            "no report for project {} at {}; run `rankroll consolidate` first",
            opts.project,
            path.display()
        ));
        return Ok(report);
    }

    let table = read_report(&path, &cfg.output)?;
    report.detail(format!("report={}", path.display()));
    for line in aligned_lines(&table) {
        report.detail(line);
    }
    Ok(report)
}

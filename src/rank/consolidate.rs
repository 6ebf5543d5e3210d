use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::error::{ConsolidateError, ConsolidationWarning};
use crate::rank::model::{ConsolidatedReport, RankRecord};
use crate::rank::reshape::reshape;
use crate::rank::selector::SelectionPolicy;

#[derive(Debug, Clone)]
pub struct Consolidation {
    pub report: ConsolidatedReport,
    pub selected_dates: Vec<NaiveDate>,
    pub dropped_dates: Vec<NaiveDate>,
    pub warnings: Vec<ConsolidationWarning>,
}

pub fn consolidate(
    project: &str,
    records: &[RankRecord],
    policy: &SelectionPolicy,
) -> Result<Consolidation, ConsolidateError> {
    if records.is_empty() {
        return Ok(Consolidation {
            report: ConsolidatedReport::empty(project),
            selected_dates: Vec::new(),
            dropped_dates: Vec::new(),
            warnings: vec![ConsolidationWarning::EmptyInput {
                project: project.to_string(),
            }],
        });
    }

    let available: BTreeSet<NaiveDate> = records.iter().map(|r| r.snapshot_date).collect();
    let selected_dates = policy.select(available.iter().copied());
    let retained: BTreeSet<NaiveDate> = selected_dates.iter().copied().collect();
    let dropped_dates = dropped_dates(&available, &selected_dates);

    let kept: Vec<RankRecord> = records
        .iter()
        .filter(|r| retained.contains(&r.snapshot_date))
        .cloned()
        .collect();
    let report = reshape(project, &kept, &selected_dates)?;

    Ok(Consolidation {
        report,
        selected_dates,
        dropped_dates,
        warnings: Vec::new(),
    })
}

/// Available dates the selection did not keep, newest first.
pub fn dropped_dates(available: &BTreeSet<NaiveDate>, selected: &[NaiveDate]) -> Vec<NaiveDate> {
    available
        .iter()
        .rev()
        .filter(|date| !selected.contains(date))
        .copied()
        .collect()
}

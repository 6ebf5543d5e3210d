use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::ConsolidateError;
use crate::rank::model::{ConsolidatedReport, IdentityKey, RankCell, RankRecord, ReportRow};

/// Pivot long-format records into one row per identity key with one rank
/// cell per retained date, newest first.
///
/// Every record must be dated on one of `retained_dates`, and an identity
/// key may appear at most once per date.
pub fn reshape(
    project: &str,
    records: &[RankRecord],
    retained_dates: &[NaiveDate],
) -> Result<ConsolidatedReport, ConsolidateError> {
    let mut dates = retained_dates.to_vec();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let column_of: BTreeMap<NaiveDate, usize> = dates
        .iter()
        .enumerate()
        .map(|(idx, date)| (*date, idx))
        .collect();

    let mut grouped: BTreeMap<IdentityKey, Vec<RankCell>> = BTreeMap::new();
    for record in records {
        let key = record.identity_key();
        let Some(&col) = column_of.get(&record.snapshot_date) else {
            return Err(ConsolidateError::DateNotRetained {
                key,
                date: record.snapshot_date,
            });
        };

        let cells = grouped
            .entry(key)
            .or_insert_with(|| vec![RankCell::Missing; dates.len()]);
        if !cells[col].is_missing() {
            return Err(ConsolidateError::DuplicateSnapshot {
                key: record.identity_key(),
                date: record.snapshot_date,
            });
        }
        cells[col] = RankCell::from_record_rank(record.rank);
    }

    let rows = grouped
        .into_iter()
        .map(|(key, cells)| ReportRow { key, cells })
        .collect();

    Ok(ConsolidatedReport {
        project: project.to_string(),
        dates,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn record(keyword: &str, date: &str, rank: Option<u32>) -> RankRecord {
        RankRecord {
            keyword: keyword.to_string(),
            url: "x.com".to_string(),
            location: "US".to_string(),
            search_volume: 100,
            tags: "t1".to_string(),
            snapshot_date: d(date),
            rank,
            project: "x".to_string(),
        }
    }

    #[test]
    fn conflicting_ranks_for_one_key_and_date_are_rejected() {
        let records = vec![
            record("seo", "2024-01-01", Some(3)),
            record("seo", "2024-01-01", Some(7)),
        ];
        let err = reshape("x", &records, &[d("2024-01-01")]).unwrap_err();
        assert_eq!(
            err,
            ConsolidateError::DuplicateSnapshot {
                key: records[0].identity_key(),
                date: d("2024-01-01"),
            }
        );
    }

    #[test]
    fn absent_dates_become_missing_cells() {
        let records = vec![
            record("seo", "2024-01-15", Some(4)),
            record("seo", "2024-01-28", Some(2)),
        ];
        let report = reshape(
            "x",
            &records,
            &[d("2024-01-03"), d("2024-01-28"), d("2024-01-15")],
        )
        .unwrap();

        assert_eq!(
            report.column_labels(),
            vec![
                "keyword",
                "location",
                "url",
                "search_volume",
                "tags",
                "rank@2024-01-28",
                "rank@2024-01-15",
                "rank@2024-01-03",
            ]
        );
        assert_eq!(report.rows.len(), 1);
        assert_eq!(
            report.rows[0].cells,
            vec![RankCell::Ranked(2), RankCell::Ranked(4), RankCell::Missing]
        );
    }

    #[test]
    fn unranked_records_are_not_missing() {
        let records = vec![record("seo", "2024-01-01", None)];
        let report = reshape("x", &records, &[d("2024-01-01")]).unwrap();
        assert_eq!(report.rows[0].cells, vec![RankCell::Unranked]);
    }

    #[test]
    fn rows_are_sorted_by_identity_key() {
        let records = vec![
            record("zeta", "2024-01-01", Some(1)),
            record("alpha", "2024-01-01", Some(9)),
            record("mid", "2024-01-01", Some(5)),
        ];
        let report = reshape("x", &records, &[d("2024-01-01")]).unwrap();
        let keywords: Vec<&str> = report.rows.iter().map(|r| r.key.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["alpha", "mid", "zeta"]);

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(reshape("x", &reversed, &[d("2024-01-01")]).unwrap(), report);
    }

    #[test]
    fn record_outside_retained_dates_is_rejected() {
        let records = vec![record("seo", "2024-01-02", Some(1))];
        let err = reshape("x", &records, &[d("2024-01-01")]).unwrap_err();
        assert!(matches!(err, ConsolidateError::DateNotRetained { .. }));
    }

    #[test]
    fn no_retained_dates_yields_identity_columns_only() {
        let report = reshape("x", &[], &[]).unwrap();
        assert_eq!(report.column_count(), 5);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn melting_reproduces_input_records() {
        let mut records = vec![
            record("seo", "2024-01-28", Some(2)),
            record("seo", "2024-01-15", None),
            record("rust", "2024-01-03", Some(11)),
            record("rust", "2024-01-28", Some(8)),
        ];
        let retained = [d("2024-01-28"), d("2024-01-15"), d("2024-01-03")];
        let report = reshape("x", &records, &retained).unwrap();
        assert_eq!(report.column_count(), 5 + retained.len());

        let mut melted = report.melt();
        melted.sort();
        records.sort();
        assert_eq!(melted, records);
    }
}

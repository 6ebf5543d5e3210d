use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const IDENTITY_COLUMNS: [&str; 5] = ["keyword", "location", "url", "search_volume", "tags"];

/// One row of a normalized rank tracker export.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RankRecord {
    pub keyword: String,
    pub url: String,
    pub location: String,
    pub search_volume: u64,
    pub tags: String,
    pub snapshot_date: NaiveDate,
    pub rank: Option<u32>,
    pub project: String,
}

impl RankRecord {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            keyword: self.keyword.clone(),
            location: self.location.clone(),
            url: self.url.clone(),
            search_volume: self.search_volume,
            tags: self.tags.clone(),
        }
    }
}

/// The date-independent part of a record. Field order is the report's row
/// sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub keyword: String,
    pub location: String,
    pub url: String,
    pub search_volume: u64,
    pub tags: String,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(keyword={:?}, location={:?}, url={:?}, search_volume={}, tags={:?})",
            self.keyword, self.location, self.url, self.search_volume, self.tags
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rank", rename_all = "snake_case")]
pub enum RankCell {
    /// No record exists for this key on this date.
    Missing,
    /// A record exists but the keyword did not rank.
    Unranked,
    Ranked(u32),
}

impl RankCell {
    pub fn from_record_rank(rank: Option<u32>) -> Self {
        match rank {
            Some(value) => Self::Ranked(value),
            None => Self::Unranked,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Rank as stored on a record, `None` for [`RankCell::Missing`].
    #[cfg(test)]
    pub fn record_rank(self) -> Option<Option<u32>> {
        match self {
            Self::Missing => None,
            Self::Unranked => Some(None),
            Self::Ranked(value) => Some(Some(value)),
        }
    }
}

pub fn rank_column_label(date: NaiveDate) -> String {
    format!("rank@{}", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub key: IdentityKey,
    /// One cell per entry of [`ConsolidatedReport::dates`], same order.
    pub cells: Vec<RankCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub project: String,
    /// Retained snapshot dates, newest first.
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<ReportRow>,
}

impl ConsolidatedReport {
    pub fn empty(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dates: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column_labels(&self) -> Vec<String> {
        IDENTITY_COLUMNS
            .iter()
            .map(|name| (*name).to_string())
            .chain(self.dates.iter().copied().map(rank_column_label))
            .collect()
    }

    #[cfg(test)]
    pub fn column_count(&self) -> usize {
        IDENTITY_COLUMNS.len() + self.dates.len()
    }

    /// Back to long format, dropping missing cells.
    #[cfg(test)]
    pub fn melt(&self) -> Vec<RankRecord> {
        let mut out = Vec::new();
        for row in &self.rows {
            for (date, cell) in self.dates.iter().zip(&row.cells) {
                let Some(rank) = cell.record_rank() else {
                    continue;
                };
                out.push(RankRecord {
                    keyword: row.key.keyword.clone(),
                    url: row.key.url.clone(),
                    location: row.key.location.clone(),
                    search_volume: row.key.search_volume,
                    tags: row.key.tags.clone(),
                    snapshot_date: *date,
                    rank,
                    project: self.project.clone(),
                });
            }
        }
        out
    }
}

use chrono::NaiveDate;
use thiserror::Error;

use crate::rank::model::IdentityKey;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsolidateError {
    #[error(
        "invalid gap configuration: min_gap_days={min_gap_days} max_count={max_count} (both must be >= 1)"
    )]
    InvalidGapConfiguration { min_gap_days: i64, max_count: i64 },
    #[error("duplicate snapshot for {key} on {date}")]
    DuplicateSnapshot { key: IdentityKey, date: NaiveDate },
    #[error("record for {key} is dated {date}, which is not a retained snapshot date")]
    DateNotRetained { key: IdentityKey, date: NaiveDate },
    #[error("missing column `{column}` in {source_name}")]
    MissingColumn { column: String, source_name: String },
    #[error("invalid value `{value}` in column `{column}` of {source_name}")]
    InvalidField {
        column: String,
        value: String,
        source_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationWarning {
    EmptyInput { project: String },
}

impl ConsolidationWarning {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput { .. } => "W001_EMPTY_INPUT",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::EmptyInput { project } => {
                format!("project {project} has no rank records; wrote an empty report")
            }
        }
    }
}

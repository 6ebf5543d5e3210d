use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::error::ConsolidateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    min_gap_days: i64,
    max_count: usize,
}

impl SelectionPolicy {
    pub fn new(min_gap_days: i64, max_count: i64) -> Result<Self, ConsolidateError> {
        if min_gap_days <= 0 || max_count <= 0 {
            return Err(ConsolidateError::InvalidGapConfiguration {
                min_gap_days,
                max_count,
            });
        }
        let max_count = usize::try_from(max_count).map_err(|_| {
            ConsolidateError::InvalidGapConfiguration {
                min_gap_days,
                max_count,
            }
        })?;
        Ok(Self {
            min_gap_days,
            max_count,
        })
    }

    pub fn min_gap_days(&self) -> i64 {
        self.min_gap_days
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Newest date anchors the first cluster; every later date is compared
    /// against the last kept date only, then the survivors are truncated.
    pub fn select<I>(&self, dates: I) -> Vec<NaiveDate>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let distinct: BTreeSet<NaiveDate> = dates.into_iter().collect();
        let kept = distinct
            .into_iter()
            .rev()
            .fold(Vec::<NaiveDate>::new(), |mut kept, date| {
                let clears_gap = kept
                    .last()
                    .is_none_or(|anchor| (*anchor - date).num_days() >= self.min_gap_days);
                if clears_gap {
                    kept.push(date);
                }
                kept
            });
        kept.into_iter().take(self.max_count).collect()
    }
}

#[cfg(test)]
pub fn select_dates<I>(
    dates: I,
    min_gap_days: i64,
    max_count: i64,
) -> Result<Vec<NaiveDate>, ConsolidateError>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let policy = SelectionPolicy::new(min_gap_days, max_count)?;
    Ok(policy.select(dates))
}

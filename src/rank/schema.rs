//! Declared mapping from rank tracker export headers to record fields.
//!
//! Exports from different tool versions label the same data differently
//! (`Position` instead of `Rank`, `Search volume` instead of `Volume`).
//! Every canonical field lists the headers it accepts; a field with no
//! matching header is an error rather than a silently dropped column.

use crate::error::ConsolidateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Keyword,
    Url,
    Location,
    SearchVolume,
    Tags,
    Rank,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Keyword,
        Field::Url,
        Field::Location,
        Field::SearchVolume,
        Field::Tags,
        Field::Rank,
    ];

    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Url => "url",
            Self::Location => "location",
            Self::SearchVolume => "search_volume",
            Self::Tags => "tags",
            Self::Rank => "rank",
        }
    }

    pub fn accepted_headers(self) -> &'static [&'static str] {
        match self {
            Self::Keyword => &["Keyword"],
            Self::Url => &["URL"],
            Self::Location => &["Location"],
            Self::SearchVolume => &["Volume", "Search volume"],
            Self::Tags => &["Tags"],
            Self::Rank => &["Rank", "Position"],
        }
    }
}

/// Column index of every [`Field`] within one export's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [usize; 6],
}

fn normalize_header(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_ascii_lowercase()
}

impl ColumnMap {
    pub fn resolve<'a, I>(headers: I, source_name: &str) -> Result<Self, ConsolidateError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let normalized: Vec<String> = headers.into_iter().map(normalize_header).collect();
        let mut indices = [0usize; 6];
        for field in Field::ALL {
            let found = field.accepted_headers().iter().find_map(|accepted| {
                let wanted = accepted.to_ascii_lowercase();
                normalized.iter().position(|h| *h == wanted)
            });
            match found {
                Some(idx) => indices[field as usize] = idx,
                None => {
                    return Err(ConsolidateError::MissingColumn {
                        column: field.canonical_name().to_string(),
                        source_name: source_name.to_string(),
                    });
                }
            }
        }
        Ok(Self { indices })
    }

    pub fn index(&self, field: Field) -> usize {
        self.indices[field as usize]
    }

    pub fn cell<'r>(&self, row: &'r csv::StringRecord, field: Field) -> &'r str {
        row.get(self.index(field)).unwrap_or("").trim()
    }
}

pub fn parse_search_volume(raw: &str, source_name: &str) -> Result<u64, ConsolidateError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Ok(0);
    }
    parse_whole_number(&cleaned).ok_or_else(|| ConsolidateError::InvalidField {
        column: Field::SearchVolume.canonical_name().to_string(),
        value: raw.to_string(),
        source_name: source_name.to_string(),
    })
}

pub fn parse_rank(raw: &str, source_name: &str) -> Result<Option<u32>, ConsolidateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(None);
    }
    parse_whole_number(trimmed)
        .and_then(|n| u32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| ConsolidateError::InvalidField {
            column: Field::Rank.canonical_name().to_string(),
            value: raw.to_string(),
            source_name: source_name.to_string(),
        })
}

/// Accepts `12` and integral floats like `12.0`, which appear once a
/// spreadsheet tool has round-tripped a column containing blanks.
fn parse_whole_number(raw: &str) -> Option<u64> {
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    let (whole, frac) = raw.split_once('.')?;
    if !frac.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse::<u64>().ok()
}

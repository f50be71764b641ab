use thiserror::Error;

use crate::model::Side;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty sheet name, bad report extension, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Required identity column absent after normalization.
    #[error("identity column '{column}' not found (columns found: {})", .found.join(", "))]
    Schema { column: String, found: Vec<String> },
    /// Two or more rows share an identity value under the reject policy.
    #[error("duplicate employee codes: {}", format_duplicates(.0))]
    DuplicateKey(Vec<DuplicateKey>),
    /// An indexed table has no display-name column.
    #[error("{side} table has no '{}' column", crate::model::DISPLAY_COLUMN)]
    MissingDisplayColumn { side: Side },
    /// A normalization or indexing fault attributed to one side of a run.
    #[error("{side} table: {source}")]
    InTable {
        side: Side,
        #[source]
        source: Box<ReconError>,
    },
}

impl ReconError {
    /// Attribute this error to one side of a run.
    pub fn in_table(self, side: Side) -> Self {
        match self {
            already @ (Self::InTable { .. } | Self::MissingDisplayColumn { .. }) => already,
            other => Self::InTable { side, source: Box::new(other) },
        }
    }

    /// The innermost error, skipping any side attribution.
    pub fn root(&self) -> &ReconError {
        match self {
            Self::InTable { source, .. } => source.root(),
            other => other,
        }
    }
}

/// An identity value that appears more than once in one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub key: String,
    pub count: usize,
}

fn format_duplicates(dups: &[DuplicateKey]) -> String {
    dups.iter()
        .map(|d| format!("{:?} ({} rows)", d.key, d.count))
        .collect::<Vec<_>>()
        .join(", ")
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DuplicateKey, ReconError};
use crate::model::{is_missing, IndexedTable, NormalizedTable, IDENTITY_COLUMN};

/// What to do when two rows share an identity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail indexing and list every duplicated value.
    #[default]
    Reject,
    KeepFirst,
    KeepLast,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::KeepFirst => write!(f, "keep_first"),
            Self::KeepLast => write!(f, "keep_last"),
        }
    }
}

/// Key a normalized table by its identity column.
///
/// `identity_override` names the column to key by when the table has no
/// canonical `Employee Code` column; it matches a normalized column name or
/// the column's original label. Rows with an empty identity are skipped.
pub fn index(
    table: NormalizedTable,
    identity_override: Option<&str>,
    policy: DuplicatePolicy,
) -> Result<IndexedTable, ReconError> {
    let key_column = match identity_override {
        Some(name) => table.position_of(name).ok_or_else(|| ReconError::Schema {
            column: name.to_string(),
            found: table.column_names(),
        })?,
        None => table.identity_position().ok_or_else(|| ReconError::Schema {
            column: IDENTITY_COLUMN.to_string(),
            found: table.column_names(),
        })?,
    };

    let column = table.column(key_column);
    let mut keyed: Vec<(String, usize)> = Vec::with_capacity(table.row_count());
    let mut blank = 0usize;
    for row in 0..table.row_count() {
        let key = column.stored(row).trim().to_string();
        if is_missing(&key) {
            blank += 1;
            continue;
        }
        keyed.push((key, row));
    }
    if blank > 0 {
        warn!(rows = blank, column = %column.name(), "skipped rows with empty identity");
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (key, _) in &keyed {
        *counts.entry(key.as_str()).or_insert(0) += 1;
    }

    let entries = if counts.values().all(|&n| n == 1) {
        keyed
    } else {
        resolve_duplicates(keyed, policy)?
    };

    debug!(rows = entries.len(), key = %table.column(key_column).name(), "table indexed");
    Ok(IndexedTable::new(table, key_column, entries))
}

fn resolve_duplicates(
    keyed: Vec<(String, usize)>,
    policy: DuplicatePolicy,
) -> Result<Vec<(String, usize)>, ReconError> {
    match policy {
        DuplicatePolicy::Reject => {
            let mut order: Vec<&str> = Vec::new();
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for (key, _) in &keyed {
                let count = counts.entry(key.as_str()).or_insert(0);
                if *count == 1 {
                    order.push(key.as_str());
                }
                *count += 1;
            }
            let dups = order
                .into_iter()
                .map(|key| DuplicateKey { key: key.to_string(), count: counts[key] })
                .collect();
            Err(ReconError::DuplicateKey(dups))
        }
        DuplicatePolicy::KeepFirst => {
            let mut seen: HashMap<String, usize> = HashMap::new();
            let mut kept = Vec::with_capacity(keyed.len());
            for (key, row) in keyed {
                if let Some(first) = seen.get(&key) {
                    warn!(key = %key, kept_row = first, dropped_row = row, "duplicate identity, keeping first");
                    continue;
                }
                seen.insert(key.clone(), row);
                kept.push((key, row));
            }
            Ok(kept)
        }
        DuplicatePolicy::KeepLast => {
            let last: HashMap<String, usize> = keyed.iter().map(|(k, row)| (k.clone(), *row)).collect();
            Ok(keyed
                .into_iter()
                .filter(|(key, row)| {
                    let keep = last[key] == *row;
                    if !keep {
                        warn!(key = %key, kept_row = last[key], dropped_row = row, "duplicate identity, keeping last");
                    }
                    keep
                })
                .collect())
        }
    }
}

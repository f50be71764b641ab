//! Header normalization: arbitrary sheet labels onto the canonical schema.
//!
//! Each label runs through [`MATCHERS`] in order; the first hit decides the
//! column. Recognized dates are written as `Status (DD-Mon-YY)` and then
//! re-parsed into `YYYY-MM-DD`, which is also how hand-written `Status (...)`
//! headers reach the status set.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::model::{
    CellValue, ColumnCells, ColumnLabel, ColumnRole, NormalizedColumn, NormalizedTable, RawTable, StatusKey,
    DISPLAY_COLUMN, IDENTITY_COLUMN,
};

/// Intermediate date header format.
const STATUS_FORMAT: &str = "Status (%d-%b-%y)";
const STATUS_PREFIX: &str = "Status";
const WRAPPED_DATE_FORMAT: &str = "%d-%b-%y";
const DAY_MONTH_YEAR_FORMAT: &str = "%d-%m-%Y";
const CANONICAL_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Assign the first column as identity and the second as display when no
    /// header names them and those columns are otherwise unrecognized.
    pub positional_fallback: bool,
}

/// Non-fatal findings from normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizeWarning {
    /// A `Status...` header whose date could not be parsed; kept under its label.
    DateParse { label: String },
    /// A header claimed a role another column already holds; kept as inert.
    DuplicateColumn { label: String, role: String },
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateParse { label } => {
                write!(f, "unable to parse date from column '{label}', keeping original name")
            }
            Self::DuplicateColumn { label, role } => {
                write!(f, "column '{label}' duplicates '{role}', ignored")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: NormalizedTable,
    pub warnings: Vec<NormalizeWarning>,
}

// ---------------------------------------------------------------------------
// Matchers
// ---------------------------------------------------------------------------

/// What a header matcher recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatch {
    Identity,
    Display,
    Date(NaiveDate),
}

pub type Matcher = fn(&ColumnLabel) -> Option<HeaderMatch>;

/// Header strategies in priority order.
pub const MATCHERS: &[(&str, Matcher)] = &[
    ("identity", match_identity),
    ("display", match_display),
    ("day-month-year", match_day_month_year),
    ("status-wrapped", match_status_wrapped),
    ("native-date", match_native_date),
    ("canonical-date", match_canonical_date),
];

fn text(label: &ColumnLabel) -> Option<&str> {
    match label {
        ColumnLabel::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

pub fn match_identity(label: &ColumnLabel) -> Option<HeaderMatch> {
    text(label)
        .filter(|s| s.to_lowercase().contains("code"))
        .map(|_| HeaderMatch::Identity)
}

pub fn match_display(label: &ColumnLabel) -> Option<HeaderMatch> {
    text(label)
        .filter(|s| s.to_lowercase().contains("name"))
        .map(|_| HeaderMatch::Display)
}

/// `05-01-2024`
pub fn match_day_month_year(label: &ColumnLabel) -> Option<HeaderMatch> {
    let s = text(label)?.trim();
    NaiveDate::parse_from_str(s, DAY_MONTH_YEAR_FORMAT).ok().map(HeaderMatch::Date)
}

/// `Status (05-Jan-24)`: the text between the first `(` and the next `)`.
pub fn match_status_wrapped(label: &ColumnLabel) -> Option<HeaderMatch> {
    wrapped_date(text(label)?).map(HeaderMatch::Date)
}

pub fn match_native_date(label: &ColumnLabel) -> Option<HeaderMatch> {
    match label {
        ColumnLabel::Date(dt) => Some(HeaderMatch::Date(dt.date())),
        _ => None,
    }
}

/// `2024-01-05`, the form this module emits.
pub fn match_canonical_date(label: &ColumnLabel) -> Option<HeaderMatch> {
    let s = text(label)?.trim();
    NaiveDate::parse_from_str(s, CANONICAL_FORMAT).ok().map(HeaderMatch::Date)
}

fn wrapped_date(s: &str) -> Option<NaiveDate> {
    let (_, after) = s.split_once('(')?;
    let inner = after.split(')').next().unwrap_or(after).trim();
    NaiveDate::parse_from_str(inner, WRAPPED_DATE_FORMAT).ok()
}

/// Run the matchers over one label.
pub fn classify(label: &ColumnLabel) -> Option<HeaderMatch> {
    MATCHERS.iter().find_map(|(_, matcher)| matcher(label))
}

// ---------------------------------------------------------------------------
// Normalize
// ---------------------------------------------------------------------------

/// First-pass header: a role, or a label still to be canonicalized.
enum Header {
    Identity,
    Display,
    Label(String),
}

fn first_pass(label: &ColumnLabel) -> Header {
    match classify(label) {
        Some(HeaderMatch::Identity) => Header::Identity,
        Some(HeaderMatch::Display) => Header::Display,
        Some(HeaderMatch::Date(date)) => Header::Label(date.format(STATUS_FORMAT).to_string()),
        None => Header::Label(label.to_string()),
    }
}

/// Second pass: `Status...` labels become canonical dates.
fn canonicalize(label: String, warnings: &mut Vec<NormalizeWarning>) -> ColumnRole {
    if !label.starts_with(STATUS_PREFIX) {
        return ColumnRole::Inert(label);
    }
    match wrapped_date(&label) {
        Some(date) => ColumnRole::Status(StatusKey::Date(date)),
        None => {
            debug!(column = %label, "unable to parse date from status column, keeping original name");
            warnings.push(NormalizeWarning::DateParse { label: label.clone() });
            ColumnRole::Status(StatusKey::Label(label))
        }
    }
}

/// Map a loaded sheet onto the canonical schema.
pub fn normalize(raw: RawTable, options: &NormalizeOptions) -> Normalized {
    let row_count = raw.row_count();
    let (header, rows) = raw.into_parts();
    let mut warnings = Vec::new();

    let mut has_identity = false;
    let mut has_display = false;
    let mut seen_status: HashSet<StatusKey> = HashSet::new();
    let mut roles: Vec<ColumnRole> = Vec::with_capacity(header.len());

    for label in &header {
        let role = match first_pass(label) {
            Header::Identity => ColumnRole::Identity,
            Header::Display => ColumnRole::Display,
            Header::Label(s) => canonicalize(s, &mut warnings),
        };

        let duplicate = match &role {
            ColumnRole::Identity => std::mem::replace(&mut has_identity, true),
            ColumnRole::Display => std::mem::replace(&mut has_display, true),
            ColumnRole::Status(key) => !seen_status.insert(key.clone()),
            ColumnRole::Inert(_) => false,
        };

        if duplicate {
            let source = label.to_string();
            debug!(column = %source, role = %role.name(), "duplicate column ignored");
            warnings.push(NormalizeWarning::DuplicateColumn { label: source.clone(), role: role.name() });
            roles.push(ColumnRole::Inert(source));
        } else {
            debug!(column = %label, normalized = %role.name(), "column recognized");
            roles.push(role);
        }
    }

    if options.positional_fallback {
        apply_positional_fallback(&mut roles, has_identity, has_display);
    }

    let mut columns: Vec<NormalizedColumn> = header
        .iter()
        .zip(roles)
        .map(|(label, role)| {
            let cells = if role == ColumnRole::Display {
                ColumnCells::Typed(Vec::with_capacity(row_count))
            } else {
                ColumnCells::Stored(Vec::with_capacity(row_count))
            };
            NormalizedColumn { role, source: label.to_string(), cells }
        })
        .collect();

    for row in rows {
        for (column, cell) in columns.iter_mut().zip(row) {
            match &mut column.cells {
                ColumnCells::Typed(cells) => cells.push(cell),
                ColumnCells::Stored(cells) => cells.push(cell.to_stored()),
            }
        }
    }

    Normalized { table: NormalizedTable::new(columns, row_count), warnings }
}

fn apply_positional_fallback(roles: &mut [ColumnRole], has_identity: bool, has_display: bool) {
    if !has_identity {
        if let Some(role) = roles.get_mut(0).filter(|r| matches!(r, ColumnRole::Inert(_))) {
            debug!(column = %role.name(), "first column assigned as {IDENTITY_COLUMN}");
            *role = ColumnRole::Identity;
        }
    }
    if !has_display {
        if let Some(role) = roles.get_mut(1).filter(|r| matches!(r, ColumnRole::Inert(_))) {
            debug!(column = %role.name(), "second column assigned as {DISPLAY_COLUMN}");
            *role = ColumnRole::Display;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

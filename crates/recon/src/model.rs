use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

/// Canonical name of the identity column.
pub const IDENTITY_COLUMN: &str = "Employee Code";
/// Canonical name of the display-name column.
pub const DISPLAY_COLUMN: &str = "Employee Name";
/// Stored form of an empty non-display cell.
pub const MISSING: &str = "nan";
/// Reference value when the reference has no column for a submitted date.
pub const DATE_NOT_IN_REFERENCE: &str = "N/A";
/// Reference value when the submitted employee is absent from the reference.
pub const EMPLOYEE_NOT_IN_REFERENCE: &str = "Employee not found in backend";

/// True for the stored forms of an absent value.
pub fn is_missing(value: &str) -> bool {
    value == MISSING || value.is_empty()
}

/// Which side of a reconciliation a table plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The authoritative backend export.
    Reference,
    /// The attendance sheet being checked.
    Submission,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Submission => write!(f, "submission"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A header cell as the loader found it.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnLabel {
    Text(String),
    Date(NaiveDateTime),
    Number(f64),
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Date(dt) => f.write_str(&format_datetime(dt)),
            Self::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl From<&str> for ColumnLabel {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A single typed cell from a loaded sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    /// Text cell, mapping the empty string to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    /// String form used for stored (non-display) cells; empty becomes `"nan"`.
    pub fn to_stored(&self) -> String {
        match self {
            Self::Empty => MISSING.to_string(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(dt) => format_datetime(dt),
        }
    }

    /// String form shown to people; empty becomes `""`.
    pub fn to_display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            other => other.to_stored(),
        }
    }
}

/// Integral values render without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// A loaded sheet: header labels plus rows of typed cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    header: Vec<ColumnLabel>,
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table, padding short rows with `Empty` and truncating long ones
    /// so every row matches the header width.
    pub fn new(header: Vec<ColumnLabel>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { header, rows }
    }

    pub fn header(&self) -> &[ColumnLabel] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn into_parts(self) -> (Vec<ColumnLabel>, Vec<Vec<CellValue>>) {
        (self.header, self.rows)
    }
}

// ---------------------------------------------------------------------------
// Normalized tables
// ---------------------------------------------------------------------------

/// Key of a status column: a calendar date, or the raw label of a
/// `Status...` column whose date could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusKey {
    Date(NaiveDate),
    Label(String),
}

impl StatusKey {
    /// Column name: `YYYY-MM-DD`, or the raw label.
    pub fn column_name(&self) -> String {
        match self {
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Label(label) => label.clone(),
        }
    }

    /// Report form: `DD-Mon-YY`, or the raw label.
    pub fn display_date(&self) -> String {
        match self {
            Self::Date(d) => d.format("%d-%b-%y").to_string(),
            Self::Label(label) => label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    Identity,
    Display,
    Status(StatusKey),
    /// Unrecognized column, carried but never compared.
    Inert(String),
}

impl ColumnRole {
    pub fn name(&self) -> String {
        match self {
            Self::Identity => IDENTITY_COLUMN.to_string(),
            Self::Display => DISPLAY_COLUMN.to_string(),
            Self::Status(key) => key.column_name(),
            Self::Inert(label) => label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnCells {
    /// Stringified cells; `"nan"` marks an empty one.
    Stored(Vec<String>),
    /// Display column cells keep their loaded type.
    Typed(Vec<CellValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedColumn {
    pub role: ColumnRole,
    /// Label as it appeared in the loaded sheet.
    pub source: String,
    pub cells: ColumnCells,
}

impl NormalizedColumn {
    pub fn name(&self) -> String {
        self.role.name()
    }

    /// Stored string form of one cell.
    pub fn stored(&self, row: usize) -> Cow<'_, str> {
        match &self.cells {
            ColumnCells::Stored(cells) => Cow::Borrowed(cells[row].as_str()),
            ColumnCells::Typed(cells) => Cow::Owned(cells[row].to_stored()),
        }
    }

    /// Human-facing form of one cell; empty values render as `""`.
    pub fn display(&self, row: usize) -> String {
        match &self.cells {
            ColumnCells::Stored(cells) if is_missing(&cells[row]) => String::new(),
            ColumnCells::Stored(cells) => cells[row].clone(),
            ColumnCells::Typed(cells) => cells[row].to_display(),
        }
    }
}

/// A table whose columns carry canonical roles.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    columns: Vec<NormalizedColumn>,
    row_count: usize,
}

impl NormalizedTable {
    pub fn new(columns: Vec<NormalizedColumn>, row_count: usize) -> Self {
        Self { columns, row_count }
    }

    pub fn columns(&self) -> &[NormalizedColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &NormalizedColumn {
        &self.columns[index]
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(NormalizedColumn::name).collect()
    }

    pub fn identity_position(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.role == ColumnRole::Identity)
    }

    pub fn display_position(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.role == ColumnRole::Display)
    }

    /// Locate a column by canonical name, falling back to its source label.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name() == name)
            .or_else(|| self.columns.iter().position(|c| c.source == name))
    }

    /// Status columns in table order.
    pub fn status_columns(&self) -> impl Iterator<Item = (usize, &StatusKey)> {
        self.columns.iter().enumerate().filter_map(|(i, c)| match &c.role {
            ColumnRole::Status(key) => Some((i, key)),
            _ => None,
        })
    }
}

/// A normalized table keyed by identity value.
#[derive(Debug, Clone)]
pub struct IndexedTable {
    table: NormalizedTable,
    key_column: usize,
    /// (identity value, row) in table order.
    entries: Vec<(String, usize)>,
    lookup: HashMap<String, usize>,
}

impl IndexedTable {
    pub(crate) fn new(table: NormalizedTable, key_column: usize, entries: Vec<(String, usize)>) -> Self {
        let lookup = entries.iter().map(|(k, row)| (k.clone(), *row)).collect();
        Self { table, key_column, entries, lookup }
    }

    pub fn table(&self) -> &NormalizedTable {
        &self.table
    }

    pub fn key_column(&self) -> usize {
        self.key_column
    }

    /// (identity value, row index) pairs in table order.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn row_of(&self, key: &str) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status columns, excluding the key column.
    pub fn status_columns(&self) -> impl Iterator<Item = (usize, &StatusKey)> {
        let key_column = self.key_column;
        self.table.status_columns().filter(move |(i, _)| *i != key_column)
    }

    pub fn into_table(self) -> NormalizedTable {
        self.table
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Why a record carries the reference value it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    Compared,
    DateMissingInReference,
    EmployeeNotInReference,
}

/// One employee on one date, as seen by both sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRecord {
    pub employee_id: String,
    pub employee_name: String,
    pub date: String,
    pub submitted: String,
    pub reference: String,
    pub mismatch: bool,
    pub basis: Basis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_table_pads_and_truncates_rows() {
        let table = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::text("x")], vec![CellValue::Number(1.0), CellValue::Empty, CellValue::text("z")]],
        );
        assert!(table.rows().iter().all(|r| r.len() == 2));
        assert_eq!(table.rows()[0][1], CellValue::Empty);
    }

    #[test]
    fn cell_string_forms() {
        assert_eq!(CellValue::Empty.to_stored(), "nan");
        assert_eq!(CellValue::Empty.to_display(), "");
        assert_eq!(CellValue::Number(8.0).to_stored(), "8");
        assert_eq!(CellValue::Number(7.5).to_stored(), "7.5");
        let dt = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(CellValue::Date(dt).to_stored(), "2024-01-05");
        assert_eq!(CellValue::text(""), CellValue::Empty);
    }

    #[test]
    fn status_key_forms() {
        let key = StatusKey::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(key.column_name(), "2024-01-05");
        assert_eq!(key.display_date(), "05-Jan-24");
        let label = StatusKey::Label("Status (bad)".into());
        assert_eq!(label.display_date(), "Status (bad)");
    }

    #[test]
    fn missing_forms() {
        assert!(is_missing("nan"));
        assert!(is_missing(""));
        assert!(!is_missing("NaN "));
        assert!(!is_missing("P"));
    }
}

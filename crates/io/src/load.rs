use std::path::{Path, PathBuf};

use rollcall_recon::model::{ColumnLabel, RawTable};
use tracing::{debug, info};

use crate::error::LoadError;

/// File extensions `load` understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Backend export extensions, in discovery priority order.
pub const BACKEND_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "csv", "xlsb"];

/// Which worksheet of a workbook to read. Ignored for CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Named(String),
    First,
    /// The named sheet if present, otherwise the first one.
    NamedOrFirst(String),
}

impl SheetSelector {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn named_or_first(name: impl Into<String>) -> Self {
        Self::NamedOrFirst(name.into())
    }
}

/// Load a CSV or spreadsheet file into a raw table.
pub fn load(path: &Path, sheet: &SheetSelector) -> Result<RawTable, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    }

    std::fs::metadata(path).map_err(|e| LoadError::from_io(path, e))?;

    let table = match extension.as_str() {
        "csv" => crate::csv::load(path)?,
        _ => crate::xlsx::load(path, sheet)?,
    };

    info!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.width(),
        "table loaded"
    );
    Ok(table)
}

/// Find the backend export `<dir>/<stem>.<ext>`, trying [`BACKEND_EXTENSIONS`] in order.
pub fn discover_backend(dir: &Path, stem: &str) -> Result<PathBuf, LoadError> {
    for ext in BACKEND_EXTENSIONS {
        let candidate = dir.join(format!("{stem}.{ext}"));
        debug!(candidate = %candidate.display(), "probing backend export");
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(LoadError::NoBackend {
        dir: dir.to_path_buf(),
        stem: stem.to_string(),
    })
}

/// Header labels with blank cells named `Column N` (1-based) and text trimmed.
pub(crate) fn header_labels(labels: impl IntoIterator<Item = ColumnLabel>) -> Vec<ColumnLabel> {
    labels
        .into_iter()
        .enumerate()
        .map(|(i, label)| match label {
            ColumnLabel::Text(s) if s.trim().is_empty() => ColumnLabel::Text(format!("Column {}", i + 1)),
            ColumnLabel::Text(s) => ColumnLabel::Text(s.trim().to_string()),
            other => other,
        })
        .collect()
}

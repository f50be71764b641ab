use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a file into a raw table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file format '{extension}' for {path} (expected one of: {})", crate::load::SUPPORTED_EXTENSIONS.join(", "))]
    UnsupportedFormat { path: PathBuf, extension: String },
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("no backend export '{stem}' in {dir} (tried: {})", crate::load::BACKEND_EXTENSIONS.join(", "))]
    NoBackend { dir: PathBuf, stem: String },
    #[error("cannot read {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sheet '{sheet}' not found in {path} (sheets: {})", .available.join(", "))]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl LoadError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::Access { path, source },
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Failure to write a discrepancy report.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("unsupported report format for {0} (expected .xlsx, .csv or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

impl WriteError {
    pub(crate) fn encode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Encode {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = LoadError::from_io("a.csv", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(err, LoadError::NotFound(_)));

        let err = LoadError::from_io("a.csv", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(err, LoadError::Access { .. }));
    }

    #[test]
    fn sheet_not_found_lists_sheets() {
        let err = LoadError::SheetNotFound {
            path: "book.xlsx".into(),
            sheet: "Attn".into(),
            available: vec!["Sheet1".into(), "Summary".into()],
        };
        assert_eq!(err.to_string(), "sheet 'Attn' not found in book.xlsx (sheets: Sheet1, Summary)");
    }
}

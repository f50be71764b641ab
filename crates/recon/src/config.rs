use serde::Deserialize;

use crate::engine::RunOptions;
use crate::error::ReconError;
use crate::index::DuplicatePolicy;
use crate::normalize::NormalizeOptions;

/// Default report file name.
pub const DEFAULT_REPORT: &str = "attendance_discrepancy_report.xlsx";

/// Report formats the writer understands, by file extension.
pub const REPORT_EXTENSIONS: &[&str] = &["xlsx", "csv", "json"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "attendance".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            backend: BackendConfig::default(),
            submission: SubmissionConfig::default(),
            columns: ColumnConfig::default(),
            policy: PolicyConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where the backend export lives.
///
/// `file` wins when set; otherwise the first `<dir>/<stem>.<ext>` that exists
/// is used, trying xlsx, xlsm, xls, csv, xlsb in that order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub file: Option<String>,
    pub dir: String,
    pub stem: String,
    pub sheet: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            file: None,
            dir: "backend".into(),
            stem: "Qandle".into(),
            sheet: "Qandle".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubmissionConfig {
    pub sheet: String,
    /// Read the first sheet when `sheet` is absent from the workbook.
    pub fallback_to_first: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            sheet: "Attn".into(),
            fallback_to_first: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Columns + policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnConfig {
    /// Identity column for either sheet when it has no `Employee Code` header.
    pub identity: Option<String>,
    /// Backend-only identity column; takes precedence over `identity`.
    pub backend_identity: Option<String>,
    /// Submission-only identity column; takes precedence over `identity`.
    pub submission_identity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub on_duplicate: DuplicatePolicy,
    pub positional_fallback: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub report: String,
    pub json: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report: DEFAULT_REPORT.into(),
            json: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.backend.file.is_none() && (self.backend.dir.trim().is_empty() || self.backend.stem.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "backend needs either `file` or both `dir` and `stem`".into(),
            ));
        }

        if self.backend.sheet.trim().is_empty() {
            return Err(ReconError::ConfigValidation("backend sheet name is empty".into()));
        }

        if self.submission.sheet.trim().is_empty() {
            return Err(ReconError::ConfigValidation("submission sheet name is empty".into()));
        }

        let identities = [
            ("identity", &self.columns.identity),
            ("backend_identity", &self.columns.backend_identity),
            ("submission_identity", &self.columns.submission_identity),
        ];
        for (key, value) in identities {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!("columns.{key} is empty")));
            }
        }

        let extension = std::path::Path::new(&self.output.report)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension {
            Some(ext) if REPORT_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(ReconError::ConfigValidation(format!(
                    "output.report '{}' must end in one of: {}",
                    self.output.report,
                    REPORT_EXTENSIONS.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Engine options derived from this config.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            normalize: NormalizeOptions {
                positional_fallback: self.policy.positional_fallback,
            },
            reference_identity: self.columns.backend_identity.clone().or_else(|| self.columns.identity.clone()),
            submission_identity: self.columns.submission_identity.clone().or_else(|| self.columns.identity.clone()),
            on_duplicate: self.policy.on_duplicate,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

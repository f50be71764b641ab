//! `rollcall batch` — many submissions against one backend export.
//!
//! The backend is loaded once; each submission then runs independently on
//! the rayon pool. A failing file is reported and never stops its siblings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rollcall_recon::engine::{self, RunOptions};
use rollcall_recon::model::RawTable;
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::exit_codes::{EXIT_BATCH_PARTIAL, EXIT_IO, EXIT_MISMATCHES};
use crate::run::{load_backend, load_submission};
use crate::settings::{ReconArgs, Settings};
use crate::{CliError, ReportFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Clean,
    Mismatches,
    NoData,
    Failed,
}

/// Outcome of one submission in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file: String,
    pub status: FileStatus,
    pub records: usize,
    pub mismatches: usize,
    pub report: Option<String>,
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: u8,
}

pub fn cmd_batch(
    submissions: Vec<PathBuf>,
    args: ReconArgs,
    out_dir: PathBuf,
    format: ReportFormat,
    json_output: bool,
) -> Result<(), CliError> {
    check_unique_stems(&submissions)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply(&args);

    let backend_path = settings.backend_path(args.backend.as_deref())?;
    let reference = load_backend(&settings, &backend_path)?;
    let options = settings.config.run_options();

    std::fs::create_dir_all(&out_dir)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot create {}: {e}", out_dir.display())))?;

    let _span = info_span!("batch", files = submissions.len()).entered();
    let outcomes: Vec<FileOutcome> = submissions
        .par_iter()
        .map(|path| {
            let report_path = report_path_for(path, &out_dir, format);
            match run_one(&settings, &reference, path, &report_path, &options) {
                Ok(outcome) => outcome,
                Err(err) => FileOutcome {
                    file: path.display().to_string(),
                    status: FileStatus::Failed,
                    records: 0,
                    mismatches: 0,
                    report: None,
                    error: Some(err.message),
                    exit_code: err.code,
                },
            }
        })
        .collect();

    for outcome in &outcomes {
        match outcome.status {
            FileStatus::Failed => eprintln!(
                "  {}: error: {}",
                outcome.file,
                outcome.error.as_deref().unwrap_or_default()
            ),
            FileStatus::NoData => eprintln!("  {}: no data to report", outcome.file),
            FileStatus::Clean | FileStatus::Mismatches => eprintln!(
                "  {}: {} records, {} mismatches -> {}",
                outcome.file,
                outcome.records,
                outcome.mismatches,
                outcome.report.as_deref().unwrap_or_default()
            ),
        }
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&outcomes)
            .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    let failed = outcomes.iter().filter(|o| o.status == FileStatus::Failed).count();
    let mismatched = outcomes.iter().filter(|o| o.status == FileStatus::Mismatches).count();
    eprintln!(
        "batch: {} file(s), {} with mismatches, {} failed",
        outcomes.len(),
        mismatched,
        failed
    );
    info!(files = outcomes.len(), mismatched, failed, "batch complete");

    match batch_exit_code(&outcomes) {
        EXIT_BATCH_PARTIAL => Err(CliError::new(EXIT_BATCH_PARTIAL, format!("{failed} submission(s) failed"))),
        EXIT_MISMATCHES => Err(CliError::new(EXIT_MISMATCHES, "mismatches found")),
        _ => Ok(()),
    }
}

fn run_one(
    settings: &Settings,
    reference: &RawTable,
    path: &Path,
    report_path: &Path,
    options: &RunOptions,
) -> Result<FileOutcome, CliError> {
    let _span = info_span!("submission", file = %path.display()).entered();

    let submission = load_submission(settings, path)?;
    let outcome = engine::run(reference.clone(), submission, options)?;
    for warning in &outcome.submission.warnings {
        warn!(file = %path.display(), "{warning}");
    }

    let file = path.display().to_string();
    let Some(report) = outcome.report else {
        return Ok(FileOutcome {
            file,
            status: FileStatus::NoData,
            records: 0,
            mismatches: 0,
            report: None,
            error: None,
            exit_code: 0,
        });
    };

    rollcall_io::write_report(&report, report_path)?;
    let (status, exit_code) = if report.has_mismatches() {
        (FileStatus::Mismatches, EXIT_MISMATCHES)
    } else {
        (FileStatus::Clean, 0)
    };
    Ok(FileOutcome {
        file,
        status,
        records: report.summary.total,
        mismatches: report.summary.mismatches,
        report: Some(report_path.display().to_string()),
        error: None,
        exit_code,
    })
}

/// `<out_dir>/<submission-stem>.discrepancy.<ext>`
fn report_path_for(submission: &Path, out_dir: &Path, format: ReportFormat) -> PathBuf {
    let stem = submission
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "submission".into());
    out_dir.join(format!("{stem}.discrepancy.{}", format.extension()))
}

/// Two submissions with the same stem would overwrite each other's report.
fn check_unique_stems(submissions: &[PathBuf]) -> Result<(), CliError> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for path in submissions {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if let Some(previous) = seen.insert(stem, path) {
            return Err(CliError::usage(format!(
                "{} and {} would write the same report",
                previous.display(),
                path.display()
            ))
            .with_hint("rename one of them or run them in separate batches"));
        }
    }
    Ok(())
}

/// Worst outcome wins: any failure, then any mismatch, then success.
fn batch_exit_code(outcomes: &[FileOutcome]) -> u8 {
    if outcomes.iter().any(|o| o.status == FileStatus::Failed) {
        EXIT_BATCH_PARTIAL
    } else if outcomes.iter().any(|o| o.exit_code == EXIT_MISMATCHES) {
        EXIT_MISMATCHES
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_USAGE;

    fn outcome(status: FileStatus, exit_code: u8) -> FileOutcome {
        FileOutcome {
            file: "a.xlsx".into(),
            status,
            records: 0,
            mismatches: 0,
            report: None,
            error: None,
            exit_code,
        }
    }

    #[test]
    fn report_names_follow_submission_stem() {
        let path = report_path_for(Path::new("in/March Attn.xlsx"), Path::new("out"), ReportFormat::Csv);
        assert_eq!(path, Path::new("out/March Attn.discrepancy.csv"));
    }

    #[test]
    fn same_stem_is_a_usage_error() {
        let err = check_unique_stems(&[PathBuf::from("a/attn.xlsx"), PathBuf::from("b/ATTN.csv")]).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert!(check_unique_stems(&[PathBuf::from("a.xlsx"), PathBuf::from("b.xlsx")]).is_ok());
    }

    #[test]
    fn worst_outcome_sets_exit_code() {
        assert_eq!(batch_exit_code(&[outcome(FileStatus::Clean, 0), outcome(FileStatus::NoData, 0)]), 0);
        assert_eq!(
            batch_exit_code(&[outcome(FileStatus::Clean, 0), outcome(FileStatus::Mismatches, EXIT_MISMATCHES)]),
            EXIT_MISMATCHES
        );
        assert_eq!(
            batch_exit_code(&[outcome(FileStatus::Mismatches, EXIT_MISMATCHES), outcome(FileStatus::Failed, EXIT_IO)]),
            EXIT_BATCH_PARTIAL
        );
    }
}

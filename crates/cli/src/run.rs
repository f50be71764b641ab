//! `rollcall run` — one submission against the backend export.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use rollcall_io::SheetSelector;
use rollcall_recon::engine::{self, RunOptions, RunOutcome, TableSummary};
use rollcall_recon::model::RawTable;
use rollcall_recon::ReconError;
use tracing::info;

use crate::exit_codes::{EXIT_IO, EXIT_MISMATCHES};
use crate::settings::{ReconArgs, Settings};
use crate::CliError;

pub fn cmd_run(
    submission: PathBuf,
    args: ReconArgs,
    out: Option<PathBuf>,
    json_output: bool,
    prompt_id_column: bool,
) -> Result<(), CliError> {
    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply(&args);

    let backend_path = settings.backend_path(args.backend.as_deref())?;
    let reference = load_backend(&settings, &backend_path)?;
    let submitted = load_submission(&settings, &submission)?;

    let mut options = settings.config.run_options();
    let outcome = if prompt_id_column {
        run_with_prompt(reference, submitted, &mut options, &mut io::stdin().lock())?
    } else {
        engine::run(reference, submitted, &options)?
    };

    print_table_summary(&outcome.reference, &backend_path);
    print_table_summary(&outcome.submission, &submission);

    let report_path = match &outcome.report {
        Some(report) => {
            let path = out.unwrap_or_else(|| settings.resolve(&settings.config.output.report));
            rollcall_io::write_report(report, &path)?;
            if let Some(json_path) = &settings.config.output.json {
                rollcall_io::write_report(report, &settings.resolve(json_path))?;
            }
            eprintln!("wrote {}", path.display());
            Some(path)
        }
        None => {
            eprintln!("no data to report: the submission has no employees or no status columns");
            None
        }
    };

    if json_output {
        let mut value = serde_json::to_value(&outcome)
            .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;
        value["report_path"] = serde_json::json!(report_path.as_ref().map(|p| p.display().to_string()));
        let json_str = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    match &outcome.report {
        Some(report) => {
            let s = &report.summary;
            eprintln!(
                "{} records for {} employees: {} mismatches ({} employees not in backend, {} dates not in backend)",
                s.total, s.employees, s.mismatches, s.employees_not_in_reference, s.dates_not_in_reference,
            );
            if report.has_mismatches() {
                return Err(CliError::new(EXIT_MISMATCHES, "mismatches found"));
            }
            Ok(())
        }
        None => Ok(()),
    }
}

/// Load the backend export from its configured sheet.
pub fn load_backend(settings: &Settings, path: &Path) -> Result<RawTable, CliError> {
    let sheet = SheetSelector::named(settings.config.backend.sheet.clone());
    Ok(rollcall_io::load(path, &sheet)?)
}

/// Load a submitted sheet, falling back to the first sheet when configured.
pub fn load_submission(settings: &Settings, path: &Path) -> Result<RawTable, CliError> {
    let submission = &settings.config.submission;
    let sheet = if submission.fallback_to_first {
        SheetSelector::named_or_first(submission.sheet.clone())
    } else {
        SheetSelector::named(submission.sheet.clone())
    };
    Ok(rollcall_io::load(path, &sheet)?)
}

/// Run, asking for an identity column on each schema failure. The answer
/// is kept for the side that failed, so the backend and the submission can
/// each use their own column.
///
/// An empty answer (or end of input) gives up with the schema error.
fn run_with_prompt(
    reference: RawTable,
    submission: RawTable,
    options: &mut RunOptions,
    input: &mut impl BufRead,
) -> Result<RunOutcome, CliError> {
    loop {
        let err = match engine::run(reference.clone(), submission.clone(), options) {
            Ok(outcome) => return Ok(outcome),
            Err(err) => err,
        };

        let (side, found) = match (&err, err.root()) {
            (ReconError::InTable { side, .. }, ReconError::Schema { found, .. }) => (*side, found.clone()),
            _ => return Err(err.into()),
        };

        eprintln!("{side} table has no recognizable employee code column. Columns found:");
        for (i, name) in found.iter().enumerate() {
            eprintln!("  {:>2}. {name}", i + 1);
        }
        let column = loop {
            eprint!("identity column (number or name, empty to abort): ");
            io::stderr().flush().ok();

            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .map_err(|e| CliError::new(EXIT_IO, format!("cannot read answer: {e}")))?;
            let answer = line.trim();
            if read == 0 || answer.is_empty() {
                return Err(CliError::from(err).with_hint("no identity column chosen"));
            }
            match pick_column(answer, &found) {
                Some(column) => break column,
                None => eprintln!("no column '{answer}'"),
            }
        };
        info!(%side, column = %column, "identity column chosen interactively");
        options.set_identity(side, column);
    }
}

/// Resolve an answer to a column name: a 1-based number or a listed name.
fn pick_column(answer: &str, found: &[String]) -> Option<String> {
    if answer.is_empty() {
        return None;
    }
    if let Ok(n) = answer.parse::<usize>() {
        return found.get(n.checked_sub(1)?).cloned();
    }
    found.iter().find(|name| name.eq_ignore_ascii_case(answer)).cloned()
}

pub fn print_table_summary(summary: &TableSummary, path: &Path) {
    eprintln!(
        "{}: {} ({} rows, {} status columns)",
        summary.side,
        path.display(),
        summary.rows,
        summary.status_columns,
    );
    for warning in &summary.warnings {
        eprintln!("  warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_SCHEMA;
    use rollcall_recon::model::{CellValue, ColumnLabel};

    fn table(header: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            header.iter().map(|h| ColumnLabel::from(*h)).collect(),
            rows.iter().map(|r| r.iter().map(|c| CellValue::text(*c)).collect()).collect(),
        )
    }

    #[test]
    fn pick_column_by_number_or_name() {
        let found = vec!["Staff No".to_string(), "Employee Name".to_string()];
        assert_eq!(pick_column("1", &found).as_deref(), Some("Staff No"));
        assert_eq!(pick_column("staff no", &found).as_deref(), Some("Staff No"));
        assert_eq!(pick_column("0", &found), None);
        assert_eq!(pick_column("3", &found), None);
        assert_eq!(pick_column("", &found), None);
    }

    #[test]
    fn prompt_retries_with_chosen_column() {
        let reference = table(&["Staff No", "Name", "05-01-2024"], &[&["E1", "Asha", "P"]]);
        let submission = table(&["Staff No", "Name", "05-01-2024"], &[&["E1", "Asha", "A"]]);
        let mut options = RunOptions::default();
        let mut input = io::Cursor::new("nope\n1\n1\n");

        let outcome = run_with_prompt(reference, submission, &mut options, &mut input).unwrap();
        assert_eq!(options.reference_identity.as_deref(), Some("Staff No"));
        assert_eq!(options.submission_identity.as_deref(), Some("Staff No"));
        assert_eq!(outcome.report.unwrap().summary.mismatches, 1);
    }

    #[test]
    fn prompt_keeps_one_answer_per_side() {
        let reference = table(&["Staff No", "Name", "05-01-2024"], &[&["E1", "Asha", "P"]]);
        let submission = table(&["Emp ID", "Name", "05-01-2024"], &[&["E1", "Asha", "P"]]);
        let mut options = RunOptions::default();
        let mut input = io::Cursor::new("Staff No\nEmp ID\n");

        let outcome = run_with_prompt(reference, submission, &mut options, &mut input).unwrap();
        assert_eq!(options.reference_identity.as_deref(), Some("Staff No"));
        assert_eq!(options.submission_identity.as_deref(), Some("Emp ID"));
        assert_eq!(outcome.report.unwrap().summary.mismatches, 0);
    }

    #[test]
    fn prompt_gives_up_on_empty_answer() {
        let reference = table(&["Staff No", "Name", "05-01-2024"], &[&["E1", "Asha", "P"]]);
        let mut input = io::Cursor::new("\n");

        let err = run_with_prompt(reference.clone(), reference, &mut RunOptions::default(), &mut input).unwrap_err();
        assert_eq!(err.code, EXIT_SCHEMA);
        assert!(err.message.contains("identity column 'Employee Code' not found"));
    }
}

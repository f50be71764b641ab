use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::error::ReconError;
use crate::index::{index, DuplicatePolicy};
use crate::model::{
    is_missing, Basis, ComparisonRecord, IndexedTable, RawTable, Side, StatusKey, DATE_NOT_IN_REFERENCE,
    EMPLOYEE_NOT_IN_REFERENCE,
};
use crate::normalize::{normalize, NormalizeOptions, NormalizeWarning};
use crate::report::{assemble_report, DiscrepancyReport};

/// Compare a submission against the reference, one record per submitted
/// employee per submitted status column.
///
/// The scan is driven by the submission: reference-only employees produce
/// nothing. Missing reference data becomes a sentinel value in the record,
/// never an error.
pub fn reconcile(reference: &IndexedTable, submission: &IndexedTable) -> Result<Vec<ComparisonRecord>, ReconError> {
    reference
        .table()
        .display_position()
        .ok_or(ReconError::MissingDisplayColumn { side: Side::Reference })?;
    let name_column = submission
        .table()
        .display_position()
        .ok_or(ReconError::MissingDisplayColumn { side: Side::Submission })?;

    let status_columns: Vec<(usize, &StatusKey)> = submission.status_columns().collect();
    let reference_columns: HashMap<&StatusKey, usize> =
        reference.status_columns().map(|(i, key)| (key, i)).collect();

    let sub = submission.table();
    let mut records = Vec::with_capacity(submission.len() * status_columns.len());

    for (key, row) in submission.entries() {
        let employee_name = sub.column(name_column).display(*row);
        let reference_row = reference.row_of(key);

        for (column, status) in &status_columns {
            let submitted = sub.column(*column).stored(*row);
            let date = status.display_date();

            let record = match reference_row {
                Some(ref_row) => {
                    let (reference_value, basis) = match reference_columns.get(status) {
                        Some(&ref_column) => {
                            (reference.table().column(ref_column).stored(ref_row).into_owned(), Basis::Compared)
                        }
                        None => (DATE_NOT_IN_REFERENCE.to_string(), Basis::DateMissingInReference),
                    };
                    let submitted = shown(&submitted);
                    let reference_value = shown(&reference_value);
                    ComparisonRecord {
                        employee_id: key.clone(),
                        employee_name: employee_name.clone(),
                        date,
                        mismatch: submitted != reference_value,
                        submitted,
                        reference: reference_value,
                        basis,
                    }
                }
                None => ComparisonRecord {
                    employee_id: key.clone(),
                    employee_name: employee_name.clone(),
                    date,
                    submitted: shown(&submitted),
                    reference: EMPLOYEE_NOT_IN_REFERENCE.to_string(),
                    mismatch: true,
                    basis: Basis::EmployeeNotInReference,
                },
            };
            records.push(record);
        }
    }

    debug!(
        records = records.len(),
        mismatches = records.iter().filter(|r| r.mismatch).count(),
        "reconciled"
    );
    Ok(records)
}

/// Empty values display as `""`; anything else as stored.
fn shown(value: &str) -> String {
    if is_missing(value) {
        String::new()
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Single run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub normalize: NormalizeOptions,
    /// Identity column for the backend export when it lacks `Employee Code`.
    pub reference_identity: Option<String>,
    /// Identity column for the submission when it lacks `Employee Code`.
    pub submission_identity: Option<String>,
    pub on_duplicate: DuplicatePolicy,
}

impl RunOptions {
    pub fn identity_for(&self, side: Side) -> Option<&str> {
        match side {
            Side::Reference => self.reference_identity.as_deref(),
            Side::Submission => self.submission_identity.as_deref(),
        }
    }

    pub fn set_identity(&mut self, side: Side, column: impl Into<String>) {
        let column = Some(column.into());
        match side {
            Side::Reference => self.reference_identity = column,
            Side::Submission => self.submission_identity = column,
        }
    }
}

/// Normalization outcome for one side, kept for display.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub side: Side,
    pub rows: usize,
    pub columns: Vec<String>,
    pub status_columns: usize,
    pub warnings: Vec<NormalizeWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub reference: TableSummary,
    pub submission: TableSummary,
    /// `None` when the submission produced no records.
    pub report: Option<DiscrepancyReport>,
}

/// Normalize and index one side of a run.
pub fn prepare(raw: RawTable, side: Side, options: &RunOptions) -> Result<(IndexedTable, TableSummary), ReconError> {
    let normalized = normalize(raw, &options.normalize);
    let columns = normalized.table.column_names();

    let identity = options
        .identity_for(side)
        .filter(|_| normalized.table.identity_position().is_none());
    let indexed = index(normalized.table, identity, options.on_duplicate).map_err(|e| e.in_table(side))?;

    let summary = TableSummary {
        side,
        rows: indexed.len(),
        status_columns: indexed.status_columns().count(),
        columns,
        warnings: normalized.warnings,
    };
    info!(%side, rows = summary.rows, status_columns = summary.status_columns, "table prepared");
    Ok((indexed, summary))
}

/// Normalize, index and reconcile both tables, then assemble the report.
pub fn run(reference: RawTable, submission: RawTable, options: &RunOptions) -> Result<RunOutcome, ReconError> {
    let _span = info_span!("recon").entered();

    let (reference_index, reference_summary) = prepare(reference, Side::Reference, options)?;
    let (submission_index, submission_summary) = prepare(submission, Side::Submission, options)?;

    let records = reconcile(&reference_index, &submission_index)?;
    let report = assemble_report(records);

    match &report {
        Some(r) => info!(records = r.summary.total, mismatches = r.summary.mismatches, "reconciliation complete"),
        None => info!("no data to report"),
    }

    Ok(RunOutcome {
        reference: reference_summary,
        submission: submission_summary,
        report,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, ColumnLabel};

    fn raw(header: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            header.iter().map(|h| ColumnLabel::from(*h)).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| if *c == "-" { CellValue::Empty } else { CellValue::text(*c) }).collect())
                .collect(),
        )
    }

    fn indexed(table: RawTable) -> IndexedTable {
        prepare(table, Side::Reference, &RunOptions::default()).unwrap().0
    }

    #[test]
    fn value_mismatch() {
        let reference = indexed(raw(&["Employee Code", "Employee Name", "05-01-2024"], &[&["E1", "Asha R", "P"]]));
        let submission = indexed(raw(&["Emp Code", "Name", "Status (05-Jan-24)"], &[&["E1", "Asha", "A"]]));

        let records = reconcile(&reference, &submission).unwrap();
        assert_eq!(
            records,
            vec![ComparisonRecord {
                employee_id: "E1".into(),
                employee_name: "Asha".into(),
                date: "05-Jan-24".into(),
                submitted: "A".into(),
                reference: "P".into(),
                mismatch: true,
                basis: Basis::Compared,
            }]
        );
    }

    #[test]
    fn employee_missing_from_reference() {
        let reference = indexed(raw(&["Code", "Name", "05-01-2024"], &[&["E1", "Asha", "P"]]));
        let submission = indexed(raw(&["Code", "Name", "05-01-2024", "06-01-2024"], &[&["E2", "Ravi", "P", "-"]]));

        let records = reconcile(&reference, &submission).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.mismatch && r.reference == EMPLOYEE_NOT_IN_REFERENCE));
        assert_eq!(records[0].submitted, "P");
        assert_eq!(records[1].submitted, "");
        assert_eq!(records[1].date, "06-Jan-24");
    }

    #[test]
    fn empty_and_equal_values_match() {
        let reference = indexed(raw(&["Code", "Name", "05-01-2024", "06-01-2024"], &[&["E1", "A", "-", "P"]]));
        let submission = indexed(raw(&["Code", "Name", "05-01-2024", "06-01-2024"], &[&["E1", "A", "nan", "P"]]));

        let records = reconcile(&reference, &submission).unwrap();
        assert!(!records[0].mismatch);
        assert_eq!((records[0].submitted.as_str(), records[0].reference.as_str()), ("", ""));
        assert!(!records[1].mismatch);
    }

    #[test]
    fn one_side_empty_is_mismatch() {
        let reference = indexed(raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "P"]]));
        let submission = indexed(raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "-"]]));

        let records = reconcile(&reference, &submission).unwrap();
        assert!(records[0].mismatch);
        assert_eq!(records[0].submitted, "");
        assert_eq!(records[0].reference, "P");
    }

    #[test]
    fn date_missing_in_reference() {
        let reference = indexed(raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "P"]]));
        let submission = indexed(raw(&["Code", "Name", "07-01-2024"], &[&["E1", "A", "-"]]));

        let records = reconcile(&reference, &submission).unwrap();
        assert_eq!(records[0].reference, DATE_NOT_IN_REFERENCE);
        assert_eq!(records[0].basis, Basis::DateMissingInReference);
        assert!(records[0].mismatch);
    }

    #[test]
    fn reference_only_employees_ignored() {
        let reference = indexed(raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "P"], &["E9", "Z", "P"]]));
        let submission = indexed(raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "P"]]));

        let records = reconcile(&reference, &submission).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.employee_id == "E1"));
    }

    #[test]
    fn unparsed_status_column_keeps_label() {
        let reference = indexed(raw(&["Code", "Name", "Status (bad)"], &[&["E1", "A", "P"]]));
        let submission = indexed(raw(&["Code", "Name", "Status (bad)", "Remarks"], &[&["E1", "A", "P", "late"]]));

        let records = reconcile(&reference, &submission).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "Status (bad)");
        assert!(!records[0].mismatch);
    }

    #[test]
    fn missing_display_column_fails() {
        let reference = indexed(raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "P"]]));
        let submission = indexed(raw(&["Code", "05-01-2024"], &[&["E1", "P"]]));

        let err = reconcile(&reference, &submission).unwrap_err();
        assert!(matches!(err, ReconError::MissingDisplayColumn { side: Side::Submission }));
    }

    #[test]
    fn run_attributes_schema_errors_to_side() {
        let reference = raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "P"]]);
        let submission = raw(&["Staff", "Name", "05-01-2024"], &[&["E1", "A", "P"]]);

        let err = run(reference, submission, &RunOptions::default()).unwrap_err();
        match err {
            ReconError::InTable { side, source } => {
                assert_eq!(side, Side::Submission);
                assert!(matches!(*source, ReconError::Schema { .. }));
            }
            other => panic!("expected InTable, got {other:?}"),
        }
    }

    #[test]
    fn run_with_identity_override() {
        let reference = raw(&["Code", "Name", "05-01-2024"], &[&["E1", "A", "P"]]);
        let submission = raw(&["Staff", "Name", "05-01-2024"], &[&["E1", "A", "P"]]);
        let options = RunOptions { submission_identity: Some("Staff".into()), ..Default::default() };

        let outcome = run(reference, submission, &options).unwrap();
        let report = outcome.report.unwrap();
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.mismatches, 0);
    }

    #[test]
    fn identity_overrides_are_per_side() {
        let reference = raw(&["Staff No", "Name", "05-01-2024"], &[&["E1", "A", "P"]]);
        let submission = raw(&["Emp ID", "Name", "05-01-2024"], &[&["E1", "A", "A"]]);
        let mut options = RunOptions::default();
        options.set_identity(Side::Reference, "Staff No");
        options.set_identity(Side::Submission, "Emp ID");

        let report = run(reference.clone(), submission.clone(), &options).unwrap().report.unwrap();
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.mismatches, 1);

        // One side's override never stands in for the other's.
        options.reference_identity = None;
        let err = run(reference, submission, &options).unwrap_err();
        assert!(matches!(err, ReconError::InTable { side: Side::Reference, .. }));
    }

    #[test]
    fn run_without_status_columns_has_no_report() {
        let reference = raw(&["Code", "Name"], &[&["E1", "A"]]);
        let submission = raw(&["Code", "Name"], &[&["E1", "A"]]);

        let outcome = run(reference, submission, &RunOptions::default()).unwrap();
        assert!(outcome.report.is_none());
        assert_eq!(outcome.submission.rows, 1);
    }
}

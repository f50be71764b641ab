use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Basis, ComparisonRecord};

/// Column headers of the discrepancy report, in order.
pub const REPORT_COLUMNS: [&str; 6] = ["Emp ID", "Emp Name", "Date", "Submitted", "Reference", "Mismatch"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub mismatches: usize,
    pub employees: usize,
    pub employees_not_in_reference: usize,
    pub dates_not_in_reference: usize,
}

/// The tabular discrepancy artifact for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscrepancyReport {
    pub summary: ReportSummary,
    pub records: Vec<ComparisonRecord>,
}

impl DiscrepancyReport {
    /// Report rows in record order, as the six report columns.
    pub fn rows(&self) -> impl Iterator<Item = [&str; 6]> {
        self.records.iter().map(|r| {
            [
                r.employee_id.as_str(),
                r.employee_name.as_str(),
                r.date.as_str(),
                r.submitted.as_str(),
                r.reference.as_str(),
                mismatch_label(r.mismatch),
            ]
        })
    }

    pub fn has_mismatches(&self) -> bool {
        self.summary.mismatches > 0
    }
}

pub fn mismatch_label(mismatch: bool) -> &'static str {
    if mismatch {
        "Yes"
    } else {
        "No"
    }
}

/// Build the report from reconciled records. Empty input has no report.
pub fn assemble_report(records: Vec<ComparisonRecord>) -> Option<DiscrepancyReport> {
    if records.is_empty() {
        return None;
    }

    let mut employees = BTreeSet::new();
    let mut missing_employees = BTreeSet::new();
    let mut missing_dates = BTreeSet::new();
    for r in &records {
        employees.insert(r.employee_id.as_str());
        match r.basis {
            Basis::EmployeeNotInReference => {
                missing_employees.insert(r.employee_id.as_str());
            }
            Basis::DateMissingInReference => {
                missing_dates.insert(r.date.as_str());
            }
            Basis::Compared => {}
        }
    }

    let summary = ReportSummary {
        total: records.len(),
        mismatches: records.iter().filter(|r| r.mismatch).count(),
        employees: employees.len(),
        employees_not_in_reference: missing_employees.len(),
        dates_not_in_reference: missing_dates.len(),
    };

    Some(DiscrepancyReport { summary, records })
}

// Discrepancy report export (xlsx, csv, json)

use std::io::Write;
use std::path::Path;

use rollcall_recon::report::{DiscrepancyReport, REPORT_COLUMNS};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook};
use tracing::info;

use crate::error::WriteError;

/// Worksheet name used for xlsx reports.
pub const REPORT_SHEET: &str = "Discrepancies";

/// Write `report` to `path`, choosing the format from the extension.
pub fn write_report(report: &DiscrepancyReport, path: &Path) -> Result<(), WriteError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let write: fn(&DiscrepancyReport, &Path) -> Result<(), WriteError> = match extension.as_deref() {
        Some("xlsx") => write_xlsx,
        Some("csv") => write_csv,
        Some("json") => write_json,
        _ => return Err(WriteError::UnsupportedFormat(path.to_path_buf())),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| WriteError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    write(report, path)?;

    info!(path = %path.display(), records = report.summary.total, "report written");
    Ok(())
}

fn write_xlsx(report: &DiscrepancyReport, path: &Path) -> Result<(), WriteError> {
    let err = |e: rust_xlsxwriter::XlsxError| WriteError::encode(path, e);

    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet().set_name(REPORT_SHEET).map_err(err)?;

    let header_format = Format::new().set_bold();
    let flagged = Format::new().set_bold().set_font_color(Color::Red);

    let mut widths: Vec<usize> = REPORT_COLUMNS.iter().map(|h| h.len()).collect();
    for (col, title) in REPORT_COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *title, &header_format)
            .map_err(err)?;
    }

    for (i, row) in report.rows().enumerate() {
        let row_idx = (i + 1) as u32;
        let mismatch = report.records[i].mismatch;
        for (col, value) in row.iter().enumerate() {
            widths[col] = widths[col].max(value.chars().count());
            if value.is_empty() {
                continue;
            }
            if mismatch && col == REPORT_COLUMNS.len() - 1 {
                worksheet
                    .write_string_with_format(row_idx, col as u16, *value, &flagged)
                    .map_err(err)?;
            } else {
                worksheet.write_string(row_idx, col as u16, *value).map_err(err)?;
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, (*width).min(60) as f64 + 2.0)
            .map_err(err)?;
    }
    worksheet.set_freeze_panes(1, 0).map_err(err)?;
    worksheet
        .autofilter(0, 0, report.records.len() as u32, (REPORT_COLUMNS.len() - 1) as u16)
        .map_err(err)?;

    workbook.save(path).map_err(err)
}

fn write_csv(report: &DiscrepancyReport, path: &Path) -> Result<(), WriteError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| WriteError::encode(path, e))?;
    writer
        .write_record(REPORT_COLUMNS)
        .map_err(|e| WriteError::encode(path, e))?;
    for row in report.rows() {
        writer.write_record(row).map_err(|e| WriteError::encode(path, e))?;
    }
    writer.flush().map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json(report: &DiscrepancyReport, path: &Path) -> Result<(), WriteError> {
    let file = std::fs::File::create(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|e| WriteError::encode(path, e))?;
    writer.flush().map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// Workbook loading (xlsx, xlsm, xls, xlsb, ods) via calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use rollcall_recon::model::{CellValue, ColumnLabel, RawTable};
use tracing::{debug, info};

use crate::error::LoadError;
use crate::load::{header_labels, SheetSelector};

pub fn load(path: &Path, selector: &SheetSelector) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| match e {
        calamine::Error::Io(io) => LoadError::from_io(path, io),
        other => LoadError::parse(path, other),
    })?;

    let sheet_names = workbook.sheet_names();
    let sheet = pick_sheet(&sheet_names, selector).ok_or_else(|| LoadError::SheetNotFound {
        path: path.to_path_buf(),
        sheet: match selector {
            SheetSelector::Named(name) | SheetSelector::NamedOrFirst(name) => name.clone(),
            SheetSelector::First => "(first)".into(),
        },
        available: sheet_names.clone(),
    })?;
    debug!(path = %path.display(), sheet = %sheet, "reading sheet");

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| LoadError::parse(path, e))?;

    let mut rows = range
        .rows()
        .filter(|row| !row.iter().all(is_blank));

    let header = match rows.next() {
        Some(cells) => header_labels(cells.iter().map(header_label)),
        None => Vec::new(),
    };
    let body = rows.map(|cells| cells.iter().map(cell_value).collect()).collect();

    Ok(RawTable::new(header, body))
}

/// Resolve the selector against the workbook's sheet names.
fn pick_sheet(names: &[String], selector: &SheetSelector) -> Option<String> {
    match selector {
        SheetSelector::Named(name) => names.iter().find(|n| *n == name).cloned(),
        SheetSelector::First => names.first().cloned(),
        SheetSelector::NamedOrFirst(name) => match names.iter().find(|n| *n == name) {
            Some(found) => Some(found.clone()),
            None => {
                let first = names.first()?;
                info!(wanted = %name, using = %first, "sheet not found, falling back to first sheet");
                Some(first.clone())
            }
        },
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn header_label(cell: &Data) -> ColumnLabel {
    match cell_value(cell) {
        CellValue::Empty => ColumnLabel::Text(String::new()),
        CellValue::Text(s) => ColumnLabel::Text(s),
        CellValue::Number(n) => ColumnLabel::Number(n),
        CellValue::Date(dt) => ColumnLabel::Date(dt),
    }
}

/// Map a calamine cell to a typed value. Error cells read as empty.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if !dt.is_duration() => CellValue::Date(value),
            _ => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s).map(CellValue::Date).unwrap_or_else(|| CellValue::text(s.as_str())),
        Data::DurationIso(s) => CellValue::text(s.as_str()),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime as XlsxDate, Format, Workbook as XlsxWorkbook};
    use tempfile::tempdir;

    /// Two sheets: `Summary` (one cell) and `Attn` (the attendance grid).
    fn write_fixture(path: &Path) {
        let mut workbook = XlsxWorkbook::new();

        let summary = workbook.add_worksheet().set_name("Summary").unwrap();
        summary.write_string(0, 0, "Attendance for January").unwrap();

        let date_format = Format::new().set_num_format("dd-mmm-yy");
        let attn = workbook.add_worksheet().set_name("Attn").unwrap();
        attn.write_string(0, 0, "Emp Code").unwrap();
        // column B header left blank
        attn.write_datetime_with_format(0, 2, XlsxDate::from_ymd(2024, 1, 5).unwrap(), &date_format).unwrap();
        attn.write_string(0, 3, "Status (06-Jan-24)").unwrap();
        attn.write_number(1, 0, 101).unwrap();
        attn.write_string(1, 1, "Asha Rao").unwrap();
        attn.write_string(1, 2, "P").unwrap();
        attn.write_number(2, 0, 102.5).unwrap();
        attn.write_string(2, 3, "A").unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn reads_named_sheet_with_typed_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attn.xlsx");
        write_fixture(&path);

        let table = load(&path, &SheetSelector::named("Attn")).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            table.header(),
            &[
                ColumnLabel::from("Emp Code"),
                ColumnLabel::from("Column 2"),
                ColumnLabel::Date(date),
                ColumnLabel::from("Status (06-Jan-24)"),
            ]
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][0], CellValue::Number(101.0));
        assert_eq!(table.rows()[0][3], CellValue::Empty);
        assert_eq!(table.rows()[1][0], CellValue::Number(102.5));
        assert_eq!(table.rows()[1][1], CellValue::Empty);
    }

    #[test]
    fn named_or_first_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attn.xlsx");
        write_fixture(&path);

        let table = load(&path, &SheetSelector::named_or_first("Qandle")).unwrap();
        assert_eq!(table.header(), &[ColumnLabel::from("Attendance for January")]);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn missing_named_sheet_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attn.xlsx");
        write_fixture(&path);

        match load(&path, &SheetSelector::named("Qandle")).unwrap_err() {
            LoadError::SheetNotFound { sheet, available, .. } => {
                assert_eq!(sheet, "Qandle");
                assert_eq!(available, vec!["Summary", "Attn"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn corrupt_workbook_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();

        assert!(matches!(load(&path, &SheetSelector::First), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn iso_strings_parse_as_dates() {
        assert_eq!(
            parse_iso("2024-01-05"),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_iso("05/01/2024").is_none());
    }
}

// CSV/TSV loading

use std::io::Read;
use std::path::Path;

use rollcall_recon::model::{CellValue, ColumnLabel, RawTable};

use crate::error::LoadError;
use crate::load::header_labels;

pub fn load(path: &Path) -> Result<RawTable, LoadError> {
    let content = read_file_as_utf8(path).map_err(|e| LoadError::from_io(path, e))?;
    let delimiter = sniff_delimiter(&content);
    parse(&content, delimiter).map_err(|e| LoadError::parse(path, e))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines.iter().map(|line| field_count(line, delim)).collect();

        let Some(&target) = counts.first() else {
            break;
        };
        // Must split the header line to be viable
        if target <= 1 {
            continue;
        }

        // Lines agreeing with the header, weighted by field count
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map(|r| r.len())
        .unwrap_or(1)
}

/// Read file and convert to UTF-8 if needed (Excel CSV exports are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Parse CSV text. The first non-blank record is the header; cells stay text.
fn parse(content: &str, delimiter: u8) -> Result<RawTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut header = None;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if header.is_none() {
            header = Some(header_labels(record.iter().map(ColumnLabel::from)));
            continue;
        }
        rows.push(record.iter().map(CellValue::text).collect());
    }

    Ok(RawTable::new(header.unwrap_or_default(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sniffs_semicolons() {
        let content = "Code;Name;05-01-2024\nE1;Asha, R;P\nE2;Ravi;A\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniffs_tabs() {
        assert_eq!(sniff_delimiter("Code\tName\nE1\tAsha\n"), b'\t');
    }

    #[test]
    fn empty_content_defaults_to_comma() {
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn parses_header_and_cells() {
        let table = parse("Emp Code,Emp Name,,Status (05-Jan-24)\nE1,Asha,,P\n\nE2,Ravi\n", b',').unwrap();

        assert_eq!(
            table.header(),
            &[
                ColumnLabel::from("Emp Code"),
                ColumnLabel::from("Emp Name"),
                ColumnLabel::from("Column 3"),
                ColumnLabel::from("Status (05-Jan-24)"),
            ]
        );
        // blank line skipped, short row padded
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][2], CellValue::Empty);
        assert_eq!(table.rows()[1], vec![CellValue::text("E2"), CellValue::text("Ravi"), CellValue::Empty, CellValue::Empty]);
    }

    #[test]
    fn codes_stay_text() {
        let table = parse("Code,Name\n007,Bond\n", b',').unwrap();
        assert_eq!(table.rows()[0][0], CellValue::text("007"));
    }

    #[test]
    fn decodes_windows_1252() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Zoë" in Windows-1252
        fs::write(&path, b"Code,Name\nE1,Zo\xeb\n").unwrap();

        let table = load(&path).unwrap();
        assert_eq!(table.rows()[0][1], CellValue::text("Zoë"));
    }

    #[test]
    fn strips_utf8_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Employee Code,Employee Name\nE1,Asha\n").unwrap();

        let table = load(&path).unwrap();
        assert_eq!(table.header()[0], ColumnLabel::from("Employee Code"));
    }
}

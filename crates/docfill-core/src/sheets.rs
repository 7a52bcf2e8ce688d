//! Cell text from spreadsheets and delimited files.
//!
//! Every sheet is read in row-major order. One row becomes one line with
//! its non-empty cells joined by a tab, so line-oriented matchers see the
//! same shape as a text table.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::debug;

use crate::error::{DocfillError, Result};

/// Largest magnitude printed without a fractional part.
const INTEGRAL_PRINT_LIMIT: f64 = 1e15;

/// Text of a single cell; `None` for empty, boolean, error and date-serial cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => format_float(*f),
        _ => None,
    }
}

/// Finite floats only; integral values print without `.0`.
fn format_float(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < INTEGRAL_PRINT_LIMIT {
        Some(format!("{}", f as i64))
    } else {
        Some(format!("{}", f))
    }
}

fn join_row<I: IntoIterator<Item = String>>(cells: I) -> Option<String> {
    let cells: Vec<String> = cells.into_iter().collect();
    (!cells.is_empty()).then(|| cells.join("\t"))
}

/// All sheets of a workbook, one line per non-empty row.
pub fn spreadsheet_text(path: &Path) -> Result<String> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| DocfillError::Sheet(e.to_string()))?;

    let mut lines = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| DocfillError::Sheet(format!("{}: {}", name, e)))?;
        debug!("Sheet {}: {:?}", name, range.get_size());

        lines.extend(
            range
                .rows()
                .filter_map(|row| join_row(row.iter().filter_map(cell_text))),
        );
    }

    Ok(lines.join("\n"))
}

/// CSV or TSV rows, chosen by extension.
pub fn delimited_text(path: &Path) -> Result<String> {
    let tab = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(if tab { b'\t' } else { b',' })
        .from_path(path)?;

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if let Some(line) = join_row(row) {
            lines.push(line);
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::String("  BT-1001 ".into())), Some("BT-1001".into()));
        assert_eq!(cell_text(&Data::Float(24.0)), Some("24".into()));
        assert_eq!(cell_text(&Data::Float(3.2)), Some("3.2".into()));
        assert_eq!(cell_text(&Data::Int(50)), Some("50".into()));
        assert_eq!(cell_text(&Data::Float(f64::NAN)), None);
        assert_eq!(cell_text(&Data::Bool(true)), None);
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn test_csv_rows_skip_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marks.csv");
        std::fs::write(
            &path,
            "SHIPPING MARK,BT-1001,\nCTNS,50\n,,\nG.W.,\"1,205.50 KGS\"\n",
        )
        .unwrap();

        assert_eq!(
            delimited_text(&path).unwrap(),
            "SHIPPING MARK\tBT-1001\nCTNS\t50\nG.W.\t1,205.50 KGS"
        );
    }

    #[test]
    fn test_tsv_uses_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.tsv");
        std::fs::write(&path, "A,B\tC\n").unwrap();
        assert_eq!(delimited_text(&path).unwrap(), "A,B\tC");
    }

    #[test]
    fn test_unreadable_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(spreadsheet_text(&path), Err(DocfillError::Sheet(_))));
    }
}

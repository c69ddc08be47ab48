//! First-worksheet reader backed by calamine.
//!
//! Every spreadsheet is read as an untyped grid: no header inference, and
//! cell coordinates match the sheet (row 0 is sheet row 1) even when the
//! used range starts further down or right. Only the used range is held.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::conf::N_CELLS_GRID_MAX;
use crate::spec::{EnumCellValue, SpecRawGrid};

/// Errors raised while reading a workbook.
#[derive(Debug, thiserror::Error)]
pub enum XlsxReadError {
    /// File could not be read from disk.
    #[error("Failed to read file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Bytes are not a workbook calamine understands.
    #[error("Invalid spreadsheet: {0}")]
    OpenWorkbook(#[from] calamine::Error),

    /// Workbook contains no worksheet.
    #[error("Workbook has no worksheet")]
    NoWorksheet,

    /// Used range spans more cells than the reader holds in memory.
    #[error("Worksheet used range of {n_rows} x {n_cols} cells exceeds {n_cells_max} cells")]
    GridTooLarge {
        n_rows: usize,
        n_cols: usize,
        n_cells_max: usize,
    },
}

/// Read the first worksheet of the workbook at `path`.
pub fn read_first_sheet(path: &Path) -> Result<SpecRawGrid, XlsxReadError> {
    let v_bytes = fs::read(path).map_err(|source| XlsxReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_first_sheet_from_bytes(&v_bytes)
}

/// Read the first worksheet from in-memory workbook bytes.
pub fn read_first_sheet_from_bytes(v_bytes: &[u8]) -> Result<SpecRawGrid, XlsxReadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(v_bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(XlsxReadError::NoWorksheet)??;

    let (Some((n_row_start, n_col_start)), Some((n_row_end, n_col_end))) =
        (range.start(), range.end())
    else {
        return Ok(SpecRawGrid::default());
    };
    let n_rows = (n_row_end - n_row_start) as usize + 1;
    let n_cols = (n_col_end - n_col_start) as usize + 1;
    validate_cell_budget(n_rows, n_cols)?;

    let l_rows: Vec<Vec<EnumCellValue>> = range
        .rows()
        .map(|row| row.iter().map(convert_calamine_cell).collect())
        .collect();

    Ok(SpecRawGrid::with_origin(
        n_row_start as usize,
        n_col_start as usize,
        l_rows,
    ))
}

fn validate_cell_budget(n_rows: usize, n_cols: usize) -> Result<(), XlsxReadError> {
    if n_rows.saturating_mul(n_cols) > N_CELLS_GRID_MAX {
        return Err(XlsxReadError::GridTooLarge {
            n_rows,
            n_cols,
            n_cells_max: N_CELLS_GRID_MAX,
        });
    }
    Ok(())
}

/// Map one calamine cell onto the crate's cell scalar.
fn convert_calamine_cell(cell: &Data) -> EnumCellValue {
    match cell {
        Data::Empty => EnumCellValue::Empty,
        Data::String(val) => EnumCellValue::from(val.as_str()),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Bool(val) => EnumCellValue::Text(if *val { "True" } else { "False" }.to_string()),
        Data::DateTime(val) => match val.as_datetime() {
            Some(dt) => EnumCellValue::Date(dt),
            None => EnumCellValue::Number(val.as_f64()),
        },
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::from(val.as_str()),
        Data::Error(err) => EnumCellValue::Text(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    use super::*;

    #[test]
    fn read_first_sheet_keeps_absolute_coordinates() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(2, 1, "姓名").expect("write");
        worksheet.write_number(3, 1, 42.0).expect("write");
        worksheet.write_boolean(3, 2, true).expect("write");
        let v_bytes = workbook.save_to_buffer().expect("save");

        let grid = read_first_sheet_from_bytes(&v_bytes).expect("read");
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.get(0, 0), &EnumCellValue::Empty);
        assert_eq!(grid.get(2, 1), &EnumCellValue::from("姓名"));
        assert_eq!(grid.get(3, 1), &EnumCellValue::Number(42.0));
        assert_eq!(grid.get(3, 2), &EnumCellValue::from("True"));
    }

    #[test]
    fn read_first_sheet_holds_only_the_used_range() {
        let mut workbook = Workbook::new();
        workbook
            .add_worksheet()
            .write_string(200_000, 10_000, "姓名")
            .expect("write");
        let v_bytes = workbook.save_to_buffer().expect("save");

        let grid = read_first_sheet_from_bytes(&v_bytes).expect("read");
        assert_eq!(grid.row_start(), 200_000);
        assert_eq!(grid.col_start(), 10_000);
        assert_eq!(grid.height(), 200_001);
        assert_eq!(grid.width(), 10_001);
        assert_eq!(grid.get(200_000, 10_000), &EnumCellValue::from("姓名"));
        assert_eq!(grid.get(0, 0), &EnumCellValue::Empty);
    }

    #[test]
    fn cell_budget_rejects_oversized_ranges() {
        assert!(validate_cell_budget(1_000, 1_000).is_ok());
        let err = validate_cell_budget(1_048_576, 16_384).expect_err("too large");
        assert!(matches!(err, XlsxReadError::GridTooLarge { n_rows: 1_048_576, .. }));
    }

    #[test]
    fn read_first_sheet_only_reads_first_worksheet() {
        let mut workbook = Workbook::new();
        workbook
            .add_worksheet()
            .write_string(0, 0, "first")
            .expect("write");
        workbook
            .add_worksheet()
            .write_string(0, 0, "second")
            .expect("write");
        let v_bytes = workbook.save_to_buffer().expect("save");

        let grid = read_first_sheet_from_bytes(&v_bytes).expect("read");
        assert_eq!(grid.get(0, 0), &EnumCellValue::from("first"));
    }

    #[test]
    fn read_first_sheet_decodes_dates() {
        let mut workbook = Workbook::new();
        let fmt_date = Format::new().set_num_format("yyyy-mm-dd");
        let dt = ExcelDateTime::from_ymd(2024, 5, 31).expect("date");
        workbook
            .add_worksheet()
            .write_datetime_with_format(0, 0, &dt, &fmt_date)
            .expect("write");
        let v_bytes = workbook.save_to_buffer().expect("save");

        let grid = read_first_sheet_from_bytes(&v_bytes).expect("read");
        let dt_expected = NaiveDate::from_ymd_opt(2024, 5, 31)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("date");
        assert_eq!(grid.get(0, 0), &EnumCellValue::Date(dt_expected));
        assert_eq!(grid.get(0, 0).to_string(), "2024-05-31");
    }

    #[test]
    fn read_first_sheet_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("book.xlsx");
        let mut workbook = Workbook::new();
        workbook
            .add_worksheet()
            .write_string(0, 0, "应付工资")
            .expect("write");
        workbook.save(&path).expect("save");

        let grid = read_first_sheet(&path).expect("read");
        assert_eq!(grid.get(0, 0), &EnumCellValue::from("应付工资"));
    }

    #[test]
    fn read_first_sheet_rejects_garbage() {
        let err = read_first_sheet_from_bytes(b"not a workbook").expect_err("garbage");
        assert!(matches!(err, XlsxReadError::OpenWorkbook(_)));

        let err = read_first_sheet(Path::new("/nonexistent/book.xlsx")).expect_err("missing");
        assert!(matches!(err, XlsxReadError::Io { .. }));
    }
}

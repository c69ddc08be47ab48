//! Cell scalar, raw grid, and writer option/report models.

use std::fmt;

use chrono::{NaiveDateTime, Timelike};

use crate::conf::{C_NUM_FORMAT_DECIMAL, C_NUM_FORMAT_INTEGER};

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Typed scalar of one spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    Empty,
    /// Text value.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Date or date-time value.
    Date(NaiveDateTime),
}

static CELL_EMPTY: EnumCellValue = EnumCellValue::Empty;

/// Numbers at or above this magnitude keep float notation when stringified.
const N_ABS_INTEGER_TEXT_MAX: f64 = 1e15;

impl EnumCellValue {
    /// Whether the value counts as missing (blank, empty text, NaN/Inf).
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(n) => !n.is_finite(),
            Self::Date(_) => false,
        }
    }

    /// Numeric view of the value: numbers as-is, text when it parses.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// `true` when the stringified value is non-empty and made only of
    /// numeric characters, full-width digits included.
    pub fn is_all_digits(&self) -> bool {
        let c_text = self.to_string();
        !c_text.is_empty() && c_text.chars().all(char::is_numeric)
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < N_ABS_INTEGER_TEXT_MAX {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Self::Date(dt) => {
                if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RawGrid

/// Zero-indexed grid of cell values from one worksheet.
///
/// Coordinates are absolute: row 0 / column 0 are sheet row 1 / column `A`.
/// Only the used range is stored, anchored at `(row_start, col_start)`;
/// positions outside it read as [`EnumCellValue::Empty`]. Short rows are
/// padded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRawGrid {
    n_row_start: usize,
    n_col_start: usize,
    n_cols: usize,
    cells: Vec<Vec<EnumCellValue>>,
}

impl SpecRawGrid {
    /// Build a grid anchored at `A1` from ragged rows.
    pub fn new(rows: Vec<Vec<EnumCellValue>>) -> Self {
        Self::with_origin(0, 0, rows)
    }

    /// Build a grid whose first stored cell sits at `(n_row_start, n_col_start)`.
    pub fn with_origin(
        n_row_start: usize,
        n_col_start: usize,
        mut rows: Vec<Vec<EnumCellValue>>,
    ) -> Self {
        let n_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.is_empty() || n_cols == 0 {
            return Self::default();
        }
        for row in &mut rows {
            row.resize(n_cols, EnumCellValue::Empty);
        }
        Self {
            n_row_start,
            n_col_start,
            n_cols,
            cells: rows,
        }
    }

    /// Number of sheet rows up to the last stored one.
    pub fn height(&self) -> usize {
        if self.cells.is_empty() {
            0
        } else {
            self.n_row_start + self.cells.len()
        }
    }

    /// Number of sheet columns up to the last stored one.
    pub fn width(&self) -> usize {
        if self.n_cols == 0 {
            0
        } else {
            self.n_col_start + self.n_cols
        }
    }

    /// First stored row.
    pub fn row_start(&self) -> usize {
        self.n_row_start
    }

    /// First stored column.
    pub fn col_start(&self) -> usize {
        self.n_col_start
    }

    /// Whether the grid holds no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `(row, col)`; positions outside the used range read as empty.
    pub fn get(&self, row: usize, col: usize) -> &EnumCellValue {
        row.checked_sub(self.n_row_start)
            .zip(col.checked_sub(self.n_col_start))
            .and_then(|(n_row, n_col)| self.cells.get(n_row)?.get(n_col))
            .unwrap_or(&CELL_EMPTY)
    }

    /// Stored cells of sheet row `row` with their absolute column index.
    pub fn row_cells(&self, row: usize) -> impl Iterator<Item = (usize, &EnumCellValue)> {
        let n_col_start = self.n_col_start;
        row.checked_sub(self.n_row_start)
            .and_then(|n_row| self.cells.get(n_row))
            .into_iter()
            .flat_map(move |l_row| {
                l_row
                    .iter()
                    .enumerate()
                    .map(move |(n_idx, cell)| (n_col_start + n_idx, cell))
            })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// How the body cells of one column are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumColumnKind {
    /// Every value written as a string cell.
    #[default]
    Text,
    /// Number cells with the integer number format.
    Integer,
    /// Number cells with the general number format.
    Decimal,
}

impl EnumColumnKind {
    /// Excel number format of body cells, `None` for text columns.
    pub fn num_format(self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Integer => Some(C_NUM_FORMAT_INTEGER),
            Self::Decimal => Some(C_NUM_FORMAT_DECIMAL),
        }
    }
}

/// Header-driven column width settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    pub width_cell_min: usize,
    pub width_cell_max: usize,
    /// Added to the header text width.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Report

/// One worksheet produced by a write call, with the source range it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetSlice {
    /// Final (unique) sheet name.
    pub sheet_name: String,
    pub row_start_inclusive: usize,
    pub row_end_exclusive: usize,
    pub col_start_inclusive: usize,
    pub col_end_exclusive: usize,
}

impl SpecSheetSlice {
    pub fn height(&self) -> usize {
        self.row_end_exclusive - self.row_start_inclusive
    }

    pub fn width(&self) -> usize {
        self.col_end_exclusive - self.col_start_inclusive
    }
}

/// Sheets written and warnings raised by one `write_sheet` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    pub sheets: Vec<SpecSheetSlice>,
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

//! Extracted table model, DataFrame conversion and workbook export.

use polars::prelude::{Column, DataFrame};
use sheetkit_io_xlsx::conf::N_F64_EXACT_INT_MAX;
use sheetkit_io_xlsx::{EnumCellValue, SpecXlsxSheetWriteOptions, XlsxWriter};

use crate::spec::MergeError;

/// Named columns over rows of cell values.
///
/// Every row has exactly one value per column. Operations never mutate a
/// table in place; they derive new ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecExtractedTable {
    columns: Vec<String>,
    rows: Vec<Vec<EnumCellValue>>,
}

impl SpecExtractedTable {
    /// Build a table, padding or truncating rows to the column count.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<EnumCellValue>>) -> Self {
        for row in &mut rows {
            row.resize(columns.len(), EnumCellValue::Empty);
        }
        Self { columns, rows }
    }

    /// Table with the given columns and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<EnumCellValue>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of column `name`.
    pub fn column_index(&self, name: &str) -> Result<usize, MergeError> {
        self.columns
            .iter()
            .position(|c_name| c_name == name)
            .ok_or_else(|| MergeError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Keep rows for which `predicate` holds.
    pub fn filter_rows(&self, predicate: impl Fn(&[EnumCellValue]) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        }
    }

    /// Stack `parts` under `columns`; columns a part lacks are filled with `Empty`.
    pub fn concat(parts: &[SpecExtractedTable], columns: &[String]) -> Self {
        let mut l_rows = Vec::with_capacity(parts.iter().map(Self::height).sum());
        for part in parts {
            let l_idx_src: Vec<Option<usize>> = columns
                .iter()
                .map(|c_name| part.columns.iter().position(|c| c == c_name))
                .collect();
            for row in &part.rows {
                l_rows.push(
                    l_idx_src
                        .iter()
                        .map(|idx| idx.map_or(EnumCellValue::Empty, |n_idx| row[n_idx].clone()))
                        .collect(),
                );
            }
        }
        Self {
            columns: columns.to_vec(),
            rows: l_rows,
        }
    }

    /// Split into column names and rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<EnumCellValue>>) {
        (self.columns, self.rows)
    }

    /// Convert to a polars DataFrame.
    ///
    /// Columns holding only numbers become `Int64` when every value is an
    /// exactly representable integer, `Float64` otherwise; any other column is
    /// stringified. Missing values become nulls.
    pub fn to_dataframe(&self) -> Result<DataFrame, MergeError> {
        let l_cols = self
            .columns
            .iter()
            .enumerate()
            .map(|(n_idx_col, c_name)| self.derive_column(n_idx_col, c_name))
            .collect();
        Ok(DataFrame::new(l_cols)?)
    }

    fn derive_column(&self, n_idx_col: usize, c_name: &str) -> Column {
        let l_values: Vec<&EnumCellValue> = self.rows.iter().map(|row| &row[n_idx_col]).collect();

        let l_numbers: Option<Vec<Option<f64>>> = l_values
            .iter()
            .map(|value| match value {
                value if value.is_missing() => Some(None),
                EnumCellValue::Number(n) => Some(Some(*n)),
                _ => None,
            })
            .collect();
        let if_has_values = l_values.iter().any(|value| !value.is_missing());

        match l_numbers {
            Some(l_numbers) if if_has_values => {
                let if_all_integral = l_numbers
                    .iter()
                    .flatten()
                    .all(|n| n.fract() == 0.0 && n.abs() < N_F64_EXACT_INT_MAX);
                if if_all_integral {
                    let l_ints: Vec<Option<i64>> = l_numbers
                        .iter()
                        .map(|n| n.map(|val| val as i64))
                        .collect();
                    Column::new(c_name.into(), l_ints)
                } else {
                    Column::new(c_name.into(), l_numbers)
                }
            }
            _ => {
                let l_texts: Vec<Option<String>> = l_values
                    .iter()
                    .map(|value| (!value.is_missing()).then(|| value.to_string()))
                    .collect();
                Column::new(c_name.into(), l_texts)
            }
        }
    }
}

/// Render `table` as a workbook with one plain, frozen header row.
///
/// Tables beyond Excel's row or column limits spill into suffixed sheets.
pub fn write_table_to_bytes(
    table: &SpecExtractedTable,
    sheet_name: &str,
) -> Result<Vec<u8>, MergeError> {
    let df = table.to_dataframe()?;
    let options = SpecXlsxSheetWriteOptions {
        row_freeze: 1,
        ..Default::default()
    };
    let mut writer = XlsxWriter::new();
    writer
        .write_sheet(&df, sheet_name, &options)
        .map_err(MergeError::WriteFailed)?;
    for report in writer.report() {
        for c_warning in &report.warnings {
            tracing::warn!(sheet = sheet_name, "{c_warning}");
        }
    }
    writer.save_to_buffer().map_err(MergeError::WriteFailed)
}

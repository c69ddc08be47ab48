//! In-memory XLSX writer turning polars DataFrames into worksheets.

use std::collections::BTreeSet;
use std::path::Path;

use polars::prelude::{AnyValue, Column, DataFrame, DataType};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::conf::{C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX};
use crate::spec::{
    EnumCellValue, EnumColumnKind, SpecAutofitCellsPolicy, SpecSheetSlice, SpecXlsxReport,
};
use crate::util::{
    estimate_display_width, normalize_cell_value, plan_sheet_slices, sanitize_sheet_name,
    validate_unique_columns,
};

/// Header rows written above every body.
const N_ROWS_HEADER: usize = 1;
/// Widest column Excel accepts, in characters.
const N_WIDTH_COLUMN_MAX: usize = 255;

/// Options of one `write_sheet` call.
#[derive(Debug, Clone, Default)]
pub struct SpecXlsxSheetWriteOptions {
    /// Rows frozen at the top of every written sheet; `0` freezes nothing.
    pub row_freeze: usize,
    pub policy_autofit: SpecAutofitCellsPolicy,
}

/// Workbook under construction. Nothing touches disk until [`Self::save`].
pub struct XlsxWriter {
    workbook: Workbook,
    set_sheet_names: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
}

impl Default for XlsxWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxWriter {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            set_sheet_names: BTreeSet::new(),
            l_reports: Vec::new(),
        }
    }

    /// One report per `write_sheet` call, in call order.
    pub fn report(&self) -> &[SpecXlsxReport] {
        &self.l_reports
    }

    /// Serialize the workbook into `.xlsx` bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, String> {
        self.ensure_at_least_one_sheet()?;
        self.workbook.save_to_buffer().map_err(derive_xlsx_error_text)
    }

    /// Serialize the workbook to `path`.
    pub fn save(&mut self, path: &Path) -> Result<(), String> {
        self.ensure_at_least_one_sheet()?;
        self.workbook.save(path).map_err(derive_xlsx_error_text)
    }

    /// Write `df` as one header row of column names followed by its rows.
    ///
    /// Integer and float columns become number cells, everything else text.
    /// Tables beyond Excel's limits spill into suffixed sheets.
    pub fn write_sheet(
        &mut self,
        df: &DataFrame,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<(), String> {
        validate_policy_autofit(&options.policy_autofit)?;

        let l_colnames: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames)?;

        let l_kinds: Vec<EnumColumnKind> = df
            .get_columns()
            .iter()
            .map(|col| derive_column_kind(col.dtype()))
            .collect();

        let mut report = SpecXlsxReport::default();
        let l_slices = plan_sheet_slices(
            df.height(),
            l_colnames.len(),
            N_ROWS_HEADER,
            &sanitize_sheet_name(sheet_name),
            &mut report,
        )?;

        for slice in l_slices {
            let sheet_name_unique = self.claim_sheet_name(&slice.sheet_name);
            let plan = SpecSlicePlan {
                df,
                slice: &slice,
                header: &l_colnames[slice.col_start_inclusive..slice.col_end_exclusive],
                kinds: &l_kinds[slice.col_start_inclusive..slice.col_end_exclusive],
            };

            let worksheet = self.workbook.add_worksheet();
            worksheet
                .set_name(&sheet_name_unique)
                .map_err(derive_xlsx_error_text)?;
            write_slice(worksheet, &plan, options)?;

            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                ..slice
            });
        }

        self.l_reports.push(report);
        Ok(())
    }

    fn ensure_at_least_one_sheet(&mut self) -> Result<(), String> {
        if !self.set_sheet_names.is_empty() {
            return Ok(());
        }
        let c_name = self.claim_sheet_name(C_SHEET_NAME_DEFAULT);
        self.workbook
            .add_worksheet()
            .set_name(&c_name)
            .map_err(derive_xlsx_error_text)?;
        Ok(())
    }

    /// Reserve `name`, or `name__2`, `name__3`, ... when it is taken.
    fn claim_sheet_name(&mut self, name: &str) -> String {
        let mut c_candidate = name.to_string();
        let mut n_idx = 2usize;
        while self.set_sheet_names.contains(&c_candidate) {
            let c_suffix = format!("__{n_idx}");
            let c_base: String = name
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX - c_suffix.len())
                .collect();
            c_candidate = format!("{c_base}{c_suffix}");
            n_idx += 1;
        }
        self.set_sheet_names.insert(c_candidate.clone());
        c_candidate
    }
}

/// Column subset of one worksheet.
struct SpecSlicePlan<'a> {
    df: &'a DataFrame,
    slice: &'a SpecSheetSlice,
    header: &'a [String],
    kinds: &'a [EnumColumnKind],
}

fn write_slice(
    worksheet: &mut Worksheet,
    plan: &SpecSlicePlan<'_>,
    options: &SpecXlsxSheetWriteOptions,
) -> Result<(), String> {
    let fmt_header = Format::new();
    let l_fmt_body: Vec<Format> = plan
        .kinds
        .iter()
        .map(|kind| match kind.num_format() {
            Some(c_num_format) => Format::new().set_num_format(c_num_format),
            None => Format::new(),
        })
        .collect();

    for (n_idx_col, c_name) in plan.header.iter().enumerate() {
        worksheet
            .write_string_with_format(0, cast_col_num(n_idx_col)?, c_name, &fmt_header)
            .map_err(derive_xlsx_error_text)?;
    }

    let l_cols: Vec<Column> = (plan.slice.col_start_inclusive..plan.slice.col_end_exclusive)
        .map(|n_idx_col| {
            plan.df.get_columns()[n_idx_col]
                .slice(plan.slice.row_start_inclusive as i64, plan.slice.height())
        })
        .collect();

    for (n_idx_col, col) in l_cols.iter().enumerate() {
        let kind = plan.kinds[n_idx_col];
        for n_row in 0..col.len() {
            let value_raw = col
                .get(n_row)
                .map_err(|err| format!("Failed to access cell value: {err}"))?;
            let value = normalize_cell_value(derive_cell_value(value_raw), kind);
            write_cell(
                worksheet,
                N_ROWS_HEADER + n_row,
                n_idx_col,
                &value,
                &l_fmt_body[n_idx_col],
            )?;
        }
    }

    if options.row_freeze > 0 {
        worksheet
            .set_freeze_panes(cast_row_num(options.row_freeze)?, 0)
            .map_err(derive_xlsx_error_text)?;
    }

    let policy = &options.policy_autofit;
    for (n_idx_col, c_name) in plan.header.iter().enumerate() {
        let n_width = (estimate_display_width(c_name) + policy.width_cell_padding)
            .clamp(policy.width_cell_min, policy.width_cell_max.min(N_WIDTH_COLUMN_MAX));
        worksheet
            .set_column_width(cast_col_num(n_idx_col)?, n_width as f64)
            .map_err(derive_xlsx_error_text)?;
    }

    Ok(())
}

fn validate_policy_autofit(policy: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy.width_cell_min == 0 {
        return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
    }
    if policy.width_cell_min > N_WIDTH_COLUMN_MAX {
        return Err(format!(
            "policy_autofit.width_cell_min must be <= {N_WIDTH_COLUMN_MAX}."
        ));
    }
    if policy.width_cell_max < policy.width_cell_min {
        return Err("policy_autofit.width_cell_max must be >= width_cell_min.".to_string());
    }
    Ok(())
}

fn derive_column_kind(dtype: &DataType) -> EnumColumnKind {
    if dtype.is_integer() {
        EnumColumnKind::Integer
    } else if dtype.is_float() {
        EnumColumnKind::Decimal
    } else {
        EnumColumnKind::Text
    }
}

fn derive_cell_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::Empty,
        AnyValue::String(val) => EnumCellValue::from(val),
        AnyValue::StringOwned(val) => EnumCellValue::from(val.as_str()),
        AnyValue::Boolean(val) => EnumCellValue::from(if val { "True" } else { "False" }),
        val if val.dtype().is_numeric() => {
            val.extract::<f64>().map_or(EnumCellValue::Empty, EnumCellValue::Number)
        }
        val => EnumCellValue::Text(val.to_string()),
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    n_idx_row: usize,
    n_idx_col: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    let n_row = cast_row_num(n_idx_row)?;
    let n_col = cast_col_num(n_idx_col)?;
    match value {
        EnumCellValue::Empty => worksheet.write_blank(n_row, n_col, format),
        EnumCellValue::Number(n) => worksheet.write_number_with_format(n_row, n_col, *n, format),
        EnumCellValue::Text(_) | EnumCellValue::Date(_) => {
            worksheet.write_string_with_format(n_row, n_col, value.to_string(), format)
        }
    }
    .map_err(derive_xlsx_error_text)?;
    Ok(())
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

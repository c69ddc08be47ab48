//! Pure helpers shared by the writer: value normalization, sheet naming and
//! Excel-limit slicing.

use std::collections::BTreeMap;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, EnumColumnKind, SpecSheetSlice, SpecXlsxReport};

////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Value actually written for `value` in a column of `kind`.
///
/// The result is `Empty`, `Text` or a finite `Number`. Missing values and
/// NaN/Inf become blank cells; numbers only survive in numeric columns; dates
/// are always written as text.
pub fn normalize_cell_value(value: EnumCellValue, kind: EnumColumnKind) -> EnumCellValue {
    match value {
        EnumCellValue::Number(n) if !n.is_finite() => EnumCellValue::Empty,
        EnumCellValue::Number(_) if kind == EnumColumnKind::Text => {
            EnumCellValue::Text(value.to_string())
        }
        EnumCellValue::Date(_) => EnumCellValue::Text(value.to_string()),
        other => other,
    }
}

/// Approximate rendered width: wide (non-ASCII) characters count double.
pub fn estimate_display_width(text: &str) -> usize {
    text.chars()
        .map(|chr| if chr.is_ascii() { 1 } else { 2 })
        .sum()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Columns

/// Reject column lists that name the same column twice.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name.as_str()).or_default().push(n_idx);
    }

    let l_dupes: Vec<String> = dict_pos
        .into_iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} at {l_pos:?}"))
        .collect();
    if l_dupes.is_empty() {
        Ok(())
    } else {
        Err(format!("Duplicate column names: {}", l_dupes.join(", ")))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Sheets

/// Make `name` acceptable to Excel: illegal characters become `_`, edges are
/// trimmed and the result is capped at 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let c_replaced: String = name
        .chars()
        .map(|chr| if TUP_EXCEL_ILLEGAL.contains(&chr) { '_' } else { chr })
        .collect();
    let c_trimmed = c_replaced.trim().trim_matches('\'');
    if c_trimmed.is_empty() {
        return "Sheet".to_string();
    }
    c_trimmed.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Name of part `n_part` (1-based) of a sheet split across several worksheets.
pub fn derive_part_sheet_name(base_name: &str, n_part: usize) -> String {
    let c_suffix = format!("_{n_part}");
    let n_len_base = N_LEN_EXCEL_SHEET_NAME_MAX
        .saturating_sub(c_suffix.chars().count())
        .max(1);
    let c_base: String = base_name.chars().take(n_len_base).collect();
    format!("{c_base}{c_suffix}")
}

/// Cut `0..n_total` into consecutive `(start, end)` ranges of at most
/// `n_step` items. An empty range still yields one `(0, 0)` part.
pub fn partition_range(n_total: usize, n_step: usize) -> Vec<(usize, usize)> {
    if n_total == 0 || n_step == 0 {
        return vec![(0, 0)];
    }
    (0..n_total)
        .step_by(n_step)
        .map(|n_start| (n_start, usize::min(n_total, n_start + n_step)))
        .collect()
}

/// Worksheets needed to hold a `height_df` x `width_df` table below
/// `height_header` header rows.
///
/// Column blocks come first, then row blocks within each. When more than one
/// worksheet is needed, parts are named `<sheet_name>_<n>` and a warning is
/// added to `report`.
pub fn plan_sheet_slices(
    height_df: usize,
    width_df: usize,
    height_header: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Result<Vec<SpecSheetSlice>, String> {
    let n_rows_body_max = N_NROWS_EXCEL_MAX.saturating_sub(height_header);
    if n_rows_body_max == 0 {
        return Err(format!(
            "Header of {height_header} rows leaves no room for data."
        ));
    }

    let l_col_parts = partition_range(width_df, N_NCOLS_EXCEL_MAX);
    let l_row_parts = partition_range(height_df, n_rows_body_max);
    let n_parts = l_col_parts.len() * l_row_parts.len();

    let l_slices: Vec<SpecSheetSlice> = l_col_parts
        .iter()
        .flat_map(|col_part| l_row_parts.iter().map(move |row_part| (*col_part, *row_part)))
        .enumerate()
        .map(|(n_idx, ((col_start, col_end), (row_start, row_end)))| SpecSheetSlice {
            sheet_name: if n_parts == 1 {
                sheet_name.to_string()
            } else {
                derive_part_sheet_name(sheet_name, n_idx + 1)
            },
            row_start_inclusive: row_start,
            row_end_exclusive: row_end,
            col_start_inclusive: col_start,
            col_end_exclusive: col_end,
        })
        .collect();

    if n_parts > 1 {
        report.warn(format!(
            "Sheet {sheet_name:?} exceeds Excel limits; written as {n_parts} sheets."
        ));
    }
    Ok(l_slices)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

//! Excel limits, reader budget and writer number formats.

/// Rows per worksheet.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Columns per worksheet.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Characters per sheet name.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters Excel rejects in sheet names.
pub const TUP_EXCEL_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// Sheet name used when the caller does not supply one.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";

/// Largest integer magnitude an `f64` represents exactly (2^53).
pub const N_F64_EXACT_INT_MAX: f64 = 9_007_199_254_740_992.0;

/// Number format of integer body columns.
pub const C_NUM_FORMAT_INTEGER: &str = "0";
/// Number format of decimal body columns.
pub const C_NUM_FORMAT_DECIMAL: &str = "General";

/// Cells a worksheet's used range may span before reading is refused.
pub const N_CELLS_GRID_MAX: usize = 20_000_000;

//! `sheetkit_io_xlsx` v1:
//! Spreadsheet I/O kernel.
//!
//! Layout:
//! - `conf`   : Excel limits, reader budget and number formats
//! - `spec`   : cell scalar, raw grid, writer options and reports
//! - `util`   : value normalization, sheet naming and slicing helpers
//! - `reader` : first-sheet reader (calamine)
//! - `writer` : in-memory workbook writer (rust_xlsxwriter)
pub mod conf;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_CELLS_GRID_MAX, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
};
pub use reader::{XlsxReadError, read_first_sheet, read_first_sheet_from_bytes};
pub use spec::{
    EnumCellValue, EnumColumnKind, SpecAutofitCellsPolicy, SpecRawGrid, SpecSheetSlice,
    SpecXlsxReport,
};
pub use util::{plan_sheet_slices, sanitize_sheet_name};
pub use writer::{SpecXlsxSheetWriteOptions, XlsxWriter};

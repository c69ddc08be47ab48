//! Merge options, result models, defaults and top-level error types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use sheetkit_io_xlsx::XlsxReadError;

use crate::report::ReportMerge;
use crate::table::SpecExtractedTable;

////////////////////////////////////////////////////////////////////////////////
// #region Constants

/// Label every extraction is anchored on.
pub const C_LABEL_IDENTITY_DEFAULT: &str = "姓名";
/// Labels pre-selected for a merge request.
pub const L_LABELS_DEFAULT: [&str; 3] = ["姓名", "身份证号", "应付工资"];
/// Rows scanned from the top of a sheet when looking for header labels.
pub const N_ROWS_HEADER_WINDOW_DEFAULT: usize = 10;

/// Name given to header cells that are blank.
pub const C_COLUMN_NAME_PLACEHOLDER: &str = "Unnamed";

/// Audit marker for rows without findings.
pub const C_AUDIT_PASS_MARKER: &str = "通过";
/// Separator between audit messages of one row.
pub const C_AUDIT_MESSAGE_SEPARATOR: &str = "；";
/// Name of the column holding per-row audit results.
pub const C_AUDIT_RESULT_COLUMN_DEFAULT: &str = "审核结果";
/// Required length of an identity number.
pub const N_LEN_IDENTITY_NUMBER: usize = 18;
/// Bank accounts at or below this length are flagged.
pub const N_LEN_BANK_ACCOUNT_TOO_SHORT: usize = 10;

/// Sheet name used for merge output.
pub const C_SHEET_NAME_MERGED: &str = "Sheet1";

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Options shared by locate/extract calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExtractOptions {
    /// Label that must be located for a file to be extractable.
    pub label_identity: String,
    /// Number of top rows scanned for header labels.
    pub n_rows_header_window: usize,
}

impl Default for SpecExtractOptions {
    fn default() -> Self {
        Self {
            label_identity: C_LABEL_IDENTITY_DEFAULT.to_string(),
            n_rows_header_window: N_ROWS_HEADER_WINDOW_DEFAULT,
        }
    }
}

/// Columns selected for the audit checks. `None` disables a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAuditOptions {
    /// Identity-number column (length check).
    pub col_identity_number: Option<String>,
    /// Bank-account column (whitespace and length checks).
    pub col_bank_account: Option<String>,
    /// Person-name column (whitespace check).
    pub col_name: Option<String>,
    /// Name of the appended result column.
    pub col_result: String,
}

impl Default for SpecAuditOptions {
    fn default() -> Self {
        Self {
            col_identity_number: None,
            col_bank_account: None,
            col_name: None,
            col_result: C_AUDIT_RESULT_COLUMN_DEFAULT.to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Results

/// Zero-based sheet coordinates of a located label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecLabelPosition {
    pub row: usize,
    pub col: usize,
}

/// Outcome of one header scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecLocateResult {
    /// First position of every label that was found.
    pub positions: BTreeMap<String, SpecLabelPosition>,
    /// Labels never found, in request order.
    pub labels_missing: Vec<String>,
}

/// Extracted table plus the scan that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecGridExtraction {
    pub table: SpecExtractedTable,
    pub locate: SpecLocateResult,
}

/// Output of [`crate::aggregate::aggregate_by_identity`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpecAggregateOutput {
    /// One row per distinct identity value.
    pub table: SpecExtractedTable,
    /// Identity values that had more than one contributing row.
    pub keys_merged: Vec<String>,
}

/// Output of [`crate::audit::audit_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpecAuditOutput {
    /// Input columns with cleaned values plus the result column.
    pub table: SpecExtractedTable,
    /// Findings per body row; empty when the row passed.
    pub messages_by_row: Vec<Vec<String>>,
    /// Number of rows with at least one finding.
    pub cnt_flagged: usize,
}

/// Where the workbook of one input file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumInputSource {
    /// Workbook bytes already in memory.
    Bytes(Vec<u8>),
    /// Workbook on disk, read when the batch reaches it.
    Path(PathBuf),
}

/// One uploaded file handed to the batch merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecInputFile {
    /// Display name used in logs and the report.
    pub name: String,
    pub source: EnumInputSource,
}

impl SpecInputFile {
    pub fn new(name: impl Into<String>, v_bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: EnumInputSource::Bytes(v_bytes),
        }
    }

    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: EnumInputSource::Path(path.into()),
        }
    }
}

/// Outcome of one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileOutcome {
    /// File display name.
    pub name: String,
    /// Rows contributed to the combined table.
    pub n_rows: usize,
    /// Wall time spent reading and extracting this file.
    pub elapsed: Duration,
    /// Requested labels absent from this file's header window.
    pub labels_missing: Vec<String>,
}

/// Progress snapshot emitted after each file of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecMergeProgress {
    /// Files finished so far.
    pub n_done: usize,
    /// Files in the batch.
    pub n_total: usize,
    /// Files extracted successfully so far.
    pub cnt_succeeded: usize,
    /// Files failed so far.
    pub cnt_failed: usize,
}

/// Combined table and summary of one batch merge.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecMergeOutput {
    pub table: SpecExtractedTable,
    pub report: ReportMerge,
}

/// One file failure item with name + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMergeFileError {
    /// File display name.
    pub name: String,
    /// User-facing error text.
    pub exception: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The workbook could not be parsed.
    #[error(transparent)]
    UnreadableFile(#[from] XlsxReadError),

    /// The identity label was not requested or not found.
    #[error("Required column not found: {label:?}")]
    MissingRequiredColumn { label: String },

    /// The same label was requested twice.
    #[error("Duplicate column label requested: {label:?}")]
    DuplicateLabel { label: String },

    /// A named column does not exist in the table.
    #[error("Column not found: {column:?}")]
    ColumnNotFound { column: String },

    /// Header row outside `1..=height`.
    #[error("Header row {row} out of range (sheet has {height} rows)")]
    InvalidHeaderRow { row: usize, height: usize },

    /// A summed cell holds text that is not a number.
    #[error("Non-numeric value {value:?} in column {column:?} at row {row}")]
    NonNumericValue {
        column: String,
        row: usize,
        value: String,
    },

    /// DataFrame construction failed.
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),

    /// Workbook output failed.
    #[error("Failed to write workbook: {0}")]
    WriteFailed(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

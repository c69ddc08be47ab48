//! `sheetkit_merge` v1:
//! Header-locating extraction engine for payroll-style spreadsheets.
//!
//! Layout:
//! - `spec`      : options, constants, result models and errors
//! - `table`     : extracted table model, DataFrame conversion, export
//! - `locate`    : header label scan and candidate label discovery
//! - `extract`   : column extraction below located labels
//! - `header`    : explicit header-row tables and unique column names
//! - `aggregate` : identity-based row merging
//! - `audit`     : per-row data checks
//! - `split`     : per-value table subsets
//! - `batch`     : sequential multi-file merge
//! - `report`    : merge report and builder
pub mod aggregate;
pub mod audit;
pub mod batch;
pub mod extract;
pub mod header;
pub mod locate;
pub mod report;
pub mod spec;
pub mod split;
pub mod table;

pub use aggregate::aggregate_by_identity;
pub use audit::audit_table;
pub use batch::{merge_files, merge_files_with_progress};
pub use extract::{extract, process_file_bytes, process_file_path, process_grid};
pub use header::{make_column_names_unique, read_table_from_bytes, read_table_with_header_row};
pub use locate::{discover_candidate_labels, locate_columns};
pub use report::{ReportMerge, ReportMergeBuilder};
pub use spec::{
    C_LABEL_IDENTITY_DEFAULT, C_SHEET_NAME_MERGED, EnumInputSource, L_LABELS_DEFAULT, MergeError,
    N_ROWS_HEADER_WINDOW_DEFAULT, SpecAggregateOutput, SpecAuditOptions, SpecAuditOutput,
    SpecExtractOptions, SpecFileOutcome, SpecGridExtraction, SpecInputFile, SpecLabelPosition,
    SpecLocateResult, SpecMergeFileError, SpecMergeOutput, SpecMergeProgress,
};
pub use split::{list_split_values, split_by_value};
pub use table::{SpecExtractedTable, write_table_to_bytes};

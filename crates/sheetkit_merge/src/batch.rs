//! Sequential multi-file merge with per-file error isolation.

use std::time::Instant;

use tracing::{info, warn};

use crate::extract::{process_file_bytes, process_file_path, validate_unique_labels};
use crate::report::ReportMergeBuilder;
use crate::spec::{
    EnumInputSource, MergeError, SpecExtractOptions, SpecFileOutcome, SpecInputFile,
    SpecMergeOutput, SpecMergeProgress,
};
use crate::table::SpecExtractedTable;

/// Merge `files` into one table of `labels` columns.
///
/// See [`merge_files_with_progress`].
pub fn merge_files(
    files: &[SpecInputFile],
    labels: &[String],
    options: &SpecExtractOptions,
) -> Result<SpecMergeOutput, MergeError> {
    merge_files_with_progress(files, labels, options, |_| {})
}

/// Merge `files` in order, reporting progress after each file.
///
/// A failing file is logged and recorded in the report; the remaining files
/// are still processed. Only an invalid label request fails the whole call.
pub fn merge_files_with_progress(
    files: &[SpecInputFile],
    labels: &[String],
    options: &SpecExtractOptions,
    mut on_progress: impl FnMut(SpecMergeProgress),
) -> Result<SpecMergeOutput, MergeError> {
    validate_unique_labels(labels)?;

    let mut builder = ReportMergeBuilder::new(files.len() as u64);
    let mut l_parts = Vec::with_capacity(files.len());

    for (n_idx_file, file) in files.iter().enumerate() {
        let t_start = Instant::now();
        let result = match &file.source {
            EnumInputSource::Bytes(v_bytes) => process_file_bytes(v_bytes, labels, options),
            EnumInputSource::Path(path) => process_file_path(path, labels, options),
        };
        match result {
            Ok(extraction) => {
                let elapsed = t_start.elapsed();
                let n_rows = extraction.table.height();
                info!(
                    file = %file.name,
                    n_rows,
                    secs = elapsed.as_secs_f64(),
                    "file merged"
                );
                if !extraction.locate.labels_missing.is_empty() {
                    warn!(
                        file = %file.name,
                        labels = ?extraction.locate.labels_missing,
                        "columns not found"
                    );
                }
                builder.add_succeeded(SpecFileOutcome {
                    name: file.name.clone(),
                    n_rows,
                    elapsed,
                    labels_missing: extraction.locate.labels_missing,
                });
                l_parts.push(extraction.table);
            }
            Err(err) => {
                warn!(file = %file.name, error = %err, "file failed");
                builder.add_error(file.name.clone(), err.to_string());
            }
        }

        on_progress(SpecMergeProgress {
            n_done: n_idx_file + 1,
            n_total: files.len(),
            cnt_succeeded: builder.cnt_succeeded as usize,
            cnt_failed: builder.cnt_failed as usize,
        });
    }

    let table = SpecExtractedTable::concat(&l_parts, labels);
    let report = builder.build();
    info!("{report}");

    Ok(SpecMergeOutput { table, report })
}

//! Merge report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::spec::{SpecFileOutcome, SpecMergeFileError};

/// Aggregate counters and diagnostics for one `merge_files` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportMerge {
    /// Number of files handed to the batch.
    pub cnt_files: u64,
    /// Number of files extracted successfully.
    pub cnt_succeeded: u64,
    /// Number of files that failed.
    pub cnt_failed: u64,
    /// Rows in the combined table.
    pub cnt_rows: u64,
    /// Sum of per-file processing times.
    pub elapsed_total: Duration,
    /// Per-file outcomes of successful files, in upload order.
    pub outcomes: Vec<SpecFileOutcome>,
    /// Non-fatal warnings (missing labels).
    pub warnings: Vec<String>,
    /// Per-file failures.
    pub errors: Vec<SpecMergeFileError>,
}

impl ReportMerge {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Whether at least one file contributed to the output.
    pub fn has_succeeded(&self) -> bool {
        self.cnt_succeeded > 0
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files".to_string(), self.cnt_files);
        dict_counts.insert("cnt_succeeded".to_string(), self.cnt_succeeded);
        dict_counts.insert("cnt_failed".to_string(), self.cnt_failed);
        dict_counts.insert("cnt_rows".to_string(), self.cnt_rows);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts.insert(
            "ms_elapsed".to_string(),
            u64::try_from(self.elapsed_total.as_millis()).unwrap_or(u64::MAX),
        );
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} files={} succeeded={} failed={} rows={} elapsed={:.2}s errors={} warnings={}",
            dict_counts["cnt_files"],
            dict_counts["cnt_succeeded"],
            dict_counts["cnt_failed"],
            dict_counts["cnt_rows"],
            self.elapsed_total.as_secs_f64(),
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportMerge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[MERGE]"))
    }
}

/// Mutable accumulator for merge statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportMergeBuilder {
    /// See [`ReportMerge::cnt_files`].
    pub cnt_files: u64,
    /// See [`ReportMerge::cnt_succeeded`].
    pub cnt_succeeded: u64,
    /// See [`ReportMerge::cnt_failed`].
    pub cnt_failed: u64,
    /// See [`ReportMerge::cnt_rows`].
    pub cnt_rows: u64,
    /// See [`ReportMerge::elapsed_total`].
    pub elapsed_total: Duration,
    /// See [`ReportMerge::outcomes`].
    pub outcomes: Vec<SpecFileOutcome>,
    /// See [`ReportMerge::warnings`].
    pub warnings: Vec<String>,
    /// See [`ReportMerge::errors`].
    pub errors: Vec<SpecMergeFileError>,
}

impl ReportMergeBuilder {
    /// Start a report for a batch of `cnt_files` files.
    pub fn new(cnt_files: u64) -> Self {
        Self {
            cnt_files,
            ..Default::default()
        }
    }

    /// Record one successful file; its missing labels become warnings.
    pub fn add_succeeded(&mut self, outcome: SpecFileOutcome) {
        self.cnt_succeeded += 1;
        self.cnt_rows += outcome.n_rows as u64;
        self.elapsed_total += outcome.elapsed;
        if !outcome.labels_missing.is_empty() {
            self.add_warning(format!(
                "{}: columns not found: {}",
                outcome.name,
                outcome.labels_missing.join(", ")
            ));
        }
        self.outcomes.push(outcome);
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Record one file failure.
    pub fn add_error(&mut self, name: String, exception: String) {
        self.cnt_failed += 1;
        self.errors.push(SpecMergeFileError { name, exception });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportMerge {
        ReportMerge {
            cnt_files: self.cnt_files,
            cnt_succeeded: self.cnt_succeeded,
            cnt_failed: self.cnt_failed,
            cnt_rows: self.cnt_rows,
            elapsed_total: self.elapsed_total,
            outcomes: self.outcomes,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_merge_to_dict_and_format() {
        let report = ReportMerge {
            cnt_files: 3,
            cnt_succeeded: 2,
            cnt_failed: 1,
            cnt_rows: 40,
            elapsed_total: Duration::from_millis(1250),
            outcomes: vec![],
            warnings: vec!["w".to_string()],
            errors: vec![SpecMergeFileError {
                name: "b.xlsx".to_string(),
                exception: "bad".to_string(),
            }],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_files"], 3);
        assert_eq!(dict_counts["cnt_succeeded"], 2);
        assert_eq!(dict_counts["cnt_failed"], 1);
        assert_eq!(dict_counts["cnt_rows"], 40);
        assert_eq!(dict_counts["cnt_errors"], 1);
        assert_eq!(dict_counts["cnt_warnings"], 1);
        assert_eq!(dict_counts["ms_elapsed"], 1250);

        let txt = report.format("[MERGE]");
        assert_eq!(
            txt,
            "[MERGE] files=3 succeeded=2 failed=1 rows=40 elapsed=1.25s errors=1 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn report_merge_builder_accumulates_outcomes() {
        let mut builder = ReportMergeBuilder::new(2);
        builder.add_succeeded(SpecFileOutcome {
            name: "a.xlsx".to_string(),
            n_rows: 5,
            elapsed: Duration::from_millis(10),
            labels_missing: vec!["应付工资".to_string()],
        });
        builder.add_error("b.xlsx".to_string(), "Invalid spreadsheet".to_string());
        let report = builder.build();

        assert_eq!(report.cnt_succeeded, 1);
        assert_eq!(report.cnt_failed, 1);
        assert_eq!(report.cnt_rows, 5);
        assert_eq!(report.elapsed_total, Duration::from_millis(10));
        assert_eq!(report.warnings, vec!["a.xlsx: columns not found: 应付工资"]);
        assert!(report.has_succeeded());
    }
}

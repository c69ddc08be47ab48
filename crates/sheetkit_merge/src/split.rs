//! Split one table into per-value subsets of a key column.

use std::collections::BTreeSet;

use crate::spec::MergeError;
use crate::table::SpecExtractedTable;

/// Distinct non-missing values of `column`, in first-appearance order.
pub fn list_split_values(
    table: &SpecExtractedTable,
    column: &str,
) -> Result<Vec<String>, MergeError> {
    let n_idx_col = table.column_index(column)?;
    let mut set_seen = BTreeSet::new();
    Ok(table
        .rows()
        .iter()
        .map(|row| &row[n_idx_col])
        .filter(|value| !value.is_missing())
        .map(ToString::to_string)
        .filter(|c_value| set_seen.insert(c_value.clone()))
        .collect())
}

/// Rows whose `column` value stringifies to `value`.
pub fn split_by_value(
    table: &SpecExtractedTable,
    column: &str,
    value: &str,
) -> Result<SpecExtractedTable, MergeError> {
    let n_idx_col = table.column_index(column)?;
    Ok(table.filter_rows(|row| {
        !row[n_idx_col].is_missing() && row[n_idx_col].to_string() == value
    }))
}

//! Collapse rows sharing one identity value.

use std::collections::BTreeMap;

use sheetkit_io_xlsx::EnumCellValue;
use tracing::info;

use crate::spec::{MergeError, SpecAggregateOutput};
use crate::table::SpecExtractedTable;

/// Group rows by the text of `col_identity`, summing `cols_sum`.
///
/// Rows with a missing identity are dropped. Non-summed columns keep the
/// value of the group's first row; the identity column is never summed, even
/// when listed in `cols_sum`. Groups appear in first-appearance order.
pub fn aggregate_by_identity(
    table: &SpecExtractedTable,
    col_identity: &str,
    cols_sum: &[String],
) -> Result<SpecAggregateOutput, MergeError> {
    let n_idx_identity = table.column_index(col_identity)?;
    let mut l_idx_sum = Vec::with_capacity(cols_sum.len());
    for c_name in cols_sum {
        let n_idx_col = table.column_index(c_name)?;
        if n_idx_col != n_idx_identity && !l_idx_sum.contains(&n_idx_col) {
            l_idx_sum.push(n_idx_col);
        }
    }

    let mut l_groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut dict_group_by_key: BTreeMap<String, usize> = BTreeMap::new();
    for (n_idx_row, row) in table.rows().iter().enumerate() {
        let value_identity = &row[n_idx_identity];
        if value_identity.is_missing() {
            continue;
        }
        let c_key = value_identity.to_string();
        match dict_group_by_key.get(&c_key) {
            Some(n_idx_group) => l_groups[*n_idx_group].1.push(n_idx_row),
            None => {
                dict_group_by_key.insert(c_key.clone(), l_groups.len());
                l_groups.push((c_key, vec![n_idx_row]));
            }
        }
    }

    let mut l_rows = Vec::with_capacity(l_groups.len());
    let mut keys_merged = Vec::new();
    for (c_key, l_idx_rows) in l_groups {
        let mut row_out = table.rows()[l_idx_rows[0]].clone();
        for n_idx_col in &l_idx_sum {
            let mut n_sum = 0.0;
            for n_idx_row in &l_idx_rows {
                let value = &table.rows()[*n_idx_row][*n_idx_col];
                if value.is_missing() {
                    continue;
                }
                n_sum += value.as_f64().ok_or_else(|| MergeError::NonNumericValue {
                    column: table.columns()[*n_idx_col].clone(),
                    row: *n_idx_row,
                    value: value.to_string(),
                })?;
            }
            row_out[*n_idx_col] = EnumCellValue::Number(n_sum);
        }
        if l_idx_rows.len() > 1 {
            keys_merged.push(c_key);
        }
        l_rows.push(row_out);
    }

    info!(
        n_rows_in = table.height(),
        n_rows_out = l_rows.len(),
        n_keys_merged = keys_merged.len(),
        "rows aggregated by identity"
    );

    Ok(SpecAggregateOutput {
        table: SpecExtractedTable::new(table.columns().to_vec(), l_rows),
        keys_merged,
    })
}

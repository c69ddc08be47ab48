//! Header label scan over the top rows of a raw grid.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use sheetkit_io_xlsx::SpecRawGrid;
use tracing::debug;

use crate::spec::{SpecLabelPosition, SpecLocateResult};

static RE_CJK_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x{4E00}-\x{9FFF}]+$").expect("valid CJK label pattern"));

/// Find the first position of each label in the top `n_rows_window` rows.
///
/// Rows are scanned top to bottom and, within a row, left to right. A label
/// matches a non-missing cell whose text equals it exactly; once found it is
/// not looked up again. The scan stops as soon as every label is found.
pub fn locate_columns(
    grid: &SpecRawGrid,
    labels: &[String],
    n_rows_window: usize,
) -> SpecLocateResult {
    let mut set_pending: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
    let mut positions = BTreeMap::new();

    let n_rows_scan = usize::min(n_rows_window, grid.height());
    'scan: for n_idx_row in 0..n_rows_scan {
        for (n_idx_col, cell) in grid.row_cells(n_idx_row) {
            if set_pending.is_empty() {
                break 'scan;
            }
            if cell.is_missing() {
                continue;
            }
            let c_text = cell.to_string();
            if set_pending.remove(c_text.as_str()) {
                debug!(label = %c_text, row = n_idx_row, col = n_idx_col, "label located");
                positions.insert(
                    c_text,
                    SpecLabelPosition {
                        row: n_idx_row,
                        col: n_idx_col,
                    },
                );
            }
        }
    }

    let labels_missing = labels
        .iter()
        .filter(|label| !positions.contains_key(label.as_str()))
        .cloned()
        .collect();

    SpecLocateResult {
        positions,
        labels_missing,
    }
}

/// Collect header-window cell texts made only of CJK ideographs.
pub fn discover_candidate_labels(grid: &SpecRawGrid, n_rows_window: usize) -> BTreeSet<String> {
    (0..usize::min(n_rows_window, grid.height()))
        .flat_map(|n_idx_row| grid.row_cells(n_idx_row))
        .map(|(_, cell)| cell)
        .filter(|cell| !cell.is_missing())
        .map(ToString::to_string)
        .filter(|c_text| RE_CJK_LABEL.is_match(c_text))
        .collect()
}

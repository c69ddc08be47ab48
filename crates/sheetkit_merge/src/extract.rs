//! Column extraction below located header labels.

use std::collections::{BTreeMap, BTreeSet};

use std::path::Path;

use sheetkit_io_xlsx::{EnumCellValue, SpecRawGrid, read_first_sheet, read_first_sheet_from_bytes};
use tracing::debug;

use crate::locate::locate_columns;
use crate::spec::{MergeError, SpecExtractOptions, SpecGridExtraction, SpecLabelPosition};
use crate::table::SpecExtractedTable;

/// Extract the located columns into a cleaned table.
///
/// The body starts one row below the lowest located label. Rows holding a
/// missing value in any extracted column are dropped, as are rows whose
/// identity value is made only of digits (sub-total or numbering rows).
/// Column order follows `label_order`; labels without a position are left out.
pub fn extract(
    grid: &SpecRawGrid,
    positions: &BTreeMap<String, SpecLabelPosition>,
    label_order: &[String],
    options: &SpecExtractOptions,
) -> Result<SpecExtractedTable, MergeError> {
    let label_identity = options.label_identity.as_str();
    if !label_order.iter().any(|label| label == label_identity)
        || !positions.contains_key(label_identity)
    {
        return Err(MergeError::MissingRequiredColumn {
            label: label_identity.to_string(),
        });
    }

    let n_row_data_start = positions
        .values()
        .map(|pos| pos.row + 1)
        .max()
        .unwrap_or(0);

    let l_cols: Vec<(&String, usize)> = label_order
        .iter()
        .filter_map(|label| positions.get(label).map(|pos| (label, pos.col)))
        .collect();
    let n_idx_identity = l_cols
        .iter()
        .position(|(label, _)| label.as_str() == label_identity)
        .ok_or_else(|| MergeError::MissingRequiredColumn {
            label: label_identity.to_string(),
        })?;

    let mut l_rows = Vec::new();
    for n_idx_row in n_row_data_start..grid.height() {
        let row: Vec<EnumCellValue> = l_cols
            .iter()
            .map(|(_, n_idx_col)| grid.get(n_idx_row, *n_idx_col).clone())
            .collect();
        if row.iter().any(EnumCellValue::is_missing) || row[n_idx_identity].is_all_digits() {
            continue;
        }
        l_rows.push(row);
    }

    debug!(
        n_row_data_start,
        n_rows = l_rows.len(),
        n_cols = l_cols.len(),
        "columns extracted"
    );

    Ok(SpecExtractedTable::new(
        l_cols.into_iter().map(|(label, _)| label.clone()).collect(),
        l_rows,
    ))
}

/// Locate `labels` in `grid` and extract them.
pub fn process_grid(
    grid: &SpecRawGrid,
    labels: &[String],
    options: &SpecExtractOptions,
) -> Result<SpecGridExtraction, MergeError> {
    validate_unique_labels(labels)?;
    let locate = locate_columns(grid, labels, options.n_rows_header_window);
    let table = extract(grid, &locate.positions, labels, options)?;
    Ok(SpecGridExtraction { table, locate })
}

/// Read the first sheet of a workbook and run [`process_grid`] on it.
pub fn process_file_bytes(
    v_bytes: &[u8],
    labels: &[String],
    options: &SpecExtractOptions,
) -> Result<SpecGridExtraction, MergeError> {
    let grid = read_first_sheet_from_bytes(v_bytes)?;
    process_grid(&grid, labels, options)
}

/// Read the first sheet of the workbook at `path` and run [`process_grid`] on it.
pub fn process_file_path(
    path: &Path,
    labels: &[String],
    options: &SpecExtractOptions,
) -> Result<SpecGridExtraction, MergeError> {
    let grid = read_first_sheet(path)?;
    process_grid(&grid, labels, options)
}

pub(crate) fn validate_unique_labels(labels: &[String]) -> Result<(), MergeError> {
    let mut set_seen = BTreeSet::new();
    for label in labels {
        if !set_seen.insert(label.as_str()) {
            return Err(MergeError::DuplicateLabel {
                label: label.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn derive_grid(rows: Vec<Vec<EnumCellValue>>) -> SpecRawGrid {
        SpecRawGrid::new(rows)
    }

    #[test]
    fn process_grid_extracts_two_columns_and_drops_digit_names() {
        let grid = derive_grid(vec![
            vec!["姓名".into(), "身份证号".into()],
            vec!["张三".into(), "110101199001011234".into()],
            vec!["12345".into(), "x".into()],
            vec!["李四".into(), "110101199202022345".into()],
        ]);
        let output = process_grid(
            &grid,
            &labels(&["姓名", "身份证号"]),
            &SpecExtractOptions::default(),
        )
        .expect("extract");

        assert_eq!(output.table.columns(), labels(&["姓名", "身份证号"]).as_slice());
        let l_rows_expected: Vec<Vec<EnumCellValue>> = vec![
            vec!["张三".into(), "110101199001011234".into()],
            vec!["李四".into(), "110101199202022345".into()],
        ];
        assert_eq!(output.table.rows(), l_rows_expected.as_slice());
    }

    #[test]
    fn extract_starts_below_lowest_label_and_orders_by_request() {
        let grid = derive_grid(vec![
            vec!["工资表".into(), EnumCellValue::Empty, EnumCellValue::Empty],
            vec!["应付工资".into(), EnumCellValue::Empty, "姓名".into()],
            vec![EnumCellValue::Empty, "部门".into(), EnumCellValue::Empty],
            vec![100.0.into(), "财务".into(), "张三".into()],
            vec![200.0.into(), "人事".into(), EnumCellValue::Empty],
        ]);
        let output = process_grid(
            &grid,
            &labels(&["姓名", "部门", "应付工资", "实发工资"]),
            &SpecExtractOptions::default(),
        )
        .expect("extract");

        assert_eq!(output.table.columns(), labels(&["姓名", "部门", "应付工资"]).as_slice());
        assert_eq!(
            output.table.rows(),
            &[vec!["张三".into(), "财务".into(), EnumCellValue::Number(100.0)]]
        );
        assert_eq!(output.locate.labels_missing, labels(&["实发工资"]));
    }

    #[test]
    fn extract_drops_integral_number_identity_values() {
        let grid = derive_grid(vec![
            vec!["姓名".into()],
            vec![EnumCellValue::Number(7.0)],
            vec!["王五".into()],
        ]);
        let output =
            process_grid(&grid, &labels(&["姓名"]), &SpecExtractOptions::default()).expect("ok");
        assert_eq!(output.table.rows(), &[vec![EnumCellValue::from("王五")]]);
    }

    #[test]
    fn extract_drops_full_width_digit_identity_values() {
        let grid = derive_grid(vec![
            vec!["姓名".into()],
            vec!["１２３".into()],
            vec!["张三".into()],
        ]);
        let output =
            process_grid(&grid, &labels(&["姓名"]), &SpecExtractOptions::default()).expect("ok");
        assert_eq!(output.table.rows(), &[vec![EnumCellValue::from("张三")]]);
    }

    #[test]
    fn extract_far_from_a1_reports_missing_identity() {
        let grid = SpecRawGrid::with_origin(
            200_000,
            10_000,
            vec![vec!["姓名".into()], vec!["张三".into()]],
        );
        let err = process_grid(&grid, &labels(&["姓名"]), &SpecExtractOptions::default())
            .expect_err("label below the header window");
        assert!(matches!(err, MergeError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn extract_requires_identity_label() {
        let grid = derive_grid(vec![vec!["身份证号".into()], vec!["1".into()]]);

        let err = process_grid(&grid, &labels(&["身份证号"]), &SpecExtractOptions::default())
            .expect_err("identity not requested");
        assert!(matches!(err, MergeError::MissingRequiredColumn { ref label } if label == "姓名"));

        let err = process_grid(
            &grid,
            &labels(&["姓名", "身份证号"]),
            &SpecExtractOptions::default(),
        )
        .expect_err("identity not found");
        assert!(matches!(err, MergeError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn extract_honours_custom_identity_label() {
        let grid = derive_grid(vec![vec!["员工".into()], vec!["张三".into()]]);
        let options = SpecExtractOptions {
            label_identity: "员工".to_string(),
            ..Default::default()
        };
        let output = process_grid(&grid, &labels(&["员工"]), &options).expect("extract");
        assert_eq!(output.table.height(), 1);
    }

    #[test]
    fn process_grid_rejects_duplicate_labels() {
        let err = process_grid(
            &SpecRawGrid::default(),
            &labels(&["姓名", "姓名"]),
            &SpecExtractOptions::default(),
        )
        .expect_err("duplicate");
        assert!(matches!(err, MergeError::DuplicateLabel { ref label } if label == "姓名"));
    }

    #[test]
    fn process_file_bytes_reads_first_sheet() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(2, 0, "姓名").expect("write");
        worksheet.write_string(2, 1, "应付工资").expect("write");
        worksheet.write_string(3, 0, "张三").expect("write");
        worksheet.write_number(3, 1, 5200.0).expect("write");
        let v_bytes = workbook.save_to_buffer().expect("save");

        let output = process_file_bytes(
            &v_bytes,
            &labels(&["姓名", "应付工资"]),
            &SpecExtractOptions::default(),
        )
        .expect("extract");
        assert_eq!(
            output.table.rows(),
            &[vec!["张三".into(), EnumCellValue::Number(5200.0)]]
        );

        let err = process_file_bytes(b"garbage", &labels(&["姓名"]), &SpecExtractOptions::default())
            .expect_err("unreadable");
        assert!(matches!(err, MergeError::UnreadableFile(_)));
    }
}

//! Tables loaded from an explicitly chosen header row.

use std::collections::{BTreeMap, BTreeSet};

use sheetkit_io_xlsx::{EnumCellValue, SpecRawGrid, read_first_sheet_from_bytes};

use crate::spec::{C_COLUMN_NAME_PLACEHOLDER, MergeError};
use crate::table::SpecExtractedTable;

/// Make column names pairwise distinct.
///
/// Missing names become `Unnamed`. Repeats get `.1`, `.2`, ... suffixes in
/// order of appearance, skipping suffixes that would collide with a name
/// already in use.
pub fn make_column_names_unique(names: &[Option<String>]) -> Vec<String> {
    let l_names: Vec<String> = names
        .iter()
        .map(|name| match name {
            Some(c_name) if !c_name.is_empty() => c_name.clone(),
            _ => C_COLUMN_NAME_PLACEHOLDER.to_string(),
        })
        .collect();

    let mut set_used: BTreeSet<String> = BTreeSet::new();
    let mut dict_cnt_seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut l_out = Vec::with_capacity(l_names.len());

    for c_name in l_names {
        let n_cnt_seen = dict_cnt_seen.entry(c_name.clone()).or_insert(0);
        let mut c_unique = c_name.clone();
        if *n_cnt_seen > 0 || set_used.contains(&c_unique) {
            let mut n_suffix = usize::max(*n_cnt_seen, 1);
            c_unique = format!("{c_name}.{n_suffix}");
            while set_used.contains(&c_unique) {
                n_suffix += 1;
                c_unique = format!("{c_name}.{n_suffix}");
            }
            *n_cnt_seen = n_suffix;
        }
        *n_cnt_seen += 1;
        set_used.insert(c_unique.clone());
        l_out.push(c_unique);
    }

    l_out
}

/// Build a table using sheet row `header_row_1based` as column names.
///
/// Columns span the sheet's used range. Rows below the header become the
/// body; rows whose cells are all missing are skipped.
pub fn read_table_with_header_row(
    grid: &SpecRawGrid,
    header_row_1based: usize,
) -> Result<SpecExtractedTable, MergeError> {
    if header_row_1based == 0 || header_row_1based > grid.height() {
        return Err(MergeError::InvalidHeaderRow {
            row: header_row_1based,
            height: grid.height(),
        });
    }
    let n_idx_header = header_row_1based - 1;

    let l_idx_cols: Vec<usize> = (grid.col_start()..grid.width()).collect();

    let l_names: Vec<Option<String>> = l_idx_cols
        .iter()
        .map(|n_idx_col| grid.get(n_idx_header, *n_idx_col))
        .map(|cell| (!cell.is_missing()).then(|| cell.to_string()))
        .collect();
    let l_columns = make_column_names_unique(&l_names);

    let l_rows: Vec<Vec<EnumCellValue>> = (header_row_1based..grid.height())
        .map(|n_idx_row| {
            l_idx_cols
                .iter()
                .map(|n_idx_col| grid.get(n_idx_row, *n_idx_col).clone())
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.iter().all(EnumCellValue::is_missing))
        .collect();

    Ok(SpecExtractedTable::new(l_columns, l_rows))
}

/// Read the first sheet of a workbook and apply [`read_table_with_header_row`].
pub fn read_table_from_bytes(
    v_bytes: &[u8],
    header_row_1based: usize,
) -> Result<SpecExtractedTable, MergeError> {
    let grid = read_first_sheet_from_bytes(v_bytes)?;
    read_table_with_header_row(&grid, header_row_1based)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::table::write_table_to_bytes;

    fn names(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(ToString::to_string)).collect()
    }

    fn strs(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn make_column_names_unique_suffixes_repeats() {
        assert_eq!(
            make_column_names_unique(&names(&[Some("N"), Some("N"), Some("N")])),
            strs(&["N", "N.1", "N.2"])
        );
    }

    #[test]
    fn make_column_names_unique_fills_placeholders() {
        assert_eq!(
            make_column_names_unique(&names(&[None, Some(""), Some("a")])),
            strs(&["Unnamed", "Unnamed.1", "a"])
        );
    }

    #[test]
    fn make_column_names_unique_skips_taken_suffixes() {
        assert_eq!(
            make_column_names_unique(&names(&[Some("a"), Some("a.1"), Some("a")])),
            strs(&["a", "a.1", "a.2"])
        );
        assert_eq!(
            make_column_names_unique(&names(&[Some("a.1"), Some("a"), Some("a")])),
            strs(&["a.1", "a", "a.2"])
        );
    }

    #[test]
    fn make_column_names_unique_is_identity_on_distinct_names() {
        let l_names = names(&[Some("姓名"), Some("工资"), Some("x.1")]);
        let l_out = make_column_names_unique(&l_names);
        assert_eq!(l_out, strs(&["姓名", "工资", "x.1"]));
        let l_again: Vec<Option<String>> = l_out.iter().cloned().map(Some).collect();
        assert_eq!(make_column_names_unique(&l_again), l_out);
    }

    #[test]
    fn read_table_with_header_row_skips_blank_rows() {
        let grid = SpecRawGrid::new(vec![
            vec!["标题".into()],
            vec!["姓名".into(), EnumCellValue::Empty, "姓名".into()],
            vec!["张三".into(), 1.0.into(), "x".into()],
            vec![EnumCellValue::Empty, EnumCellValue::Empty, EnumCellValue::Empty],
            vec!["李四".into(), EnumCellValue::Empty, EnumCellValue::Empty],
        ]);
        let table = read_table_with_header_row(&grid, 2).expect("table");

        assert_eq!(table.columns(), strs(&["姓名", "Unnamed", "姓名.1"]).as_slice());
        assert_eq!(table.height(), 2);
        assert_eq!(table.rows()[1][0], EnumCellValue::from("李四"));
    }

    #[test]
    fn read_table_with_header_row_uses_the_used_column_range() {
        let grid = SpecRawGrid::with_origin(
            1,
            3,
            vec![
                vec!["姓名".into(), "应付工资".into()],
                vec!["张三".into(), 5000.0.into()],
            ],
        );
        let table = read_table_with_header_row(&grid, 2).expect("table");

        assert_eq!(table.columns(), strs(&["姓名", "应付工资"]).as_slice());
        assert_eq!(
            table.rows(),
            &[vec![EnumCellValue::from("张三"), EnumCellValue::Number(5000.0)]]
        );
    }

    #[test]
    fn read_table_with_header_row_validates_range() {
        let grid = SpecRawGrid::new(vec![vec!["a".into()]]);
        assert!(matches!(
            read_table_with_header_row(&grid, 0),
            Err(MergeError::InvalidHeaderRow { row: 0, height: 1 })
        ));
        assert!(matches!(
            read_table_with_header_row(&grid, 2),
            Err(MergeError::InvalidHeaderRow { row: 2, height: 1 })
        ));
        assert_eq!(read_table_with_header_row(&grid, 1).expect("ok").height(), 0);
    }

    #[test]
    fn written_table_reads_back_with_header_row_one() {
        let table = SpecExtractedTable::new(
            strs(&["姓名", "身份证号", "应付工资"]),
            vec![
                vec!["张三".into(), "110101199001011234".into(), 5000.0.into()],
                vec!["李四".into(), "110101199202022345".into(), 6100.5.into()],
            ],
        );
        let v_bytes = write_table_to_bytes(&table, "Sheet1").expect("bytes");

        assert_eq!(read_table_from_bytes(&v_bytes, 1).expect("table"), table);
    }
}

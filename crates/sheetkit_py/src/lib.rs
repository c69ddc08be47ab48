use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyAny, PyBytes, PyFloat, PyString};
use sheetkit_io_xlsx::{EnumCellValue, read_first_sheet_from_bytes};
use sheetkit_merge::spec::C_AUDIT_RESULT_COLUMN_DEFAULT;
use sheetkit_merge::{
    C_LABEL_IDENTITY_DEFAULT, C_SHEET_NAME_MERGED, MergeError, N_ROWS_HEADER_WINDOW_DEFAULT,
    SpecAuditOptions, SpecExtractOptions, SpecExtractedTable, SpecInputFile, SpecMergeOutput,
    aggregate_by_identity, audit_table, discover_candidate_labels, merge_files_with_progress,
    read_table_from_bytes, split_by_value, write_table_to_bytes,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetkit.merge.v1";
const C_BRIDGE_TRANSPORT: &str = "xlsx_bytes";

/// Result of `merge_files`: counters, diagnostics and the combined table.
#[pyclass(name = "ReportMerge")]
struct PyReportMerge {
    inner: SpecMergeOutput,
}

#[pymethods]
impl PyReportMerge {
    #[getter]
    fn cnt_files(&self) -> u64 {
        self.inner.report.cnt_files
    }

    #[getter]
    fn cnt_succeeded(&self) -> u64 {
        self.inner.report.cnt_succeeded
    }

    #[getter]
    fn cnt_failed(&self) -> u64 {
        self.inner.report.cnt_failed
    }

    #[getter]
    fn cnt_rows(&self) -> u64 {
        self.inner.report.cnt_rows
    }

    #[getter]
    fn seconds_elapsed(&self) -> f64 {
        self.inner.report.elapsed_total.as_secs_f64()
    }

    #[getter]
    fn errors(&self) -> Vec<(String, String)> {
        self.inner
            .report
            .errors
            .iter()
            .map(|err| (err.name.clone(), err.exception.clone()))
            .collect()
    }

    #[getter]
    fn warnings(&self) -> Vec<String> {
        self.inner.report.warnings.clone()
    }

    #[getter]
    fn columns(&self) -> Vec<String> {
        self.inner.table.columns().to_vec()
    }

    fn has_succeeded(&self) -> bool {
        self.inner.report.has_succeeded()
    }

    fn to_dict(&self) -> std::collections::BTreeMap<String, u64> {
        self.inner.report.to_dict()
    }

    fn rows(&self, py: Python<'_>) -> PyResult<Vec<Vec<Py<PyAny>>>> {
        convert_table_rows(py, &self.inner.table)
    }

    fn to_xlsx_bytes<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let v_bytes = write_table_to_bytes(&self.inner.table, C_SHEET_NAME_MERGED)
            .map_err(convert_merge_error)?;
        Ok(PyBytes::new(py, &v_bytes))
    }

    fn __repr__(&self) -> String {
        self.inner.report.format("ReportMerge")
    }

    fn __str__(&self) -> String {
        self.inner.report.to_string()
    }
}

/// Sorted CJK-only labels found in the header window of the first sheet.
#[pyfunction]
#[pyo3(signature = (data, n_rows_window = N_ROWS_HEADER_WINDOW_DEFAULT))]
fn find_possible_columns(data: &[u8], n_rows_window: usize) -> PyResult<Vec<String>> {
    let grid = read_first_sheet_from_bytes(data)
        .map_err(|err| convert_merge_error(MergeError::from(err)))?;
    Ok(discover_candidate_labels(&grid, n_rows_window)
        .into_iter()
        .collect())
}

/// Merge `(name, bytes)` workbooks into one table of `columns`.
///
/// `on_progress`, when given, is called as
/// `on_progress(n_done, n_total, cnt_succeeded, cnt_failed)` after each file.
#[pyfunction]
#[pyo3(signature = (
    files,
    columns,
    label_identity = C_LABEL_IDENTITY_DEFAULT.to_string(),
    on_progress = None,
    n_rows_window = N_ROWS_HEADER_WINDOW_DEFAULT
))]
fn merge_files<'py>(
    files: Vec<(String, Bound<'py, PyBytes>)>,
    columns: Vec<String>,
    label_identity: String,
    on_progress: Option<Bound<'py, PyAny>>,
    n_rows_window: usize,
) -> PyResult<PyReportMerge> {
    let l_files: Vec<SpecInputFile> = files
        .into_iter()
        .map(|(name, data)| SpecInputFile::new(name, data.as_bytes().to_vec()))
        .collect();
    let options = SpecExtractOptions {
        label_identity,
        n_rows_header_window: n_rows_window,
    };

    let mut err_callback: Option<PyErr> = None;
    let output = merge_files_with_progress(&l_files, &columns, &options, |progress| {
        if err_callback.is_some() {
            return;
        }
        if let Some(callback) = on_progress.as_ref().filter(|cb| !cb.is_none())
            && let Err(err) = callback.call1((
                progress.n_done,
                progress.n_total,
                progress.cnt_succeeded,
                progress.cnt_failed,
            ))
        {
            err_callback = Some(err);
        }
    })
    .map_err(convert_merge_error)?;

    if let Some(err) = err_callback {
        return Err(err);
    }
    Ok(PyReportMerge { inner: output })
}

/// Table of the first sheet using `header_row` (1-based) as column names.
#[pyfunction]
fn read_sheet(
    py: Python<'_>,
    data: &[u8],
    header_row: usize,
) -> PyResult<(Vec<String>, Vec<Vec<Py<PyAny>>>)> {
    let table = read_table_from_bytes(data, header_row).map_err(convert_merge_error)?;
    let l_rows = convert_table_rows(py, &table)?;
    Ok((table.columns().to_vec(), l_rows))
}

/// Workbook holding the rows whose `column` equals `value`.
#[pyfunction]
fn split_sheet<'py>(
    py: Python<'py>,
    data: &[u8],
    header_row: usize,
    column: &str,
    value: &str,
) -> PyResult<Bound<'py, PyBytes>> {
    let table = read_table_from_bytes(data, header_row).map_err(convert_merge_error)?;
    let table_part = split_by_value(&table, column, value).map_err(convert_merge_error)?;
    let v_bytes =
        write_table_to_bytes(&table_part, C_SHEET_NAME_MERGED).map_err(convert_merge_error)?;
    Ok(PyBytes::new(py, &v_bytes))
}

/// Distinct values of `column`, in first-appearance order.
#[pyfunction]
fn list_split_values(data: &[u8], header_row: usize, column: &str) -> PyResult<Vec<String>> {
    let table = read_table_from_bytes(data, header_row).map_err(convert_merge_error)?;
    sheetkit_merge::list_split_values(&table, column).map_err(convert_merge_error)
}

/// Audited workbook plus the number of flagged rows.
#[pyfunction]
#[pyo3(signature = (
    data,
    header_row,
    col_identity_number = None,
    col_bank_account = None,
    col_name = None,
    col_result = C_AUDIT_RESULT_COLUMN_DEFAULT.to_string()
))]
fn audit_sheet<'py>(
    py: Python<'py>,
    data: &[u8],
    header_row: usize,
    col_identity_number: Option<String>,
    col_bank_account: Option<String>,
    col_name: Option<String>,
    col_result: String,
) -> PyResult<(Bound<'py, PyBytes>, usize)> {
    let table = read_table_from_bytes(data, header_row).map_err(convert_merge_error)?;
    let options = SpecAuditOptions {
        col_identity_number,
        col_bank_account,
        col_name,
        col_result,
    };
    let output = audit_table(&table, &options).map_err(convert_merge_error)?;
    let v_bytes =
        write_table_to_bytes(&output.table, C_SHEET_NAME_MERGED).map_err(convert_merge_error)?;
    Ok((PyBytes::new(py, &v_bytes), output.cnt_flagged))
}

/// Workbook with one row per identity plus the identities that were merged.
#[pyfunction]
fn merge_duplicates<'py>(
    py: Python<'py>,
    data: &[u8],
    header_row: usize,
    col_identity: &str,
    cols_sum: Vec<String>,
) -> PyResult<(Bound<'py, PyBytes>, Vec<String>)> {
    let table = read_table_from_bytes(data, header_row).map_err(convert_merge_error)?;
    let output =
        aggregate_by_identity(&table, col_identity, &cols_sum).map_err(convert_merge_error)?;
    let v_bytes =
        write_table_to_bytes(&output.table, C_SHEET_NAME_MERGED).map_err(convert_merge_error)?;
    Ok((PyBytes::new(py, &v_bytes), output.keys_merged))
}

fn convert_table_rows(
    py: Python<'_>,
    table: &SpecExtractedTable,
) -> PyResult<Vec<Vec<Py<PyAny>>>> {
    table
        .rows()
        .iter()
        .map(|row| row.iter().map(|cell| convert_cell_to_py(py, cell)).collect())
        .collect()
}

fn convert_cell_to_py(py: Python<'_>, cell: &EnumCellValue) -> PyResult<Py<PyAny>> {
    Ok(match cell {
        EnumCellValue::Empty => py.None(),
        EnumCellValue::Text(c_text) => PyString::new(py, c_text).into_any().unbind(),
        EnumCellValue::Number(n) => PyFloat::new(py, *n).into_any().unbind(),
        EnumCellValue::Date(_) => PyString::new(py, &cell.to_string()).into_any().unbind(),
    })
}

fn convert_merge_error(err: MergeError) -> PyErr {
    match err {
        MergeError::DataFrame(_) | MergeError::WriteFailed(_) => {
            PyRuntimeError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

#[pymodule]
fn _sheetkit_rs(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyReportMerge>()?;
    module.add_function(wrap_pyfunction!(find_possible_columns, module)?)?;
    module.add_function(wrap_pyfunction!(merge_files, module)?)?;
    module.add_function(wrap_pyfunction!(read_sheet, module)?)?;
    module.add_function(wrap_pyfunction!(split_sheet, module)?)?;
    module.add_function(wrap_pyfunction!(list_split_values, module)?)?;
    module.add_function(wrap_pyfunction!(audit_sheet, module)?)?;
    module.add_function(wrap_pyfunction!(merge_duplicates, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}

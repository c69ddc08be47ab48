//! Per-row data checks for identity numbers, bank accounts and names.

use sheetkit_io_xlsx::EnumCellValue;
use tracing::info;

use crate::spec::{
    C_AUDIT_MESSAGE_SEPARATOR, C_AUDIT_PASS_MARKER, MergeError, N_LEN_BANK_ACCOUNT_TOO_SHORT,
    N_LEN_IDENTITY_NUMBER, SpecAuditOptions, SpecAuditOutput,
};
use crate::table::SpecExtractedTable;

/// Run the selected checks on every row of `table`.
///
/// Findings never fail the call: each row gets a result cell holding either
/// the pass marker or its messages. Whitespace is stripped from bank-account
/// and name values that contain any. An existing result column is replaced.
pub fn audit_table(
    table: &SpecExtractedTable,
    options: &SpecAuditOptions,
) -> Result<SpecAuditOutput, MergeError> {
    let col_identity_number = resolve_column(table, options.col_identity_number.as_deref())?;
    let col_bank_account = resolve_column(table, options.col_bank_account.as_deref())?;
    let col_name = resolve_column(table, options.col_name.as_deref())?;

    let mut l_columns = table.columns().to_vec();
    let n_idx_result = match l_columns.iter().position(|c| *c == options.col_result) {
        Some(n_idx) => n_idx,
        None => {
            l_columns.push(options.col_result.clone());
            l_columns.len() - 1
        }
    };

    let mut l_rows = Vec::with_capacity(table.height());
    let mut messages_by_row = Vec::with_capacity(table.height());
    for row in table.rows() {
        let mut row_out = row.clone();
        row_out.resize(l_columns.len(), EnumCellValue::Empty);
        let mut l_messages = Vec::new();

        if let Some((n_idx, c_col)) = col_identity_number {
            let n_len = row[n_idx].to_string().chars().count();
            if n_len != N_LEN_IDENTITY_NUMBER {
                l_messages.push(format!(
                    "{c_col}长度为{n_len}位，应为{N_LEN_IDENTITY_NUMBER}位"
                ));
            }
        }

        if let Some((n_idx, c_col)) = col_bank_account {
            let c_stripped = check_whitespace(&mut row_out[n_idx], c_col, &mut l_messages);
            if c_stripped.chars().count() <= N_LEN_BANK_ACCOUNT_TOO_SHORT {
                l_messages.push(format!(
                    "{c_col}长度不超过{N_LEN_BANK_ACCOUNT_TOO_SHORT}位"
                ));
            }
        }

        if let Some((n_idx, c_col)) = col_name {
            check_whitespace(&mut row_out[n_idx], c_col, &mut l_messages);
        }

        row_out[n_idx_result] = EnumCellValue::Text(if l_messages.is_empty() {
            C_AUDIT_PASS_MARKER.to_string()
        } else {
            l_messages.join(C_AUDIT_MESSAGE_SEPARATOR)
        });
        l_rows.push(row_out);
        messages_by_row.push(l_messages);
    }

    let cnt_flagged = messages_by_row.iter().filter(|l| !l.is_empty()).count();
    info!(n_rows = table.height(), cnt_flagged, "audit finished");

    Ok(SpecAuditOutput {
        table: SpecExtractedTable::new(l_columns, l_rows),
        messages_by_row,
        cnt_flagged,
    })
}

fn resolve_column<'a>(
    table: &SpecExtractedTable,
    col: Option<&'a str>,
) -> Result<Option<(usize, &'a str)>, MergeError> {
    match col {
        Some(c_name) => Ok(Some((table.column_index(c_name)?, c_name))),
        None => Ok(None),
    }
}

/// Flag and strip whitespace in `value`; returns the stripped text.
fn check_whitespace(
    value: &mut EnumCellValue,
    c_col: &str,
    l_messages: &mut Vec<String>,
) -> String {
    let c_text = value.to_string();
    if !c_text.chars().any(char::is_whitespace) {
        return c_text;
    }
    l_messages.push(format!("{c_col}包含空格"));
    let c_stripped: String = c_text.chars().filter(|chr| !chr.is_whitespace()).collect();
    *value = EnumCellValue::from(c_stripped.clone());
    c_stripped
}

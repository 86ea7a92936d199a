//! Column/row to record reshaping.

use crate::types::Record;

/// Whether `row` is an echo of the column header.
///
/// Athena includes the header as the first row of the first page for most
/// statement types, but not all of them, so the check compares values
/// positionally instead of trusting the page index.
pub fn is_header_row(columns: &[String], row: &[String]) -> bool {
    !columns.is_empty() && columns == row
}

/// Zip column names with each row's values, one [`Record`] per row.
///
/// Rows are not validated: a short row produces a record without the
/// trailing columns, surplus values are dropped.
pub fn reshape(columns: &[String], rows: &[Vec<String>]) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        })
        .collect()
}

/// Reshape one page, dropping its first row when it repeats the header.
pub fn reshape_page(columns: &[String], rows: &[Vec<String>]) -> Vec<Record> {
    match rows.first() {
        Some(first) if is_header_row(columns, first) => reshape(columns, &rows[1..]),
        _ => reshape(columns, rows),
    }
}

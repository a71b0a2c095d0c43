//! Spreadsheet output: one worksheet per extracted table.

use crate::extract::ExtractedTable;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error(transparent)]
    Xlsx(#[from] XlsxError),

    #[error("table {table} is too large for a worksheet ({rows} rows, {columns} columns)")]
    TooLarge { table: usize, rows: usize, columns: usize },
}

/// `Tabela_1`, `Tabela_2`, ... for zero-based `index`.
pub fn sheet_name(index: usize) -> String {
    format!("Tabela_{}", index + 1)
}

/// Numeric cells go in as numbers so spreadsheet formulas work on them.
fn parse_number(cell: &str) -> Option<f64> {
    let value: f64 = cell.parse().ok()?;
    value.is_finite().then_some(value)
}

fn write_row(
    sheet: &mut Worksheet,
    row: u32,
    cells: &[String],
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    for (col, cell) in cells.iter().enumerate() {
        // Column count is checked against u16 before any row is written
        let col = col as u16;
        if cell.is_empty() {
            continue;
        }
        match (format, parse_number(cell)) {
            (Some(format), _) => sheet.write_string_with_format(row, col, cell, format)?,
            (None, Some(number)) => sheet.write_number(row, col, number)?,
            (None, None) => sheet.write_string(row, col, cell)?,
        };
    }
    Ok(())
}

/// Write `tables` to a new workbook at `path`, replacing any existing file.
///
/// Each sheet holds the header in the first row (bold) followed by the data
/// rows in their original order.
pub fn write_workbook(path: &Path, tables: &[ExtractedTable]) -> Result<(), WorkbookError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for (index, table) in tables.iter().enumerate() {
        let too_large = || WorkbookError::TooLarge {
            table: index + 1,
            rows: table.rows.len() + 1,
            columns: table.width(),
        };
        let row_count = u32::try_from(table.rows.len() + 1).map_err(|_| too_large())?;
        let columns = table.rows.iter().map(Vec::len).chain([table.width()]).max().unwrap_or(0);
        u16::try_from(columns).map_err(|_| too_large())?;

        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(index))?;

        write_row(sheet, 0, &table.header, Some(&header_format))?;
        for (row, cells) in (1..row_count).zip(&table.rows) {
            write_row(sheet, row, cells, None)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

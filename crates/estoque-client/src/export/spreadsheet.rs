//! `.xlsx` generation with `rust_xlsxwriter`.

use estoque_core::export::{Cell, ExportFormat, ExportTable};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::{DocumentExporter, ExportError};

/// Excel limits worksheet names to 31 characters.
const MAX_SHEET_NAME: usize = 31;
const MIN_COLUMN_WIDTH: usize = 8;
const MAX_COLUMN_WIDTH: usize = 60;
/// Excel's worksheet column limit (XFD).
const MAX_COLUMNS: usize = 16_384;

/// One worksheet: bold frozen header row, then the data rows.
#[derive(Debug, Default, Clone)]
pub struct SpreadsheetExporter;

impl SpreadsheetExporter {
    pub fn new() -> Self {
        SpreadsheetExporter
    }

    fn build(&self, table: &ExportTable) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&table.title))?;

        for (col, header) in table.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }
        worksheet.set_freeze_panes(1, 0)?;

        for (i, row) in table.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string(r, col as u16, text)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, col as u16, *n)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        for (col, width) in column_widths(table).into_iter().enumerate() {
            worksheet.set_column_width(col as u16, width as f64)?;
        }

        workbook.save_to_buffer()
    }
}

impl DocumentExporter for SpreadsheetExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Spreadsheet
    }

    fn render(&self, table: &ExportTable) -> Result<Vec<u8>, ExportError> {
        if table.column_count() > MAX_COLUMNS {
            return Err(ExportError::Render {
                format: ExportFormat::Spreadsheet,
                message: format!(
                    "{} columns exceed the worksheet limit of {MAX_COLUMNS}",
                    table.column_count()
                ),
            });
        }
        self.build(table).map_err(|e| ExportError::Render {
            format: ExportFormat::Spreadsheet,
            message: e.to_string(),
        })
    }
}

/// Strips characters Excel rejects in sheet names and truncates.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// Widest cell per column in characters, clamped.
fn column_widths(table: &ExportTable) -> Vec<usize> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.display().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
                .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
                + 2
        })
        .collect()
}

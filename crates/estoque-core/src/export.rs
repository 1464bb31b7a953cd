//! # Export Table Model
//!
//! Turns a row collection into the rectangular table the document
//! generators consume, and names the resulting file.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  rows: &[Product]  +  title  +  columns                                │
//! │                                   ├── Column::field("Nome", "name")     │
//! │                                   └── Column::derived("Status", |p| ..) │
//! │        │                                                                │
//! │        ▼  ExportTable::build()          (this module, pure)            │
//! │                                                                         │
//! │  ExportTable { title, headers, rows: Vec<Vec<Cell>> }                  │
//! │        │                                                                │
//! │        ▼  DocumentExporter::render()    (estoque-client, I/O)          │
//! │                                                                         │
//! │  produtos-em-estoque-2024-12-31.xlsx                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::format::iso_date;

// =============================================================================
// Formats
// =============================================================================

/// Output document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Spreadsheet,
    Pdf,
}

impl ExportFormat {
    pub const fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub const fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "format".to_string(),
                allowed: vec!["xlsx".to_string(), "pdf".to_string()],
            }),
        }
    }
}

// =============================================================================
// Cells & Columns
// =============================================================================

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Display text, used by the paginated document.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }

    fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Text(b.to_string()),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Where a column's value comes from.
pub enum ColumnSource<R> {
    /// A field of the row's JSON representation. Dotted paths reach into
    /// nested objects (`"address.city"`).
    Field(String),
    /// Computed from the row.
    Derived(Box<dyn Fn(&R) -> Cell + Send + Sync>),
}

impl<R> fmt::Debug for ColumnSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSource::Field(name) => f.debug_tuple("Field").field(name).finish(),
            ColumnSource::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// A column: its header and how to extract the cell.
#[derive(Debug)]
pub struct Column<R> {
    pub header: String,
    pub source: ColumnSource<R>,
}

impl<R> Column<R> {
    pub fn field(header: impl Into<String>, field: impl Into<String>) -> Self {
        Column {
            header: header.into(),
            source: ColumnSource::Field(field.into()),
        }
    }

    pub fn derived<F>(header: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&R) -> Cell + Send + Sync + 'static,
    {
        Column {
            header: header.into(),
            source: ColumnSource::Derived(Box::new(derive)),
        }
    }
}

// =============================================================================
// Table
// =============================================================================

/// A materialized table ready for a document generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ExportTable {
    /// Builds the table from rows and column definitions.
    ///
    /// An empty row collection yields a header-only table.
    pub fn build<R: Serialize>(
        title: impl Into<String>,
        rows: &[R],
        columns: &[Column<R>],
    ) -> CoreResult<ExportTable> {
        let title = title.into();
        if columns.is_empty() {
            return Err(CoreError::NoColumns { title });
        }

        let needs_json = columns
            .iter()
            .any(|c| matches!(c.source, ColumnSource::Field(_)));

        let rows = rows
            .iter()
            .map(|row| {
                // A row that fails to serialize only loses its field columns.
                let json = if needs_json {
                    serde_json::to_value(row).unwrap_or(Value::Null)
                } else {
                    Value::Null
                };
                columns
                    .iter()
                    .map(|column| match &column.source {
                        ColumnSource::Field(path) => lookup(&json, path)
                            .map(Cell::from_json)
                            .unwrap_or(Cell::Empty),
                        ColumnSource::Derived(derive) => derive(row),
                    })
                    .collect()
            })
            .collect();

        Ok(ExportTable {
            title,
            headers: columns.iter().map(|c| c.header.clone()).collect(),
            rows,
        })
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

// =============================================================================
// File Naming
// =============================================================================

/// Lowercases a title and turns every run of characters that are not
/// letters or digits into a single `-`. The result is safe as a file name.
///
/// ```rust
/// use estoque_core::export::slugify;
///
/// assert_eq!(slugify("Relatório de Vendas"), "relatório-de-vendas");
/// assert_eq!(slugify("  Low   Stock "), "low-stock");
/// assert_eq!(slugify("Vendas 03/2024"), "vendas-03-2024");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-').len();
    slug.truncate(trimmed);
    slug
}

/// `<slug(title)>-<YYYY-MM-DD>.<ext>`
pub fn export_file_name(title: &str, date: NaiveDate, format: ExportFormat) -> String {
    let slug = slugify(title);
    let slug = if slug.is_empty() { "export".to_string() } else { slug };
    format!("{slug}-{}.{}", iso_date(date), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        name: String,
        stock: i64,
        supplier: Option<Supplier>,
    }

    #[derive(Serialize)]
    struct Supplier {
        city: String,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "Café".to_string(),
                stock: 3,
                supplier: Some(Supplier {
                    city: "Campinas".to_string(),
                }),
            },
            Row {
                name: "Açúcar".to_string(),
                stock: 40,
                supplier: None,
            },
        ]
    }

    fn columns() -> Vec<Column<Row>> {
        vec![
            Column::field("Nome", "name"),
            Column::field("Estoque", "stock"),
            Column::field("Cidade", "supplier.city"),
            Column::derived("Baixo?", |r: &Row| {
                Cell::from(if r.stock <= 5 { "sim" } else { "não" })
            }),
        ]
    }

    #[test]
    fn test_build_table() {
        let table = ExportTable::build("Produtos", &rows(), &columns()).unwrap();
        assert_eq!(table.headers, vec!["Nome", "Estoque", "Cidade", "Baixo?"]);
        assert_eq!(
            table.rows[0],
            vec![
                Cell::Text("Café".to_string()),
                Cell::Number(3.0),
                Cell::Text("Campinas".to_string()),
                Cell::Text("sim".to_string()),
            ]
        );
        assert_eq!(table.rows[1][2], Cell::Empty);
    }

    #[test]
    fn test_empty_rows_keep_headers() {
        let table = ExportTable::build("Produtos", &Vec::<Row>::new(), &columns()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 4);
    }

    #[test]
    fn test_no_columns_is_an_error() {
        let err = ExportTable::build("Vazio", &rows(), &[]).unwrap_err();
        assert!(matches!(err, CoreError::NoColumns { .. }));
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(
            export_file_name("Estoque Baixo", date, ExportFormat::Spreadsheet),
            "estoque-baixo-2024-01-09.xlsx"
        );
        assert_eq!(export_file_name("   ", date, ExportFormat::Pdf), "export-2024-01-09.pdf");
    }

    #[test]
    fn test_file_name_strips_path_characters() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            export_file_name("Vendas 03/2024", date, ExportFormat::Pdf),
            "vendas-03-2024-2026-03-09.pdf"
        );
        assert_eq!(
            export_file_name("../../etc x", date, ExportFormat::Pdf),
            "etc-x-2026-03-09.pdf"
        );
        assert_eq!(
            export_file_name(r"C:\temp: a--b", date, ExportFormat::Spreadsheet),
            "c-temp-a-b-2026-03-09.xlsx"
        );
        assert_eq!(export_file_name("../..", date, ExportFormat::Pdf), "export-2026-03-09.pdf");
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(12.0).display(), "12");
        assert_eq!(Cell::Number(12.5).display(), "12.5");
        assert_eq!(Cell::Empty.display(), "");
        assert_eq!(Cell::from(Some(7_i64)), Cell::Number(7.0));
        assert_eq!(Cell::from(None::<String>), Cell::Empty);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Spreadsheet);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!("csv".parse::<ExportFormat>().is_err());
    }
}

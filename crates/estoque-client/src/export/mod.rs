//! # Document Export
//!
//! Renders an [`ExportTable`] into a file and hands it to a download sink.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ExportService::export(table, format, date)                            │
//! │        │                                                                │
//! │        ├──► DocumentExporter (per format)                               │
//! │        │      SpreadsheetExporter   feature "xlsx"                      │
//! │        │      PdfExporter           feature "pdf"                       │
//! │        │      UnavailableExporter   when the feature is off             │
//! │        │                                                                │
//! │        └──► DownloadSink                                                │
//! │               DirectorySink   writes <dir>/<slug>-<YYYY-MM-DD>.<ext>    │
//! │               MemorySink      keeps bytes in memory                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing generator is an ordinary `Unavailable` error: logged here and
//! shown to the user as a notice.

#[cfg(feature = "pdf")]
mod pdf;
#[cfg(feature = "xlsx")]
mod spreadsheet;

#[cfg(feature = "pdf")]
pub use pdf::PdfExporter;
#[cfg(feature = "xlsx")]
pub use spreadsheet::SpreadsheetExporter;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use estoque_core::export::{export_file_name, Column, ExportFormat, ExportTable};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("{format} export is unavailable: {reason}")]
    Unavailable { format: ExportFormat, reason: String },

    #[error("Failed to render {format}: {message}")]
    Render { format: ExportFormat, message: String },

    #[error("Failed to save {file_name}: {message}")]
    Delivery { file_name: String, message: String },
}

impl From<ExportError> for ClientError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Unavailable { .. } => ClientError::Unavailable(err.to_string()),
            other => ClientError::Export(other),
        }
    }
}

// =============================================================================
// Exporters
// =============================================================================

/// Renders a table into document bytes of one format.
pub trait DocumentExporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(&self, table: &ExportTable) -> Result<Vec<u8>, ExportError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in for a generator that is not compiled in or not installed.
#[derive(Debug, Clone)]
pub struct UnavailableExporter {
    format: ExportFormat,
    reason: String,
}

impl UnavailableExporter {
    pub fn new(format: ExportFormat, reason: impl Into<String>) -> Self {
        UnavailableExporter {
            format,
            reason: reason.into(),
        }
    }
}

impl DocumentExporter for UnavailableExporter {
    fn format(&self) -> ExportFormat {
        self.format
    }

    fn render(&self, _table: &ExportTable) -> Result<Vec<u8>, ExportError> {
        Err(ExportError::Unavailable {
            format: self.format,
            reason: self.reason.clone(),
        })
    }

    fn is_available(&self) -> bool {
        false
    }
}

fn default_spreadsheet_exporter() -> Arc<dyn DocumentExporter> {
    #[cfg(feature = "xlsx")]
    {
        Arc::new(SpreadsheetExporter::new())
    }
    #[cfg(not(feature = "xlsx"))]
    {
        Arc::new(UnavailableExporter::new(
            ExportFormat::Spreadsheet,
            "built without the xlsx feature",
        ))
    }
}

fn default_pdf_exporter() -> Arc<dyn DocumentExporter> {
    #[cfg(feature = "pdf")]
    {
        Arc::new(PdfExporter::new())
    }
    #[cfg(not(feature = "pdf"))]
    {
        Arc::new(UnavailableExporter::new(
            ExportFormat::Pdf,
            "built without the pdf feature",
        ))
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Where a finished file went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub size: usize,
    /// Path on disk, when the sink writes to one.
    pub path: Option<PathBuf>,
}

/// Delivers a rendered file to the user.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, file_name: &str, format: ExportFormat, bytes: Vec<u8>) -> Result<Download, ExportError>;
}

/// Writes files into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySink { dir: dir.into() }
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, file_name: &str, format: ExportFormat, bytes: Vec<u8>) -> Result<Download, ExportError> {
        let delivery_error = |e: std::io::Error| ExportError::Delivery {
            file_name: file_name.to_string(),
            message: e.to_string(),
        };

        std::fs::create_dir_all(&self.dir).map_err(delivery_error)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, &bytes).map_err(delivery_error)?;

        Ok(Download {
            file_name: file_name.to_string(),
            mime_type: format.mime_type(),
            size: bytes.len(),
            path: Some(path),
        })
    }
}

/// Keeps delivered files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, file_name: &str, format: ExportFormat, bytes: Vec<u8>) -> Result<Download, ExportError> {
        let size = bytes.len();
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((file_name.to_string(), bytes));
        Ok(Download {
            file_name: file_name.to_string(),
            mime_type: format.mime_type(),
            size,
            path: None,
        })
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct ExportService {
    spreadsheet: Arc<dyn DocumentExporter>,
    pdf: Arc<dyn DocumentExporter>,
    sink: Arc<dyn DownloadSink>,
}

impl ExportService {
    pub fn new(
        spreadsheet: Arc<dyn DocumentExporter>,
        pdf: Arc<dyn DocumentExporter>,
        sink: Arc<dyn DownloadSink>,
    ) -> Self {
        ExportService {
            spreadsheet,
            pdf,
            sink,
        }
    }

    /// Uses whichever generators this build includes.
    pub fn with_default_backends(sink: Arc<dyn DownloadSink>) -> Self {
        Self::new(default_spreadsheet_exporter(), default_pdf_exporter(), sink)
    }

    pub fn exporter(&self, format: ExportFormat) -> &Arc<dyn DocumentExporter> {
        match format {
            ExportFormat::Spreadsheet => &self.spreadsheet,
            ExportFormat::Pdf => &self.pdf,
        }
    }

    pub fn is_available(&self, format: ExportFormat) -> bool {
        self.exporter(format).is_available()
    }

    /// Renders `table` and delivers it as `<slug>-<date>.<ext>`.
    pub fn export(&self, table: &ExportTable, format: ExportFormat, date: NaiveDate) -> ClientResult<Download> {
        let bytes = match self.exporter(format).render(table) {
            Ok(bytes) => bytes,
            Err(err @ ExportError::Unavailable { .. }) => {
                warn!(%format, title = %table.title, error = %err, "Export backend unavailable");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let file_name = export_file_name(&table.title, date, format);
        let download = self.sink.deliver(&file_name, format, bytes)?;
        info!(
            file = %download.file_name,
            rows = table.rows.len(),
            bytes = download.size,
            "Export written"
        );
        Ok(download)
    }

    /// Builds the table from `rows` and exports it.
    pub fn export_rows<R: Serialize>(
        &self,
        title: &str,
        rows: &[R],
        columns: &[Column<R>],
        format: ExportFormat,
        date: NaiveDate,
    ) -> ClientResult<Download> {
        let table = ExportTable::build(title, rows, columns)?;
        self.export(&table, format, date)
    }
}

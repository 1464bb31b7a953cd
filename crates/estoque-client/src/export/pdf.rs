//! Paginated `.pdf` generation with `printpdf`.
//!
//! ```text
//! ┌──────────────────────────── A4 landscape ──────────────────────────────┐
//! │  Title                                                                 │
//! │  ───────────────────────────────────────────────────────────────────── │
//! │  Header 1        Header 2        Header 3        ...   (every page)    │
//! │  cell            cell            cell                                  │
//! │  ...                                                                   │
//! │                                                              1 / 3     │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use std::ops::Range;

use estoque_core::export::{ExportFormat, ExportTable};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use super::{DocumentExporter, ExportError};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 15.0;
const TITLE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 9.0;
const ROW_HEIGHT: f32 = 6.0;
/// Average Helvetica glyph width at 1pt, in mm.
const GLYPH_WIDTH_PER_PT: f32 = 0.19;

/// Rows that fit under the title and header on one page.
fn rows_per_page() -> usize {
    let top = PAGE_HEIGHT - MARGIN - 12.0 - ROW_HEIGHT;
    let usable = top - MARGIN - ROW_HEIGHT;
    (usable / ROW_HEIGHT).floor() as usize
}

/// Row ranges per page. An empty table still gets one page.
fn paginate(row_count: usize, per_page: usize) -> Vec<Range<usize>> {
    if row_count == 0 || per_page == 0 {
        return vec![0..0];
    }
    (0..row_count)
        .step_by(per_page)
        .map(|start| start..(start + per_page).min(row_count))
        .collect()
}

/// Cuts `text` to fit `width_mm` at `size` points.
fn fit(text: &str, width_mm: f32, size: f32) -> String {
    let max_chars = (width_mm / (size * GLYPH_WIDTH_PER_PT)).floor() as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut cut: String = text.chars().take(max_chars - 3).collect();
    cut.push_str("...");
    cut
}

/// One piece of text at a fixed position, in mm from the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
struct TextRun {
    text: String,
    size: f32,
    x: f32,
    y: f32,
    bold: bool,
}

/// Text runs per page: title, header row, the page's rows, page number.
fn layout(table: &ExportTable) -> Vec<Vec<TextRun>> {
    let columns = table.column_count().max(1);
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
    let x = |col: usize| MARGIN + col as f32 * column_width;

    let pages = paginate(table.rows.len(), rows_per_page());
    let total = pages.len();

    pages
        .into_iter()
        .enumerate()
        .map(|(index, range)| {
            let mut runs = Vec::new();
            let mut y = PAGE_HEIGHT - MARGIN;
            runs.push(TextRun {
                text: table.title.clone(),
                size: TITLE_SIZE,
                x: MARGIN,
                y,
                bold: true,
            });

            y -= 12.0;
            for (col, header) in table.headers.iter().enumerate() {
                runs.push(TextRun {
                    text: fit(header, column_width, BODY_SIZE),
                    size: BODY_SIZE,
                    x: x(col),
                    y,
                    bold: true,
                });
            }

            for row in &table.rows[range] {
                y -= ROW_HEIGHT;
                for (col, cell) in row.iter().enumerate() {
                    runs.push(TextRun {
                        text: fit(&cell.display(), column_width, BODY_SIZE),
                        size: BODY_SIZE,
                        x: x(col),
                        y,
                        bold: false,
                    });
                }
            }

            runs.push(TextRun {
                text: format!("{} / {total}", index + 1),
                size: BODY_SIZE,
                x: PAGE_WIDTH - MARGIN - 15.0,
                y: MARGIN / 2.0,
                bold: false,
            });
            runs
        })
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct PdfExporter;

impl PdfExporter {
    pub fn new() -> Self {
        PdfExporter
    }

    fn build(&self, table: &ExportTable) -> Result<Vec<u8>, printpdf::Error> {
        let (doc, first_page, first_layer) =
            PdfDocument::new(&table.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

        for (index, runs) in layout(table).into_iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                doc.get_page(page).get_layer(layer)
            };
            draw(&layer, runs, &regular, &bold);
        }

        doc.save_to_bytes()
    }
}

fn draw(
    layer: &PdfLayerReference,
    runs: Vec<TextRun>,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    for run in runs {
        let font = if run.bold { bold } else { regular };
        layer.use_text(run.text, run.size, Mm(run.x), Mm(run.y), font);
    }
}

impl DocumentExporter for PdfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, table: &ExportTable) -> Result<Vec<u8>, ExportError> {
        self.build(table).map_err(|e| ExportError::Render {
            format: ExportFormat::Pdf,
            message: e.to_string(),
        })
    }
}

//! Table extraction from PDF documents
//!
//! [`PdfTableExtractor`] drives pdf-extract through its positional output
//! device and rebuilds the page layout from glyph coordinates: glyphs that
//! share a baseline form a line, and a horizontal gap wider than about one
//! font size starts a new cell. A table is a run of at least two lines with
//! the same cell count, the first line of the run being the header. Every
//! page is scanned and a page may hold several tables.
//!
//! [`PdfTableExtractor::detect_tables`] applies the same run detection to
//! plain text, where cells are separated by a tab or by two or more spaces.

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use regex::Regex;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static CELL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t ]{2,}|\t").expect("valid separator regex"));

const PAGE_BREAK: char = '\u{0C}';

/// Gap between glyphs, in font sizes, above which a space is inserted
/// inside a cell when the PDF positions words without a space glyph.
const WORD_GAP: f64 = 0.15;

/// Fraction of the font size two baselines may differ by and still be
/// the same line.
const BASELINE_TOLERANCE: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Pdf(String),
}

/// A rectangular grid of cells with an inferred header row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    pub fn width(&self) -> usize {
        self.header.len()
    }
}

/// Anything that can turn a document on disk into tables, in document order.
pub trait TableExtractor: Send + Sync {
    fn extract_tables(&self, path: &Path) -> Result<Vec<ExtractedTable>, ExtractError>;
}

#[derive(Debug, Clone)]
pub struct PdfTableExtractor {
    /// Minimum lines (header included) for a run to count as a table.
    pub min_rows: usize,
    pub min_columns: usize,
    /// Horizontal gap, in font sizes, that separates two cells.
    pub cell_gap: f64,
}

impl Default for PdfTableExtractor {
    fn default() -> Self {
        Self { min_rows: 2, min_columns: 2, cell_gap: 1.0 }
    }
}

impl TableExtractor for PdfTableExtractor {
    fn extract_tables(&self, path: &Path) -> Result<Vec<ExtractedTable>, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        // pdf-extract panics on some malformed fonts and xref tables
        let pages = panic::catch_unwind(AssertUnwindSafe(|| layout_pages(&bytes)))
            .map_err(|_| ExtractError::Pdf(format!("PDF parser panicked on {}", path.display())))??;

        let tables: Vec<ExtractedTable> = pages
            .into_iter()
            .flat_map(|glyphs| self.detect_rows(page_lines(glyphs, self.cell_gap)))
            .collect();
        tracing::debug!(path = %path.display(), tables = tables.len(), "extracted tables");
        Ok(tables)
    }
}

impl PdfTableExtractor {
    /// Find tables in plain text. Form feeds mark page boundaries and
    /// always end a table.
    pub fn detect_tables(&self, text: &str) -> Vec<ExtractedTable> {
        text.split(PAGE_BREAK)
            .flat_map(|page| {
                let rows = page
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(split_cells);
                self.detect_rows(rows)
            })
            .collect()
    }

    /// Run detection over the lines of one page, already split into cells.
    fn detect_rows(&self, rows: impl IntoIterator<Item = Vec<String>>) -> Vec<ExtractedTable> {
        let mut tables = Vec::new();
        let mut run: Vec<Vec<String>> = Vec::new();

        for cells in rows {
            if cells.len() < self.min_columns {
                self.flush(&mut run, &mut tables);
                continue;
            }
            if run.first().is_some_and(|first| first.len() != cells.len()) {
                self.flush(&mut run, &mut tables);
            }
            run.push(cells);
        }
        self.flush(&mut run, &mut tables);

        tables
    }

    fn flush(&self, run: &mut Vec<Vec<String>>, tables: &mut Vec<ExtractedTable>) {
        if run.len() >= self.min_rows.max(1) {
            let mut lines = std::mem::take(run).into_iter();
            if let Some(header) = lines.next() {
                tables.push(ExtractedTable { header, rows: lines.collect() });
            }
        } else {
            run.clear();
        }
    }
}

fn split_cells(line: &str) -> Vec<String> {
    CELL_SEPARATOR
        .split(line.trim())
        .map(|cell| cell.trim().to_string())
        .collect()
}

// ============================================================================
// Page layout
// ============================================================================

/// One rendered glyph in page space (PDF units, y grows upwards).
#[derive(Debug, Clone, PartialEq)]
struct Glyph {
    x: f64,
    y: f64,
    /// Horizontal advance.
    width: f64,
    /// Rendered font size.
    size: f64,
    text: String,
}

/// Collects the glyphs of every page in document order.
#[derive(Debug, Default)]
struct PageLayout {
    pages: Vec<Vec<Glyph>>,
    current: Vec<Glyph>,
}

impl OutputDev for PageLayout {
    fn begin_page(
        &mut self,
        _page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.current.clear();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.pages.push(std::mem::take(&mut self.current));
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        // trm carries the text matrix, CTM and horizontal scaling but not the font size
        let size = font_size * trm.m21.hypot(trm.m22);
        self.current.push(Glyph {
            x: trm.m31,
            y: trm.m32,
            width: width * font_size * trm.m11.hypot(trm.m12),
            size: if size.is_finite() && size > 0.0 { size } else { font_size.abs().max(1.0) },
            text: char.to_string(),
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Parse a PDF and return the glyphs of each page.
fn layout_pages(bytes: &[u8]) -> Result<Vec<Vec<Glyph>>, ExtractError> {
    let mut doc = pdf_extract::Document::load_mem(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if doc.is_encrypted() {
        // Owner-password-only PDFs open with the empty user password
        doc.decrypt("")
            .map_err(|e| ExtractError::Pdf(format!("encrypted PDF: {}", e)))?;
    }

    let mut layout = PageLayout::default();
    pdf_extract::output_doc(&doc, &mut layout).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if !layout.current.is_empty() {
        layout.pages.push(std::mem::take(&mut layout.current));
    }
    Ok(layout.pages)
}

/// Group a page's glyphs into lines, top to bottom, each split into cells.
fn page_lines(mut glyphs: Vec<Glyph>, cell_gap: f64) -> Vec<Vec<String>> {
    glyphs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<Glyph>> = Vec::new();
    for glyph in glyphs {
        match lines.last_mut() {
            Some(line) if same_baseline(&line[0], &glyph) => line.push(glyph),
            _ => lines.push(vec![glyph]),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line_cells(&line, cell_gap)
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

fn same_baseline(a: &Glyph, b: &Glyph) -> bool {
    (a.y - b.y).abs() <= a.size.max(b.size) * BASELINE_TOLERANCE
}

/// Split one line into cells wherever the gap between consecutive glyphs
/// exceeds `cell_gap` font sizes. Space glyphs only mark word breaks.
fn line_cells(line: &[Glyph], cell_gap: f64) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut prev_end: Option<f64> = None;
    let mut pending_space = false;

    for glyph in line {
        if glyph.text.trim().is_empty() {
            pending_space = !cell.is_empty();
            continue;
        }
        if let Some(end) = prev_end {
            let gap = glyph.x - end;
            if gap > glyph.size * cell_gap {
                cells.push(std::mem::take(&mut cell));
            } else if pending_space || gap > glyph.size * WORD_GAP {
                cell.push(' ');
            }
        }
        pending_space = false;
        cell.push_str(glyph.text.trim());
        prev_end = Some(glyph.x + glyph.width);
    }
    if !cell.is_empty() {
        cells.push(cell);
    }
    cells
}

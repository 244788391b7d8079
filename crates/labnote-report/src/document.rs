//! Block model of a rendered report.
//!
//! A [`Document`] is an ordered list of blocks, the same shape a typesetting
//! library consumes. Writers turn it into bytes; the block list itself never
//! depends on the output format.

use std::path::Path;

use anyhow::{Context, Result};

use labnote_core::model::Table;

/// One element of the document flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Right-aligned self-assessment line at the top of the first page.
    ScoreBanner(String),
    Title(String),
    Heading(String),
    Paragraph(String),
    /// Paragraph set in bold, used for question lines.
    Strong(String),
    /// Centered caption under a figure.
    Caption(String),
    Table(TableBlock),
    Image(ImageBlock),
    /// Images placed side by side.
    ImageRow(Vec<ImageBlock>),
    Chart(ChartBlock),
    /// Note shown where an image or chart could not be produced.
    Placeholder(String),
    /// Vertical space in millimetres.
    Spacer(f64),
}

/// Width of the leading row-label column, when a table has one.
pub const ROW_LABEL_WIDTH_MM: f64 = 30.0;

/// A grid with a shaded header row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Leading header cell of each row. Empty for unlabelled tables.
    pub row_labels: Vec<String>,
    pub column_widths_mm: Vec<f64>,
    /// Smaller type, for wide tables.
    pub compact: bool,
}

impl TableBlock {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>, column_widths_mm: Vec<f64>) -> Self {
        Self {
            header,
            rows,
            row_labels: Vec::new(),
            column_widths_mm,
            compact: false,
        }
    }

    /// Label of row `index`, when the table is labelled.
    pub fn row_label(&self, index: usize) -> Option<&str> {
        if self.row_labels.is_empty() {
            return None;
        }
        Some(self.row_labels.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Cell text of a state table, every column at `column_width_mm`.
    pub fn from_table(table: &Table, column_width_mm: f64) -> Self {
        Self::from_table_with_widths(table, vec![column_width_mm; table.columns().len()])
    }

    /// Fixed rows keep their schema labels (`1回目`, `清澄度`, ...) as a
    /// leading header column.
    pub fn from_table_with_widths(table: &Table, column_widths_mm: Vec<f64>) -> Self {
        let header = table.columns().iter().map(|c| c.to_string()).collect();
        let rows = table
            .rows()
            .iter()
            .map(|row| row.iter().map(|cell| cell.display_text().into_owned()).collect())
            .collect();
        let mut block = Self::new(header, rows, column_widths_mm);
        block.row_labels = table
            .schema()
            .row_labels
            .iter()
            .map(|label| label.to_string())
            .collect();
        block
    }

    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

/// An embedded raster image with its placed size.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub mime: &'static str,
    /// Image bytes, base64 encoded.
    pub data: String,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// A vector chart with its placed size.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBlock {
    pub svg: String,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// A complete report, ready for a writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Every block's visible text, in order. Handy for checks and previews.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::ScoreBanner(s)
                | Block::Title(s)
                | Block::Heading(s)
                | Block::Paragraph(s)
                | Block::Strong(s)
                | Block::Caption(s)
                | Block::Placeholder(s) => {
                    out.push_str(s);
                    out.push('\n');
                }
                Block::Table(t) => {
                    if !t.row_labels.is_empty() {
                        out.push('\t');
                    }
                    out.push_str(&t.header.join("\t"));
                    out.push('\n');
                    for (i, row) in t.rows.iter().enumerate() {
                        if let Some(label) = t.row_label(i) {
                            out.push_str(label);
                            out.push('\t');
                        }
                        out.push_str(&row.join("\t"));
                        out.push('\n');
                    }
                }
                Block::Image(_) | Block::ImageRow(_) | Block::Chart(_) | Block::Spacer(_) => {}
            }
        }
        out
    }
}

/// Turns a [`Document`] into the bytes of one output format.
pub trait DocumentWriter {
    /// File extension of the output, without the dot.
    fn extension(&self) -> &'static str;

    /// Render the whole document in memory.
    fn render(&self, document: &Document) -> Result<Vec<u8>>;
}

/// Render `document` and write it to `path`.
///
/// The document is rendered completely before anything is written, so a
/// failed build leaves no partial file behind.
pub fn write_document(writer: &dyn DocumentWriter, document: &Document, path: &Path) -> Result<()> {
    let bytes = writer
        .render(document)
        .with_context(|| format!("failed to build document '{}'", document.title))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write document to {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

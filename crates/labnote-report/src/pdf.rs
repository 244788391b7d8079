//! PDF document writer.
//!
//! Layout and painting are separate passes. The layout pass places every block on
//! A4 pages as positioned draw operations, measured from the top-left corner
//! in millimetres. The paint pass hands those operations to `printpdf`.
//!
//! Japanese text needs an embedded TrueType font, so a [`PdfWriter`] is always
//! built from font bytes. Glyph widths are estimated (full width for non-ASCII,
//! a little over half width for ASCII), which is close enough for wrapping
//! with the CJK fonts the writer is meant for.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use printpdf::{
    Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference,
    Point, Rgb, Svg, SvgTransform,
};

use labnote_core::model::Photo;

use crate::document::{
    Block, ChartBlock, Document, DocumentWriter, ImageBlock, TableBlock, ROW_LABEL_WIDTH_MM,
};

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const MARGIN_X: f64 = 15.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 20.0;
const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN_X;

const PT_TO_MM: f64 = 25.4 / 72.0;
const MM_PER_INCH: f64 = 25.4;
const LINE_SPACING: f64 = 1.5;
const CELL_PADDING: f64 = 1.5;
const FIGURE_GAP: f64 = 3.0;
const IMAGE_ROW_GAP: f64 = 5.0;
const PDF_DPI: f64 = 300.0;

/// Writes documents as A4 PDF with an embedded font.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    font: Vec<u8>,
}

impl PdfWriter {
    /// `font` is the raw bytes of a TrueType font with Japanese glyphs.
    pub fn new(font: Vec<u8>) -> Self {
        Self { font }
    }

    pub fn from_font_file(path: &Path) -> Result<Self> {
        let font = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        Ok(Self::new(font))
    }
}

impl DocumentWriter for PdfWriter {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, document: &Document) -> Result<Vec<u8>> {
        let pages = layout(document);
        tracing::debug!(pages = pages.len(), "laid out PDF document");
        paint(&document.title, pages, &self.font)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ink {
    Black,
    Red,
    Grey,
}

impl Ink {
    fn color(self) -> Color {
        let (r, g, b) = match self {
            Ink::Black => (0.0, 0.0, 0.0),
            Ink::Red => (0.8, 0.0, 0.0),
            Ink::Grey => (0.4, 0.4, 0.4),
        };
        Color::Rgb(Rgb::new(r, g, b, None))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size: f64,
    align: Align,
    ink: Ink,
    space_before: f64,
}

impl TextStyle {
    const fn new(size: f64) -> Self {
        Self {
            size,
            align: Align::Left,
            ink: Ink::Black,
            space_before: 0.0,
        }
    }
}

const BANNER: TextStyle = TextStyle {
    align: Align::Right,
    ink: Ink::Red,
    ..TextStyle::new(11.0)
};
const TITLE: TextStyle = TextStyle {
    align: Align::Center,
    space_before: 2.0,
    ..TextStyle::new(16.0)
};
const HEADING: TextStyle = TextStyle {
    space_before: 3.0,
    ..TextStyle::new(13.0)
};
const BODY: TextStyle = TextStyle::new(10.5);
const STRONG: TextStyle = TextStyle {
    space_before: 1.5,
    ..TextStyle::new(10.5)
};
const CAPTION: TextStyle = TextStyle {
    align: Align::Center,
    ..TextStyle::new(9.0)
};
const NOTE: TextStyle = TextStyle {
    ink: Ink::Grey,
    ..TextStyle::new(9.0)
};

/// One positioned drawing instruction. `baseline` and `top` are measured
/// down from the top edge of the page.
#[derive(Debug, Clone, PartialEq)]
enum DrawOp {
    Text {
        x: f64,
        baseline: f64,
        size: f64,
        ink: Ink,
        text: String,
    },
    Rule {
        from: (f64, f64),
        to: (f64, f64),
    },
    Image {
        image: ImageBlock,
        x: f64,
        top: f64,
    },
    Chart {
        chart: ChartBlock,
        x: f64,
        top: f64,
    },
}

fn char_width_em(c: char) -> f64 {
    if c.is_ascii() {
        0.55
    } else {
        1.0
    }
}

/// Estimated printed width of `text`.
fn text_width_mm(text: &str, size_pt: f64) -> f64 {
    text.chars().map(char_width_em).sum::<f64>() * size_pt * PT_TO_MM
}

/// Break `text` into lines no wider than `max_width_mm`. Explicit newlines
/// always break; otherwise lines break between characters.
fn wrap_text(text: &str, max_width_mm: f64, size_pt: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut width = 0.0;
        for c in paragraph.chars() {
            let w = char_width_em(c) * size_pt * PT_TO_MM;
            if width + w > max_width_mm && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
            }
            line.push(c);
            width += w;
        }
        lines.push(line);
    }
    lines
}

/// A table row, wrapped to its column widths.
struct WrappedRow {
    cells: Vec<Vec<String>>,
    height: f64,
}

impl WrappedRow {
    fn new(cells: &[&str], widths: &[f64], size: f64) -> Self {
        let cells: Vec<Vec<String>> = cells
            .iter()
            .zip(widths)
            .map(|(text, width)| wrap_text(text, width - 2.0 * CELL_PADDING, size))
            .collect();
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1);
        let height = lines as f64 * size * PT_TO_MM * LINE_SPACING + 2.0 * CELL_PADDING;
        Self { cells, height }
    }
}

struct Layout {
    done: Vec<Vec<DrawOp>>,
    current: Vec<DrawOp>,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: Vec::new(),
            y: MARGIN_TOP,
        }
    }

    fn finish(mut self) -> Vec<Vec<DrawOp>> {
        self.done.push(self.current);
        self.done
    }

    fn break_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = MARGIN_TOP;
    }

    fn fits(&self, height: f64) -> bool {
        self.y + height <= PAGE_HEIGHT - MARGIN_BOTTOM
    }

    /// Start a new page unless `height` fits. A fresh page never breaks again.
    fn ensure(&mut self, height: f64) {
        if !self.fits(height) && self.y > MARGIN_TOP {
            self.break_page();
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::ScoreBanner(text) => self.text(text, BANNER),
            Block::Title(text) => self.text(text, TITLE),
            Block::Heading(text) => self.text(text, HEADING),
            Block::Paragraph(text) => self.text(text, BODY),
            Block::Strong(text) => self.text(text, STRONG),
            Block::Caption(text) => self.text(text, CAPTION),
            Block::Placeholder(text) => self.text(text, NOTE),
            Block::Table(table) => self.table(table),
            Block::Image(image) => {
                let (x, top) = self.figure(image.width_mm, image.height_mm);
                self.current.push(DrawOp::Image {
                    image: image.clone(),
                    x,
                    top,
                });
            }
            Block::ImageRow(images) => self.image_row(images),
            Block::Chart(chart) => {
                let (x, top) = self.figure(chart.width_mm, chart.height_mm);
                self.current.push(DrawOp::Chart {
                    chart: chart.clone(),
                    x,
                    top,
                });
            }
            Block::Spacer(height) => self.y += height,
        }
    }

    fn text(&mut self, text: &str, style: TextStyle) {
        self.y += style.space_before;
        let line_height = style.size * PT_TO_MM * LINE_SPACING;
        for line in wrap_text(text, CONTENT_WIDTH, style.size) {
            self.ensure(line_height);
            let slack = (CONTENT_WIDTH - text_width_mm(&line, style.size)).max(0.0);
            let x = match style.align {
                Align::Left => MARGIN_X,
                Align::Center => MARGIN_X + slack / 2.0,
                Align::Right => MARGIN_X + slack,
            };
            let baseline = self.y + style.size * PT_TO_MM;
            self.current.push(DrawOp::Text {
                x,
                baseline,
                size: style.size,
                ink: style.ink,
                text: line,
            });
            self.y += line_height;
        }
    }

    /// Reserve a centred box and return its top-left corner.
    fn figure(&mut self, width: f64, height: f64) -> (f64, f64) {
        self.ensure(height + FIGURE_GAP);
        let x = MARGIN_X + (CONTENT_WIDTH - width).max(0.0) / 2.0;
        let top = self.y;
        self.y += height + FIGURE_GAP;
        (x, top)
    }

    fn image_row(&mut self, images: &[ImageBlock]) {
        if images.is_empty() {
            return;
        }
        let gaps = IMAGE_ROW_GAP * (images.len() - 1) as f64;
        let width = images.iter().map(|i| i.width_mm).sum::<f64>() + gaps;
        let height = images.iter().map(|i| i.height_mm).fold(0.0, f64::max);
        let (mut x, top) = self.figure(width, height);
        for image in images {
            self.current.push(DrawOp::Image {
                image: image.clone(),
                x,
                top,
            });
            x += image.width_mm + IMAGE_ROW_GAP;
        }
    }

    fn table(&mut self, table: &TableBlock) {
        let size = if table.compact { 8.0 } else { 9.5 };
        let labelled = !table.row_labels.is_empty();

        let columns = table.header.len() + usize::from(labelled);
        let mut widths: Vec<f64> = Vec::with_capacity(columns);
        if labelled {
            widths.push(ROW_LABEL_WIDTH_MM);
        }
        widths.extend(&table.column_widths_mm);
        if widths.len() < columns {
            widths.resize(columns, CONTENT_WIDTH / columns as f64);
        }
        let total: f64 = widths.iter().sum();
        if total > CONTENT_WIDTH {
            let shrink = CONTENT_WIDTH / total;
            widths.iter_mut().for_each(|w| *w *= shrink);
        }
        let left = MARGIN_X + (CONTENT_WIDTH - widths.iter().sum::<f64>()).max(0.0) / 2.0;

        let header_cells: Vec<&str> = labelled
            .then_some("")
            .into_iter()
            .chain(table.header.iter().map(String::as_str))
            .collect();
        let header = WrappedRow::new(&header_cells, &widths, size);
        let rows: Vec<WrappedRow> = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells: Vec<&str> = table
                    .row_label(i)
                    .into_iter()
                    .chain(row.iter().map(String::as_str))
                    .collect();
                WrappedRow::new(&cells, &widths, size)
            })
            .collect();

        self.y += 1.0;
        self.ensure(header.height + rows.first().map_or(0.0, |r| r.height));
        self.table_row(&header, &widths, left, size);
        for row in &rows {
            if !self.fits(row.height) {
                self.break_page();
                self.table_row(&header, &widths, left, size);
            }
            self.table_row(row, &widths, left, size);
        }
        self.y += 2.0;
    }

    fn table_row(&mut self, row: &WrappedRow, widths: &[f64], left: f64, size: f64) {
        let top = self.y;
        let bottom = top + row.height;
        let right = left + widths.iter().sum::<f64>();
        let line_height = size * PT_TO_MM * LINE_SPACING;

        self.current.push(DrawOp::Rule {
            from: (left, top),
            to: (right, top),
        });
        self.current.push(DrawOp::Rule {
            from: (left, bottom),
            to: (right, bottom),
        });

        let mut x = left;
        self.current.push(DrawOp::Rule {
            from: (x, top),
            to: (x, bottom),
        });
        for (lines, width) in row.cells.iter().zip(widths) {
            for (n, line) in lines.iter().enumerate() {
                self.current.push(DrawOp::Text {
                    x: x + CELL_PADDING,
                    baseline: top + CELL_PADDING + n as f64 * line_height + size * PT_TO_MM,
                    size,
                    ink: Ink::Black,
                    text: line.clone(),
                });
            }
            x += width;
            self.current.push(DrawOp::Rule {
                from: (x, top),
                to: (x, bottom),
            });
        }
        self.y = bottom;
    }
}

/// Place every block of `document` on pages.
fn layout(document: &Document) -> Vec<Vec<DrawOp>> {
    let mut layout = Layout::new();
    for block in &document.blocks {
        layout.block(block);
    }
    layout.finish()
}

// ---------------------------------------------------------------------------
// Painting
// ---------------------------------------------------------------------------

fn mm(value: f64) -> Mm {
    Mm(value as f32)
}

/// Convert a distance from the top edge into printpdf's bottom-up coordinate.
fn from_top(value: f64) -> Mm {
    mm(PAGE_HEIGHT - value)
}

fn paint(title: &str, pages: Vec<Vec<DrawOp>>, font: &[u8]) -> Result<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "content");
    let font = doc
        .add_external_font(font)
        .map_err(|e| anyhow!("failed to load font: {e:?}"))?;

    let mut current = doc.get_page(page).get_layer(layer);
    for (n, ops) in pages.into_iter().enumerate() {
        if n > 0 {
            let (page, layer) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "content");
            current = doc.get_page(page).get_layer(layer);
        }
        for op in ops {
            paint_op(&current, &font, op);
        }
    }

    drop(current);
    doc.save_to_bytes()
        .map_err(|e| anyhow!("failed to write PDF: {e:?}"))
}

fn paint_op(layer: &PdfLayerReference, font: &IndirectFontRef, op: DrawOp) {
    match op {
        DrawOp::Text {
            x,
            baseline,
            size,
            ink,
            text,
        } => {
            layer.set_fill_color(ink.color());
            layer.use_text(text, size as f32, mm(x), from_top(baseline), font);
        }
        DrawOp::Rule { from, to } => {
            layer.set_outline_color(Ink::Black.color());
            layer.set_outline_thickness(0.5);
            layer.add_line(Line {
                points: vec![
                    (Point::new(mm(from.0), from_top(from.1)), false),
                    (Point::new(mm(to.0), from_top(to.1)), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Image { image, x, top } => {
            if let Err(e) = place_image(layer, &image, x, top) {
                tracing::warn!("image could not be embedded: {e:#}");
                paint_note(layer, font, x, top);
            }
        }
        DrawOp::Chart { chart, x, top } => {
            if let Err(e) = place_chart(layer, &chart, x, top) {
                tracing::warn!("chart could not be embedded: {e:#}");
                paint_note(layer, font, x, top);
            }
        }
    }
}

fn paint_note(layer: &PdfLayerReference, font: &IndirectFontRef, x: f64, top: f64) {
    layer.set_fill_color(Ink::Grey.color());
    layer.use_text(
        "(画像を配置できませんでした)",
        NOTE.size as f32,
        mm(x),
        from_top(top + NOTE.size * PT_TO_MM),
        font,
    );
}

fn place_image(layer: &PdfLayerReference, block: &ImageBlock, x: f64, top: f64) -> Result<()> {
    let photo = Photo::from_base64(block.data.as_str()).context("image has no data")?;
    let bytes = photo.decode()?;
    let decoded = ::image::load_from_memory(&bytes).context("unsupported image format")?;
    let natural_width = f64::from(decoded.width()) / PDF_DPI * MM_PER_INCH;
    let natural_height = f64::from(decoded.height()) / PDF_DPI * MM_PER_INCH;

    Image::from_dynamic_image(&decoded).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(x)),
            translate_y: Some(from_top(top + block.height_mm)),
            scale_x: Some((block.width_mm / natural_width) as f32),
            scale_y: Some((block.height_mm / natural_height) as f32),
            dpi: Some(PDF_DPI as f32),
            ..Default::default()
        },
    );
    Ok(())
}

fn place_chart(layer: &PdfLayerReference, chart: &ChartBlock, x: f64, top: f64) -> Result<()> {
    let svg = Svg::parse(&chart.svg).map_err(|e| anyhow!("invalid chart SVG: {e:?}"))?;
    let natural_width = svg.width.0 as f64 / PDF_DPI * MM_PER_INCH;
    let natural_height = svg.height.0 as f64 / PDF_DPI * MM_PER_INCH;

    svg.into_xobject(layer).add_to_layer(
        layer,
        SvgTransform {
            translate_x: Some(mm(x).into()),
            translate_y: Some(from_top(top + chart.height_mm).into()),
            scale_x: Some((chart.width_mm / natural_width) as f32),
            scale_y: Some((chart.height_mm / natural_height) as f32),
            dpi: Some(PDF_DPI as f32),
            ..Default::default()
        },
    );
    Ok(())
}

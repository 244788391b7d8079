//! HTML document writer.
//!
//! Produces a self-contained, print-paged HTML file: CSS is inlined, photos
//! are data URIs and charts are inline SVG.

use anyhow::Result;

use crate::document::{
    Block, Document, DocumentWriter, ImageBlock, TableBlock, ROW_LABEL_WIDTH_MM,
};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Escaped text with line breaks kept.
fn text_with_breaks(s: &str) -> String {
    html_escape(s).replace('\n', "<br>\n")
}

/// Writes documents as A4-paged HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlWriter;

impl DocumentWriter for HtmlWriter {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, document: &Document) -> Result<Vec<u8>> {
        Ok(generate_html(document).into_bytes())
    }
}

/// Generate the HTML text of a document.
pub fn generate_html(document: &Document) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>{}</title>\n",
        html_escape(&document.title)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n<main class=\"page\">\n");

    for block in &document.blocks {
        push_block(&mut html, block);
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn push_block(html: &mut String, block: &Block) {
    match block {
        Block::ScoreBanner(text) => {
            html.push_str(&format!("<p class=\"score\">{}</p>\n", html_escape(text)));
        }
        Block::Title(text) => {
            html.push_str(&format!("<h1>{}</h1>\n", html_escape(text)));
        }
        Block::Heading(text) => {
            html.push_str(&format!("<h2>{}</h2>\n", html_escape(text)));
        }
        Block::Paragraph(text) => {
            html.push_str(&format!("<p>{}</p>\n", text_with_breaks(text)));
        }
        Block::Strong(text) => {
            html.push_str(&format!(
                "<p><strong>{}</strong></p>\n",
                text_with_breaks(text)
            ));
        }
        Block::Caption(text) => {
            html.push_str(&format!("<p class=\"caption\">{}</p>\n", html_escape(text)));
        }
        Block::Table(table) => push_table(html, table),
        Block::Image(image) => {
            html.push_str("<figure>");
            push_image(html, image);
            html.push_str("</figure>\n");
        }
        Block::ImageRow(images) => {
            html.push_str("<div class=\"image-row\">");
            for image in images {
                push_image(html, image);
            }
            html.push_str("</div>\n");
        }
        Block::Chart(chart) => {
            html.push_str(&format!(
                "<figure class=\"chart\" style=\"width: {:.1}mm; height: {:.1}mm\">\n",
                chart.width_mm, chart.height_mm
            ));
            html.push_str(&chart.svg);
            html.push_str("\n</figure>\n");
        }
        Block::Placeholder(text) => {
            html.push_str(&format!(
                "<p class=\"placeholder\">{}</p>\n",
                html_escape(text)
            ));
        }
        Block::Spacer(mm) => {
            html.push_str(&format!("<div style=\"height: {mm:.1}mm\"></div>\n"));
        }
    }
}

fn push_table(html: &mut String, table: &TableBlock) {
    if table.compact {
        html.push_str("<table class=\"compact\">\n");
    } else {
        html.push_str("<table>\n");
    }
    let labelled = !table.row_labels.is_empty();
    html.push_str("<colgroup>");
    if labelled {
        html.push_str(&format!("<col style=\"width: {ROW_LABEL_WIDTH_MM:.1}mm\">"));
    }
    for width in &table.column_widths_mm {
        html.push_str(&format!("<col style=\"width: {width:.1}mm\">"));
    }
    html.push_str("</colgroup>\n<thead><tr>");
    if labelled {
        html.push_str("<th></th>");
    }
    for cell in &table.header {
        html.push_str(&format!("<th>{}</th>", html_escape(cell)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for (i, row) in table.rows.iter().enumerate() {
        html.push_str("<tr>");
        if let Some(label) = table.row_label(i) {
            html.push_str(&format!("<th>{}</th>", html_escape(label)));
        }
        for cell in row {
            html.push_str(&format!("<td>{}</td>", text_with_breaks(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody></table>\n");
}

fn push_image(html: &mut String, image: &ImageBlock) {
    html.push_str(&format!(
        "<img src=\"data:{};base64,{}\" style=\"width: {:.1}mm; height: {:.1}mm\" alt=\"\">",
        image.mime, image.data, image.width_mm, image.height_mm
    ));
}

const CSS: &str = r#"
@page { size: A4; margin: 20mm 15mm; }
body { font-family: 'IPAexGothic', 'Noto Sans JP', 'Yu Gothic', sans-serif; margin: 0; color: #000; background: #fff; }
.page { width: 180mm; margin: 0 auto; padding: 10mm 0; font-size: 10.5pt; line-height: 1.5; }
h1 { font-size: 18pt; text-align: center; margin: 0 0 4mm; }
h2 { font-size: 13pt; margin: 5mm 0 2mm; }
p { margin: 1mm 0; }
.score { text-align: right; color: #d00; }
.caption { text-align: center; }
.placeholder { color: #666; font-style: italic; }
table { border-collapse: collapse; margin: 2mm 0; table-layout: fixed; }
th, td { border: 0.5pt solid #000; padding: 1mm 2mm; text-align: center; word-break: break-all; }
th { background: #d3d3d3; font-weight: normal; }
table.compact { font-size: 8pt; }
figure { margin: 2mm 0; text-align: center; }
figure.chart { margin: 2mm auto; }
figure.chart svg { width: 100%; height: 100%; }
.image-row { display: flex; gap: 4mm; justify-content: center; align-items: flex-start; margin: 2mm 0; }
@media print { h2 { break-after: avoid; } table, figure, .image-row { break-inside: avoid; } }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{write_document, ChartBlock};

    fn sample() -> Document {
        let mut doc = Document::new("実験② <燃料電池>");
        doc.push(Block::ScoreBanner("簡易自己評価: 42%".into()));
        doc.push(Block::Strong("Q. 電解液は？".into()));
        doc.push(Block::Paragraph("A. 1行目\n2行目 & 'quote'".into()));
        doc.push(Block::Table(
            TableBlock::new(
                vec!["1回目".into(), "2回目".into()],
                vec![vec!["1.20".into(), "<b>".into()]],
                vec![30.0, 30.0],
            )
            .compact(),
        ));
        doc.push(Block::ImageRow(vec![ImageBlock {
            mime: "image/png",
            data: "iVBORw0KGgo=".into(),
            width_mm: 75.0,
            height_mm: 50.0,
        }]));
        doc.push(Block::Chart(ChartBlock {
            svg: "<svg id=\"c\"></svg>".into(),
            width_mm: 135.0,
            height_mm: 90.0,
        }));
        doc
    }

    #[test]
    fn html_contains_required_elements() {
        let html = generate_html(&sample());

        assert!(html.contains("<html lang=\"ja\">"));
        assert!(html.contains("</html>"));
        assert!(html.contains("@page { size: A4"));
        assert!(html.contains("<title>実験② &lt;燃料電池&gt;</title>"));
        assert!(html.contains("<p class=\"score\">簡易自己評価: 42%</p>"));
        assert!(html.contains("<p><strong>Q. 電解液は？</strong></p>"));
        assert!(html.contains("A. 1行目<br>\n2行目 &amp; &#x27;quote&#x27;"));
        assert!(html.contains("<table class=\"compact\">"));
        assert!(html.contains("<td>&lt;b&gt;</td>"));
        assert!(html.contains("src=\"data:image/png;base64,iVBORw0KGgo=\""));
        assert!(html.contains("width: 75.0mm; height: 50.0mm"));
        assert!(html.contains("<svg id=\"c\"></svg>"));
    }

    #[test]
    fn labelled_rows_start_with_a_header_cell() {
        let mut table = TableBlock::new(
            vec!["試作検討①".into(), "試作検討②".into()],
            vec![vec!["420".into(), "650".into()]],
            vec![40.0, 40.0],
        );
        table.row_labels = vec!["清澄度".into()];
        let mut doc = Document::new("t");
        doc.push(Block::Table(table));

        let html = generate_html(&doc);
        assert!(html.contains("<col style=\"width: 30.0mm\"><col style=\"width: 40.0mm\">"));
        assert!(html.contains("<thead><tr><th></th><th>試作検討①</th>"));
        assert!(html.contains("<tr><th>清澄度</th><td>420</td><td>650</td></tr>"));
    }

    #[test]
    fn html_report_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.html");

        write_document(&HtmlWriter, &sample(), &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("<!DOCTYPE html>"));
        assert_eq!(HtmlWriter.extension(), "html");
    }
}

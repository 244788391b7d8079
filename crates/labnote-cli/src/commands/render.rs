//! The `labnote render` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use labnote_core::config::DocumentFormat;
use labnote_core::snapshot::{document_file_name, pdf_file_name};
use labnote_report::{build_document, write_document, DocumentWriter, HtmlWriter, PdfWriter};

use super::open;

pub fn execute(
    session: PathBuf,
    output: Option<PathBuf>,
    format: Option<DocumentFormat>,
    font: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let (app, config) = open(&session, config.as_deref())?;
    let dir = output.unwrap_or(config.output_dir);
    let format = format.unwrap_or(config.report.format);

    let document = build_document(&app, &config.report);
    let path = match format {
        DocumentFormat::Html => {
            let writer = HtmlWriter;
            let path = dir.join(document_file_name(
                &app.global,
                app.active_title(),
                writer.extension(),
            ));
            write_document(&writer, &document, &path)?;
            path
        }
        DocumentFormat::Pdf => {
            let font = font.or(config.report.pdf_font).context(
                "PDF output needs a Japanese TrueType font: pass --font or set report.pdf_font",
            )?;
            let writer = PdfWriter::from_font_file(&font)?;
            let path = dir.join(pdf_file_name(&app.global, app.active_title()));
            write_document(&writer, &document, &path)?;
            path
        }
    };

    println!("Rendered {}", path.display());
    Ok(())
}

//! labnote-report: turns a session into a paged report document.
//!
//! The builder produces a format-neutral block list; writers such as
//! [`HtmlWriter`] and [`PdfWriter`] turn that list into a file.

pub mod chart;
pub mod document;
pub mod html;
pub mod image;
pub mod pdf;
pub mod render;
pub mod sections;

pub use document::{write_document, Block, Document, DocumentWriter};
pub use html::HtmlWriter;
pub use pdf::PdfWriter;
pub use render::build_document;

//! Error types for state edits, snapshot parsing, and photo payloads.
//!
//! Malformed cell contents never surface here: numeric coercion failures are
//! absorbed where the numbers are used. These errors cover the cases where a
//! caller asked for something the schema cannot hold, or where a whole
//! document could not be read.

use thiserror::Error;

/// Errors raised when editing an [`ExperimentState`](crate::state::ExperimentState).
#[derive(Debug, Error)]
pub enum StateError {
    /// The field name is not part of the schema.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The value kind does not match the field's declared kind.
    #[error("field '{field}' holds {expected} values, got {actual}")]
    KindMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The table has no column with this name.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: &'static str, column: String },

    /// The row index is past the end of the table.
    #[error("table '{table}' has {rows} rows, row {row} is out of range")]
    RowOutOfRange {
        table: &'static str,
        row: usize,
        rows: usize,
    },

    /// Rows were added to or removed from a fixed-shape table.
    #[error("table '{0}' has a fixed number of rows")]
    FixedShape(&'static str),
}

/// Errors that abort a snapshot import. The live state is left untouched.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The document is not valid JSON.
    #[error("failed to parse snapshot JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The document parsed but its root is not an object.
    #[error("snapshot root must be a JSON object")]
    NotAnObject,
}

/// Errors decoding a stored photo.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("photo is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The bytes decoded but are not an image format we can size.
    #[error("photo is not a recognised image: {0}")]
    UnrecognizedImage(String),
}

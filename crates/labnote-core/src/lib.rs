//! labnote-core: experiment state, templates, rubric scoring, and snapshots.
//!
//! This crate holds everything about a lab report except how it is drawn:
//! the closed field schema, the per-title question templates, the live state
//! store with its registry of other titles, the completeness rubric, and the
//! JSON snapshot format sessions are saved in.

pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod schema;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod template;
pub mod traits;

pub use error::{PhotoError, SnapshotError, StateError};
pub use model::{Cell, ExperimentTitle, GlobalInfo, Photo, Table};
pub use scoring::{score, Band, Score};
pub use session::AppState;
pub use state::{ExperimentState, FieldValue, StateSnapshot};

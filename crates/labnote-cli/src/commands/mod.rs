//! Subcommand implementations and the session plumbing they share.

pub mod check;
pub mod edit;
pub mod export;
pub mod info;
pub mod init;
pub mod new;
pub mod render;
pub mod score;
pub mod switch;

use std::path::Path;

use anyhow::{Context, Result};

use labnote_core::config::{load_config_from, LabnoteConfig};
use labnote_core::schema::FieldKey;
use labnote_core::snapshot::{load_session, save_session};
use labnote_core::AppState;

/// Load the configuration and the session file.
pub fn open(session: &Path, config: Option<&Path>) -> Result<(AppState, LabnoteConfig)> {
    let config = load_config_from(config)?;
    let app = load_session(session, config.default_title)?;
    Ok((app, config))
}

/// Load a session, apply one edit, refresh derived cells and save it back.
pub fn edit_session<F>(session: &Path, config: Option<&Path>, edit: F) -> Result<AppState>
where
    F: FnOnce(&mut AppState) -> Result<()>,
{
    let (mut app, _) = open(session, config)?;
    edit(&mut app)?;
    app.current.recompute_derived();
    save_session(&mut app, session)?;
    Ok(app)
}

/// Resolve a field name, with a readable error for unknown names.
pub fn field_key(name: &str) -> Result<FieldKey> {
    FieldKey::from_name(name).with_context(|| format!("unknown field '{name}'"))
}

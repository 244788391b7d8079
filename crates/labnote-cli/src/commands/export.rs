//! The `labnote export` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use labnote_core::snapshot::{self, snapshot_file_name};

use super::open;

pub fn execute(session: PathBuf, output: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let (mut app, config) = open(&session, config.as_deref())?;
    let dir = output.unwrap_or(config.output_dir);

    let json = snapshot::export(&mut app).to_json()?;
    let now = chrono::Local::now().naive_local();
    let path = dir.join(snapshot_file_name(&app.global, now));

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!("exported snapshot for {}", app.active_title());
    println!("Exported {}", path.display());
    Ok(())
}

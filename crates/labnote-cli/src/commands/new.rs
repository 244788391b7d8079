//! The `labnote new` command.

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;

use labnote_core::config::load_config_from;
use labnote_core::model::{ExperimentTitle, GlobalInfo};
use labnote_core::snapshot::save_session;
use labnote_core::AppState;

pub fn execute(
    title: Option<ExperimentTitle>,
    date: Option<NaiveDate>,
    output: PathBuf,
    force: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    let config = load_config_from(config.as_deref())?;
    let title = title.unwrap_or(config.default_title);
    let date = date.unwrap_or_else(|| GlobalInfo::default().exp_date);

    let mut app = AppState::new(title, date);
    save_session(&mut app, &output)?;

    println!("Created session {} ({title})", output.display());
    Ok(())
}

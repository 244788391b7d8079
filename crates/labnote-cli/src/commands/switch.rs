//! The `labnote switch` command.

use std::path::PathBuf;

use anyhow::Result;

use labnote_core::model::ExperimentTitle;

use super::edit_session;

pub fn execute(session: PathBuf, title: ExperimentTitle, config: Option<PathBuf>) -> Result<()> {
    let mut from = title;
    let mut restored = false;
    edit_session(&session, config.as_deref(), |app| {
        from = app.active_title();
        restored = app
            .registry()
            .get(&title)
            .is_some_and(|snapshot| !snapshot.is_empty());
        app.switch_title(title);
        Ok(())
    })?;

    if from == title {
        println!("Already on {title}");
    } else if restored {
        println!("Switched to {title} (restored saved data)");
    } else {
        println!("Switched to {title} (factory defaults)");
    }
    Ok(())
}

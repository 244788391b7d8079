//! The `labnote score` command.

use std::path::PathBuf;

use anyhow::{bail, Result};
use comfy_table::{Cell, Table};

use labnote_core::scoring::{Score, Section};

use super::open;

pub fn execute(session: PathBuf, format: String, config: Option<PathBuf>) -> Result<()> {
    let (app, config) = open(&session, config.as_deref())?;
    let score = app.score();
    let band = score.band(config.report.pass_threshold, config.report.excellent_threshold);

    match format.as_str() {
        "json" => {
            let out = serde_json::json!({
                "title": app.active_title().as_str(),
                "band": band,
                "score": score,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        "text" => {
            println!("{}", app.active_title());
            println!("{}", rubric_table(&score));
            println!(
                "Total: {}% (home {}% / report {}%)",
                score.total, score.home, score.report
            );
            println!("Band: {band} {}", band.message());
        }
        other => bail!("unknown format '{other}' (expected text or json)"),
    }

    if score.is_default_identity {
        eprintln!(
            "Warning: student id or name is still the factory default. \
             Set them with `labnote info` before submitting."
        );
    }
    Ok(())
}

fn rubric_table(score: &Score) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Section", "Item", "Earned", "Max"]);
    for item in &score.items {
        let section = match item.section {
            Section::Home => "home",
            Section::Report => "report",
        };
        table.add_row(vec![
            Cell::new(section),
            Cell::new(&item.label),
            Cell::new(format!("{:.1}", item.earned)),
            Cell::new(format!("{:.1}", item.max)),
        ]);
    }
    table
}

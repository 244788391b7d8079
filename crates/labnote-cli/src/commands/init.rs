//! The `labnote init` command.

use std::path::Path;

use anyhow::Result;

use labnote_core::config::SAMPLE_CONFIG;

pub fn execute() -> Result<()> {
    let path = Path::new("labnote.toml");
    if path.exists() {
        println!("labnote.toml already exists, skipping.");
    } else {
        std::fs::write(path, SAMPLE_CONFIG)?;
        println!("Created labnote.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit labnote.toml to pick your default experiment");
    println!("  2. Run: labnote new --title heat --output report.json");
    println!("  3. Run: labnote info --session report.json --student-id 12 --student-name \"山田 花子\"");

    Ok(())
}

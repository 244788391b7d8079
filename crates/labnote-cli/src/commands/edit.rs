//! Field editing commands: `set`, `cell`, `add-row`, `remove-row`, `photo`
//! and `import`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use labnote_core::model::{Cell, Photo, Table};
use labnote_core::schema::{FieldKey, FieldKind};
use labnote_core::snapshot;
use labnote_core::state::FieldValue;
use labnote_core::AppState;

use super::{edit_session, field_key};

fn table_mut<'a>(app: &'a mut AppState, name: &str) -> Result<&'a mut Table> {
    let key = field_key(name)?;
    app.current
        .table_mut(key)
        .with_context(|| format!("'{name}' is a {} field, not a table", key.kind().label()))
}

/// `labnote set`: overwrite a text field or a question answer.
pub fn set(
    session: PathBuf,
    field: String,
    value: Option<String>,
    file: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let text = match (value, file) {
        (Some(value), _) => value,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("either --value or --file is required"),
    };
    let chars = text.chars().count();
    edit_session(&session, config.as_deref(), |app| {
        app.current.set_text_by_name(&field, text)?;
        Ok(())
    })?;
    println!("Set {field} ({chars} chars)");
    Ok(())
}

/// `labnote cell`: overwrite one table cell.
pub fn cell(
    session: PathBuf,
    field: String,
    row: usize,
    column: String,
    value: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let app = edit_session(&session, config.as_deref(), |app| {
        table_mut(app, &field)?.set_cell(row, &column, Cell::text(value))?;
        Ok(())
    })?;
    // Derived cells may have changed alongside the edit.
    if let Some(table) = field_key(&field).ok().and_then(|k| app.current.table(k)) {
        if let Some(row_cells) = table.rows().get(row) {
            let shown: Vec<_> = row_cells.iter().map(|c| c.display_text()).collect();
            println!("{field}[{row}]: {}", shown.join(" | "));
        }
    }
    Ok(())
}

/// `labnote add-row`: append an empty row to a dynamic table.
pub fn add_row(session: PathBuf, field: String, config: Option<PathBuf>) -> Result<()> {
    let mut added = 0;
    edit_session(&session, config.as_deref(), |app| {
        added = table_mut(app, &field)?.push_row()?;
        Ok(())
    })?;
    println!("Added row {added} to {field}");
    Ok(())
}

/// `labnote remove-row`: delete one row of a dynamic table.
pub fn remove_row(session: PathBuf, field: String, row: usize, config: Option<PathBuf>) -> Result<()> {
    edit_session(&session, config.as_deref(), |app| {
        table_mut(app, &field)?.remove_row(row)?;
        Ok(())
    })?;
    println!("Removed row {row} from {field}");
    Ok(())
}

/// `labnote photo`: attach or clear a photo slot.
pub fn photo(
    session: PathBuf,
    field: String,
    image: Option<PathBuf>,
    clear: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let key = field_key(&field)?;
    if !matches!(key.kind(), FieldKind::Photo) {
        bail!("'{field}' is a {} field, not a photo", key.kind().label());
    }
    let photo = match (image, clear) {
        (_, true) => None,
        (Some(path), false) => Some(read_photo(&path)?),
        (None, false) => bail!("either --image or --clear is required"),
    };
    let attached = photo.is_some();
    edit_session(&session, config.as_deref(), |app| {
        app.current.set(key, FieldValue::Photo(photo))?;
        Ok(())
    })?;
    if attached {
        println!("Attached photo to {field}");
    } else {
        println!("Cleared {field}");
    }
    Ok(())
}

fn read_photo(path: &Path) -> Result<Photo> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    tracing::debug!(bytes = bytes.len(), "read photo from {}", path.display());
    Ok(Photo::from_bytes(&bytes))
}

/// `labnote import`: apply a snapshot file to the session.
///
/// A document with a registry replaces the registry and restores the active
/// title from it; a document without one is applied to the active title.
pub fn import(session: PathBuf, input: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let json = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read snapshot {}", input.display()))?;
    let mut summary = None;
    edit_session(&session, config.as_deref(), |app| {
        summary = Some(snapshot::import(app, &json)?);
        Ok(())
    })
    .with_context(|| format!("failed to import {}", input.display()))?;

    if let Some(summary) = summary {
        let restored = summary.restored.as_ref().map_or(0, |r| r.applied);
        println!(
            "Imported {}: {} identity fields, {} registry titles, {} fields restored{}",
            input.display(),
            summary.global_fields,
            summary.registry_titles,
            restored,
            if summary.legacy { " (single-title snapshot)" } else { "" }
        );
        if let Some(restore) = &summary.restored {
            for key in &restore.ignored {
                eprintln!("Warning: ignored unknown field '{key}'");
            }
        }
    }
    Ok(())
}

/// `labnote fields`: list every field name with its kind.
pub fn list_fields() -> Result<()> {
    for key in FieldKey::TRACKED {
        let kind = key.kind();
        match kind {
            FieldKind::Table(schema) => {
                println!("{:<28} {:<6} {}", key.name(), kind.label(), schema.columns.join(", "))
            }
            _ => println!("{:<28} {}", key.name(), kind.label()),
        }
    }
    println!("\nQuestion answers use the 設問_ names shown by `labnote check`.");
    Ok(())
}

//! Snapshot documents: the JSON file a session is saved to and restored from.
//!
//! ```text
//! { "global_info": { ..., "last_exp_title": title },
//!   "achievement_at_save": { "home", "report", "total" },
//!   "experiment_registry": { title: { field: value, ... }, ... } }
//! ```
//!
//! Import is lenient: only an unparseable document or a non-object root
//! aborts, and nothing is changed in that case. A document without
//! `experiment_registry` is a legacy single-title snapshot and is applied to
//! the active title directly.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SnapshotError;
use crate::model::{ExperimentTitle, GlobalInfo};
use crate::session::{AppState, Registry};
use crate::state::{RestoreSummary, StateSnapshot};

const GLOBAL_INFO: &str = "global_info";
const ACHIEVEMENT: &str = "achievement_at_save";
const REGISTRY: &str = "experiment_registry";
const LAST_TITLE: &str = "last_exp_title";

/// Identity block as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalInfoRecord {
    pub exp_date: String,
    pub class_name: String,
    pub seat_number: String,
    pub student_id: String,
    pub student_name: String,
    pub partner1_id: String,
    pub partner1_name: String,
    pub partner2_id: String,
    pub partner2_name: String,
    pub last_exp_title: String,
}

/// Score at the time the document was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub home: u32,
    pub report: u32,
    pub total: u32,
}

/// A complete exported session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub global_info: GlobalInfoRecord,
    pub achievement_at_save: Achievement,
    pub experiment_registry: BTreeMap<String, StateSnapshot>,
}

impl SnapshotDocument {
    /// Pretty-printed JSON with non-ASCII text kept literal.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    /// Global info keys that were applied.
    pub global_fields: usize,
    /// Titles in the imported registry.
    pub registry_titles: usize,
    /// Title named by `last_exp_title`, when it is a known title.
    pub last_title: Option<ExperimentTitle>,
    /// Whether the document had no registry and was applied directly.
    pub legacy: bool,
    /// Outcome of applying a snapshot to the live state, if one was applied.
    pub restored: Option<RestoreSummary>,
}

/// Build the export document.
///
/// The live state is first copied into the registry under the active title,
/// so the registry in the document is complete.
pub fn export(app: &mut AppState) -> SnapshotDocument {
    app.save_active();
    let score = app.score();
    let g = &app.global;

    SnapshotDocument {
        global_info: GlobalInfoRecord {
            exp_date: g.exp_date.format("%Y-%m-%d").to_string(),
            class_name: g.class_name.clone(),
            seat_number: g.seat_number.clone(),
            student_id: g.student_id.clone(),
            student_name: g.student_name.clone(),
            partner1_id: g.partner1_id.clone(),
            partner1_name: g.partner1_name.clone(),
            partner2_id: g.partner2_id.clone(),
            partner2_name: g.partner2_name.clone(),
            last_exp_title: app.active_title().as_str().to_string(),
        },
        achievement_at_save: Achievement {
            home: score.home,
            report: score.report,
            total: score.total,
        },
        experiment_registry: app
            .registry()
            .iter()
            .map(|(title, snapshot)| (title.as_str().to_string(), snapshot.clone()))
            .collect(),
    }
}

/// Import a snapshot document into `app`.
pub fn import(app: &mut AppState, json: &str) -> Result<ImportSummary, SnapshotError> {
    let root: Value = serde_json::from_str(json)?;
    let Value::Object(mut doc) = root else {
        return Err(SnapshotError::NotAnObject);
    };

    let mut summary = ImportSummary::default();

    match doc.get(GLOBAL_INFO) {
        Some(Value::Object(info)) => {
            summary.global_fields = apply_global_info(&mut app.global, info);
            summary.last_title = info
                .get(LAST_TITLE)
                .and_then(Value::as_str)
                .and_then(ExperimentTitle::from_title);
        }
        Some(_) => tracing::warn!("'{GLOBAL_INFO}' is not an object, ignoring it"),
        None => {}
    }

    match doc.remove(REGISTRY) {
        Some(value) => {
            let registry = parse_registry(&value);
            summary.registry_titles = registry.len();
            let active = registry.get(&app.active_title()).cloned();
            app.replace_registry(registry);
            if let Some(snapshot) = active {
                summary.restored = Some(app.apply_snapshot(&snapshot));
            }
        }
        None => {
            tracing::info!("snapshot has no registry, applying it to the active title");
            summary.legacy = true;
            let fields: Map<String, Value> = doc
                .into_iter()
                .filter(|(key, _)| key != GLOBAL_INFO && key != ACHIEVEMENT)
                .collect();
            summary.restored = Some(app.apply_snapshot(&StateSnapshot::new(fields)));
        }
    }

    Ok(summary)
}

/// `last_exp_title` of a document, when it parses and names a known title.
pub fn last_title(json: &str) -> Option<ExperimentTitle> {
    let root: Value = serde_json::from_str(json).ok()?;
    root.get(GLOBAL_INFO)?
        .get(LAST_TITLE)?
        .as_str()
        .and_then(ExperimentTitle::from_title)
}

fn parse_registry(value: &Value) -> Registry {
    let Some(entries) = value.as_object() else {
        tracing::warn!("'{REGISTRY}' is not an object, using an empty registry");
        return Registry::new();
    };
    entries
        .iter()
        .filter_map(|(title, snapshot)| {
            let Some(title) = ExperimentTitle::from_title(title) else {
                tracing::warn!("ignoring registry entry for unknown title '{title}'");
                return None;
            };
            match snapshot {
                Value::Object(fields) => Some((title, StateSnapshot::new(fields.clone()))),
                _ => {
                    tracing::warn!("registry entry for '{title}' is not an object");
                    Some((title, StateSnapshot::default()))
                }
            }
        })
        .collect()
}

/// Apply each known key that is present; returns how many were applied.
fn apply_global_info(global: &mut GlobalInfo, info: &Map<String, Value>) -> usize {
    let mut applied = 0;

    if let Some(value) = info.get("exp_date") {
        match value.as_str().and_then(parse_date) {
            Some(date) => {
                global.exp_date = date;
                applied += 1;
            }
            None => tracing::warn!("ignoring unparseable exp_date {value}"),
        }
    }

    let text_fields: [(&str, &mut String); 8] = [
        ("class_name", &mut global.class_name),
        ("seat_number", &mut global.seat_number),
        ("student_id", &mut global.student_id),
        ("student_name", &mut global.student_name),
        ("partner1_id", &mut global.partner1_id),
        ("partner1_name", &mut global.partner1_name),
        ("partner2_id", &mut global.partner2_id),
        ("partner2_name", &mut global.partner2_name),
    ];
    for (key, slot) in text_fields {
        let Some(value) = info.get(key) else { continue };
        match value {
            Value::String(s) => *slot = s.clone(),
            Value::Number(n) => *slot = n.to_string(),
            _ => {
                tracing::warn!("ignoring global_info.{key}: expected text, got {value}");
                continue;
            }
        }
        applied += 1;
    }

    applied
}

/// ISO date, or the date part of an ISO date-time.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

// ---------------------------------------------------------------------------
// File names
// ---------------------------------------------------------------------------

/// Replace ASCII and full-width spaces, and path separators, with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '\u{3000}' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// `{student_id}_{student_name}_{YYYYmmddHHMM}.json`
pub fn snapshot_file_name(global: &GlobalInfo, at: NaiveDateTime) -> String {
    sanitize_file_name(&format!(
        "{}_{}_{}.json",
        global.student_id,
        global.student_name,
        at.format("%Y%m%d%H%M")
    ))
}

/// `{student_id}_{student_name}_{title}.{extension}`
pub fn document_file_name(global: &GlobalInfo, title: ExperimentTitle, extension: &str) -> String {
    sanitize_file_name(&format!(
        "{}_{}_{}.{extension}",
        global.student_id, global.student_name, title
    ))
}

/// File name for the PDF form of the rendered document.
pub fn pdf_file_name(global: &GlobalInfo, title: ExperimentTitle) -> String {
    document_file_name(global, title, "pdf")
}

// ---------------------------------------------------------------------------
// Session files
// ---------------------------------------------------------------------------

/// Export `app` and write it to `path`.
pub fn save_session(app: &mut AppState, path: &Path) -> Result<()> {
    let json = export(app)
        .to_json()
        .context("failed to serialize session")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write session to {}", path.display()))?;
    tracing::debug!("saved session to {}", path.display());
    Ok(())
}

/// Load a session file.
///
/// The active title is the document's `last_exp_title` when it names a known
/// title, otherwise `fallback`.
pub fn load_session(path: &Path, fallback: ExperimentTitle) -> Result<AppState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session from {}", path.display()))?;
    let title = last_title(&content).unwrap_or(fallback);
    let mut app = AppState::new(title, GlobalInfo::default().exp_date);
    import(&mut app, &content)
        .with_context(|| format!("failed to load session {}", path.display()))?;
    Ok(app)
}

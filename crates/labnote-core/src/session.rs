//! Application state: identity, the active title, its live experiment state,
//! and the registry of saved snapshots for the other titles.
//!
//! Every operation takes the [`AppState`] explicitly. The live state is
//! authoritative for the active title; the registry entry for it is only
//! refreshed on a title switch, a manual save, or an export.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{ExperimentTitle, GlobalInfo};
use crate::scoring::{self, Score};
use crate::state::{ExperimentState, RestoreSummary, StateSnapshot};

/// Saved snapshots keyed by title.
pub type Registry = BTreeMap<ExperimentTitle, StateSnapshot>;

/// One authoring session.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub global: GlobalInfo,
    active: ExperimentTitle,
    pub current: ExperimentState,
    registry: Registry,
}

impl AppState {
    /// A fresh session on `title`, with factory defaults everywhere.
    pub fn new(title: ExperimentTitle, exp_date: NaiveDate) -> Self {
        Self {
            global: GlobalInfo::new(exp_date),
            active: title,
            current: ExperimentState::new(),
            registry: Registry::new(),
        }
    }

    pub fn active_title(&self) -> ExperimentTitle {
        self.active
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Replace the whole registry. The live state is not touched.
    pub fn replace_registry(&mut self, registry: Registry) {
        self.registry = registry;
    }

    /// Copy the live state into the registry under the active title.
    pub fn save_active(&mut self) {
        self.registry.insert(self.active, self.current.snapshot());
    }

    /// Switch to another title.
    ///
    /// The outgoing state is saved first. The incoming title starts from its
    /// factory defaults and, when the registry holds a snapshot for it, that
    /// snapshot is applied on top.
    pub fn switch_title(&mut self, title: ExperimentTitle) {
        if title == self.active {
            return;
        }
        self.save_active();
        tracing::debug!(from = %self.active, to = %title, "switching experiment title");
        self.active = title;
        self.current.reset();
        if let Some(snapshot) = self.registry.get(&title) {
            if !snapshot.is_empty() {
                self.current.restore(snapshot);
            }
        }
    }

    /// Apply a snapshot to the live state as a partial overwrite. An empty
    /// snapshot resets the live state instead.
    pub fn apply_snapshot(&mut self, snapshot: &StateSnapshot) -> RestoreSummary {
        if snapshot.is_empty() {
            self.current.reset();
            return RestoreSummary::default();
        }
        self.current.restore(snapshot)
    }

    /// Score the live state for the active title.
    pub fn score(&self) -> Score {
        scoring::score(&self.current, &self.global, self.active)
    }
}

impl Default for AppState {
    fn default() -> Self {
        let global = GlobalInfo::default();
        Self::new(ExperimentTitle::default(), global.exp_date)
    }
}

//! The experiment state store.
//!
//! [`ExperimentState`] is a typed record holding every field of every title.
//! Field-level access by name goes through the closed [`FieldKey`] schema, so
//! an unknown name is rejected instead of silently creating a new slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis;
use crate::error::StateError;
use crate::model::{ExperimentTitle, Photo, Table};
use crate::schema::{self, FieldKey, FieldKind};
use crate::template::QuestionId;

/// A value that can be written to or read from a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Table(Table),
    Photo(Option<Photo>),
}

impl FieldValue {
    fn kind_label(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Table(_) => "table",
            FieldValue::Photo(_) => "photo",
        }
    }
}

/// Fields shared by every title.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonFields {
    pub tools: Table,
    pub references: Table,
    pub evaluation_method: String,
    /// Apparatus photo, used by every title except water treatment.
    pub apparatus_photo: Option<Photo>,
}

/// Heat-conduction results and discussion.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatConductionFields {
    pub melting_point: Table,
    pub results: Table,
    pub lit_cu: String,
    pub lit_al: String,
    pub lit_sus: String,
    pub conductivity_ref: String,
    pub discussion: String,
}

/// Fuel-cell results and discussion.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelCellFields {
    pub charge: Table,
    pub discharge: [Table; 3],
    pub discussion: String,
}

/// Water-treatment results and discussion.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterTreatmentFields {
    pub original_water_photo: Option<Photo>,
    pub proto1_device_photo: Option<Photo>,
    pub proto1_water_photo: Option<Photo>,
    pub proto1_text: String,
    pub proto2_device_photo: Option<Photo>,
    pub proto2_water_photo: Option<Photo>,
    pub proto2_text: String,
    pub clarity: Table,
    pub coagulation_photo: Option<Photo>,
    pub coagulation_text: String,
    pub discussion: String,
}

/// All field values for one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentState {
    answers: BTreeMap<QuestionId, String>,
    pub common: CommonFields,
    pub heat: HeatConductionFields,
    pub fuel_cell: FuelCellFields,
    pub water: WaterTreatmentFields,
}

impl Default for ExperimentState {
    fn default() -> Self {
        Self {
            answers: BTreeMap::new(),
            common: CommonFields {
                tools: Table::factory(&schema::TOOLS_LIST),
                references: Table::factory(&schema::REFERENCES_LIST),
                evaluation_method: String::new(),
                apparatus_photo: None,
            },
            heat: HeatConductionFields {
                melting_point: Table::factory(&schema::MELTING_POINT),
                results: Table::factory(&schema::RESULT_TABLE),
                lit_cu: String::new(),
                lit_al: String::new(),
                lit_sus: String::new(),
                conductivity_ref: String::new(),
                discussion: String::new(),
            },
            fuel_cell: FuelCellFields {
                charge: Table::factory(&schema::FC_CHARGE),
                discharge: [
                    Table::factory(&schema::FC_DISCHARGE_1),
                    Table::factory(&schema::FC_DISCHARGE_2),
                    Table::factory(&schema::FC_DISCHARGE_3),
                ],
                discussion: String::new(),
            },
            water: WaterTreatmentFields {
                original_water_photo: None,
                proto1_device_photo: None,
                proto1_water_photo: None,
                proto1_text: String::new(),
                proto2_device_photo: None,
                proto2_water_photo: None,
                proto2_text: String::new(),
                clarity: Table::factory(&schema::WT_CLARITY),
                coagulation_photo: None,
                coagulation_text: String::new(),
                discussion: String::new(),
            },
        }
    }
}

enum Slot<'a> {
    Text(&'a String),
    Table(&'a Table),
    Photo(&'a Option<Photo>),
}

enum SlotMut<'a> {
    Text(&'a mut String),
    Table(&'a mut Table),
    Photo(&'a mut Option<Photo>),
}

/// Snapshot of an experiment state: field name → JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot(Map<String, Value>);

impl StateSnapshot {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// What a restore did with each key of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub applied: usize,
    pub ignored: Vec<String>,
}

impl ExperimentState {
    /// Factory defaults for every field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every field to its factory default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn answer(&self, id: QuestionId) -> &str {
        self.answers.get(&id).map(String::as_str).unwrap_or("")
    }

    /// Store an answer. An empty answer removes the entry.
    pub fn set_answer(&mut self, id: QuestionId, answer: impl Into<String>) {
        let answer = answer.into();
        if answer.is_empty() {
            self.answers.remove(&id);
        } else {
            self.answers.insert(id, answer);
        }
    }

    pub fn photo(&self, key: FieldKey) -> Option<&Photo> {
        match self.slot(key) {
            Some(Slot::Photo(p)) => p.as_ref(),
            _ => None,
        }
    }

    pub fn text(&self, key: FieldKey) -> &str {
        match key {
            FieldKey::Answer(id) => self.answer(id),
            _ => match self.slot(key) {
                Some(Slot::Text(s)) => s.as_str(),
                _ => "",
            },
        }
    }

    pub fn table(&self, key: FieldKey) -> Option<&Table> {
        match self.slot(key) {
            Some(Slot::Table(t)) => Some(t),
            _ => None,
        }
    }

    pub fn table_mut(&mut self, key: FieldKey) -> Option<&mut Table> {
        match self.slot_mut(key) {
            Some(SlotMut::Table(t)) => Some(t),
            _ => None,
        }
    }

    /// Current value of a field.
    pub fn get(&self, key: FieldKey) -> FieldValue {
        if let FieldKey::Answer(id) = key {
            return FieldValue::Text(self.answer(id).to_string());
        }
        match self.slot(key) {
            Some(Slot::Text(s)) => FieldValue::Text(s.clone()),
            Some(Slot::Table(t)) => FieldValue::Table(t.clone()),
            Some(Slot::Photo(p)) => FieldValue::Photo(p.clone()),
            None => FieldValue::Text(String::new()),
        }
    }

    /// Overwrite a field. The value must match the field's declared kind, and
    /// a table must be bound to the field's own schema.
    pub fn set(&mut self, key: FieldKey, value: FieldValue) -> Result<(), StateError> {
        let mismatch = |key: FieldKey, value: &FieldValue| StateError::KindMismatch {
            field: key.name().into_owned(),
            expected: key.kind().label(),
            actual: value.kind_label(),
        };

        if let FieldKey::Answer(id) = key {
            return match value {
                FieldValue::Text(s) => {
                    self.set_answer(id, s);
                    Ok(())
                }
                other => Err(mismatch(key, &other)),
            };
        }

        match (self.slot_mut(key), value) {
            (Some(SlotMut::Text(slot)), FieldValue::Text(s)) => *slot = s,
            (Some(SlotMut::Photo(slot)), FieldValue::Photo(p)) => *slot = p,
            (Some(SlotMut::Table(slot)), FieldValue::Table(t)) => {
                if t.schema().name != slot.schema().name {
                    return Err(StateError::KindMismatch {
                        field: key.name().into_owned(),
                        expected: slot.schema().name,
                        actual: t.schema().name,
                    });
                }
                *slot = t;
            }
            (_, other) => return Err(mismatch(key, &other)),
        }
        Ok(())
    }

    /// Set a field from its snapshot name and a text value.
    pub fn set_text_by_name(&mut self, name: &str, text: impl Into<String>) -> Result<(), StateError> {
        let key = FieldKey::from_name(name).ok_or_else(|| StateError::UnknownField(name.to_string()))?;
        self.set(key, FieldValue::Text(text.into()))
    }

    /// Recompute derived cells: the melting average and discharge power.
    pub fn recompute_derived(&mut self) {
        analysis::update_melting_average(&mut self.heat.melting_point);
        for table in &mut self.fuel_cell.discharge {
            analysis::update_discharge_power(table);
        }
    }

    /// Copy every tracked field and every question answer into a snapshot.
    /// Unanswered questions are written as empty text.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut fields = Map::new();
        for key in FieldKey::TRACKED {
            let value = match self.slot(key) {
                Some(Slot::Text(s)) => Value::String(s.clone()),
                Some(Slot::Table(t)) => t.to_records(),
                Some(Slot::Photo(p)) => p
                    .as_ref()
                    .map(|p| Value::String(p.encoded().to_string()))
                    .unwrap_or(Value::Null),
                None => continue,
            };
            fields.insert(key.name().into_owned(), value);
        }
        for title in ExperimentTitle::ALL {
            for id in QuestionId::all_for(title) {
                fields.insert(id.field_name(), Value::String(self.answer(id).to_string()));
            }
        }
        StateSnapshot(fields)
    }

    /// Apply a snapshot on top of the current values.
    ///
    /// Only keys present in the snapshot are touched; every other field keeps
    /// its current value. Unknown keys are ignored and values of the wrong
    /// shape degrade instead of failing.
    pub fn restore(&mut self, snapshot: &StateSnapshot) -> RestoreSummary {
        let mut summary = RestoreSummary::default();

        for (name, value) in snapshot.fields() {
            let Some(key) = FieldKey::from_name(name) else {
                tracing::debug!("ignoring unknown snapshot field '{name}'");
                summary.ignored.push(name.clone());
                continue;
            };

            let applied = match key.kind() {
                FieldKind::Table(table_schema) => {
                    let table = Table::from_records(table_schema, value);
                    self.set(key, FieldValue::Table(table)).is_ok()
                }
                FieldKind::Photo => match value {
                    Value::Null => self.set(key, FieldValue::Photo(None)).is_ok(),
                    Value::String(s) => self
                        .set(key, FieldValue::Photo(Photo::from_base64(s.as_str())))
                        .is_ok(),
                    _ => false,
                },
                FieldKind::Text => match scalar_text(value) {
                    Some(text) => self.set(key, FieldValue::Text(text)).is_ok(),
                    None => false,
                },
            };

            if applied {
                summary.applied += 1;
            } else {
                tracing::warn!("snapshot field '{name}' has an unexpected shape, keeping current value");
                summary.ignored.push(name.clone());
            }
        }

        summary
    }

    fn slot(&self, key: FieldKey) -> Option<Slot<'_>> {
        let c = &self.common;
        let h = &self.heat;
        let f = &self.fuel_cell;
        let w = &self.water;
        Some(match key {
            FieldKey::Answer(_) => return None,
            FieldKey::ToolsList => Slot::Table(&c.tools),
            FieldKey::ReferencesList => Slot::Table(&c.references),
            FieldKey::EvaluationMethod => Slot::Text(&c.evaluation_method),
            FieldKey::ApparatusPhoto => Slot::Photo(&c.apparatus_photo),
            FieldKey::MeltingPoint => Slot::Table(&h.melting_point),
            FieldKey::ResultTable => Slot::Table(&h.results),
            FieldKey::LitCu => Slot::Text(&h.lit_cu),
            FieldKey::LitAl => Slot::Text(&h.lit_al),
            FieldKey::LitSus => Slot::Text(&h.lit_sus),
            FieldKey::ThermalConductivityRef => Slot::Text(&h.conductivity_ref),
            FieldKey::ComparisonText => Slot::Text(&h.discussion),
            FieldKey::FcCharge => Slot::Table(&f.charge),
            FieldKey::FcDischarge1 => Slot::Table(&f.discharge[0]),
            FieldKey::FcDischarge2 => Slot::Table(&f.discharge[1]),
            FieldKey::FcDischarge3 => Slot::Table(&f.discharge[2]),
            FieldKey::FcComparisonText => Slot::Text(&f.discussion),
            FieldKey::WtOriginalWaterPhoto => Slot::Photo(&w.original_water_photo),
            FieldKey::WtProto1DevPhoto => Slot::Photo(&w.proto1_device_photo),
            FieldKey::WtProto1WaterPhoto => Slot::Photo(&w.proto1_water_photo),
            FieldKey::WtProto1Text => Slot::Text(&w.proto1_text),
            FieldKey::WtProto2DevPhoto => Slot::Photo(&w.proto2_device_photo),
            FieldKey::WtProto2WaterPhoto => Slot::Photo(&w.proto2_water_photo),
            FieldKey::WtProto2Text => Slot::Text(&w.proto2_text),
            FieldKey::WtClarity => Slot::Table(&w.clarity),
            FieldKey::WtCoagulationPhoto => Slot::Photo(&w.coagulation_photo),
            FieldKey::WtCoagulationText => Slot::Text(&w.coagulation_text),
            FieldKey::WtComparisonText => Slot::Text(&w.discussion),
        })
    }

    fn slot_mut(&mut self, key: FieldKey) -> Option<SlotMut<'_>> {
        let c = &mut self.common;
        let h = &mut self.heat;
        let f = &mut self.fuel_cell;
        let w = &mut self.water;
        Some(match key {
            FieldKey::Answer(_) => return None,
            FieldKey::ToolsList => SlotMut::Table(&mut c.tools),
            FieldKey::ReferencesList => SlotMut::Table(&mut c.references),
            FieldKey::EvaluationMethod => SlotMut::Text(&mut c.evaluation_method),
            FieldKey::ApparatusPhoto => SlotMut::Photo(&mut c.apparatus_photo),
            FieldKey::MeltingPoint => SlotMut::Table(&mut h.melting_point),
            FieldKey::ResultTable => SlotMut::Table(&mut h.results),
            FieldKey::LitCu => SlotMut::Text(&mut h.lit_cu),
            FieldKey::LitAl => SlotMut::Text(&mut h.lit_al),
            FieldKey::LitSus => SlotMut::Text(&mut h.lit_sus),
            FieldKey::ThermalConductivityRef => SlotMut::Text(&mut h.conductivity_ref),
            FieldKey::ComparisonText => SlotMut::Text(&mut h.discussion),
            FieldKey::FcCharge => SlotMut::Table(&mut f.charge),
            FieldKey::FcDischarge1 => SlotMut::Table(&mut f.discharge[0]),
            FieldKey::FcDischarge2 => SlotMut::Table(&mut f.discharge[1]),
            FieldKey::FcDischarge3 => SlotMut::Table(&mut f.discharge[2]),
            FieldKey::FcComparisonText => SlotMut::Text(&mut f.discussion),
            FieldKey::WtOriginalWaterPhoto => SlotMut::Photo(&mut w.original_water_photo),
            FieldKey::WtProto1DevPhoto => SlotMut::Photo(&mut w.proto1_device_photo),
            FieldKey::WtProto1WaterPhoto => SlotMut::Photo(&mut w.proto1_water_photo),
            FieldKey::WtProto1Text => SlotMut::Text(&mut w.proto1_text),
            FieldKey::WtProto2DevPhoto => SlotMut::Photo(&mut w.proto2_device_photo),
            FieldKey::WtProto2WaterPhoto => SlotMut::Photo(&mut w.proto2_water_photo),
            FieldKey::WtProto2Text => SlotMut::Text(&mut w.proto2_text),
            FieldKey::WtClarity => SlotMut::Table(&mut w.clarity),
            FieldKey::WtCoagulationPhoto => SlotMut::Photo(&mut w.coagulation_photo),
            FieldKey::WtCoagulationText => SlotMut::Text(&mut w.coagulation_text),
            FieldKey::WtComparisonText => SlotMut::Text(&mut w.discussion),
        })
    }
}

/// Text form of a scalar JSON value; `null` reads as empty text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;
    use serde_json::json;

    fn q(title: ExperimentTitle, index: usize) -> QuestionId {
        QuestionId { title, index }
    }

    fn edited_state() -> ExperimentState {
        let mut s = ExperimentState::new();
        s.set_answer(q(ExperimentTitle::HeatConduction, 0), "高温から低温へエネルギーが移る");
        let tools = s.table_mut(FieldKey::ToolsList).unwrap();
        let row = tools.push_row().unwrap();
        tools
            .set_cell(row, schema::TOOL_NAME, Cell::text("ガスバーナー"))
            .unwrap();
        s.heat
            .results
            .set_cell(0, "銅(sec)", Cell::text("12"))
            .unwrap();
        s.common.apparatus_photo = Some(Photo::from_bytes(b"jpeg-bytes"));
        s.water.proto1_text = "砂と活性炭".into();
        s
    }

    #[test]
    fn get_returns_factory_defaults() {
        let s = ExperimentState::new();
        assert_eq!(s.get(FieldKey::LitCu), FieldValue::Text(String::new()));
        assert_eq!(s.get(FieldKey::ApparatusPhoto), FieldValue::Photo(None));
        match s.get(FieldKey::ReferencesList) {
            FieldValue::Table(t) => assert_eq!(t.row_count(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            s.get(FieldKey::Answer(q(ExperimentTitle::FuelCell, 1))),
            FieldValue::Text(String::new())
        );
    }

    #[test]
    fn set_rejects_wrong_kind() {
        let mut s = ExperimentState::new();
        let err = s
            .set(FieldKey::ApparatusPhoto, FieldValue::Text("x".into()))
            .unwrap_err();
        assert!(matches!(err, StateError::KindMismatch { .. }));

        let wrong_table = Table::factory(&schema::WT_CLARITY);
        assert!(s
            .set(FieldKey::MeltingPoint, FieldValue::Table(wrong_table))
            .is_err());
    }

    #[test]
    fn set_text_by_name_resolves_answers() {
        let mut s = ExperimentState::new();
        s.set_text_by_name("設問_水の利用と機械の関係", "浄水と下水")
            .unwrap();
        assert_eq!(
            s.answer(q(ExperimentTitle::WaterTreatment, 0)),
            "浄水と下水"
        );
        assert!(matches!(
            s.set_text_by_name("no_such_field", "x"),
            Err(StateError::UnknownField(_))
        ));
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let original = edited_state();
        let snap = original.snapshot();
        let mut restored = ExperimentState::new();
        let summary = restored.restore(&snap);
        assert!(summary.ignored.is_empty());
        assert_eq!(restored, original);
    }

    #[test]
    fn cleared_answers_overwrite_stale_ones_on_restore() {
        let cleared = ExperimentState::new();
        let snap = cleared.snapshot();
        let first = q(ExperimentTitle::HeatConduction, 0);
        assert_eq!(snap.get(&first.field_name()), Some(&json!("")));
        assert_eq!(
            snap.fields()
                .keys()
                .filter(|k| k.starts_with(crate::template::ANSWER_PREFIX))
                .count(),
            ExperimentTitle::ALL
                .into_iter()
                .map(|t| QuestionId::all_for(t).count())
                .sum::<usize>()
        );

        let mut live = ExperimentState::new();
        live.set_answer(first, "古い回答");
        live.heat.lit_cu = "398".into();
        live.restore(&snap);
        assert_eq!(live.answer(first), "");
        assert_eq!(live.heat.lit_cu, "");
        assert_eq!(live, cleared);
    }

    #[test]
    fn snapshot_tables_are_row_lists() {
        let snap = ExperimentState::new().snapshot();
        assert_eq!(
            snap.get("wt_clarity_df"),
            Some(&json!([{"試作検討①": "", "試作検討②": ""}]))
        );
        assert_eq!(snap.get("apparatus_photo_data"), Some(&Value::Null));
        assert_eq!(snap.get("fc_discharge_1").unwrap()[3]["放電時間(sec)"], json!(900));
    }

    #[test]
    fn restore_is_a_partial_overwrite() {
        let mut s = edited_state();
        let mut fields = Map::new();
        fields.insert("lit_cu".into(), json!("398"));
        fields.insert("photos".into(), json!([]));
        let summary = s.restore(&StateSnapshot::new(fields));
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.ignored, vec!["photos".to_string()]);
        assert_eq!(s.heat.lit_cu, "398");
        assert_eq!(s.water.proto1_text, "砂と活性炭");
        assert!(s.common.apparatus_photo.is_some());
    }

    #[test]
    fn restore_degrades_malformed_tables() {
        let mut s = ExperimentState::new();
        let mut fields = Map::new();
        fields.insert("melting_point_df".into(), json!("garbage"));
        fields.insert("tools_list".into(), json!([]));
        s.restore(&StateSnapshot::new(fields));
        assert_eq!(s.heat.melting_point, Table::factory(&schema::MELTING_POINT));
        assert!(s.common.tools.is_empty());
        assert_eq!(s.common.tools.columns().len(), 2);
    }

    #[test]
    fn restore_keeps_text_on_structured_value() {
        let mut s = ExperimentState::new();
        s.heat.discussion = "before".into();
        let mut fields = Map::new();
        fields.insert("comparison_text".into(), json!({"nested": true}));
        let summary = s.restore(&StateSnapshot::new(fields));
        assert_eq!(summary.applied, 0);
        assert_eq!(s.heat.discussion, "before");
    }

    #[test]
    fn reset_restores_factory_defaults() {
        let mut s = edited_state();
        s.reset();
        assert_eq!(s, ExperimentState::new());
    }

    #[test]
    fn recompute_derived_fills_average_and_power() {
        let mut s = ExperimentState::new();
        s.heat
            .melting_point
            .set_cell(0, schema::MELT_TRIALS[0], Cell::text("48"))
            .unwrap();
        s.fuel_cell.discharge[2]
            .set_cell(0, schema::TERMINAL_VOLTAGE, Cell::text("1.2"))
            .unwrap();
        s.fuel_cell.discharge[2]
            .set_cell(0, schema::CURRENT_MA, Cell::text("50"))
            .unwrap();
        s.recompute_derived();
        assert_eq!(
            s.heat.melting_point.cell(0, schema::MELT_AVERAGE),
            Some(&Cell::text("48.0"))
        );
        assert_eq!(
            s.fuel_cell.discharge[2].cell(0, schema::POWER_MW),
            Some(&Cell::text("60.0"))
        );
    }
}

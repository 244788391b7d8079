//! The closed field schema.
//!
//! Every field an experiment can hold is a [`FieldKey`] variant with a fixed
//! snapshot name and a fixed [`FieldKind`]. Table fields carry a static
//! [`TableSchema`] describing their columns, shape, and factory rows.

use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};

use crate::model::Cell;
use crate::template::QuestionId;

/// Whether a table's row count may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// Rows may be added and removed freely, including down to zero.
    Dynamic,
    /// Exactly `rows` rows, always.
    Fixed { rows: usize },
}

/// Static description of a table field.
#[derive(Debug)]
pub struct TableSchema {
    /// Snapshot field name.
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub shape: TableShape,
    /// Display labels for fixed rows. Not persisted.
    pub row_labels: &'static [&'static str],
    /// `(column, older column name)` pairs accepted on restore.
    pub legacy_columns: &'static [(&'static str, &'static str)],
    pub factory_rows: fn() -> Vec<Vec<Cell>>,
}

impl TableSchema {
    /// Find the value for `column` in a row object, falling back to legacy names.
    pub fn lookup<'a>(&self, row: &'a Map<String, Value>, column: &str) -> Option<&'a Value> {
        row.get(column).or_else(|| {
            self.legacy_columns
                .iter()
                .find(|(current, _)| *current == column)
                .and_then(|(_, legacy)| row.get(*legacy))
        })
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.shape, TableShape::Fixed { .. })
    }
}

// Column names, as persisted.
pub const TOOL_NAME: &str = "器具・装置・薬品名";
pub const TOOL_ROLE: &str = "用途・役割など";
pub const REF_TITLE: &str = "書籍名・サイト名";
pub const REF_AUTHOR: &str = "著者・発行者";
pub const REF_YEAR_URL: &str = "発行年・URL";
pub const MELT_TRIALS: [&str; 3] = ["1回目(℃)", "2回目(℃)", "3回目(℃)"];
pub const MELT_AVERAGE: &str = "平均(℃)";
pub const DISTANCE: &str = "距離(cm)";
pub const MATERIAL_COLUMNS: [&str; 3] = ["銅(sec)", "アルミ(sec)", "ステンレス(sec)"];
pub const CHARGE_COLUMNS: [&str; 3] = ["充電時間(sec)", "充電電圧(V)", "開回路電圧(V)"];
pub const DISCHARGE_MINUTES: &str = "放電時間(分)";
pub const DISCHARGE_SECONDS: &str = "放電時間(sec)";
pub const TERMINAL_VOLTAGE: &str = "端子電圧(V)";
pub const CURRENT_MA: &str = "電流(mA)";
pub const POWER_MW: &str = "出力(mW)";
pub const CLARITY_COLUMNS: [&str; 2] = ["試作検討①", "試作検討②"];

/// Reference titles seeded into every fresh state. They earn no credit.
pub const DEFAULT_REFERENCE_TITLES: [&str; 2] =
    ["物理基礎 改訂版", "国立天文台 理科年表オフィシャルサイト"];

/// Factory discharge time axis: minutes and seconds.
pub const DISCHARGE_TIME_AXIS: [(i64, i64); 4] = [(0, 0), (5, 300), (10, 600), (15, 900)];

fn empty_rows(rows: usize, cols: usize) -> Vec<Vec<Cell>> {
    vec![vec![Cell::empty(); cols]; rows]
}

fn no_rows() -> Vec<Vec<Cell>> {
    Vec::new()
}

fn default_references() -> Vec<Vec<Cell>> {
    vec![
        vec![
            Cell::text(DEFAULT_REFERENCE_TITLES[0]),
            Cell::text("第一学習社"),
            Cell::text("2023年"),
        ],
        vec![
            Cell::text(DEFAULT_REFERENCE_TITLES[1]),
            Cell::text("国立天文台"),
            Cell::text("https://official.rikanenpyo.jp/"),
        ],
    ]
}

fn melting_rows() -> Vec<Vec<Cell>> {
    empty_rows(1, 4)
}

fn result_rows() -> Vec<Vec<Cell>> {
    (1..=6)
        .map(|i| {
            vec![
                Cell::int(i * 2),
                Cell::empty(),
                Cell::empty(),
                Cell::empty(),
            ]
        })
        .collect()
}

fn charge_rows() -> Vec<Vec<Cell>> {
    empty_rows(3, 3)
}

fn discharge_rows() -> Vec<Vec<Cell>> {
    DISCHARGE_TIME_AXIS
        .iter()
        .map(|&(min, sec)| {
            vec![
                Cell::int(min),
                Cell::int(sec),
                Cell::empty(),
                Cell::empty(),
                Cell::empty(),
            ]
        })
        .collect()
}

fn clarity_rows() -> Vec<Vec<Cell>> {
    empty_rows(1, 2)
}

pub static TOOLS_LIST: TableSchema = TableSchema {
    name: "tools_list",
    columns: &[TOOL_NAME, TOOL_ROLE],
    shape: TableShape::Dynamic,
    row_labels: &[],
    legacy_columns: &[(TOOL_NAME, "器具名"), (TOOL_ROLE, "役割")],
    factory_rows: no_rows,
};

pub static REFERENCES_LIST: TableSchema = TableSchema {
    name: "references_list",
    columns: &[REF_TITLE, REF_AUTHOR, REF_YEAR_URL],
    shape: TableShape::Dynamic,
    row_labels: &[],
    legacy_columns: &[],
    factory_rows: default_references,
};

pub static MELTING_POINT: TableSchema = TableSchema {
    name: "melting_point_df",
    columns: &[MELT_TRIALS[0], MELT_TRIALS[1], MELT_TRIALS[2], MELT_AVERAGE],
    shape: TableShape::Fixed { rows: 1 },
    row_labels: &["融解温度(℃)"],
    legacy_columns: &[],
    factory_rows: melting_rows,
};

pub static RESULT_TABLE: TableSchema = TableSchema {
    name: "result_df",
    columns: &[
        DISTANCE,
        MATERIAL_COLUMNS[0],
        MATERIAL_COLUMNS[1],
        MATERIAL_COLUMNS[2],
    ],
    shape: TableShape::Dynamic,
    row_labels: &[],
    legacy_columns: &[],
    factory_rows: result_rows,
};

pub static FC_CHARGE: TableSchema = TableSchema {
    name: "fc_charge_df",
    columns: &[CHARGE_COLUMNS[0], CHARGE_COLUMNS[1], CHARGE_COLUMNS[2]],
    shape: TableShape::Fixed { rows: 3 },
    row_labels: &["1回目", "2回目", "3回目"],
    legacy_columns: &[],
    factory_rows: charge_rows,
};

const DISCHARGE_COLUMNS: &[&str] = &[
    DISCHARGE_MINUTES,
    DISCHARGE_SECONDS,
    TERMINAL_VOLTAGE,
    CURRENT_MA,
    POWER_MW,
];

pub static FC_DISCHARGE_1: TableSchema = TableSchema {
    name: "fc_discharge_1",
    columns: DISCHARGE_COLUMNS,
    shape: TableShape::Fixed { rows: 4 },
    row_labels: &[],
    legacy_columns: &[],
    factory_rows: discharge_rows,
};

pub static FC_DISCHARGE_2: TableSchema = TableSchema {
    name: "fc_discharge_2",
    columns: DISCHARGE_COLUMNS,
    shape: TableShape::Fixed { rows: 4 },
    row_labels: &[],
    legacy_columns: &[],
    factory_rows: discharge_rows,
};

pub static FC_DISCHARGE_3: TableSchema = TableSchema {
    name: "fc_discharge_3",
    columns: DISCHARGE_COLUMNS,
    shape: TableShape::Fixed { rows: 4 },
    row_labels: &[],
    legacy_columns: &[],
    factory_rows: discharge_rows,
};

pub static WT_CLARITY: TableSchema = TableSchema {
    name: "wt_clarity_df",
    columns: &[CLARITY_COLUMNS[0], CLARITY_COLUMNS[1]],
    shape: TableShape::Fixed { rows: 1 },
    row_labels: &["清澄度"],
    legacy_columns: &[],
    factory_rows: clarity_rows,
};

// ---------------------------------------------------------------------------
// Field keys
// ---------------------------------------------------------------------------

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Table(&'static TableSchema),
    Photo,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Table(_) => "table",
            FieldKind::Photo => "photo",
        }
    }
}

/// Every field an experiment state tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Answer(QuestionId),
    ToolsList,
    ReferencesList,
    EvaluationMethod,
    MeltingPoint,
    ResultTable,
    LitCu,
    LitAl,
    LitSus,
    ThermalConductivityRef,
    ComparisonText,
    ApparatusPhoto,
    FcCharge,
    FcDischarge1,
    FcDischarge2,
    FcDischarge3,
    FcComparisonText,
    WtOriginalWaterPhoto,
    WtProto1DevPhoto,
    WtProto1WaterPhoto,
    WtProto1Text,
    WtProto2DevPhoto,
    WtProto2WaterPhoto,
    WtProto2Text,
    WtClarity,
    WtCoagulationPhoto,
    WtCoagulationText,
    WtComparisonText,
}

impl FieldKey {
    /// Non-answer fields in persisted order.
    pub const TRACKED: [FieldKey; 27] = [
        FieldKey::ToolsList,
        FieldKey::ReferencesList,
        FieldKey::EvaluationMethod,
        FieldKey::MeltingPoint,
        FieldKey::ResultTable,
        FieldKey::LitCu,
        FieldKey::LitAl,
        FieldKey::LitSus,
        FieldKey::ThermalConductivityRef,
        FieldKey::ComparisonText,
        FieldKey::ApparatusPhoto,
        FieldKey::FcCharge,
        FieldKey::FcDischarge1,
        FieldKey::FcDischarge2,
        FieldKey::FcDischarge3,
        FieldKey::FcComparisonText,
        FieldKey::WtOriginalWaterPhoto,
        FieldKey::WtProto1DevPhoto,
        FieldKey::WtProto1WaterPhoto,
        FieldKey::WtProto1Text,
        FieldKey::WtProto2DevPhoto,
        FieldKey::WtProto2WaterPhoto,
        FieldKey::WtProto2Text,
        FieldKey::WtClarity,
        FieldKey::WtCoagulationPhoto,
        FieldKey::WtCoagulationText,
        FieldKey::WtComparisonText,
    ];

    /// The six photo slots counted by the water-treatment rubric.
    pub const WATER_PHOTOS: [FieldKey; 6] = [
        FieldKey::WtOriginalWaterPhoto,
        FieldKey::WtProto1DevPhoto,
        FieldKey::WtProto1WaterPhoto,
        FieldKey::WtProto2DevPhoto,
        FieldKey::WtProto2WaterPhoto,
        FieldKey::WtCoagulationPhoto,
    ];

    /// Snapshot name of the field.
    pub fn name(&self) -> Cow<'static, str> {
        let name = match self {
            FieldKey::Answer(q) => return Cow::Owned(q.field_name()),
            FieldKey::ToolsList => "tools_list",
            FieldKey::ReferencesList => "references_list",
            FieldKey::EvaluationMethod => "evaluation_method",
            FieldKey::MeltingPoint => "melting_point_df",
            FieldKey::ResultTable => "result_df",
            FieldKey::LitCu => "lit_cu",
            FieldKey::LitAl => "lit_al",
            FieldKey::LitSus => "lit_sus",
            FieldKey::ThermalConductivityRef => "thermal_conductivity_ref",
            FieldKey::ComparisonText => "comparison_text",
            FieldKey::ApparatusPhoto => "apparatus_photo_data",
            FieldKey::FcCharge => "fc_charge_df",
            FieldKey::FcDischarge1 => "fc_discharge_1",
            FieldKey::FcDischarge2 => "fc_discharge_2",
            FieldKey::FcDischarge3 => "fc_discharge_3",
            FieldKey::FcComparisonText => "fc_comparison_text",
            FieldKey::WtOriginalWaterPhoto => "wt_original_water_photo",
            FieldKey::WtProto1DevPhoto => "wt_proto1_dev_photo",
            FieldKey::WtProto1WaterPhoto => "wt_proto1_water_photo",
            FieldKey::WtProto1Text => "wt_proto1_text",
            FieldKey::WtProto2DevPhoto => "wt_proto2_dev_photo",
            FieldKey::WtProto2WaterPhoto => "wt_proto2_water_photo",
            FieldKey::WtProto2Text => "wt_proto2_text",
            FieldKey::WtClarity => "wt_clarity_df",
            FieldKey::WtCoagulationPhoto => "wt_coagulation_photo",
            FieldKey::WtCoagulationText => "wt_coagulation_text",
            FieldKey::WtComparisonText => "wt_comparison_text",
        };
        Cow::Borrowed(name)
    }

    /// Resolve a snapshot name. Unknown names, including unknown question
    /// fields, resolve to `None`.
    pub fn from_name(name: &str) -> Option<FieldKey> {
        Self::TRACKED
            .into_iter()
            .find(|k| k.name() == name)
            .or_else(|| QuestionId::from_field_name(name).map(FieldKey::Answer))
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldKey::ToolsList => FieldKind::Table(&TOOLS_LIST),
            FieldKey::ReferencesList => FieldKind::Table(&REFERENCES_LIST),
            FieldKey::MeltingPoint => FieldKind::Table(&MELTING_POINT),
            FieldKey::ResultTable => FieldKind::Table(&RESULT_TABLE),
            FieldKey::FcCharge => FieldKind::Table(&FC_CHARGE),
            FieldKey::FcDischarge1 => FieldKind::Table(&FC_DISCHARGE_1),
            FieldKey::FcDischarge2 => FieldKind::Table(&FC_DISCHARGE_2),
            FieldKey::FcDischarge3 => FieldKind::Table(&FC_DISCHARGE_3),
            FieldKey::WtClarity => FieldKind::Table(&WT_CLARITY),
            FieldKey::ApparatusPhoto
            | FieldKey::WtOriginalWaterPhoto
            | FieldKey::WtProto1DevPhoto
            | FieldKey::WtProto1WaterPhoto
            | FieldKey::WtProto2DevPhoto
            | FieldKey::WtProto2WaterPhoto
            | FieldKey::WtCoagulationPhoto => FieldKind::Photo,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExperimentTitle;

    #[test]
    fn names_resolve_back_to_keys() {
        for key in FieldKey::TRACKED {
            assert_eq!(FieldKey::from_name(&key.name()), Some(key));
        }
        assert_eq!(FieldKey::from_name("photos"), None);
    }

    #[test]
    fn question_fields_resolve() {
        let key = FieldKey::from_name("設問_熱伝導って何").unwrap();
        assert_eq!(
            key,
            FieldKey::Answer(QuestionId {
                title: ExperimentTitle::HeatConduction,
                index: 0
            })
        );
        assert_eq!(FieldKey::from_name("設問_存在しない設問"), None);
    }

    #[test]
    fn factory_shapes_match_schema() {
        for key in FieldKey::TRACKED {
            if let FieldKind::Table(schema) = key.kind() {
                let rows = (schema.factory_rows)();
                for row in &rows {
                    assert_eq!(row.len(), schema.columns.len(), "{}", schema.name);
                }
                if let TableShape::Fixed { rows: n } = schema.shape {
                    assert_eq!(rows.len(), n, "{}", schema.name);
                }
            }
        }
    }
}

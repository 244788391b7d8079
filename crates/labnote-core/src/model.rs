//! Core data model types for labnote.
//!
//! These are the value types the rest of the system passes around: the three
//! experiment titles, table cells and tables, stored photos, and the
//! identity block that sits above any one experiment.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PhotoError, StateError};
use crate::schema::{TableSchema, TableShape};

/// One of the three fixed experiment themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExperimentTitle {
    #[serde(rename = "実験① 熱の可視化")]
    HeatConduction,
    #[serde(rename = "実験② アルカリ型燃料電池の組み立て")]
    FuelCell,
    #[serde(rename = "実験③ 水処理装置の設計と提案")]
    WaterTreatment,
}

impl ExperimentTitle {
    /// All titles in menu order.
    pub const ALL: [ExperimentTitle; 3] = [
        ExperimentTitle::HeatConduction,
        ExperimentTitle::FuelCell,
        ExperimentTitle::WaterTreatment,
    ];

    /// The full display title, also used as the registry key in snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            ExperimentTitle::HeatConduction => "実験① 熱の可視化",
            ExperimentTitle::FuelCell => "実験② アルカリ型燃料電池の組み立て",
            ExperimentTitle::WaterTreatment => "実験③ 水処理装置の設計と提案",
        }
    }

    /// Short ASCII alias accepted on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            ExperimentTitle::HeatConduction => "heat",
            ExperimentTitle::FuelCell => "fuel-cell",
            ExperimentTitle::WaterTreatment => "water",
        }
    }

    /// Look up a title by its exact display string.
    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == title)
    }
}

impl Default for ExperimentTitle {
    fn default() -> Self {
        ExperimentTitle::HeatConduction
    }
}

impl fmt::Display for ExperimentTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentTitle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(title) = Self::from_title(s.trim()) {
            return Ok(title);
        }
        match s.trim().to_lowercase().as_str() {
            "heat" | "heat-conduction" | "1" => Ok(ExperimentTitle::HeatConduction),
            "fuel-cell" | "fuel" | "fuelcell" | "2" => Ok(ExperimentTitle::FuelCell),
            "water" | "water-treatment" | "3" => Ok(ExperimentTitle::WaterTreatment),
            other => Err(format!("unknown experiment title: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Cells and tables
// ---------------------------------------------------------------------------

/// A single table cell: free text, a number, or nothing.
///
/// Numbers only appear where a factory default seeded them (distances and the
/// discharge time axis); everything a student types is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(serde_json::Number),
    Text(String),
}

impl Cell {
    /// An empty text cell.
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn int(n: i64) -> Self {
        Cell::Number(n.into())
    }

    /// Build a cell from an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Number(n) => Cell::Number(n.clone()),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Number(n) => Value::Number(n.clone()),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }

    /// The cell as it is shown to the student.
    pub fn display_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Null => Cow::Borrowed(""),
            Cell::Number(n) => Cow::Owned(n.to_string()),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Whether the cell holds anything other than whitespace.
    pub fn is_filled(&self) -> bool {
        !self.display_text().trim().is_empty()
    }

    /// Numeric reading of the cell; text that does not parse yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Cell::Null => None,
            Cell::Number(n) => n.as_f64(),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
        }?;
        n.is_finite().then_some(n)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::empty()
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// A table bound to its schema. Column set and, for fixed-shape tables, row
/// count always match the schema.
#[derive(Debug, Clone)]
pub struct Table {
    schema: &'static TableSchema,
    rows: Vec<Vec<Cell>>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.rows == other.rows
    }
}

impl Table {
    /// The factory-default table for a schema.
    pub fn factory(schema: &'static TableSchema) -> Self {
        Self {
            schema,
            rows: (schema.factory_rows)(),
        }
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.schema.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.schema.columns.iter().position(|c| *c == column)
    }

    /// Cell at `row` in the named column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Every cell of the named column, top to bottom. Unknown columns are empty.
    pub fn column<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a Cell> + 'a {
        let col = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |r| col.map(|c| &r[c]))
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: Cell) -> Result<(), StateError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| StateError::UnknownColumn {
                table: self.schema.name,
                column: column.to_string(),
            })?;
        let rows = self.rows.len();
        let target = self.rows.get_mut(row).ok_or(StateError::RowOutOfRange {
            table: self.schema.name,
            row,
            rows,
        })?;
        target[col] = value;
        Ok(())
    }

    /// Append an empty row. Only dynamic-shape tables grow.
    pub fn push_row(&mut self) -> Result<usize, StateError> {
        if self.schema.is_fixed() {
            return Err(StateError::FixedShape(self.schema.name));
        }
        self.rows.push(vec![Cell::empty(); self.schema.columns.len()]);
        Ok(self.rows.len() - 1)
    }

    pub fn remove_row(&mut self, row: usize) -> Result<Vec<Cell>, StateError> {
        if self.schema.is_fixed() {
            return Err(StateError::FixedShape(self.schema.name));
        }
        if row >= self.rows.len() {
            return Err(StateError::RowOutOfRange {
                table: self.schema.name,
                row,
                rows: self.rows.len(),
            });
        }
        Ok(self.rows.remove(row))
    }

    /// Serialize as an ordered list of row objects (column name → cell).
    ///
    /// Row labels are not part of the record form; row order is the identity.
    pub fn to_records(&self) -> Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (col, cell) in self.schema.columns.iter().zip(row) {
                    obj.insert((*col).to_string(), cell.to_value());
                }
                Value::Object(obj)
            })
            .collect();
        Value::Array(records)
    }

    /// Rebuild a table from its record form.
    ///
    /// Never fails: cells missing from a row restore as empty text, non-object
    /// rows are skipped, and a fixed-shape table is truncated or padded with
    /// its factory rows so the row count is preserved.
    pub fn from_records(schema: &'static TableSchema, value: &Value) -> Self {
        let Some(records) = value.as_array() else {
            tracing::warn!(
                "table '{}' is not a list of rows, using factory rows",
                schema.name
            );
            return Self::factory(schema);
        };

        let mut rows: Vec<Vec<Cell>> = records
            .iter()
            .filter_map(|record| {
                let Some(obj) = record.as_object() else {
                    tracing::warn!("skipping malformed row in table '{}'", schema.name);
                    return None;
                };
                Some(
                    schema
                        .columns
                        .iter()
                        .map(|col| schema.lookup(obj, col).map(Cell::from_value).unwrap_or_default())
                        .collect(),
                )
            })
            .collect();

        if let TableShape::Fixed { rows: fixed } = schema.shape {
            rows.truncate(fixed);
            let have = rows.len();
            if have < fixed {
                let factory = (schema.factory_rows)();
                rows.extend(factory.into_iter().skip(have));
            }
        }

        Self { schema, rows }
    }
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

/// An uploaded photo, stored as base64 text exactly as it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Photo(String);

impl Photo {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Photo(STANDARD.encode(bytes))
    }

    /// Wrap already-encoded text. Empty text means no photo.
    pub fn from_base64(encoded: impl Into<String>) -> Option<Self> {
        let encoded = encoded.into();
        (!encoded.is_empty()).then_some(Photo(encoded))
    }

    pub fn encoded(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<Vec<u8>, PhotoError> {
        Ok(STANDARD.decode(self.0.trim())?)
    }
}

// ---------------------------------------------------------------------------
// Global info
// ---------------------------------------------------------------------------

/// Factory-default student id.
pub const DEFAULT_STUDENT_ID: &str = "00";
/// Factory-default student name.
pub const DEFAULT_STUDENT_NAME: &str = "高専 太郎";

/// Identity and session metadata, independent of the experiment title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalInfo {
    pub exp_date: NaiveDate,
    pub class_name: String,
    pub seat_number: String,
    pub student_id: String,
    pub student_name: String,
    pub partner1_id: String,
    pub partner1_name: String,
    pub partner2_id: String,
    pub partner2_name: String,
}

impl GlobalInfo {
    /// Factory defaults dated `exp_date`.
    pub fn new(exp_date: NaiveDate) -> Self {
        Self {
            exp_date,
            class_name: "1年1組".to_string(),
            seat_number: "00".to_string(),
            student_id: DEFAULT_STUDENT_ID.to_string(),
            student_name: DEFAULT_STUDENT_NAME.to_string(),
            partner1_id: String::new(),
            partner1_name: String::new(),
            partner2_id: String::new(),
            partner2_name: String::new(),
        }
    }

    /// True while either the id or the name is still the factory placeholder.
    pub fn is_default_identity(&self) -> bool {
        self.student_id == DEFAULT_STUDENT_ID || self.student_name == DEFAULT_STUDENT_NAME
    }
}

impl Default for GlobalInfo {
    fn default() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn title_display_and_parse() {
        assert_eq!(
            ExperimentTitle::FuelCell.to_string(),
            "実験② アルカリ型燃料電池の組み立て"
        );
        assert_eq!(
            "実験① 熱の可視化".parse::<ExperimentTitle>().unwrap(),
            ExperimentTitle::HeatConduction
        );
        assert_eq!(
            "water".parse::<ExperimentTitle>().unwrap(),
            ExperimentTitle::WaterTreatment
        );
        assert_eq!(
            "2".parse::<ExperimentTitle>().unwrap(),
            ExperimentTitle::FuelCell
        );
        assert!("chemistry".parse::<ExperimentTitle>().is_err());
    }

    #[test]
    fn title_serializes_as_display_string() {
        let json = serde_json::to_string(&ExperimentTitle::WaterTreatment).unwrap();
        assert_eq!(json, "\"実験③ 水処理装置の設計と提案\"");
    }

    #[test]
    fn cell_text_and_numbers() {
        assert_eq!(Cell::int(12).display_text(), "12");
        assert_eq!(Cell::text(" 3.5 ").as_f64(), Some(3.5));
        assert_eq!(Cell::text("abc").as_f64(), None);
        assert_eq!(Cell::text("nan").as_f64(), None);
        assert!(!Cell::text("   ").is_filled());
        assert!(!Cell::Null.is_filled());
        assert!(Cell::int(0).is_filled());
    }

    #[test]
    fn fixed_table_rejects_new_rows() {
        let mut t = Table::factory(&schema::MELTING_POINT);
        assert!(matches!(t.push_row(), Err(StateError::FixedShape(_))));
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn dynamic_table_grows_and_shrinks() {
        let mut t = Table::factory(&schema::TOOLS_LIST);
        assert!(t.is_empty());
        let idx = t.push_row().unwrap();
        t.set_cell(idx, "器具・装置・薬品名", Cell::text("ビーカー")).unwrap();
        assert_eq!(t.row_count(), 1);
        t.remove_row(0).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn set_cell_errors() {
        let mut t = Table::factory(&schema::WT_CLARITY);
        assert!(matches!(
            t.set_cell(0, "nope", Cell::empty()),
            Err(StateError::UnknownColumn { .. })
        ));
        assert!(matches!(
            t.set_cell(3, "試作検討①", Cell::empty()),
            Err(StateError::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn fixed_table_restored_from_empty_list_keeps_factory_rows() {
        let t = Table::from_records(&schema::FC_DISCHARGE_1, &serde_json::json!([]));
        assert_eq!(t, Table::factory(&schema::FC_DISCHARGE_1));
        assert_eq!(t.row_count(), 4);
    }

    #[test]
    fn fixed_table_restore_truncates_and_fills_missing_cells() {
        let value = serde_json::json!([
            {"試作検討①": "800"},
            {"試作検討①": "1", "試作検討②": "2"}
        ]);
        let t = Table::from_records(&schema::WT_CLARITY, &value);
        assert_eq!(t.row_count(), 1);
        assert_eq!(t.cell(0, "試作検討①"), Some(&Cell::text("800")));
        assert_eq!(t.cell(0, "試作検討②"), Some(&Cell::empty()));
    }

    #[test]
    fn dynamic_table_restored_from_empty_list_is_empty_with_columns() {
        let t = Table::from_records(&schema::REFERENCES_LIST, &serde_json::json!([]));
        assert!(t.is_empty());
        assert_eq!(t.columns().len(), 3);
    }

    #[test]
    fn legacy_tool_columns_are_accepted() {
        let value = serde_json::json!([{"器具名": "温度計", "役割": "測定"}]);
        let t = Table::from_records(&schema::TOOLS_LIST, &value);
        assert_eq!(t.cell(0, "器具・装置・薬品名"), Some(&Cell::text("温度計")));
        assert_eq!(t.cell(0, "用途・役割など"), Some(&Cell::text("測定")));
    }

    #[test]
    fn photo_roundtrip_and_empty() {
        let photo = Photo::from_bytes(b"\x89PNG");
        assert_eq!(photo.decode().unwrap(), b"\x89PNG");
        assert!(Photo::from_base64("").is_none());
        assert!(Photo::from_base64("!!!").unwrap().decode().is_err());
    }

    #[test]
    fn default_identity_detection() {
        let mut g = GlobalInfo::new(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        assert!(g.is_default_identity());
        g.student_id = "12".into();
        assert!(g.is_default_identity());
        g.student_name = "山田 花子".into();
        assert!(!g.is_default_identity());
    }
}

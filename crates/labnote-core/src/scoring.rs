//! The completeness rubric.
//!
//! Points accumulate as `f64` in a fixed order and are truncated exactly once
//! per exposed number. The total is the truncation of the unrounded sum, so a
//! home of 49.9 and a report of 0.5 give 49, 0 and 50.

use serde::{Deserialize, Serialize};

use crate::model::{ExperimentTitle, GlobalInfo};
use crate::schema::{
    FieldKey, CHARGE_COLUMNS, CLARITY_COLUMNS, CURRENT_MA, DEFAULT_REFERENCE_TITLES, MATERIAL_COLUMNS,
    MELT_AVERAGE, REF_TITLE, TERMINAL_VOLTAGE, TOOL_NAME,
};
use crate::state::ExperimentState;
use crate::template::{QuestionId, FULL_LENGTH, PARTIAL_LENGTH};
use crate::traits::TitleRubric;

/// Points for the whole take-home question block.
pub const QUESTION_POINTS: f64 = 40.0;
/// Points for citing a non-default reference.
pub const REFERENCE_POINTS: f64 = 10.0;

/// Which half of the rubric an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Home,
    Report,
}

/// One rubric component and what it earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricItem {
    pub section: Section,
    pub label: String,
    pub earned: f64,
    pub max: f64,
}

/// Running tally of rubric items, in accumulation order.
#[derive(Debug, Default)]
pub struct Scorecard {
    items: Vec<RubricItem>,
    home: f64,
    report: f64,
}

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn home(&mut self, label: impl Into<String>, earned: f64, max: f64) {
        self.home += earned;
        self.items.push(RubricItem {
            section: Section::Home,
            label: label.into(),
            earned,
            max,
        });
    }

    pub fn report(&mut self, label: impl Into<String>, earned: f64, max: f64) {
        self.report += earned;
        self.items.push(RubricItem {
            section: Section::Report,
            label: label.into(),
            earned,
            max,
        });
    }

    /// Award `max` when `met`, else nothing.
    pub fn report_if(&mut self, label: impl Into<String>, met: bool, max: f64) {
        self.report(label, if met { max } else { 0.0 }, max);
    }

    pub fn items(&self) -> &[RubricItem] {
        &self.items
    }

    /// Truncate the tallies into a [`Score`].
    pub fn finish(self, is_default_identity: bool) -> Score {
        Score {
            home: truncate_points(self.home),
            report: truncate_points(self.report),
            total: truncate_points(self.home + self.report),
            is_default_identity,
            home_points: self.home,
            report_points: self.report,
            items: self.items,
        }
    }
}

/// Truncate toward zero; negative tallies cannot occur but clamp anyway.
fn truncate_points(points: f64) -> u32 {
    points.max(0.0) as u32
}

/// Result of scoring one experiment state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Take-home score, 0..=50.
    pub home: u32,
    /// Report score, 0..=50.
    pub report: u32,
    /// Truncation of the unrounded sum, 0..=100.
    pub total: u32,
    pub is_default_identity: bool,
    /// Untruncated home tally.
    pub home_points: f64,
    /// Untruncated report tally.
    pub report_points: f64,
    pub items: Vec<RubricItem>,
}

impl Score {
    pub fn band(&self, pass_threshold: u32, excellent_threshold: u32) -> Band {
        Band::classify(self.total, pass_threshold, excellent_threshold)
    }
}

/// Coarse feedback band for a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Insufficient,
    Passing,
    Excellent,
}

impl Band {
    pub fn classify(total: u32, pass_threshold: u32, excellent_threshold: u32) -> Band {
        if total < pass_threshold {
            Band::Insufficient
        } else if total < excellent_threshold {
            Band::Passing
        } else {
            Band::Excellent
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Band::Insufficient => "まだ記述や入力が不足しています。",
            Band::Passing => "合格ラインです。さらに充実させましょう。",
            Band::Excellent => "素晴らしい完成度です。",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Band::Insufficient => "insufficient",
            Band::Passing => "passing",
            Band::Excellent => "excellent",
        };
        f.write_str(s)
    }
}

/// Score `state` as an experiment of `title`.
pub fn score(state: &ExperimentState, global: &GlobalInfo, title: ExperimentTitle) -> Score {
    let rubric = rubric_for(title);
    let mut card = Scorecard::new();

    score_questions(rubric, state, &mut card);
    card.home(
        "参考文献",
        if has_own_reference(state) { REFERENCE_POINTS } else { 0.0 },
        REFERENCE_POINTS,
    );

    let is_default_identity = global.is_default_identity();
    let identity_filled = !global.class_name.is_empty()
        && !global.student_id.is_empty()
        && !global.student_name.is_empty();
    card.report_if("基本情報", identity_filled && !is_default_identity, 5.0);

    let has_tools = state
        .common
        .tools
        .column(TOOL_NAME)
        .any(|c| c.is_filled());
    card.report_if("使用器具", has_tools, 4.0);
    card.report_if("装置写真", rubric.has_apparatus_photo(state), 4.0);
    card.report_if("評価方法", rubric.has_evaluation_method(state), 2.0);

    rubric.score_results(state, &mut card);

    let score = card.finish(is_default_identity);
    tracing::debug!(
        title = %title,
        home = score.home,
        report = score.report,
        total = score.total,
        "scored experiment"
    );
    score
}

fn score_questions(rubric: &dyn TitleRubric, state: &ExperimentState, card: &mut Scorecard) {
    let questions = rubric.questions();
    if questions.is_empty() {
        return;
    }
    let share = QUESTION_POINTS / questions.len() as f64;

    for (index, question) in questions.iter().enumerate() {
        let answer = state.answer(QuestionId {
            title: rubric.title(),
            index,
        });
        let n = index + 1;
        let len = answer.chars().count();

        let written = if answer.trim().is_empty() { 0.0 } else { share * 0.3 };
        card.home(format!("設問{n} 記述"), written, share * 0.3);

        let length = if len >= FULL_LENGTH {
            share * 0.4
        } else if len >= PARTIAL_LENGTH {
            share * 0.2
        } else {
            0.0
        };
        card.home(format!("設問{n} 文字数"), length, share * 0.4);

        let keywords = if question.has_all_keywords(answer) { share * 0.3 } else { 0.0 };
        card.home(format!("設問{n} 必須語句"), keywords, share * 0.3);
    }
}

/// A reference row with a title that is neither empty nor a factory default.
fn has_own_reference(state: &ExperimentState) -> bool {
    state.common.references.column(REF_TITLE).any(|cell| {
        let title = cell.display_text();
        let title = title.trim();
        !title.is_empty() && !DEFAULT_REFERENCE_TITLES.contains(&title)
    })
}

/// The rubric strategy for a title.
pub fn rubric_for(title: ExperimentTitle) -> &'static dyn TitleRubric {
    match title {
        ExperimentTitle::HeatConduction => &HeatConductionRubric,
        ExperimentTitle::FuelCell => &FuelCellRubric,
        ExperimentTitle::WaterTreatment => &WaterTreatmentRubric,
    }
}

fn chars_over(text: &str, limit: usize) -> bool {
    text.chars().count() > limit
}

pub struct HeatConductionRubric;

impl TitleRubric for HeatConductionRubric {
    fn title(&self) -> ExperimentTitle {
        ExperimentTitle::HeatConduction
    }

    fn has_apparatus_photo(&self, state: &ExperimentState) -> bool {
        state.common.apparatus_photo.is_some()
    }

    fn has_evaluation_method(&self, state: &ExperimentState) -> bool {
        !state.common.evaluation_method.is_empty()
    }

    fn score_results(&self, state: &ExperimentState, card: &mut Scorecard) {
        let heat = &state.heat;
        let average = heat
            .melting_point
            .cell(0, MELT_AVERAGE)
            .is_some_and(|c| c.is_filled());
        card.report_if("融解温度の平均", average, 5.0);

        let slots = heat.results.row_count() * MATERIAL_COLUMNS.len();
        let filled = MATERIAL_COLUMNS
            .iter()
            .flat_map(|col| heat.results.column(col))
            .filter(|c| c.is_filled())
            .count();
        let earned = if slots > 0 {
            15.0 * (filled as f64 / slots as f64)
        } else {
            0.0
        };
        card.report("結果データ", earned, 15.0);

        let literature =
            !heat.lit_cu.is_empty() && !heat.lit_al.is_empty() && !heat.lit_sus.is_empty();
        card.report_if("文献値", literature, 5.0);
        card.report_if("文献値の引用元", !heat.conductivity_ref.is_empty(), 2.0);
        card.report_if("考察", chars_over(&heat.discussion, 20), 8.0);
    }
}

pub struct FuelCellRubric;

impl TitleRubric for FuelCellRubric {
    fn title(&self) -> ExperimentTitle {
        ExperimentTitle::FuelCell
    }

    fn has_apparatus_photo(&self, state: &ExperimentState) -> bool {
        state.common.apparatus_photo.is_some()
    }

    fn has_evaluation_method(&self, state: &ExperimentState) -> bool {
        !state.common.evaluation_method.is_empty()
    }

    fn score_results(&self, state: &ExperimentState, card: &mut Scorecard) {
        let fc = &state.fuel_cell;
        let charge_filled = CHARGE_COLUMNS
            .iter()
            .flat_map(|col| fc.charge.column(col))
            .filter(|c| c.is_filled())
            .count();
        card.report_if("充電データ", charge_filled > 5, 5.0);

        const DISCHARGE_SLOTS: f64 = 3.0 * 4.0 * 2.0;
        let discharge_filled = fc
            .discharge
            .iter()
            .flat_map(|table| {
                [TERMINAL_VOLTAGE, CURRENT_MA]
                    .into_iter()
                    .flat_map(move |col| table.column(col))
            })
            .filter(|c| c.is_filled())
            .count();
        card.report(
            "放電データ",
            15.0 * (discharge_filled as f64 / DISCHARGE_SLOTS),
            15.0,
        );

        card.report_if("考察", chars_over(&fc.discussion, 20), 15.0);
    }
}

pub struct WaterTreatmentRubric;

impl WaterTreatmentRubric {
    fn clarity_cells(state: &ExperimentState) -> [bool; 2] {
        CLARITY_COLUMNS.map(|col| {
            state
                .water
                .clarity
                .cell(0, col)
                .is_some_and(|c| c.is_filled())
        })
    }
}

impl TitleRubric for WaterTreatmentRubric {
    fn title(&self) -> ExperimentTitle {
        ExperimentTitle::WaterTreatment
    }

    fn has_apparatus_photo(&self, state: &ExperimentState) -> bool {
        state.water.proto1_device_photo.is_some() || state.water.proto2_device_photo.is_some()
    }

    fn has_evaluation_method(&self, state: &ExperimentState) -> bool {
        Self::clarity_cells(state).iter().any(|filled| *filled)
    }

    fn score_results(&self, state: &ExperimentState, card: &mut Scorecard) {
        let photos = FieldKey::WATER_PHOTOS
            .iter()
            .filter(|key| state.photo(**key).is_some())
            .count();
        let photo_points = if photos >= 6 {
            10.0
        } else if photos >= 3 {
            5.0
        } else {
            0.0
        };
        card.report("写真", photo_points, 10.0);

        let w = &state.water;
        let mut items = [&w.proto1_text, &w.proto2_text, &w.coagulation_text]
            .into_iter()
            .filter(|text| chars_over(text, 10))
            .count();
        if Self::clarity_cells(state).iter().all(|filled| *filled) {
            items += 1;
        }
        card.report("記述とデータ", 10.0 * (items as f64 / 4.0), 10.0);

        card.report_if("考察", chars_over(&w.discussion, 20), 15.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Photo};
    use crate::schema::{self, DEFAULT_REFERENCE_TITLES};
    use crate::template::required_questions;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
    }

    fn named_student() -> GlobalInfo {
        let mut g = GlobalInfo::new(date());
        g.student_id = "15".into();
        g.student_name = "山田 花子".into();
        g
    }

    fn q(title: ExperimentTitle, index: usize) -> QuestionId {
        QuestionId { title, index }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Answers that earn every home point for `title`.
    fn answer_everything(state: &mut ExperimentState, title: ExperimentTitle) {
        for (index, question) in required_questions(title).iter().enumerate() {
            let mut answer = question.keywords.concat();
            while answer.chars().count() < FULL_LENGTH {
                answer.push('あ');
            }
            state.set_answer(q(title, index), answer);
        }
        let refs = &mut state.common.references;
        let row = refs.push_row().unwrap();
        refs.set_cell(row, REF_TITLE, Cell::text("伝熱工学")).unwrap();
    }

    #[test]
    fn reset_state_scores_nothing() {
        let global = GlobalInfo::new(date());
        let mut state = ExperimentState::new();
        state.heat.lit_cu = "398".into();
        state.reset();
        for title in ExperimentTitle::ALL {
            let s = score(&state, &global, title);
            assert_eq!(s.home, 0, "{title}");
            assert_eq!(s.report, 0, "{title}");
            assert!(s.is_default_identity);
            assert_eq!(s.band(60, 80), Band::Insufficient);
        }
    }

    #[test]
    fn total_truncates_the_unrounded_sum() {
        let mut card = Scorecard::new();
        card.home("a", 49.999999, 50.0);
        card.report("b", 0.5, 50.0);
        let s = card.finish(false);
        assert_eq!(s.home, 49);
        assert_eq!(s.report, 0);
        assert_eq!(s.total, 50);
    }

    #[test]
    fn length_bands_are_exclusive_and_strict() {
        let global = GlobalInfo::new(date());
        let title = ExperimentTitle::HeatConduction;
        let share = QUESTION_POINTS / 3.0;
        let mut state = ExperimentState::new();

        state.set_answer(q(title, 0), "あ".repeat(99));
        assert!(approx(score(&state, &global, title).home_points, share * 0.3));

        state.set_answer(q(title, 0), "あ".repeat(100));
        assert!(approx(score(&state, &global, title).home_points, share * 0.3 + share * 0.2));

        state.set_answer(q(title, 0), "あ".repeat(200));
        assert!(approx(score(&state, &global, title).home_points, share * 0.3 + share * 0.4));
    }

    #[test]
    fn whitespace_answer_earns_length_but_not_written() {
        let global = GlobalInfo::new(date());
        let title = ExperimentTitle::FuelCell;
        let mut state = ExperimentState::new();
        state.set_answer(q(title, 0), " ".repeat(120));
        let s = score(&state, &global, title);
        assert!(approx(s.home_points, QUESTION_POINTS / 3.0 * 0.2));
    }

    #[test]
    fn keywords_need_exact_substrings() {
        let global = GlobalInfo::new(date());
        let title = ExperimentTitle::HeatConduction;
        let share = QUESTION_POINTS / 3.0;
        let mut state = ExperimentState::new();

        state.set_answer(q(title, 1), "原子の格子 振動と自由電子");
        let partial = score(&state, &global, title).home_points;
        assert!(approx(partial, share * 0.3));

        state.set_answer(q(title, 1), "原子の格子振動と自由電子");
        let full = score(&state, &global, title).home_points;
        assert!(approx(full, share * 0.6));
    }

    #[test]
    fn questions_without_keywords_never_earn_keyword_credit() {
        let global = GlobalInfo::new(date());
        let title = ExperimentTitle::WaterTreatment;
        let mut state = ExperimentState::new();
        state.set_answer(q(title, 2), "ろ過材の順番を工夫した");
        let s = score(&state, &global, title);
        assert!(approx(s.home_points, QUESTION_POINTS / 3.0 * 0.3));
    }

    #[test]
    fn default_references_do_not_count() {
        let global = GlobalInfo::new(date());
        let mut state = ExperimentState::new();
        let refs = &mut state.common.references;
        let row = refs.push_row().unwrap();
        refs.set_cell(row, REF_TITLE, Cell::text(DEFAULT_REFERENCE_TITLES[0]))
            .unwrap();
        let row = refs.push_row().unwrap();
        refs.set_cell(row, REF_TITLE, Cell::text("   ")).unwrap();
        assert_eq!(score(&state, &global, ExperimentTitle::HeatConduction).home, 0);

        let row = state.common.references.push_row().unwrap();
        state
            .common
            .references
            .set_cell(row, REF_TITLE, Cell::text("熱力学入門"))
            .unwrap();
        assert_eq!(score(&state, &global, ExperimentTitle::HeatConduction).home, 10);
    }

    #[test]
    fn identity_credit_needs_both_id_and_name() {
        let state = ExperimentState::new();
        let mut global = GlobalInfo::new(date());
        global.student_id = "21".into();
        assert_eq!(score(&state, &global, ExperimentTitle::FuelCell).report, 0);

        let global = named_student();
        let s = score(&state, &global, ExperimentTitle::FuelCell);
        assert_eq!(s.report, 5);
        assert!(!s.is_default_identity);
    }

    #[test]
    fn heat_conduction_full_marks() {
        let title = ExperimentTitle::HeatConduction;
        let mut state = ExperimentState::new();
        answer_everything(&mut state, title);

        let tools = &mut state.common.tools;
        let row = tools.push_row().unwrap();
        tools.set_cell(row, TOOL_NAME, Cell::text("サーモインク")).unwrap();
        state.common.apparatus_photo = Some(Photo::from_bytes(b"img"));
        state.common.evaluation_method = "色の変化を観察".into();

        let heat = &mut state.heat;
        heat.melting_point
            .set_cell(0, MELT_AVERAGE, Cell::text("45.0"))
            .unwrap();
        for row in 0..heat.results.row_count() {
            for col in MATERIAL_COLUMNS {
                heat.results.set_cell(row, col, Cell::text("10")).unwrap();
            }
        }
        heat.lit_cu = "398".into();
        heat.lit_al = "237".into();
        heat.lit_sus = "16".into();
        heat.conductivity_ref = "理科年表".into();
        heat.discussion = "銅が最も速く融解し、ステンレスが最も遅かった。".into();

        let s = score(&state, &named_student(), title);
        assert_eq!((s.home, s.report, s.total), (50, 50, 100));
        assert_eq!(s.band(60, 80), Band::Excellent);
    }

    #[test]
    fn heat_results_fraction_and_empty_table() {
        let global = GlobalInfo::new(date());
        let title = ExperimentTitle::HeatConduction;
        let mut state = ExperimentState::new();
        // 6 rows x 3 materials, 9 filled
        for row in 0..3 {
            for col in MATERIAL_COLUMNS {
                state.heat.results.set_cell(row, col, Cell::text("5")).unwrap();
            }
        }
        assert!(approx(score(&state, &global, title).report_points, 7.5));

        while !state.heat.results.is_empty() {
            state.heat.results.remove_row(0).unwrap();
        }
        assert!(approx(score(&state, &global, title).report_points, 0.0));
    }

    #[test]
    fn fuel_cell_charge_threshold_and_discharge_fraction() {
        let global = GlobalInfo::new(date());
        let title = ExperimentTitle::FuelCell;
        let mut state = ExperimentState::new();

        let mut filled = 0;
        'outer: for row in 0..3 {
            for col in CHARGE_COLUMNS {
                if filled == 5 {
                    break 'outer;
                }
                state.fuel_cell.charge.set_cell(row, col, Cell::text("1")).unwrap();
                filled += 1;
            }
        }
        assert!(approx(score(&state, &global, title).report_points, 0.0));
        state
            .fuel_cell
            .charge
            .set_cell(2, CHARGE_COLUMNS[2], Cell::text("1.1"))
            .unwrap();
        assert!(approx(score(&state, &global, title).report_points, 5.0));

        for row in 0..4 {
            state.fuel_cell.discharge[0]
                .set_cell(row, TERMINAL_VOLTAGE, Cell::text("0.9"))
                .unwrap();
            state.fuel_cell.discharge[0]
                .set_cell(row, CURRENT_MA, Cell::text("20"))
                .unwrap();
        }
        // 8 of 24 slots
        assert!(approx(score(&state, &global, title).report_points, 10.0));
    }

    #[test]
    fn water_treatment_photos_and_items() {
        let global = GlobalInfo::new(date());
        let title = ExperimentTitle::WaterTreatment;
        let mut state = ExperimentState::new();
        let photo = Some(Photo::from_bytes(b"img"));

        state.water.original_water_photo = photo.clone();
        state.water.proto1_water_photo = photo.clone();
        // apparatus credit only comes from the device photos
        state.common.apparatus_photo = photo.clone();
        let s = score(&state, &global, title);
        assert!(approx(s.report_points, 0.0));

        state.water.proto1_device_photo = photo.clone();
        let s = score(&state, &global, title);
        // apparatus 4 + three photos 5
        assert!(approx(s.report_points, 9.0));

        state
            .water
            .clarity
            .set_cell(0, CLARITY_COLUMNS[0], Cell::text("300"))
            .unwrap();
        // evaluation method 2, clarity item needs both cells
        assert!(approx(score(&state, &global, title).report_points, 11.0));

        state
            .water
            .clarity
            .set_cell(0, CLARITY_COLUMNS[1], Cell::text("600"))
            .unwrap();
        state.water.proto1_text = "砂利と砂と活性炭を重ねた".into();
        state.water.proto2_text = "短い".into();
        assert!(approx(score(&state, &global, title).report_points, 16.0));
    }

    #[test]
    fn water_treatment_full_report() {
        let title = ExperimentTitle::WaterTreatment;
        let mut state = ExperimentState::new();
        answer_everything(&mut state, title);
        let tools = &mut state.common.tools;
        let row = tools.push_row().unwrap();
        tools.set_cell(row, TOOL_NAME, Cell::text("ペットボトル")).unwrap();

        for key in FieldKey::WATER_PHOTOS {
            state
                .set(key, crate::state::FieldValue::Photo(Some(Photo::from_bytes(b"x"))))
                .unwrap();
        }
        for col in CLARITY_COLUMNS {
            state.water.clarity.set_cell(0, col, Cell::text("500")).unwrap();
        }
        state.water.proto1_text = "砂利と砂と活性炭を重ねた".into();
        state.water.proto2_text = "ろ過材の層を倍の厚さにした".into();
        state.water.coagulation_text = "ミョウバンで濁りが沈殿した".into();
        state.water.discussion = "試作②の方が清澄度が高く、層の厚さが効いていた。".into();

        let s = score(&state, &named_student(), title);
        // water questions 2 and 3 have no keywords
        let share = QUESTION_POINTS / 3.0;
        assert!(approx(s.home_points, 50.0 - 2.0 * share * 0.3));
        assert_eq!(s.report, 50);
    }

    #[test]
    fn items_follow_accumulation_order() {
        let s = score(
            &ExperimentState::new(),
            &GlobalInfo::new(date()),
            ExperimentTitle::FuelCell,
        );
        let labels: Vec<&str> = s.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels[0], "設問1 記述");
        assert_eq!(labels[9], "参考文献");
        assert_eq!(labels[10], "基本情報");
        assert_eq!(*labels.last().unwrap(), "考察");
        let max: f64 = s.items.iter().map(|i| i.max).sum();
        assert!(approx(max, 100.0));
    }

    #[test]
    fn band_thresholds() {
        assert_eq!(Band::classify(59, 60, 80), Band::Insufficient);
        assert_eq!(Band::classify(60, 60, 80), Band::Passing);
        assert_eq!(Band::classify(79, 60, 80), Band::Passing);
        assert_eq!(Band::classify(80, 60, 80), Band::Excellent);
    }

    #[test]
    fn fixed_tables_untouched_by_scoring() {
        let state = ExperimentState::new();
        let _ = score(&state, &GlobalInfo::new(date()), ExperimentTitle::HeatConduction);
        assert_eq!(state.heat.melting_point.row_count(), 1);
        assert_eq!(state.heat.melting_point.schema().name, schema::MELTING_POINT.name);
    }
}

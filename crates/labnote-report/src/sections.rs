//! Per-title results and discussion sections.
//!
//! Each experiment title has one [`ResultsSection`]; the document builder
//! picks it with [`section_for`] and never branches on the title itself.

use plotters::style::RGBColor;

use labnote_core::analysis::{discharge_energy_mj, format_joules, paired_points};
use labnote_core::config::ReportSettings;
use labnote_core::model::{ExperimentTitle, Photo};
use labnote_core::schema::{DISCHARGE_SECONDS, DISTANCE, MATERIAL_COLUMNS, POWER_MW};
use labnote_core::state::ExperimentState;

use crate::chart::{LineChart, Series};
use crate::document::{Block, ChartBlock, TableBlock};
use crate::image::{
    fit_to_box, photo_block, photo_or_placeholder, CHART_BOX, PAIRED_PHOTO_BOX, WATER_PHOTO_BOX,
};

const DISCUSSION_HEADING: &str = "5. 比較検証・考察";
const TRIAL_LABELS: [&str; 3] = ["1回目", "2回目", "3回目"];

const ORANGE: RGBColor = RGBColor(0xff, 0x7f, 0x0e);
const BLUE: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const GREY: RGBColor = RGBColor(0x7f, 0x7f, 0x7f);
const GREEN: RGBColor = RGBColor(0x2c, 0xa0, 0x2c);

/// What a section needs to draw itself.
#[derive(Debug, Clone, Copy)]
pub struct SectionContext<'a> {
    pub state: &'a ExperimentState,
    pub settings: &'a ReportSettings,
}

impl SectionContext<'_> {
    fn chart_size(&self) -> (u32, u32) {
        (self.settings.chart_width_px, self.settings.chart_height_px)
    }
}

/// The title-specific part of a report.
pub trait ResultsSection: Send + Sync {
    fn title(&self) -> ExperimentTitle;

    /// Blocks under "3. 実験結果".
    fn results(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>);

    /// The closing comparison and discussion.
    fn discussion(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>);
}

pub struct HeatConductionSection;
pub struct FuelCellSection;
pub struct WaterTreatmentSection;

pub fn section_for(title: ExperimentTitle) -> &'static dyn ResultsSection {
    match title {
        ExperimentTitle::HeatConduction => &HeatConductionSection,
        ExperimentTitle::FuelCell => &FuelCellSection,
        ExperimentTitle::WaterTreatment => &WaterTreatmentSection,
    }
}

/// The chart as a block, or an error note in its place.
pub fn chart_block(chart: &LineChart) -> Block {
    match chart.render_svg() {
        Ok(svg) => {
            let (w, h) = chart.size;
            let (width_mm, height_mm) = fit_to_box((w as f64, h as f64), CHART_BOX);
            Block::Chart(ChartBlock {
                svg,
                width_mm,
                height_mm,
            })
        }
        Err(e) => {
            tracing::warn!("chart could not be drawn: {e}");
            Block::Placeholder(format!("グラフ作成エラー: {e}"))
        }
    }
}

fn label(text: &str) -> Block {
    Block::Paragraph(text.to_string())
}

impl HeatConductionSection {
    pub fn chart(ctx: &SectionContext<'_>) -> LineChart {
        let results = &ctx.state.heat.results;
        let series = MATERIAL_COLUMNS
            .iter()
            .zip(["銅", "アルミ", "ステンレス"])
            .zip([ORANGE, BLUE, GREY])
            .map(|((column, name), color)| {
                Series::new(name, paired_points(results, DISTANCE, column), color)
            })
            .collect();
        LineChart {
            x_desc: Some("距離 (cm)".to_string()),
            y_desc: "融解時間 (sec)".to_string(),
            series,
            size: ctx.chart_size(),
        }
    }
}

impl ResultsSection for HeatConductionSection {
    fn title(&self) -> ExperimentTitle {
        ExperimentTitle::HeatConduction
    }

    fn results(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>) {
        let heat = &ctx.state.heat;
        out.push(label("■ ロウの融解温度(℃)"));
        out.push(Block::Table(TableBlock::from_table(&heat.melting_point, 30.0)));
        out.push(Block::Spacer(3.0));

        out.push(label("■ 距離と融解時間"));
        out.push(Block::Table(TableBlock::from_table(&heat.results, 40.0)));
        out.push(Block::Spacer(2.0));

        out.push(Block::Heading("4. 結果グラフ".to_string()));
        out.push(chart_block(&Self::chart(ctx)));
        out.push(Block::Caption(
            "図：熱が伝導した距離とロウの融解時間の関係（溶け始めの時間）".to_string(),
        ));
        out.push(Block::Spacer(5.0));
    }

    fn discussion(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>) {
        let heat = &ctx.state.heat;
        out.push(Block::Heading(DISCUSSION_HEADING.to_string()));
        out.push(Block::Paragraph(format!(
            "熱伝導率の文献値: 銅={}, アルミ={}, ステンレス={} (W/m/K)",
            heat.lit_cu, heat.lit_al, heat.lit_sus
        )));
        out.push(Block::Spacer(2.0));
        out.push(label("【考察】"));
        out.push(Block::Paragraph(heat.discussion.clone()));
        out.push(Block::Spacer(2.0));
        if !heat.conductivity_ref.is_empty() {
            out.push(Block::Paragraph(format!(
                "（熱伝導率の参考文献: {}）",
                heat.conductivity_ref
            )));
        }
    }
}

impl FuelCellSection {
    pub fn chart(ctx: &SectionContext<'_>) -> LineChart {
        let series = ctx
            .state
            .fuel_cell
            .discharge
            .iter()
            .zip(TRIAL_LABELS)
            .zip([ORANGE, BLUE, GREEN])
            .map(|((table, name), color)| {
                Series::new(name, paired_points(table, DISCHARGE_SECONDS, POWER_MW), color)
            })
            .collect();
        LineChart {
            x_desc: Some("放電時間 (sec)".to_string()),
            y_desc: "出力 (mW)".to_string(),
            series,
            size: ctx.chart_size(),
        }
    }

    /// Energy per trial in joules, as shown in the energy table.
    pub fn energies(state: &ExperimentState) -> Vec<String> {
        state
            .fuel_cell
            .discharge
            .iter()
            .map(|table| format_joules(discharge_energy_mj(table)))
            .collect()
    }
}

impl ResultsSection for FuelCellSection {
    fn title(&self) -> ExperimentTitle {
        ExperimentTitle::FuelCell
    }

    fn results(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>) {
        let fuel = &ctx.state.fuel_cell;
        out.push(label("■ 充電実験"));
        out.push(Block::Table(TableBlock::from_table(&fuel.charge, 40.0)));
        out.push(Block::Spacer(3.0));

        out.push(label("■ 放電実験"));
        for (i, table) in fuel.discharge.iter().enumerate() {
            out.push(Block::Paragraph(format!("【{}回目】", i + 1)));
            out.push(Block::Table(TableBlock::from_table(table, 25.0).compact()));
            out.push(Block::Spacer(2.0));
        }

        out.push(Block::Heading("4. 結果グラフ".to_string()));
        out.push(chart_block(&Self::chart(ctx)));
        out.push(Block::Caption("図：放電時の時間と出力の関係".to_string()));
        out.push(Block::Spacer(5.0));

        out.push(label("■ 発生エネルギー (J)"));
        out.push(Block::Table(TableBlock::new(
            TRIAL_LABELS.iter().map(|s| s.to_string()).collect(),
            vec![Self::energies(ctx.state)],
            vec![30.0; 3],
        )));
        out.push(Block::Spacer(5.0));
    }

    fn discussion(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>) {
        out.push(Block::Heading(DISCUSSION_HEADING.to_string()));
        out.push(label("【充電条件の比較と考察】"));
        out.push(Block::Paragraph(ctx.state.fuel_cell.discussion.clone()));
    }
}

impl WaterTreatmentSection {
    /// Device and water photos of one prototype, side by side.
    fn photo_pair(photos: [Option<&Photo>; 2], out: &mut Vec<Block>) {
        let mut row = Vec::new();
        for photo in photos.into_iter().flatten() {
            match photo_block(photo, PAIRED_PHOTO_BOX) {
                Ok(image) => row.push(image),
                Err(e) => {
                    tracing::warn!("prototype photo could not be placed: {e}");
                    out.push(Block::Placeholder(format!("(画像読み込みエラー: {e})")));
                }
            }
        }
        if !row.is_empty() {
            out.push(Block::ImageRow(row));
        }
    }
}

impl ResultsSection for WaterTreatmentSection {
    fn title(&self) -> ExperimentTitle {
        ExperimentTitle::WaterTreatment
    }

    fn results(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>) {
        let water = &ctx.state.water;
        out.push(label("■ 浄化対象の水"));
        if let Some(photo) = &water.original_water_photo {
            out.push(photo_or_placeholder(photo, WATER_PHOTO_BOX));
        }
        out.push(Block::Spacer(3.0));

        let prototypes = [
            (
                "■ 試作検討①",
                [water.proto1_device_photo.as_ref(), water.proto1_water_photo.as_ref()],
                &water.proto1_text,
            ),
            (
                "■ 試作検討②",
                [water.proto2_device_photo.as_ref(), water.proto2_water_photo.as_ref()],
                &water.proto2_text,
            ),
        ];
        for (heading, photos, text) in prototypes {
            out.push(Block::Heading(heading.to_string()));
            Self::photo_pair(photos, out);
            out.push(label("【原理や工夫】"));
            out.push(Block::Paragraph(text.clone()));
            out.push(Block::Spacer(4.0));
        }

        out.push(Block::Heading("■ 清澄度評価 (1000点満点)".to_string()));
        out.push(Block::Table(TableBlock::from_table(&water.clarity, 40.0)));
        out.push(Block::Spacer(4.0));

        out.push(Block::Heading("■ 凝集剤の効果".to_string()));
        if let Some(photo) = &water.coagulation_photo {
            out.push(photo_or_placeholder(photo, WATER_PHOTO_BOX));
        }
        out.push(Block::Spacer(2.0));
        out.push(label("【原理】"));
        out.push(Block::Paragraph(water.coagulation_text.clone()));
        out.push(Block::Spacer(5.0));
    }

    fn discussion(&self, ctx: &SectionContext<'_>, out: &mut Vec<Block>) {
        out.push(Block::Heading(DISCUSSION_HEADING.to_string()));
        out.push(label("【装置の比較（試作① vs 試作②）】"));
        out.push(Block::Paragraph(ctx.state.water.discussion.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tests::png_header;
    use labnote_core::model::Cell;
    use labnote_core::schema::{CURRENT_MA, TERMINAL_VOLTAGE};

    fn render(title: ExperimentTitle, state: &ExperimentState) -> Vec<Block> {
        let settings = ReportSettings::default();
        let ctx = SectionContext {
            state,
            settings: &settings,
        };
        let section = section_for(title);
        assert_eq!(section.title(), title);
        let mut out = Vec::new();
        section.results(&ctx, &mut out);
        section.discussion(&ctx, &mut out);
        out
    }

    fn texts(blocks: &[Block]) -> Vec<&str> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(s) | Block::Heading(s) | Block::Caption(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn heat_chart_drops_rows_missing_either_axis() {
        let mut state = ExperimentState::new();
        let results = &mut state.heat.results;
        results.set_cell(0, MATERIAL_COLUMNS[0], Cell::text("12")).unwrap();
        results.set_cell(1, MATERIAL_COLUMNS[0], Cell::text("abc")).unwrap();
        results.set_cell(2, DISTANCE, Cell::empty()).unwrap();
        results.set_cell(2, MATERIAL_COLUMNS[0], Cell::text("40")).unwrap();
        results.set_cell(3, MATERIAL_COLUMNS[0], Cell::text("55")).unwrap();

        let settings = ReportSettings::default();
        let ctx = SectionContext {
            state: &state,
            settings: &settings,
        };
        let chart = HeatConductionSection::chart(&ctx);
        assert_eq!(chart.series[0].points, vec![(2.0, 12.0), (8.0, 55.0)]);
        assert!(chart.series[1].points.is_empty());
        assert_eq!(chart.plotted().count(), 1);
    }

    #[test]
    fn heat_section_order_and_citation() {
        let mut state = ExperimentState::new();
        state.heat.lit_cu = "398".into();
        state.heat.discussion = "銅が最も速く融けた。".into();
        let blocks = render(ExperimentTitle::HeatConduction, &state);
        let t = texts(&blocks);
        assert_eq!(t[0], "■ ロウの融解温度(℃)");
        assert!(t.contains(&"4. 結果グラフ"));
        assert!(t.contains(&"熱伝導率の文献値: 銅=398, アルミ=, ステンレス= (W/m/K)"));
        assert!(!t.iter().any(|s| s.starts_with("（熱伝導率の参考文献")));
        assert!(blocks.iter().any(|b| matches!(b, Block::Chart(_))));

        state.heat.conductivity_ref = "理科年表".into();
        let blocks = render(ExperimentTitle::HeatConduction, &state);
        assert_eq!(
            texts(&blocks).last(),
            Some(&"（熱伝導率の参考文献: 理科年表）")
        );
    }

    #[test]
    fn fuel_cell_energy_table() {
        let mut state = ExperimentState::new();
        for row in 0..4 {
            let d = &mut state.fuel_cell.discharge[0];
            d.set_cell(row, TERMINAL_VOLTAGE, Cell::text("1.0")).unwrap();
            d.set_cell(row, CURRENT_MA, Cell::text("20")).unwrap();
        }
        state.recompute_derived();
        // 900 s at 20 mW is 18 J
        assert_eq!(
            FuelCellSection::energies(&state),
            vec!["18.00", "0.00", "0.00"]
        );

        let blocks = render(ExperimentTitle::FuelCell, &state);
        let energy = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) if t.header[0] == "1回目" => Some(t),
                _ => None,
            })
            .next()
            .unwrap();
        assert_eq!(energy.rows, vec![vec!["18.00", "0.00", "0.00"]]);
        let compact = blocks
            .iter()
            .filter(|b| matches!(b, Block::Table(t) if t.compact))
            .count();
        assert_eq!(compact, 3);
        assert!(texts(&blocks).contains(&"【3回目】"));
    }

    #[test]
    fn water_photos_pair_and_placeholder() {
        let mut state = ExperimentState::new();
        state.water.proto1_device_photo = Some(Photo::from_bytes(&png_header(300, 200)));
        state.water.proto1_water_photo = Some(Photo::from_bytes(&png_header(200, 300)));
        state.water.coagulation_photo = Some(Photo::from_bytes(b"broken"));
        let blocks = render(ExperimentTitle::WaterTreatment, &state);

        let rows: Vec<&Vec<_>> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::ImageRow(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert!((rows[0][0].width_mm - 75.0).abs() < 1e-9);
        assert!((rows[0][1].height_mm - 55.0).abs() < 1e-9);

        assert!(blocks
            .iter()
            .any(|b| matches!(b, Block::Placeholder(p) if p.starts_with("(画像読み込みエラー"))));
        assert!(texts(&blocks).contains(&"【装置の比較（試作① vs 試作②）】"));
    }
}

//! Builds the full report document from a session.

use labnote_core::config::ReportSettings;
use labnote_core::session::AppState;
use labnote_core::template::QuestionId;

use crate::document::{Block, Document, TableBlock};
use crate::image::{photo_or_placeholder, APPARATUS_BOX};
use crate::sections::{section_for, SectionContext};

const NONE_TEXT: &str = "なし";

/// Assemble the report for the active title.
///
/// Sections come in a fixed order: score banner, header, take-home
/// questions with references, methods, results, discussion.
pub fn build_document(app: &AppState, settings: &ReportSettings) -> Document {
    let title = app.active_title();
    let state = &app.current;
    let global = &app.global;
    let score = app.score();
    tracing::debug!(title = %title, total = score.total, "building report document");

    let mut doc = Document::new(title.as_str());

    doc.push(Block::ScoreBanner(format!(
        "簡易自己評価: {}% (自宅課題: {}% / レポート: {}%)",
        score.total, score.home, score.report
    )));
    doc.push(Block::Spacer(5.0));

    doc.push(Block::Title(format!("実験タイトル: {title}")));
    doc.push(Block::Paragraph(format!(
        "実験日: {}",
        global.exp_date.format("%Y-%m-%d")
    )));
    doc.push(Block::Paragraph(format!(
        "クラス: {} 席番号: {} 出席番号: {} 氏名: {}",
        global.class_name, global.seat_number, global.student_id, global.student_name
    )));
    let partners: Vec<String> = [
        ("共同実験者①", &global.partner1_id, &global.partner1_name),
        ("共同実験者②", &global.partner2_id, &global.partner2_name),
    ]
    .into_iter()
    .filter(|(_, id, name)| !id.is_empty() || !name.is_empty())
    .map(|(slot, id, name)| format!("{slot}: {id} {name}"))
    .collect();
    if !partners.is_empty() {
        doc.push(Block::Paragraph(partners.join(" / ")));
    }
    doc.push(Block::Spacer(5.0));

    doc.push(Block::Heading("1. 調査レポート（自宅課題）".to_string()));
    for id in QuestionId::all_for(title) {
        doc.push(Block::Strong(format!("Q. {}", id.question().text)));
        doc.push(Block::Paragraph(format!("A. {}", state.answer(id))));
        doc.push(Block::Spacer(2.0));
    }

    doc.push(Block::Paragraph("【参考文献】".to_string()));
    let references = &state.common.references;
    if references.is_empty() {
        doc.push(Block::Paragraph(NONE_TEXT.to_string()));
    } else {
        doc.push(Block::Table(TableBlock::from_table_with_widths(
            references,
            vec![60.0, 50.0, 50.0],
        )));
    }
    doc.push(Block::Spacer(4.0));

    doc.push(Block::Heading("2. 実験方法".to_string()));
    doc.push(Block::Paragraph("【使用器具】".to_string()));
    let tools = &state.common.tools;
    if tools.is_empty() {
        doc.push(Block::Paragraph(NONE_TEXT.to_string()));
    } else {
        doc.push(Block::Table(TableBlock::from_table_with_widths(
            tools,
            vec![60.0, 100.0],
        )));
    }
    doc.push(Block::Spacer(3.0));

    if let Some(photo) = &state.common.apparatus_photo {
        doc.push(Block::Paragraph("【作成した実験装置】".to_string()));
        doc.push(photo_or_placeholder(photo, APPARATUS_BOX));
        doc.push(Block::Spacer(3.0));
    }

    doc.push(Block::Paragraph(format!(
        "【評価方法】 {}",
        state.common.evaluation_method
    )));
    doc.push(Block::Spacer(5.0));

    doc.push(Block::Heading("3. 実験結果".to_string()));
    let ctx = SectionContext { state, settings };
    let section = section_for(title);
    section.results(&ctx, &mut doc.blocks);
    section.discussion(&ctx, &mut doc.blocks);

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use labnote_core::model::{Cell, ExperimentTitle, Photo};
    use labnote_core::schema::{TOOL_NAME, TOOL_ROLE};

    fn app(title: ExperimentTitle) -> AppState {
        AppState::new(title, NaiveDate::from_ymd_opt(2025, 6, 3).unwrap())
    }

    fn build(app: &AppState) -> Document {
        build_document(app, &ReportSettings::default())
    }

    #[test]
    fn header_lines() {
        let mut app = app(ExperimentTitle::HeatConduction);
        app.global.student_id = "12".into();
        app.global.student_name = "山田 花子".into();
        app.global.partner2_name = "佐藤".into();
        let doc = build(&app);

        assert_eq!(doc.title, "実験① 熱の可視化");
        assert_eq!(
            doc.blocks[0],
            Block::ScoreBanner("簡易自己評価: 5% (自宅課題: 0% / レポート: 5%)".into())
        );
        let text = doc.plain_text();
        assert!(text.contains("実験タイトル: 実験① 熱の可視化\n実験日: 2025-06-03\n"));
        assert!(text.contains("クラス: 1年1組 席番号: 00 出席番号: 12 氏名: 山田 花子\n"));
        assert!(text.contains("共同実験者②:  佐藤\n"));
        assert!(!text.contains("共同実験者①"));
    }

    #[test]
    fn questions_and_default_references() {
        let app = app(ExperimentTitle::FuelCell);
        let doc = build(&app);
        let questions = doc
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::Strong(q) if q.starts_with("Q. ")))
            .count();
        assert_eq!(questions, QuestionId::all_for(ExperimentTitle::FuelCell).count());

        let text = doc.plain_text();
        assert!(text.contains("【参考文献】\n書籍名・サイト名\t著者・発行者\t発行年・URL\n"));
        assert!(text.contains("【使用器具】\nなし\n"));
        assert!(!text.contains("【作成した実験装置】"));
        assert!(text.contains("■ 発生エネルギー (J)"));
    }

    #[test]
    fn methods_with_tools_and_photo() {
        let mut app = app(ExperimentTitle::HeatConduction);
        let tools = &mut app.current.common.tools;
        let row = tools.push_row().unwrap();
        tools.set_cell(row, TOOL_NAME, Cell::text("銅板")).unwrap();
        tools.set_cell(row, TOOL_ROLE, Cell::text("試料")).unwrap();
        app.current.common.references.remove_row(1).unwrap();
        app.current.common.references.remove_row(0).unwrap();
        app.current.common.apparatus_photo = Some(Photo::from_bytes(b"not an image"));
        app.current.common.evaluation_method = "ロウが溶けた時間".into();

        let text = build(&app).plain_text();
        assert!(text.contains("【参考文献】\nなし\n"));
        assert!(text.contains("銅板\t試料\n"));
        assert!(text.contains("【作成した実験装置】\n(画像読み込みエラー: "));
        assert!(text.contains("【評価方法】 ロウが溶けた時間\n"));
        let results = text.find("3. 実験結果").unwrap();
        assert!(text.find("2. 実験方法").unwrap() < results);
        assert!(results < text.find("5. 比較検証・考察").unwrap());
    }

    #[test]
    fn water_title_has_no_chart() {
        let doc = build(&app(ExperimentTitle::WaterTreatment));
        assert!(!doc.blocks.iter().any(|b| matches!(b, Block::Chart(_))));
        assert!(doc.plain_text().contains("■ 清澄度評価 (1000点満点)"));
    }
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use labnote_core::model::{Cell, ExperimentTitle, GlobalInfo, Photo};
use labnote_core::schema::{FieldKey, CURRENT_MA, MATERIAL_COLUMNS, TERMINAL_VOLTAGE};
use labnote_core::scoring::score;
use labnote_core::snapshot;
use labnote_core::state::{ExperimentState, FieldValue};
use labnote_core::template::{required_questions, QuestionId};
use labnote_core::AppState;

fn filled_state(title: ExperimentTitle) -> ExperimentState {
    let mut state = ExperimentState::new();
    for (index, question) in required_questions(title).iter().enumerate() {
        let answer = format!("{}{}", question.keywords.concat(), "あ".repeat(180));
        state.set_answer(QuestionId { title, index }, answer);
    }
    for row in 0..state.heat.results.row_count() {
        for col in MATERIAL_COLUMNS {
            let _ = state.heat.results.set_cell(row, col, Cell::text("42"));
        }
    }
    for table in &mut state.fuel_cell.discharge {
        for row in 0..table.row_count() {
            let _ = table.set_cell(row, TERMINAL_VOLTAGE, Cell::text("0.95"));
            let _ = table.set_cell(row, CURRENT_MA, Cell::text("30"));
        }
    }
    for key in FieldKey::WATER_PHOTOS {
        let _ = state.set(key, FieldValue::Photo(Some(Photo::from_bytes(&[0u8; 4096]))));
    }
    state
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let global = GlobalInfo::default();

    group.bench_function("factory_defaults", |b| {
        let state = ExperimentState::new();
        b.iter(|| score(black_box(&state), black_box(&global), ExperimentTitle::HeatConduction))
    });

    for title in ExperimentTitle::ALL {
        let state = filled_state(title);
        group.bench_function(format!("filled/{}", title.slug()), |b| {
            b.iter(|| score(black_box(&state), black_box(&global), title))
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let state = filled_state(ExperimentTitle::FuelCell);

    group.bench_function("snapshot", |b| b.iter(|| black_box(&state).snapshot()));

    let snap = state.snapshot();
    group.bench_function("restore", |b| {
        b.iter(|| {
            let mut fresh = ExperimentState::new();
            fresh.restore(black_box(&snap))
        })
    });

    let mut app = AppState::default();
    app.current = state.clone();
    let json = snapshot::export(&mut app).to_json().unwrap_or_default();
    group.bench_function("import", |b| {
        b.iter(|| {
            let mut target = AppState::default();
            snapshot::import(&mut target, black_box(&json)).is_ok()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_score, bench_snapshot);
criterion_main!(benches);

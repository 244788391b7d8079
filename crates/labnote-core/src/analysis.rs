//! Numeric helpers over table columns.
//!
//! Cells are coerced to numbers leniently: anything that does not parse is
//! treated as missing. What "missing" means depends on the caller. Charts drop
//! the whole point, the energy integral counts it as zero.

use crate::model::{Cell, Table};
use crate::schema::{
    CURRENT_MA, DISCHARGE_SECONDS, MELT_AVERAGE, MELT_TRIALS, POWER_MW, TERMINAL_VOLTAGE,
};

/// Round to `digits` decimal places, ties to even.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

/// Render a float the way a student-facing cell shows it: integral values keep
/// a trailing `.0`, everything else uses the shortest round-trip form.
pub fn float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// `(x, y)` pairs where both cells of a row are numeric.
pub fn paired_points(table: &Table, x_column: &str, y_column: &str) -> Vec<(f64, f64)> {
    table
        .column(x_column)
        .zip(table.column(y_column))
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect()
}

/// Mean of the numeric trial cells of the melting row, rounded to 1 decimal.
/// Empty text when no trial is numeric.
pub fn melting_point_average(table: &Table) -> String {
    let values: Vec<f64> = MELT_TRIALS
        .iter()
        .filter_map(|col| table.cell(0, col).and_then(Cell::as_f64))
        .collect();
    if values.is_empty() {
        return String::new();
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    float_text(round_to(mean, 1))
}

/// Write the melting average into its cell.
pub fn update_melting_average(table: &mut Table) {
    let average = melting_point_average(table);
    let written = table.set_cell(0, MELT_AVERAGE, Cell::Text(average));
    debug_assert!(written.is_ok(), "melting table lost its average cell");
}

/// Output power in mW for one discharge row, when voltage and current parse.
pub fn discharge_power(voltage: &Cell, current_ma: &Cell) -> Option<String> {
    let v = voltage.as_f64()?;
    let a = current_ma.as_f64()?;
    Some(float_text(round_to(v * a, 2)))
}

/// Fill `出力(mW)` for every discharge row with numeric voltage and current.
/// Rows without both readings keep whatever power text they had.
pub fn update_discharge_power(table: &mut Table) {
    let powers: Vec<Option<String>> = table
        .column(TERMINAL_VOLTAGE)
        .zip(table.column(CURRENT_MA))
        .map(|(v, a)| discharge_power(v, a))
        .collect();
    for (row, power) in powers.into_iter().enumerate() {
        if let Some(power) = power {
            let written = table.set_cell(row, POWER_MW, Cell::Text(power));
            debug_assert!(written.is_ok(), "discharge table lost its power column");
        }
    }
}

/// Trapezoidal integral `Σ (t[i+1]-t[i]) * (p[i+1]+p[i]) / 2`.
pub fn trapezoid(t: &[f64], p: &[f64]) -> f64 {
    t.windows(2)
        .zip(p.windows(2))
        .map(|(t, p)| (t[1] - t[0]) * (p[1] + p[0]) / 2.0)
        .sum()
}

/// Energy of one discharge trial in millijoules (seconds × milliwatts).
/// Non-numeric cells count as zero.
pub fn discharge_energy_mj(table: &Table) -> f64 {
    let t: Vec<f64> = table
        .column(DISCHARGE_SECONDS)
        .map(|c| c.as_f64().unwrap_or(0.0))
        .collect();
    let p: Vec<f64> = table
        .column(POWER_MW)
        .map(|c| c.as_f64().unwrap_or(0.0))
        .collect();
    trapezoid(&t, &p)
}

/// Energy in joules, formatted to 2 decimals.
pub fn format_joules(millijoules: f64) -> String {
    format!("{:.2}", millijoules / 1000.0)
}

use chrono::{DateTime, Utc};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use ndarray::Array1;

use crate::{
    api::renewables_ninja::CapacityFactors,
    core::{
        formulation::{Report, smoothing::SmoothingOutcome, stochastic::StochasticOutcome},
        prices::PriceScenarioSet,
        probability::SocScenarios,
        schedule::DispatchSchedule,
        solver::Status,
        sweep::SweepSurface,
    },
    quantity::{cost::Cost, energy::MegawattHours, rate::MegawattHourRate},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

const fn status_color(status: Status) -> Color {
    match status {
        Status::Optimal => Color::Green,
        Status::Inaccurate => Color::DarkYellow,
        Status::Failed => Color::Red,
    }
}

/// Solver outcome followed by the formulation's own metrics.
pub fn build_summary_table(report: &Report, metrics: &[(&str, String)]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Status"),
        Cell::new(report.status).fg(status_color(report.status)),
    ]);
    table.add_row(vec![Cell::new("Objective"), Cell::new(format!("{:.2}", report.objective))]);
    table.add_row(vec![Cell::new("Cycles"), Cell::new(format!("{:.2}", report.cycles))]);
    table.add_row(vec![
        Cell::new("Annualized cycles"),
        Cell::new(format!("{:.1}", report.annualized_cycles)),
    ]);
    table.add_row(vec![
        Cell::new("Iterations").add_attribute(Attribute::Dim),
        Cell::new(report.iterations).add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Solve time").add_attribute(Attribute::Dim),
        Cell::new(format!("{:.2?}", report.solve_time)).add_attribute(Attribute::Dim),
    ]);
    for (name, value) in metrics {
        table.add_row(vec![Cell::new(name), Cell::new(value).set_alignment(CellAlignment::Right)]);
    }
    table
}

pub fn format_cost(value: f64) -> String {
    Cost::from(value).to_string()
}

/// Per-step schedule with the prices and the expected state of charge after the step.
pub fn build_schedule_table(
    timestamps: impl Iterator<Item = DateTime<Utc>>,
    schedule: &DispatchSchedule,
    bid_prices: &Array1<f64>,
    offer_prices: &Array1<f64>,
    state_of_charge: &Array1<f64>,
    max_rows: usize,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Time", "Bid", "Offer", "Charge", "Discharge", "SoC after"]);
    for (t, timestamp) in timestamps.enumerate().take(max_rows) {
        table.add_row(vec![
            Cell::new(timestamp.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(timestamp.format("%H:%M")),
            Cell::new(MegawattHourRate::from(bid_prices[t])).set_alignment(CellAlignment::Right),
            Cell::new(MegawattHourRate::from(offer_prices[t])).set_alignment(CellAlignment::Right),
            volume_cell(schedule.charge[t], Color::Green),
            volume_cell(schedule.discharge[t], Color::Red),
            Cell::new(MegawattHours::from(state_of_charge[t + 1])).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Price scenario spread per step: interquartile band around the mean.
pub fn build_price_bands_table(
    timestamps: impl Iterator<Item = DateTime<Utc>>,
    prices: &PriceScenarioSet,
    max_rows: usize,
) -> Table {
    let bid = (prices.bid_percentile(25.0), prices.mean_bid(), prices.bid_percentile(75.0));
    let offer = (prices.offer_percentile(25.0), prices.mean_offer(), prices.offer_percentile(75.0));

    let mut table = new_table();
    table.set_header(vec![
        "Date", "Time", "Bid P25", "Bid mean", "Bid P75", "Offer P25", "Offer mean", "Offer P75",
    ]);
    for (t, timestamp) in timestamps.enumerate().take(max_rows) {
        let rate = |value: f64, attribute| {
            Cell::new(MegawattHourRate::from(value))
                .set_alignment(CellAlignment::Right)
                .add_attribute(attribute)
        };
        table.add_row(vec![
            Cell::new(timestamp.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(timestamp.format("%H:%M")),
            rate(bid.0[t], Attribute::Dim),
            rate(bid.1[t], Attribute::Bold),
            rate(bid.2[t], Attribute::Dim),
            rate(offer.0[t], Attribute::Dim),
            rate(offer.1[t], Attribute::Bold),
            rate(offer.2[t], Attribute::Dim),
        ]);
    }
    table
}

/// Realized volumes per initial state of charge.
pub fn build_scenario_table(scenarios: &SocScenarios, outcome: &StochasticOutcome) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Initial SoC",
        "Probability",
        "Charged",
        "Discharged",
        "Unrealized bid",
        "Unrealized offer",
    ]);
    for (k, (initial, weight)) in scenarios.iter().enumerate() {
        let realized = outcome.realized(k);
        table.add_row(vec![
            Cell::new(MegawattHours::from(initial)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", weight * 100.0)).set_alignment(CellAlignment::Right),
            volume_cell(realized.charge.sum(), Color::Green),
            volume_cell(realized.discharge.sum(), Color::Red),
            volume_cell(outcome.unrealized_charge.column(k).sum(), Color::DarkYellow),
            volume_cell(outcome.unrealized_discharge.column(k).sum(), Color::DarkYellow),
        ]);
    }
    table
}

/// Plant revenue per step without and with the battery.
pub fn build_revenue_table(
    timestamps: impl Iterator<Item = DateTime<Utc>>,
    spot_prices: &[f64],
    production: &[f64],
    outcome: &SmoothingOutcome,
    max_rows: usize,
) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Date", "Time", "Spot", "Production", "Charge", "Discharge", "Revenue", "With battery",
    ]);
    let schedule = &outcome.dispatch.schedule;
    for (t, timestamp) in timestamps.enumerate().take(max_rows) {
        table.add_row(vec![
            Cell::new(timestamp.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(timestamp.format("%H:%M")),
            Cell::new(MegawattHourRate::from(spot_prices[t])).set_alignment(CellAlignment::Right),
            Cell::new(MegawattHours::from(production[t])).set_alignment(CellAlignment::Right),
            volume_cell(schedule.charge[t], Color::Green),
            volume_cell(schedule.discharge[t], Color::Red),
            Cell::new(Cost::from(outcome.revenue_before[t])).set_alignment(CellAlignment::Right),
            Cell::new(Cost::from(outcome.revenue_after[t])).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Volatility improvement and annualized cycles by battery power share (rows) and duration (columns).
pub fn build_sweep_table(surface: &SweepSurface) -> Table {
    let mut table = new_table();
    let mut header = vec![Cell::new("Power share")];
    header.extend(surface.durations.iter().map(|duration| Cell::new(format!("{duration:.1} h"))));
    table.set_header(header);
    for (row, power_share) in surface.power_shares.iter().enumerate() {
        let mut cells = vec![Cell::new(format!("{:.1}%", power_share * 100.0))];
        let improvements = surface.improvements.row(row);
        let cycles = surface.annualized_cycles.row(row);
        cells.extend(improvements.iter().zip(cycles).map(|(improvement, cycles)| match improvement {
            Some(improvement) => Cell::new(match cycles {
                Some(cycles) => format!("{:.1}%\n{cycles:.0} cycles/y", improvement * 100.0),
                None => format!("{:.1}%", improvement * 100.0),
            })
            .set_alignment(CellAlignment::Right)
            .fg(if *improvement > 0.0 { Color::Green } else { Color::Red }),
            None => Cell::new("failed").set_alignment(CellAlignment::Right).fg(Color::Red),
        }));
        table.add_row(cells);
    }
    table
}

pub fn build_capacity_factor_table(series: &CapacityFactors, max_rows: usize) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Time", "Capacity factor"]);
    for (timestamp, capacity_factor) in series.iter().take(max_rows) {
        table.add_row(vec![
            Cell::new(timestamp.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(timestamp.format("%H:%M")),
            match capacity_factor {
                Some(capacity_factor) => {
                    Cell::new(format!("{capacity_factor:.3}")).set_alignment(CellAlignment::Right)
                }
                None => Cell::new("missing").add_attribute(Attribute::Dim),
            },
        ]);
    }
    table
}

/// Highlight volumes of at least a kilowatt-hour.
fn volume_cell(volume: f64, color: Color) -> Cell {
    let cell = Cell::new(MegawattHours::from(volume)).set_alignment(CellAlignment::Right);
    if volume >= 0.001 { cell.fg(color) } else { cell.add_attribute(Attribute::Dim) }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeDelta, TimeZone};
    use ndarray::{Array2, array};

    use super::*;

    #[test]
    fn test_build_tables() {
        let report = Report {
            status: Status::Optimal,
            objective: 1340.0,
            cycles: 1.7,
            annualized_cycles: 7446.0,
            iterations: 12,
            solve_time: Duration::from_millis(5),
        };
        let summary = build_summary_table(&report, &[("Profit", format_cost(1340.0))]);
        assert!(summary.to_string().contains("+1340.00 £"));

        let start = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..2).map(|i| start + TimeDelta::minutes(30) * i);
        let schedule = DispatchSchedule { charge: array![5.0, 0.0], discharge: array![0.0, 4.25] };
        let table = build_schedule_table(
            timestamps,
            &schedule,
            &array![35.0, 35.0],
            &array![120.0, 120.0],
            &array![0.0, 4.61, 0.0],
            48,
        );
        assert_eq!(table.row_count(), 2);

        let surface = SweepSurface {
            power_shares: vec![0.1],
            durations: vec![1.0, 2.0],
            improvements: Array2::from_shape_vec((1, 2), vec![Some(0.25), None]).unwrap(),
            annualized_cycles: Array2::from_shape_vec((1, 2), vec![Some(312.4), None]).unwrap(),
        };
        let rendered = build_sweep_table(&surface).to_string();
        assert!(rendered.contains("25.0%"));
        assert!(rendered.contains("312 cycles/y"));
        assert!(rendered.contains("failed"));
    }
}

//! Plain-text and JSON rendering of projection results

use std::fmt::Write as _;

use glidepath_core::model::{AnnualSummary, MonteCarloSummary, SignificantEvent, SimulationPhase};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Everything printed for one scenario
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub scenario: &'a str,
    pub description: &'a str,
    pub years: &'a [AnnualSummary],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<&'a MonteCarloSummary>,
}

impl Report<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if !self.scenario.is_empty() {
            let _ = writeln!(out, "{}", self.scenario);
        }
        if !self.description.is_empty() {
            let _ = writeln!(out, "{}", self.description);
        }
        if !out.is_empty() {
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "{:<6} {:<5} {:>15} {:>13} {:>13} {:>11} {:>15} {:>8}",
            "Year", "Phase", "Start", "Contrib", "Withdrawn", "Tax", "End", "Return"
        );
        for year in self.years {
            let _ = writeln!(
                out,
                "{:<6} {:<5} {:>15} {:>13} {:>13} {:>11} {:>15} {:>7}%",
                year.year,
                phase_label(year.ending_phase),
                money(year.starting_balance),
                money(year.total_contributions),
                money(year.total_withdrawals),
                money(year.total_taxes),
                money(year.ending_balance),
                year.annual_return_percent,
            );
        }

        let events: Vec<String> = self
            .years
            .iter()
            .flat_map(|y| y.significant_events.iter().map(move |e| (y.year, e)))
            .filter_map(|(year, event)| describe(event).map(|text| format!("  {year}  {text}")))
            .collect();
        if !events.is_empty() {
            out.push_str("\nEvents\n");
            for line in events {
                let _ = writeln!(out, "{line}");
            }
        }

        if let Some(mc) = self.monte_carlo {
            let _ = writeln!(out, "\nMonte Carlo ({} trials)", mc.trials);
            let _ = writeln!(
                out,
                "  success rate  {}%",
                (mc.success_rate * Decimal::ONE_HUNDRED).round_dp(1)
            );
            let _ = writeln!(out, "  p10 final     {}", money(mc.p10_final_balance));
            let _ = writeln!(out, "  median final  {}", money(mc.p50_final_balance));
            let _ = writeln!(out, "  p90 final     {}", money(mc.p90_final_balance));
        }
        out
    }
}

fn phase_label(phase: SimulationPhase) -> &'static str {
    match phase {
        SimulationPhase::Accumulation => "ACC",
        SimulationPhase::Distribution => "DIST",
    }
}

/// Events worth a line of their own; routine monthly ones are skipped
fn describe(event: &SignificantEvent) -> Option<String> {
    match event {
        SignificantEvent::RetirementStarted => Some("retirement begins".to_string()),
        SignificantEvent::IncomeStarted { name } => Some(format!("{name} starts")),
        SignificantEvent::IncomeEnded { name } => Some(format!("{name} ends")),
        SignificantEvent::ContributionRateIncreased { rate } => Some(format!(
            "contribution rate rises to {}%",
            (rate * Decimal::ONE_HUNDRED).normalize()
        )),
        SignificantEvent::PortfolioDepleted => Some("portfolio depleted".to_string()),
        SignificantEvent::RothConversion { .. }
        | SignificantEvent::RequiredDistribution { .. }
        | SignificantEvent::WithdrawalShortfall { .. } => None,
    }
}

/// Whole dollars with thousands separators, e.g. `-1,234,568`
fn money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

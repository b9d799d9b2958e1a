//! Insulin-on-board estimation and dose summaries.

use crate::glucose::round1;
use crate::types::{AnalysisContext, InsulinDose, InsulinKind, Metric};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default duration over which a dose decays to zero
pub const DEFAULT_ACTIVE_DURATION_HOURS: f64 = 4.0;

/// Remaining active insulin at `now` with linear decay:
/// `units * max(0, 1 - elapsed / active_hours)` summed over doses taken in
/// the last `active_hours`. Doses after `now` are ignored.
pub fn insulin_on_board(doses: &[InsulinDose], now: DateTime<Utc>, active_hours: f64) -> f64 {
    if active_hours <= 0.0 {
        return 0.0;
    }

    let iob: f64 = doses
        .iter()
        .filter_map(|dose| {
            let elapsed_hours = (now - dose.taken_at).num_seconds() as f64 / 3600.0;
            if !(0.0..active_hours).contains(&elapsed_hours) {
                return None;
            }
            Some(dose.units * (1.0 - elapsed_hours / active_hours).max(0.0))
        })
        .sum();

    (iob * 100.0).round() / 100.0
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InsulinSummary {
    pub total_units: f64,
    pub dose_count: usize,
    pub units_by_kind: BTreeMap<InsulinKind, f64>,
    /// Mean units per local day on which any dose was logged
    pub daily_average_units: f64,
    pub insulin_on_board: f64,
}

/// Totals for the doses in a window, plus IOB at the reference instant
pub fn insulin_summary(doses: &[InsulinDose], ctx: &AnalysisContext) -> Metric<InsulinSummary> {
    if doses.is_empty() {
        return Metric::insufficient(1, 0);
    }

    let mut units_by_kind = BTreeMap::new();
    let mut days = BTreeSet::new();
    let mut total = 0.0;
    for dose in doses {
        *units_by_kind.entry(dose.kind).or_insert(0.0) += dose.units;
        days.insert(ctx.local_date(dose.taken_at));
        total += dose.units;
    }

    Metric::available(InsulinSummary {
        total_units: round1(total),
        dose_count: doses.len(),
        units_by_kind,
        daily_average_units: round1(total / days.len() as f64),
        insulin_on_board: insulin_on_board(doses, ctx.now, ctx.thresholds.insulin_active_hours),
    })
}

//! Logging streaks over local calendar days.
//!
//! A day is "active" when any stream has at least one entry on it. The walk
//! goes backward from today for at most [`STREAK_LOOKBACK_DAYS`] days.

use crate::repository::LogRepository;
use crate::types::AnalysisContext;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const STREAK_LOOKBACK_DAYS: u64 = 365;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakSummary {
    /// Consecutive active days ending today (0 when today has no entries)
    pub current: u32,
    /// Longest run of active days inside the look-back window
    pub longest: u32,
    /// Number of distinct active days ever logged
    pub total_days: usize,
}

/// Union of local calendar dates across every stream
pub fn active_days(repo: &LogRepository, ctx: &AnalysisContext) -> BTreeSet<NaiveDate> {
    repo.timestamps().map(|t| ctx.local_date(t)).collect()
}

/// Walk backward from today over the active-day set.
///
/// The current streak only counts while the walk has not yet hit an inactive
/// day, so an inactive today ends it immediately even if yesterday was
/// active.
pub fn calculate_streaks(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakSummary {
    let mut current = 0;
    let mut longest = 0;
    let mut run = 0;
    let mut counting_current = true;

    for offset in 0..STREAK_LOOKBACK_DAYS {
        let Some(day) = today.checked_sub_days(Days::new(offset)) else {
            break;
        };

        if days.contains(&day) {
            run += 1;
            longest = longest.max(run);
            if counting_current {
                current = run;
            }
        } else {
            counting_current = false;
            run = 0;
        }
    }

    StreakSummary {
        current,
        longest,
        total_days: days.len(),
    }
}

/// Streak summary for a repository at the context's reference instant
pub fn streak_summary(repo: &LogRepository, ctx: &AnalysisContext) -> StreakSummary {
    let days = active_days(repo, ctx);
    let summary = calculate_streaks(&days, ctx.today());
    tracing::debug!(
        current = summary.current,
        longest = summary.longest,
        total = summary.total_days,
        "Computed logging streaks"
    );
    summary
}

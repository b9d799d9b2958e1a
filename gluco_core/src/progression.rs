//! Points and level tiers for consistent logging.
//!
//! Points are a weighted count of logged entries plus a bonus for the
//! current streak:
//! - Glucose reading: 10
//! - Carb entry, insulin dose, taken medication, mood check-in: 5
//! - Activity session: 15
//! - Current streak: 20 per day

use crate::repository::LogRepository;
use crate::streak::StreakSummary;
use serde::Serialize;

pub const POINTS_GLUCOSE: u64 = 10;
pub const POINTS_CARBS: u64 = 5;
pub const POINTS_INSULIN: u64 = 5;
pub const POINTS_MEDICATION_TAKEN: u64 = 5;
pub const POINTS_ACTIVITY: u64 = 15;
pub const POINTS_MOOD: u64 = 5;
pub const POINTS_PER_STREAK_DAY: u64 = 20;

/// A named level with its minimum points
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Tier {
    pub rank: u32,
    pub name: &'static str,
    pub min_points: u64,
}

/// Ascending tier table
pub const TIERS: [Tier; 7] = [
    Tier { rank: 1, name: "Newcomer", min_points: 0 },
    Tier { rank: 2, name: "Tracker", min_points: 100 },
    Tier { rank: 3, name: "Committed", min_points: 500 },
    Tier { rank: 4, name: "Dedicated", min_points: 1500 },
    Tier { rank: 5, name: "Expert", min_points: 3000 },
    Tier { rank: 6, name: "Master", min_points: 6000 },
    Tier { rank: 7, name: "Legend", min_points: 10000 },
];

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PointsSummary {
    pub entry_points: u64,
    pub streak_bonus: u64,
    pub total: u64,
    pub tier: Tier,
    pub next_tier: Option<Tier>,
    /// Points still needed for the next tier (0 at the top tier)
    pub points_to_next: u64,
}

/// Highest tier whose minimum is at or below `points`
pub fn tier_for(points: u64) -> Tier {
    TIERS
        .iter()
        .rev()
        .find(|t| points >= t.min_points)
        .copied()
        .unwrap_or(TIERS[0])
}

/// Weighted entry points before the streak bonus
pub fn entry_points(repo: &LogRepository) -> u64 {
    let taken = repo.medications.iter().filter(|m| m.taken).count() as u64;

    repo.glucose.len() as u64 * POINTS_GLUCOSE
        + repo.carbs.len() as u64 * POINTS_CARBS
        + repo.insulin.len() as u64 * POINTS_INSULIN
        + taken * POINTS_MEDICATION_TAKEN
        + repo.activity.len() as u64 * POINTS_ACTIVITY
        + repo.mood.len() as u64 * POINTS_MOOD
}

/// Total points and the level they map to
pub fn points_and_level(repo: &LogRepository, streak: &StreakSummary) -> PointsSummary {
    let entry_points = entry_points(repo);
    let streak_bonus = streak.current as u64 * POINTS_PER_STREAK_DAY;
    let total = entry_points + streak_bonus;

    let tier = tier_for(total);
    let next_tier = TIERS.iter().find(|t| t.rank == tier.rank + 1).copied();
    let points_to_next = next_tier.map_or(0, |t| t.min_points - total);

    tracing::debug!(total, tier = tier.name, "Computed points and level");

    PointsSummary {
        entry_points,
        streak_bonus,
        total,
        tier,
        next_tier,
        points_to_next,
    }
}

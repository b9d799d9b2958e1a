//! Summaries for the non-glucose streams: meals, medications, activity and
//! mood. These feed the report sections.

use crate::glucose::round1;
use crate::types::{
    ActivitySession, AnalysisContext, CarbEntry, MedicationDose, Metric, MoodCheckIn,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Meals
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CarbSummary {
    pub entry_count: usize,
    pub total_carbs: f64,
    /// Sum over entries with a known calorie value
    pub total_calories: f64,
    pub logged_days: usize,
    pub daily_average_carbs: f64,
    pub days_over_goal: usize,
}

pub fn carb_summary(entries: &[CarbEntry], ctx: &AnalysisContext) -> Metric<CarbSummary> {
    if entries.is_empty() {
        return Metric::insufficient(1, 0);
    }

    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for e in entries {
        *per_day.entry(ctx.local_date(e.logged_at)).or_insert(0.0) += e.carbs_grams;
    }

    let total_carbs: f64 = entries.iter().map(|e| e.carbs_grams).sum();
    let total_calories: f64 = entries.iter().filter_map(|e| e.calories_kcal).sum();
    let goal = ctx.thresholds.daily_carb_goal_grams;

    Metric::available(CarbSummary {
        entry_count: entries.len(),
        total_carbs: round1(total_carbs),
        total_calories: round1(total_calories),
        logged_days: per_day.len(),
        daily_average_carbs: round1(total_carbs / per_day.len() as f64),
        days_over_goal: per_day.values().filter(|&&c| c > goal).count(),
    })
}

// ============================================================================
// Medications
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicationAdherence {
    pub scheduled: usize,
    pub taken: usize,
    /// Rounded percentage of scheduled doses that were taken
    pub adherence_pct: u32,
    /// Skip reasons with counts, most frequent first
    pub skip_reasons: Vec<(String, usize)>,
}

pub fn medication_adherence(doses: &[MedicationDose]) -> Metric<MedicationAdherence> {
    if doses.is_empty() {
        return Metric::insufficient(1, 0);
    }

    let taken = doses.iter().filter(|d| d.taken).count();

    let mut reasons: HashMap<String, usize> = HashMap::new();
    for d in doses.iter().filter(|d| !d.taken) {
        let reason = d
            .skip_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("unspecified")
            .to_lowercase();
        *reasons.entry(reason).or_insert(0) += 1;
    }
    let mut skip_reasons: Vec<(String, usize)> = reasons.into_iter().collect();
    skip_reasons.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Metric::available(MedicationAdherence {
        scheduled: doses.len(),
        taken,
        adherence_pct: ((taken as f64 / doses.len() as f64) * 100.0).round() as u32,
        skip_reasons,
    })
}

// ============================================================================
// Activity
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivitySummary {
    pub sessions: usize,
    pub total_minutes: f64,
    pub total_calories: f64,
    pub average_minutes: f64,
}

pub fn activity_summary(sessions: &[ActivitySession]) -> Metric<ActivitySummary> {
    if sessions.is_empty() {
        return Metric::insufficient(1, 0);
    }

    let total_minutes: f64 = sessions.iter().map(|s| s.duration_min).sum();
    let total_calories: f64 = sessions.iter().map(|s| s.calories_burned).sum();

    Metric::available(ActivitySummary {
        sessions: sessions.len(),
        total_minutes: round1(total_minutes),
        total_calories: round1(total_calories),
        average_minutes: round1(total_minutes / sessions.len() as f64),
    })
}

// ============================================================================
// Mood
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MoodSummary {
    pub check_ins: usize,
    pub average_mood: f64,
    pub average_energy: f64,
    pub average_stress: f64,
    pub average_sleep: f64,
    /// Up to three most reported symptoms, most frequent first
    pub top_symptoms: Vec<(String, usize)>,
    /// Mean glucose recorded at check-ins with the lowest mood rank seen
    pub glucose_at_lowest_mood: Option<f64>,
    /// Mean glucose recorded at check-ins with the highest mood rank seen
    pub glucose_at_highest_mood: Option<f64>,
}

pub fn mood_summary(check_ins: &[MoodCheckIn]) -> Metric<MoodSummary> {
    if check_ins.is_empty() {
        return Metric::insufficient(1, 0);
    }

    let n = check_ins.len() as f64;
    let avg = |f: fn(&MoodCheckIn) -> u8| round1(check_ins.iter().map(|c| f(c) as f64).sum::<f64>() / n);

    let mut symptoms: HashMap<&str, usize> = HashMap::new();
    for c in check_ins {
        for s in &c.symptoms {
            *symptoms.entry(s.as_str()).or_insert(0) += 1;
        }
    }
    let mut top_symptoms: Vec<(String, usize)> = symptoms
        .into_iter()
        .map(|(s, n)| (s.to_string(), n))
        .collect();
    top_symptoms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_symptoms.truncate(3);

    let glucose_at_rank = |rank: u8| {
        let values: Vec<f64> = check_ins
            .iter()
            .filter(|c| c.mood_rank == rank)
            .filter_map(|c| c.glucose_at_time)
            .collect();
        (!values.is_empty()).then(|| round1(values.iter().sum::<f64>() / values.len() as f64))
    };

    let lowest = check_ins.iter().map(|c| c.mood_rank).min().unwrap_or(1);
    let highest = check_ins.iter().map(|c| c.mood_rank).max().unwrap_or(5);

    Metric::available(MoodSummary {
        check_ins: check_ins.len(),
        average_mood: avg(|c| c.mood_rank),
        average_energy: avg(|c| c.energy),
        average_stress: avg(|c| c.stress),
        average_sleep: avg(|c| c.sleep),
        top_symptoms,
        glucose_at_lowest_mood: (lowest != highest).then(|| glucose_at_rank(lowest)).flatten(),
        glucose_at_highest_mood: (lowest != highest).then(|| glucose_at_rank(highest)).flatten(),
    })
}

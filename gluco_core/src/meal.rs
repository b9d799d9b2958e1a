//! Free-text meal parser.
//!
//! Turns a description like "2 cups of brown rice and chicken" into
//! quantified food items with nutrition totals. Keys are matched
//! longest-first so "brown rice" wins over "rice"; once a key matches, its
//! words are consumed and cannot match again.
//!
//! Known limitation: precedence is purely by key length, so overlapping
//! names can tokenize unexpectedly ("chicken breast" is consumed before
//! "fried chicken" can see "chicken"). Keys of equal length are tried in
//! table order.

use crate::foods::FoodTable;
use crate::glucose::round1;
use crate::types::{CarbEntry, GlycemicTag};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Carbs assigned when nothing in the text is recognized
pub const FALLBACK_CARBS: f64 = 25.0;

/// Calories assigned when nothing in the text is recognized
pub const FALLBACK_CALORIES: f64 = 200.0;

/// Maximum characters of raw input kept as the fallback item name
pub const FALLBACK_NAME_MAX_CHARS: usize = 40;

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9.\s]").expect("valid punctuation regex"));

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid number regex"));

static UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(cup|piece|slice|bowl|plate|serving|fillet)s?$").expect("valid unit regex")
});

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GlycemicLoad {
    Low,
    Moderate,
    High,
}

impl GlycemicLoad {
    /// `> 50g`, or any high-GI item with `> 30g` total, is High; `> 25g` is
    /// Moderate; anything else is Low
    pub fn classify(total_carbs: f64, any_high_gi: bool) -> Self {
        if total_carbs > 50.0 || (any_high_gi && total_carbs > 30.0) {
            GlycemicLoad::High
        } else if total_carbs > 25.0 {
            GlycemicLoad::Moderate
        } else {
            GlycemicLoad::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GlycemicLoad::Low => "Low",
            GlycemicLoad::Moderate => "Moderate",
            GlycemicLoad::High => "High",
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ParsedFoodItem {
    /// Matched reference key; `None` for the generic fallback item
    pub key: Option<String>,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub carbs: f64,
    pub calories: f64,
    pub glycemic_tag: Option<GlycemicTag>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ParsedMeal {
    /// Items in the order they appear in the text
    pub items: Vec<ParsedFoodItem>,
    pub total_carbs: f64,
    pub total_calories: f64,
    pub glycemic_load: GlycemicLoad,
    /// True when nothing was recognized and a generic item was emitted
    pub fallback: bool,
}

impl ParsedMeal {
    /// Candidate log entries for the caller to approve and commit
    pub fn to_carb_entries(&self, logged_at: DateTime<Utc>) -> Vec<CarbEntry> {
        self.items
            .iter()
            .map(|item| CarbEntry {
                food_name: item.name.clone(),
                carbs_grams: item.carbs,
                calories_kcal: Some(item.calories),
                logged_at,
            })
            .collect()
    }
}

/// Lowercase, replace punctuation with spaces and split into words.
/// Decimal points inside numbers survive ("1.5").
fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    PUNCTUATION
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(|w| w.trim_matches('.').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Food key for a display name, normalized the way meal text is tokenized
/// so that the parser can match it ("Kellogg's Frosties" -> "kellogg s frosties")
pub fn normalize_key(name: &str) -> String {
    tokenize(name).join(" ")
}

fn parse_quantity(word: &str) -> Option<f64> {
    if NUMBER.is_match(word) {
        return word.parse().ok();
    }
    let q = match word {
        "a" | "an" | "one" => 1.0,
        "half" => 0.5,
        "two" => 2.0,
        "three" => 3.0,
        "four" => 4.0,
        "five" => 5.0,
        "six" => 6.0,
        "seven" => 7.0,
        "eight" => 8.0,
        "nine" => 9.0,
        "ten" => 10.0,
        _ => return None,
    };
    Some(q)
}

/// Does `token` match key word `word`? The last word of a key also accepts
/// simple plurals.
fn word_matches(token: &str, word: &str, is_last: bool) -> bool {
    if token == word {
        return true;
    }
    is_last
        && token
            .strip_prefix(word)
            .is_some_and(|suffix| suffix == "s" || suffix == "es")
}

/// First position where every word of `key_words` matches unconsumed tokens
fn find_key(tokens: &[String], consumed: &[bool], key_words: &[&str]) -> Option<usize> {
    let k = key_words.len();
    if k == 0 || k > tokens.len() {
        return None;
    }
    (0..=tokens.len() - k).find(|&start| {
        key_words.iter().enumerate().all(|(j, word)| {
            !consumed[start + j] && word_matches(&tokens[start + j], word, j == k - 1)
        })
    })
}

struct Quantity {
    amount: f64,
    unit: Option<String>,
    /// Index of the first token belonging to the quantity phrase
    start: usize,
}

/// Look back from `key_start` for `<number> [unit] [of]`
fn leading_quantity(tokens: &[String], consumed: &[bool], key_start: usize) -> Option<Quantity> {
    let free = |i: usize| !consumed[i];
    let mut i = key_start;

    if i > 0 && free(i - 1) && tokens[i - 1] == "of" {
        i -= 1;
    }

    let mut unit = None;
    if i > 0 && free(i - 1) && UNIT.is_match(&tokens[i - 1]) {
        unit = Some(tokens[i - 1].trim_end_matches('s').to_string());
        i -= 1;
    }

    if i > 0 && free(i - 1) {
        if let Some(amount) = parse_quantity(&tokens[i - 1]) {
            return Some(Quantity {
                amount,
                unit,
                start: i - 1,
            });
        }
    }
    None
}

fn fallback_item(text: &str) -> ParsedFoodItem {
    let trimmed = text.trim();
    let name: String = if trimmed.is_empty() {
        "Meal".to_string()
    } else {
        trimmed.chars().take(FALLBACK_NAME_MAX_CHARS).collect()
    };

    ParsedFoodItem {
        key: None,
        name,
        quantity: 1.0,
        unit: None,
        carbs: FALLBACK_CARBS,
        calories: FALLBACK_CALORIES,
        glycemic_tag: None,
    }
}

/// Parse free text against a food table
pub fn parse_meal(text: &str, table: &FoodTable) -> ParsedMeal {
    let tokens = tokenize(text);
    let mut consumed = vec![false; tokens.len()];
    let mut found: Vec<(usize, ParsedFoodItem)> = Vec::new();

    for record in table.match_order() {
        let key_words: Vec<&str> = record.key.split_whitespace().collect();
        let Some(start) = find_key(&tokens, &consumed, &key_words) else {
            continue;
        };

        let quantity = leading_quantity(&tokens, &consumed, start);
        let (amount, unit, phrase_start) = match quantity {
            Some(q) => (q.amount, q.unit, q.start),
            None => (1.0, None, start),
        };

        for flag in &mut consumed[phrase_start..start + key_words.len()] {
            *flag = true;
        }

        tracing::debug!(key = %record.key, quantity = amount, "Matched food key");

        found.push((
            phrase_start,
            ParsedFoodItem {
                key: Some(record.key.clone()),
                name: record.key.clone(),
                quantity: amount,
                unit,
                carbs: round1(record.carbs_per_portion * amount),
                calories: round1(record.calories_per_portion * amount),
                glycemic_tag: Some(record.glycemic_tag),
            },
        ));
    }

    found.sort_by_key(|(pos, _)| *pos);
    let mut items: Vec<ParsedFoodItem> = found.into_iter().map(|(_, item)| item).collect();

    let fallback = items.is_empty();
    if fallback {
        tracing::debug!("No food keys recognized, using generic entry");
        items.push(fallback_item(text));
    }

    let total_carbs = round1(items.iter().map(|i| i.carbs).sum());
    let total_calories = round1(items.iter().map(|i| i.calories).sum());
    let any_high_gi = items
        .iter()
        .any(|i| i.glycemic_tag == Some(GlycemicTag::High));

    ParsedMeal {
        glycemic_load: GlycemicLoad::classify(total_carbs, any_high_gi),
        items,
        total_carbs,
        total_calories,
        fallback,
    }
}

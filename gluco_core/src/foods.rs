//! Default food composition table used by the meal parser.
//!
//! Values are per typical portion (one cup of rice, one slice of bread, one
//! fillet of fish, ...).

use crate::types::{FoodCompositionRecord, GlycemicTag};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default table - built once and reused across all parses
static DEFAULT_FOOD_TABLE: Lazy<FoodTable> = Lazy::new(build_default_food_table);

/// Get a reference to the cached default food table
pub fn get_default_food_table() -> &'static FoodTable {
    &DEFAULT_FOOD_TABLE
}

/// A set of food composition records keyed by lowercase match key
#[derive(Clone, Debug, Default)]
pub struct FoodTable {
    records: Vec<FoodCompositionRecord>,
}

impl FoodTable {
    pub fn new(records: Vec<FoodCompositionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FoodCompositionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FoodCompositionRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    /// Copy of this table extended with extra records (e.g. normalized
    /// product lookups). Records whose key already exists are skipped.
    pub fn with_records(&self, extra: impl IntoIterator<Item = FoodCompositionRecord>) -> Self {
        let mut table = self.clone();
        for record in extra {
            if table.get(&record.key).is_some() {
                tracing::debug!("Skipping duplicate food key '{}'", record.key);
                continue;
            }
            table.records.push(record);
        }
        table
    }

    /// Records in match order: longest key first, ties keep table order
    pub fn match_order(&self) -> Vec<&FoodCompositionRecord> {
        let mut ordered: Vec<&FoodCompositionRecord> = self.records.iter().collect();
        ordered.sort_by(|a, b| b.key.chars().count().cmp(&a.key.chars().count()));
        ordered
    }

    /// Validate the table and return any errors found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for record in &self.records {
            if record.key.trim().is_empty() {
                errors.push("Food record with empty key".to_string());
                continue;
            }
            if record.key != record.key.to_lowercase() || record.key.trim() != record.key {
                errors.push(format!("Food key '{}' must be lowercase and trimmed", record.key));
            }
            if !seen.insert(record.key.as_str()) {
                errors.push(format!("Duplicate food key '{}'", record.key));
            }
            if record.carbs_per_portion < 0.0 || record.calories_per_portion < 0.0 {
                errors.push(format!("Food '{}' has negative nutrition values", record.key));
            }
        }

        errors
    }
}

fn food(key: &str, carbs: f64, calories: f64, tag: GlycemicTag) -> FoodCompositionRecord {
    FoodCompositionRecord {
        key: key.into(),
        carbs_per_portion: carbs,
        calories_per_portion: calories,
        glycemic_tag: tag,
    }
}

/// Builds the default food table
///
/// **Note**: For production use, prefer `get_default_food_table()` which
/// returns a cached reference.
pub fn build_default_food_table() -> FoodTable {
    use GlycemicTag::{High, Low, Medium};

    FoodTable::new(vec![
        // Grains and starches
        food("rice", 45.0, 206.0, High),
        food("white rice", 45.0, 206.0, High),
        food("brown rice", 45.0, 216.0, Medium),
        food("fried rice", 55.0, 340.0, High),
        food("bread", 15.0, 80.0, High),
        food("whole wheat bread", 12.0, 70.0, Medium),
        food("toast", 15.0, 80.0, High),
        food("bagel", 48.0, 245.0, High),
        food("tortilla", 26.0, 140.0, Medium),
        food("pasta", 43.0, 220.0, Medium),
        food("spaghetti", 43.0, 220.0, Medium),
        food("noodles", 40.0, 220.0, Medium),
        food("quinoa", 39.0, 222.0, Low),
        food("oatmeal", 27.0, 158.0, Low),
        food("cereal", 24.0, 110.0, High),
        food("granola", 32.0, 200.0, Medium),
        food("pancake", 22.0, 175.0, High),
        food("waffle", 25.0, 220.0, High),
        food("crackers", 20.0, 130.0, High),
        food("potato", 37.0, 163.0, High),
        food("sweet potato", 24.0, 103.0, Medium),
        food("french fries", 48.0, 365.0, High),
        food("corn", 27.0, 125.0, Medium),
        // Fruit
        food("apple", 25.0, 95.0, Low),
        food("banana", 27.0, 105.0, Medium),
        food("orange", 15.0, 62.0, Low),
        food("grapes", 27.0, 104.0, Medium),
        food("berries", 15.0, 70.0, Low),
        food("mango", 25.0, 100.0, Medium),
        // Protein
        food("chicken", 0.0, 165.0, Low),
        food("chicken breast", 0.0, 165.0, Low),
        food("fried chicken", 11.0, 320.0, Low),
        food("egg", 0.6, 78.0, Low),
        food("salmon", 0.0, 208.0, Low),
        food("fish", 0.0, 140.0, Low),
        food("beef", 0.0, 250.0, Low),
        food("steak", 0.0, 270.0, Low),
        food("pork", 0.0, 242.0, Low),
        food("tofu", 3.0, 94.0, Low),
        food("beans", 40.0, 225.0, Low),
        food("lentils", 40.0, 230.0, Low),
        food("peanut butter", 6.0, 190.0, Low),
        food("nuts", 6.0, 170.0, Low),
        // Dairy
        food("milk", 12.0, 103.0, Low),
        food("yogurt", 17.0, 150.0, Low),
        food("cheese", 0.4, 113.0, Low),
        food("ice cream", 24.0, 210.0, Medium),
        // Vegetables and mixed dishes
        food("salad", 7.0, 33.0, Low),
        food("broccoli", 6.0, 31.0, Low),
        food("carrot", 6.0, 25.0, Low),
        food("soup", 15.0, 100.0, Low),
        food("curry", 20.0, 300.0, Medium),
        food("sushi", 38.0, 200.0, Medium),
        food("pizza", 36.0, 285.0, High),
        food("burger", 40.0, 540.0, Medium),
        food("sandwich", 35.0, 300.0, Medium),
        // Snacks, sweets and drinks
        food("chips", 15.0, 150.0, High),
        food("popcorn", 6.0, 31.0, Medium),
        food("cookie", 10.0, 50.0, High),
        food("cake", 35.0, 240.0, High),
        food("donut", 22.0, 250.0, High),
        food("muffin", 30.0, 340.0, High),
        food("chocolate", 25.0, 230.0, Medium),
        food("soda", 39.0, 150.0, High),
        food("orange juice", 26.0, 112.0, High),
        food("juice", 28.0, 120.0, High),
    ])
}

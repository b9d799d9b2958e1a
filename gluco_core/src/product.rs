//! Normalization of external product lookups into food records.
//!
//! Product data arrives in an open food-facts style shape (per-serving and
//! per-100g nutriments, a letter grade, a processing group, ingredient and
//! allergen text). The engine only needs a carb/calorie record out of it.
//! Lookup failures of any kind surface as empty results.

use crate::meal::normalize_key;
use crate::types::{FoodCompositionRecord, GlycemicTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Nutriment values as reported by the product service
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Nutriments {
    #[serde(default, rename = "carbohydrates_serving")]
    pub carbs_serving: Option<f64>,
    #[serde(default, rename = "carbohydrates_100g")]
    pub carbs_100g: Option<f64>,
    #[serde(default, rename = "energy-kcal_serving")]
    pub kcal_serving: Option<f64>,
    #[serde(default, rename = "energy-kcal_100g")]
    pub kcal_100g: Option<f64>,
    #[serde(default)]
    pub sugars_serving: Option<f64>,
    #[serde(default)]
    pub sugars_100g: Option<f64>,
}

/// Raw product record from a barcode or text search
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub serving_size: Option<String>,
    #[serde(default)]
    pub nutriments: Nutriments,
    /// Letter quality grade (a..e)
    #[serde(default)]
    pub nutriscore_grade: Option<String>,
    /// Processing level (1 unprocessed .. 4 ultra-processed)
    #[serde(default)]
    pub nova_group: Option<u8>,
    #[serde(default)]
    pub ingredients_text: Option<String>,
    #[serde(default)]
    pub allergens: Option<String>,
}

/// Source of product records. Implementations must not fail: unavailable
/// services and unknown products both come back empty.
pub trait ProductLookup {
    fn by_barcode(&self, code: &str) -> Option<ProductRecord>;
    fn search(&self, query: &str) -> Vec<ProductRecord>;
}

/// Map a product record into a food record.
///
/// Per-serving values are preferred, per-100g used otherwise. The key is
/// normalized like meal text, so punctuation and accents become spaces.
/// Returns `None` without a usable product name or carbohydrate value.
pub fn normalize_product(product: &ProductRecord) -> Option<FoodCompositionRecord> {
    let key = product
        .product_name
        .as_deref()
        .map(normalize_key)
        .filter(|k| !k.is_empty())?;

    let n = &product.nutriments;
    let (carbs, kcal, sugars) = match n.carbs_serving {
        Some(carbs) => (carbs, n.kcal_serving, n.sugars_serving),
        None => (n.carbs_100g?, n.kcal_100g, n.sugars_100g),
    };
    if carbs < 0.0 {
        return None;
    }

    Some(FoodCompositionRecord {
        key,
        carbs_per_portion: carbs,
        calories_per_portion: kcal.unwrap_or(carbs * 4.0).max(0.0),
        glycemic_tag: glycemic_tag_for(carbs, sugars, product.nova_group),
    })
}

/// Sugar-heavy or dense carbs in ultra-processed products read as high GI
fn glycemic_tag_for(carbs: f64, sugars: Option<f64>, nova_group: Option<u8>) -> GlycemicTag {
    let sugar_share = match sugars {
        Some(s) if carbs > 0.0 => s / carbs,
        _ => 0.0,
    };

    if sugar_share > 0.5 || (carbs >= 30.0 && nova_group == Some(4)) {
        GlycemicTag::High
    } else if carbs >= 15.0 {
        GlycemicTag::Medium
    } else {
        GlycemicTag::Low
    }
}

/// Product lookup over a JSON file containing an array of product records
#[derive(Clone, Debug, Default)]
pub struct JsonProductCatalog {
    products: Vec<ProductRecord>,
    by_code: HashMap<String, usize>,
}

impl JsonProductCatalog {
    pub fn new(products: Vec<ProductRecord>) -> Self {
        let by_code = products
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.code.clone().map(|c| (c, i)))
            .collect();
        Self { products, by_code }
    }

    /// Load from a file. Missing or malformed files give an empty catalog.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No product catalog found at {:?}", path);
            return Self::default();
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read product catalog {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<ProductRecord>>(&contents) {
            Ok(products) => {
                tracing::info!("Loaded {} products from {:?}", products.len(), path);
                Self::new(products)
            }
            Err(e) => {
                tracing::warn!("Failed to parse product catalog {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Every record that normalizes into a food record
    pub fn food_records(&self) -> Vec<FoodCompositionRecord> {
        self.products.iter().filter_map(normalize_product).collect()
    }
}

impl ProductLookup for JsonProductCatalog {
    fn by_barcode(&self, code: &str) -> Option<ProductRecord> {
        self.by_code
            .get(code.trim())
            .and_then(|&i| self.products.get(i))
            .cloned()
    }

    fn search(&self, query: &str) -> Vec<ProductRecord> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        self.products
            .iter()
            .filter(|p| {
                let name = p.product_name.as_deref().unwrap_or("").to_lowercase();
                let brand = p.brands.as_deref().unwrap_or("").to_lowercase();
                name.contains(&q) || brand.contains(&q)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foods::get_default_food_table;
    use crate::meal::parse_meal;

    const PRODUCTS_JSON: &str = r#"[
        {
            "code": "5000159484695",
            "product_name": "Chocolate Bar",
            "brands": "Sweetco",
            "serving_size": "45 g",
            "nutriments": {
                "carbohydrates_serving": 26.0,
                "carbohydrates_100g": 58.0,
                "energy-kcal_serving": 230.0,
                "sugars_serving": 24.0
            },
            "nutriscore_grade": "e",
            "nova_group": 4,
            "ingredients_text": "sugar, cocoa butter, milk powder",
            "allergens": "en:milk"
        },
        {
            "code": "0001",
            "product_name": "Rolled Oats",
            "nutriments": { "carbohydrates_100g": 60.0, "energy-kcal_100g": 380.0, "sugars_100g": 1.0 }
        },
        {
            "code": "0002",
            "product_name": "Mystery Drink",
            "nutriments": {}
        }
    ]"#;

    fn catalog() -> JsonProductCatalog {
        JsonProductCatalog::new(serde_json::from_str(PRODUCTS_JSON).unwrap())
    }

    #[test]
    fn test_normalize_prefers_per_serving() {
        let product = catalog().by_barcode("5000159484695").unwrap();
        let record = normalize_product(&product).unwrap();

        assert_eq!(record.key, "chocolate bar");
        assert_eq!(record.carbs_per_portion, 26.0);
        assert_eq!(record.calories_per_portion, 230.0);
        assert_eq!(record.glycemic_tag, GlycemicTag::High);
    }

    #[test]
    fn test_normalize_falls_back_to_per_100g() {
        let product = catalog().by_barcode("0001").unwrap();
        let record = normalize_product(&product).unwrap();

        assert_eq!(record.carbs_per_portion, 60.0);
        assert_eq!(record.calories_per_portion, 380.0);
        assert_eq!(record.glycemic_tag, GlycemicTag::Medium);
    }

    #[test]
    fn test_normalize_without_carbs_is_none() {
        let product = catalog().by_barcode("0002").unwrap();
        assert!(normalize_product(&product).is_none());
    }

    #[test]
    fn test_punctuated_product_name_feeds_meal_parser() {
        let product = ProductRecord {
            product_name: Some("Kellogg's Frosties".into()),
            nutriments: Nutriments {
                carbs_serving: Some(26.0),
                kcal_serving: Some(113.0),
                sugars_serving: Some(11.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let record = normalize_product(&product).unwrap();
        assert_eq!(record.key, "kellogg s frosties");

        let table = get_default_food_table().with_records(vec![record]);
        assert!(table.validate().is_empty());

        let meal = parse_meal("2 bowls of Kellogg's Frosties", &table);
        assert!(!meal.fallback);
        assert_eq!(meal.items.len(), 1);
        assert_eq!(meal.items[0].key.as_deref(), Some("kellogg s frosties"));
        assert_eq!(meal.items[0].quantity, 2.0);
        assert_eq!(meal.total_carbs, 52.0);
    }

    #[test]
    fn test_name_without_letters_or_digits_is_none() {
        let product = ProductRecord {
            product_name: Some("???".into()),
            nutriments: Nutriments {
                carbs_100g: Some(10.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(normalize_product(&product).is_none());
    }

    #[test]
    fn test_unknown_barcode_is_empty() {
        assert!(catalog().by_barcode("999").is_none());
    }

    #[test]
    fn test_search_by_name_or_brand() {
        let c = catalog();
        assert_eq!(c.search("oats").len(), 1);
        assert_eq!(c.search("SWEETCO").len(), 1);
        assert!(c.search("").is_empty());
    }

    #[test]
    fn test_food_records_skip_unusable_products() {
        assert_eq!(catalog().food_records().len(), 2);
    }

    #[test]
    fn test_load_missing_or_corrupt_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = JsonProductCatalog::load(&temp_dir.path().join("none.json"));
        assert!(missing.is_empty());

        let bad_path = temp_dir.path().join("bad.json");
        std::fs::write(&bad_path, "{ not json").unwrap();
        assert!(JsonProductCatalog::load(&bad_path).is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("products.json");
        std::fs::write(&path, PRODUCTS_JSON).unwrap();

        let c = JsonProductCatalog::load(&path);
        assert_eq!(c.len(), 3);
    }
}

#![allow(clippy::missing_panics_doc)]
//! Fixtures shared by the tests of the nutriload crates.
use pretty_assertions::assert_eq;

use crate::food::{Attribute, Food, Nutrient};
use crate::records::SourceKind;
use crate::source_stream::LineStream;

/// A single food spread over all four sources, with the amount given as a string.
pub fn acme_source(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::BrandedFoods => {
            r#"[
{"fdcId": 1, "description": "", "brandOwner": "Acme", "ingredients": "water"},
]"#
        }
        SourceKind::FoodDescriptions => r#"{"fdcId": 1, "description": "Acme Water"}"#,
        SourceKind::FoodAttributes => {
            r#"{"fdcId": 1, "attributeId": 5, "name": "organic", "value": "true"}
{"fdcId": 99, "attributeId": 6, "name": "vegan", "value": "true"}"#
        }
        SourceKind::FoodNutrients => {
            r#"{"fdcId": 1, "nutrientId": 100, "nutrientName": "Energy", "nutrientUnit": "kcal", "amount": "0"}"#
        }
    }
}

/// The aggregate the acme sources merge into
pub fn acme_food() -> Food {
    let mut food = Food::new(1, "Acme Water", "Acme", "water");
    food.attributes.push(Attribute {
        attribute_id: 5,
        name: "organic".into(),
        value: "true".into(),
    });
    food.nutrients.push(Nutrient {
        nutrient_id: 100,
        nutrient_name: "Energy".into(),
        nutrient_unit: "kcal".into(),
        amount: 0.0,
    });
    food
}

/// `count` base foods with ids starting at 1, one json object per line
pub fn branded_foods_lines(count: usize) -> Vec<String> {
    (1..=count)
        .map(|id| {
            serde_json::json!({
                "fdcId": id,
                "description": format!("Food {id}"),
                "brandOwner": "Acme",
                "ingredients": "",
            })
            .to_string()
        })
        .collect()
}

pub fn lines(text: &str) -> LineStream {
    LineStream::from_lines(text.lines().map(str::to_string).collect::<Vec<_>>())
}

/// Compares catalogs with a readable diff
pub fn assert_foods_eq(actual: &[Food], expected: &[Food]) {
    assert_eq!(
        serde_json::to_value(actual).unwrap(),
        serde_json::to_value(expected).unwrap()
    );
}

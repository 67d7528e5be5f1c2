//! This module defines the `Food` aggregate and the facts it is assembled from.
//!
//! A `Food` is the fully denormalized catalog document: the base fields from the branded food
//! source, with every nutrient and attribute fact for the same identifier folded in. It is the
//! only shape that is ever written to a catalog store, and the shape the read contract returns.
use std::fmt::Debug;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};


/// Identifier shared by all sources, the join key for everything.
pub type FoodId = i64;

/// A single nutrient measurement of a food.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Nutrient {
    pub nutrient_id: i64,
    pub nutrient_name: String,
    pub nutrient_unit: String,
    pub amount: f64,
}

/// A qualitative attribute of a food, e.g. `organic = true`.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub attribute_id: i64,
    pub name: String,
    pub value: String,
}

/// The denormalized catalog document.
///
/// Exists iff a base food with the same id was seen. Nutrients and attributes are kept in the
/// order they were read, without deduplication.
#[derive(Default, Clone, Serialize, Deserialize, PartialEq, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into), build_fn(error = "anyhow::Error"))]
pub struct Food {
    pub id: FoodId,
    #[builder(default)]
    pub description: String,
    #[builder(default)]
    pub brand_owner: String,
    #[builder(default)]
    pub ingredients: String,
    #[builder(default)]
    #[serde(default)]
    pub nutrients: Vec<Nutrient>,
    #[builder(default)]
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Food {
    pub fn builder() -> FoodBuilder {
        FoodBuilder::default()
    }

    /// Creates a food with only base fields set and empty fact lists.
    pub fn new(
        id: FoodId,
        description: impl Into<String>,
        brand_owner: impl Into<String>,
        ingredients: impl Into<String>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            brand_owner: brand_owner.into(),
            ingredients: ingredients.into(),
            nutrients: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// True if any nutrient or attribute has been merged into this food.
    pub fn has_facts(&self) -> bool {
        !self.nutrients.is_empty() || !self.attributes.is_empty()
    }
}

impl Debug for Food {
    /// Ingredient lists can be very long, so they are truncated for debugging.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Food")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("brand_owner", &self.brand_owner)
            .field("ingredients", &truncated(&self.ingredients, 60))
            .field("nutrients", &self.nutrients.len())
            .field("attributes", &self.attributes.len())
            .finish()
    }
}

/// The first `max_chars` characters followed by the full character count
fn truncated(s: &str, max_chars: usize) -> String {
    let head: String = s.chars().take(max_chars).collect();
    format!("{head} ({})", s.chars().count())
}

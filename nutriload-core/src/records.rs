//! Typed records produced by normalizing the four sources.
//!
//! Merge logic never looks at untyped json; every raw line is first turned into one of the
//! closed [`SourceRecord`] variants.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::food::{Attribute, FoodId, Nutrient};

/// The four independently sourced datasets.
///
/// The declaration order is the processing order, see [`SourceKind::ORDER`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    BrandedFoods,
    FoodDescriptions,
    FoodAttributes,
    FoodNutrients,
}

impl SourceKind {
    /// Base foods seed the index, every other source joins onto it.
    pub const ORDER: [SourceKind; 4] = [
        SourceKind::BrandedFoods,
        SourceKind::FoodDescriptions,
        SourceKind::FoodAttributes,
        SourceKind::FoodNutrients,
    ];

    /// Conventional file name of the dataset
    pub fn file_name(self) -> &'static str {
        match self {
            SourceKind::BrandedFoods => "branded_foods.json",
            SourceKind::FoodDescriptions => "food_descriptions.json",
            SourceKind::FoodAttributes => "food_attributes.json",
            SourceKind::FoodNutrients => "food_nutrients.json",
        }
    }
}

/// A json value read from a source, with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonLine {
    pub line: usize,
    pub value: Value,
}

/// Seed record from the branded food source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseFood {
    pub id: FoodId,
    pub description: String,
    pub brand_owner: String,
    pub ingredients: String,
}

/// Fill-if-missing description from the description source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescriptionOverride {
    pub id: FoodId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeFact {
    pub id: FoodId,
    pub attribute: Attribute,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NutrientFact {
    pub id: FoodId,
    pub nutrient: Nutrient,
}

/// One normalized record from any source.
#[derive(Debug, Clone, PartialEq, strum_macros::EnumIs)]
pub enum SourceRecord {
    Base(BaseFood),
    Description(DescriptionOverride),
    Attribute(AttributeFact),
    Nutrient(NutrientFact),
}

impl SourceRecord {
    pub fn id(&self) -> FoodId {
        match self {
            SourceRecord::Base(base) => base.id,
            SourceRecord::Description(description) => description.id,
            SourceRecord::Attribute(fact) => fact.id,
            SourceRecord::Nutrient(fact) => fact.id,
        }
    }

    /// The source this kind of record comes from
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceRecord::Base(_) => SourceKind::BrandedFoods,
            SourceRecord::Description(_) => SourceKind::FoodDescriptions,
            SourceRecord::Attribute(_) => SourceKind::FoodAttributes,
            SourceRecord::Nutrient(_) => SourceKind::FoodNutrients,
        }
    }
}

impl From<BaseFood> for SourceRecord {
    fn from(value: BaseFood) -> Self {
        SourceRecord::Base(value)
    }
}

impl From<DescriptionOverride> for SourceRecord {
    fn from(value: DescriptionOverride) -> Self {
        SourceRecord::Description(value)
    }
}

impl From<AttributeFact> for SourceRecord {
    fn from(value: AttributeFact) -> Self {
        SourceRecord::Attribute(value)
    }
}

impl From<NutrientFact> for SourceRecord {
    fn from(value: NutrientFact) -> Self {
        SourceRecord::Nutrient(value)
    }
}

//! Source normalizer
//!
//! Maps raw json objects onto the four typed source records. Only the identifier is required;
//! every other field is coerced to its target type and falls back to an empty string or zero.
//! Unknown fields are ignored.
use nutriload_core::{
    Attribute, AttributeFact, BaseFood, DescriptionOverride, FoodId, JsonLine, Nutrient,
    NutrientFact, SkipReason, SourceKind, SourceRecord,
};
use serde_json::{Map, Value};

/// Name of the identifier in all sources
pub const ID_FIELD: &str = "fdcId";
/// Accepted in place of [`ID_FIELD`]
pub const ID_ALIAS: &str = "id";

type Object = Map<String, Value>;

/// Normalizes a decoded line from the source of the given kind
pub fn normalize(kind: SourceKind, line: &JsonLine) -> Result<SourceRecord, SkipReason> {
    let Value::Object(object) = &line.value else {
        return Err(SkipReason::NotAnObject { line: line.line });
    };

    let record = match kind {
        SourceKind::BrandedFoods => base_food(line.line, object)?.into(),
        SourceKind::FoodDescriptions => description_override(line.line, object)?.into(),
        SourceKind::FoodAttributes => attribute_fact(line.line, object)?.into(),
        SourceKind::FoodNutrients => nutrient_fact(line.line, object)?.into(),
    };

    Ok(record)
}

pub fn base_food(line: usize, object: &Object) -> Result<BaseFood, SkipReason> {
    Ok(BaseFood {
        id: food_id(line, object)?,
        description: string_field(object, "description"),
        brand_owner: string_field(object, "brandOwner"),
        ingredients: string_field(object, "ingredients"),
    })
}

pub fn description_override(
    line: usize,
    object: &Object,
) -> Result<DescriptionOverride, SkipReason> {
    Ok(DescriptionOverride {
        id: food_id(line, object)?,
        description: string_field(object, "description"),
    })
}

pub fn attribute_fact(line: usize, object: &Object) -> Result<AttributeFact, SkipReason> {
    Ok(AttributeFact {
        id: food_id(line, object)?,
        attribute: Attribute {
            attribute_id: integer_field(object, "attributeId"),
            name: string_field(object, "name"),
            value: string_field(object, "value"),
        },
    })
}

pub fn nutrient_fact(line: usize, object: &Object) -> Result<NutrientFact, SkipReason> {
    Ok(NutrientFact {
        id: food_id(line, object)?,
        nutrient: Nutrient {
            nutrient_id: integer_field(object, "nutrientId"),
            nutrient_name: string_field(object, "nutrientName"),
            nutrient_unit: string_field(object, "nutrientUnit"),
            amount: number_field(object, "amount"),
        },
    })
}

fn food_id(line: usize, object: &Object) -> Result<FoodId, SkipReason> {
    let value = object
        .get(ID_FIELD)
        .or_else(|| object.get(ID_ALIAS))
        .filter(|value| !value.is_null())
        .ok_or(SkipReason::MissingField {
            line,
            field: ID_FIELD,
        })?;

    as_integer(value).ok_or_else(|| SkipReason::InvalidField {
        line,
        field: ID_FIELD,
        value: value.to_string(),
    })
}

fn string_field(object: &Object, field: &str) -> String {
    match object.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
        _ => String::new(),
    }
}

fn number_field(object: &Object, field: &str) -> f64 {
    let number = match object.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    number.filter(|n| n.is_finite()).unwrap_or_default()
}

fn integer_field(object: &Object, field: &str) -> i64 {
    object.get(field).and_then(as_integer).unwrap_or_default()
}

/// Integers, integral floats and strings holding either
#[allow(clippy::cast_possible_truncation)]
fn as_integer(value: &Value) -> Option<i64> {
    let float = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            n.as_f64()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(i);
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    }?;

    (float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e15).then_some(float as i64)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    fn line(value: Value) -> JsonLine {
        JsonLine { line: 7, value }
    }

    #[test]
    fn test_base_food_ignores_unknown_fields() {
        let record = normalize(
            SourceKind::BrandedFoods,
            &line(json!({
                "fdcId": 1,
                "description": "",
                "brandOwner": "Acme",
                "ingredients": "water",
                "gtinUpc": "0001"
            })),
        )
        .unwrap();

        assert_eq!(
            record,
            SourceRecord::Base(BaseFood {
                id: 1,
                description: String::new(),
                brand_owner: "Acme".into(),
                ingredients: "water".into(),
            })
        );
    }

    #[test]
    fn test_nutrient_amount_coerced_from_string() {
        let record = normalize(
            SourceKind::FoodNutrients,
            &line(json!({
                "fdcId": "1",
                "nutrientId": "100",
                "nutrientName": "Energy",
                "nutrientUnit": "kcal",
                "amount": "0"
            })),
        )
        .unwrap();

        assert_eq!(
            record,
            SourceRecord::Nutrient(NutrientFact {
                id: 1,
                nutrient: Nutrient {
                    nutrient_id: 100,
                    nutrient_name: "Energy".into(),
                    nutrient_unit: "kcal".into(),
                    amount: 0.0,
                },
            })
        );
    }

    #[test_case(json!(12.5), 12.5; "number")]
    #[test_case(json!(" 3.25 "), 3.25; "numeric string")]
    #[test_case(json!("n/a"), 0.0; "garbage string")]
    #[test_case(json!(null), 0.0; "null")]
    #[test_case(json!([1]), 0.0; "array")]
    fn test_amount_coercion(amount: Value, expected: f64) {
        let fact = nutrient_fact(1, json!({"fdcId": 1, "amount": amount}).as_object().unwrap())
            .unwrap();

        assert!((fact.nutrient.amount - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_attribute_value_coerced_to_string() {
        let fact = attribute_fact(
            1,
            json!({"fdcId": 1, "attributeId": 5.0, "name": "organic", "value": true})
                .as_object()
                .unwrap(),
        )
        .unwrap();

        assert_eq!(
            fact.attribute,
            Attribute {
                attribute_id: 5,
                name: "organic".into(),
                value: "true".into(),
            }
        );
    }

    #[test]
    fn test_id_alias() {
        let record = normalize(
            SourceKind::FoodDescriptions,
            &line(json!({"id": 4, "description": "Oats"})),
        )
        .unwrap();

        assert_eq!(record.id(), 4);
    }

    #[test_case(json!({"description": "Oats"}); "absent")]
    #[test_case(json!({"fdcId": null}); "null")]
    fn test_missing_id_is_skipped(value: Value) {
        assert_eq!(
            normalize(SourceKind::FoodDescriptions, &line(value)),
            Err(SkipReason::MissingField {
                line: 7,
                field: "fdcId"
            })
        );
    }

    #[test_case(json!("abc"); "text")]
    #[test_case(json!(1.5); "fraction")]
    #[test_case(json!({"v": 1}); "object")]
    fn test_invalid_id_is_skipped(id: Value) {
        let result = normalize(SourceKind::FoodAttributes, &line(json!({"fdcId": id})));

        assert!(matches!(
            result,
            Err(SkipReason::InvalidField {
                line: 7,
                field: "fdcId",
                ..
            })
        ));
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(
            normalize(SourceKind::BrandedFoods, &line(json!([1, 2]))),
            Err(SkipReason::NotAnObject { line: 7 })
        );
    }
}

//! Join/merge engine
//!
//! [`FoodIndex`] folds the typed records of all sources into denormalized [`Food`] aggregates.
//! Base foods seed the index, the other sources only ever join onto an id that is already
//! present. Each source is read exactly once.
use anyhow::Result;
use futures_util::TryStreamExt as _;
use indexmap::IndexMap;
use nutriload_core::{
    BaseFood, Food, FoodId, LineOutcome, MergeOutcome, RecordStream, SkipReason, SourceKind,
    SourceRecord, SourceStats,
};

use crate::normalize::normalize;

/// In-memory join map from food id to aggregate.
///
/// Owned by a single pipeline run and consumed once loading starts. Iteration order is the
/// order in which ids were first seeded.
#[derive(Debug, Default, Clone)]
pub struct FoodIndex {
    foods: IndexMap<FoodId, Food>,
}

impl FoodIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    pub fn get(&self, id: FoodId) -> Option<&Food> {
        self.foods.get(&id)
    }

    /// Applies a single record
    ///
    /// * A base food creates the aggregate or replaces it entirely, clearing its facts.
    /// * A non-empty description only fills an empty description.
    /// * Attributes and nutrients are appended in arrival order.
    ///
    /// Anything but a base food for an unknown id is skipped.
    pub fn apply(&mut self, record: SourceRecord) -> MergeOutcome {
        match record {
            SourceRecord::Base(base) => self.seed(base),
            SourceRecord::Description(description) => {
                self.update(description.id, |food| {
                    if food.description.is_empty() && !description.description.is_empty() {
                        food.description = description.description;
                        MergeOutcome::Filled
                    } else {
                        MergeOutcome::Unchanged
                    }
                })
            }
            SourceRecord::Attribute(fact) => self.update(fact.id, |food| {
                food.attributes.push(fact.attribute);
                MergeOutcome::Appended
            }),
            SourceRecord::Nutrient(fact) => self.update(fact.id, |food| {
                food.nutrients.push(fact.nutrient);
                MergeOutcome::Appended
            }),
        }
    }

    fn update(&mut self, id: FoodId, f: impl FnOnce(&mut Food) -> MergeOutcome) -> MergeOutcome {
        self.foods
            .get_mut(&id)
            .map_or(MergeOutcome::Skipped(SkipReason::UnknownFood(id)), f)
    }

    fn seed(&mut self, base: BaseFood) -> MergeOutcome {
        let food = Food::new(base.id, base.description, base.brand_owner, base.ingredients);

        match self.foods.insert(base.id, food) {
            None => MergeOutcome::Seeded,
            Some(previous) => {
                if previous.has_facts() {
                    tracing::warn!(
                        id = base.id,
                        nutrients = previous.nutrients.len(),
                        attributes = previous.attributes.len(),
                        "Base food replaced after facts were merged, facts are discarded"
                    );
                }
                MergeOutcome::Replaced
            }
        }
    }

    /// Reads a whole source, normalizing and merging every record.
    ///
    /// Skipped lines and records are counted in the returned stats. An error means the source
    /// itself could not be read.
    ///
    /// # Errors
    ///
    /// Errors if the underlying stream yields an error.
    pub async fn merge_source(
        &mut self,
        kind: SourceKind,
        mut records: RecordStream,
    ) -> Result<SourceStats> {
        let mut stats = SourceStats::new(kind);

        while let Some(outcome) = records.try_next().await? {
            stats.lines += 1;

            let outcome = match outcome {
                LineOutcome::Record(line) => match normalize(kind, &line) {
                    Ok(record) => self.apply(record),
                    Err(reason) => MergeOutcome::Skipped(reason),
                },
                LineOutcome::Skipped(reason) => MergeOutcome::Skipped(reason),
            };

            if let MergeOutcome::Skipped(reason) = &outcome {
                tracing::debug!(source = %kind, %reason, "Skipping record");
            }
            stats.record(&outcome);
        }

        tracing::info!(source = %kind, %stats, "Merged source");

        Ok(stats)
    }

    /// Consumes the index, yielding the aggregates in seed order
    pub fn into_foods(self) -> Vec<Food> {
        self.foods.into_values().collect()
    }
}

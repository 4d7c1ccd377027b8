use std::sync::Arc;

use chrono::TimeZone;
use serde::Serialize;

use crate::error::{FoodError, FoodResult};
use crate::models::{Component, Ingredient, Meal, Nutrients, to_datetime};
use crate::script::{self, Record};
use crate::store::IngredientStore;

/// Accumulates definitions and meals while sources are being read.
///
/// Meals are kept in arrival order until [`FoodLog::finish`] sorts them once
/// by time.
#[derive(Debug, Default)]
pub struct FoodLog {
    store: IngredientStore,
    eaten: Vec<Meal>,
}

impl FoodLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn store(&self) -> &IngredientStore {
        &self.store
    }

    #[must_use]
    pub fn meals(&self) -> &[Meal] {
        &self.eaten
    }

    pub fn define_primitive(
        &mut self,
        name: &str,
        unit: &str,
        amount: f64,
        authored: Nutrients,
    ) -> FoodResult<&Ingredient> {
        self.store.define_primitive(name, unit, amount, authored)
    }

    pub fn define_composite(
        &mut self,
        name: &str,
        components: &[Component],
        unit: &str,
        serving_amount: f64,
    ) -> FoodResult<&Ingredient> {
        self.store
            .define_composite(name, components, unit, serving_amount)
    }

    /// Record eating `amount` units of `name`, snapshotting its nutrition.
    pub fn record_consumption(&mut self, time: f64, name: &str, amount: f64) -> FoodResult<&Meal> {
        let ingredient = self.store.lookup(name)?;
        let meal = Meal {
            time,
            ingredient: ingredient.name.clone(),
            amount,
            totals: ingredient.per_unit.scale(amount),
        };
        self.eaten.push(meal);
        Ok(&self.eaten[self.eaten.len() - 1])
    }

    pub fn apply(&mut self, record: &Record) -> FoodResult<()> {
        match record {
            Record::Ingredient {
                name,
                unit,
                amount,
                nutrients,
            } => {
                self.define_primitive(name, unit, *amount, *nutrients)?;
            }
            Record::Combine {
                name,
                components,
                amount,
                unit,
            } => {
                self.define_composite(name, components, unit, *amount)?;
            }
            Record::Eat { time, item, amount } => {
                self.record_consumption(*time, item, *amount)?;
            }
        }
        Ok(())
    }

    /// Parse and apply every line of one source.
    ///
    /// The first bad line aborts with its source id, 0-based line index and
    /// text attached. Returns the number of records applied.
    pub fn integrate(&mut self, source_id: &str, text: &str) -> FoodResult<usize> {
        let mut applied = 0;
        for (index, line) in text.lines().enumerate() {
            let outcome = script::parse_line(line).and_then(|record| match record {
                Some(record) => self.apply(&record).map(|()| true),
                None => Ok(false),
            });
            match outcome {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(error) => {
                    return Err(FoodError::AtRecord {
                        source_id: source_id.to_string(),
                        index,
                        line: line.trim().to_string(),
                        error: Box::new(error),
                    });
                }
            }
        }
        tracing::debug!(source = source_id, records = applied, "integrated source");
        Ok(applied)
    }

    /// Sort meals by time (stable, ties keep arrival order) and freeze.
    ///
    /// The window runs from the first meal (or the epoch when there are
    /// none) to `end`.
    #[must_use]
    pub fn finish(mut self, end: f64) -> FoodDb {
        self.eaten.sort_by(|a, b| a.time.total_cmp(&b.time));
        let begin = self.eaten.first().map_or(0.0, |m| m.time);
        tracing::debug!(
            ingredients = self.store.len(),
            meals = self.eaten.len(),
            "food log sealed"
        );
        FoodDb {
            ingredients: Arc::new(self.store),
            eaten: self.eaten,
            begin,
            end,
        }
    }
}

/// A time-sorted food log over the half-open window `[begin, end)`.
///
/// Filtered views share the ingredient store with their parent and own a
/// copy of their slice of meals.
#[derive(Debug, Clone)]
pub struct FoodDb {
    ingredients: Arc<IngredientStore>,
    eaten: Vec<Meal>,
    begin: f64,
    end: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpData<'a> {
    pub begin: f64,
    pub end: f64,
    pub ingredients: Vec<&'a Ingredient>,
    pub eaten: &'a [Meal],
}

impl FoodDb {
    #[must_use]
    pub fn ingredients(&self) -> &IngredientStore {
        &self.ingredients
    }

    #[must_use]
    pub fn meals(&self) -> &[Meal] {
        &self.eaten
    }

    #[must_use]
    pub fn begin(&self) -> f64 {
        self.begin
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Whether two views resolve names against the same ingredient store.
    #[must_use]
    pub fn shares_store_with(&self, other: &FoodDb) -> bool {
        Arc::ptr_eq(&self.ingredients, &other.ingredients)
    }

    /// Meals with `begin <= time < end`, found by binary search.
    #[must_use]
    pub fn filtered_range(&self, begin: f64, end: f64) -> FoodDb {
        let first = self.eaten.partition_point(|m| m.time < begin);
        let after = self.eaten.partition_point(|m| m.time < end).max(first);
        tracing::trace!(begin, end, meals = after - first, "filtered view");
        FoodDb {
            ingredients: Arc::clone(&self.ingredients),
            eaten: self.eaten[first..after].to_vec(),
            begin,
            end,
        }
    }

    #[must_use]
    pub fn dump_data(&self) -> DumpData<'_> {
        DumpData {
            begin: self.begin,
            end: self.end,
            ingredients: self.ingredients.iter().collect(),
            eaten: &self.eaten,
        }
    }

    /// Human-diffable listing: window, ingredients by name, meals by time.
    #[must_use]
    pub fn dump<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let stamp = |t: f64| {
            to_datetime(t, tz).map_or_else(
                || format!("@{t}"),
                |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            )
        };
        let mut out = format!("{} to {}\nIngredients:\n", stamp(self.begin), stamp(self.end));
        for ingredient in self.ingredients.iter() {
            out.push_str("  ");
            out.push_str(&ingredient.dump_line());
            out.push('\n');
        }
        out.push_str("Eaten:\n");
        for meal in &self.eaten {
            out.push_str("  ");
            out.push_str(&meal.dump_line(tz));
            out.push('\n');
        }
        out
    }
}

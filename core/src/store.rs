use std::collections::BTreeMap;

use crate::error::{FoodError, FoodResult};
use crate::models::{Component, Ingredient, Nutrients};

/// Name-keyed arena of ingredient definitions.
///
/// Composites refer to children by name, and a child must exist before the
/// composite that uses it is inserted, so the graph is acyclic by
/// construction and recursive expansion always terminates.
#[derive(Debug, Clone, Default)]
pub struct IngredientStore {
    ingredients: BTreeMap<String, Ingredient>,
}

impl IngredientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a leaf ingredient from values authored for `amount` units.
    pub fn define_primitive(
        &mut self,
        name: &str,
        unit: &str,
        amount: f64,
        authored: Nutrients,
    ) -> FoodResult<&Ingredient> {
        if self.ingredients.contains_key(name) {
            return Err(FoodError::DuplicateName(name.to_string()));
        }
        if amount == 0.0 || !amount.is_finite() {
            return Err(FoodError::InvalidQuantity(format!(
                "amount for '{name}' must be nonzero, got {amount}"
            )));
        }
        let ingredient = Ingredient {
            name: name.to_string(),
            unit: unit.to_string(),
            contents: Vec::new(),
            per_unit: authored.scale(1.0 / amount),
        };
        Ok(self.insert(ingredient))
    }

    /// Define a composite as a weighted sum of existing ingredients.
    ///
    /// The stored record is normalized to one unit of the new ingredient, so
    /// a recipe written for `serving_amount` servings has its nutrition and
    /// child amounts divided by `serving_amount`.
    pub fn define_composite(
        &mut self,
        name: &str,
        components: &[Component],
        unit: &str,
        serving_amount: f64,
    ) -> FoodResult<&Ingredient> {
        if self.ingredients.contains_key(name) {
            return Err(FoodError::DuplicateName(name.to_string()));
        }
        if serving_amount == 0.0 || !serving_amount.is_finite() {
            return Err(FoodError::InvalidQuantity(format!(
                "serving amount for '{name}' must be nonzero, got {serving_amount}"
            )));
        }
        if components.is_empty() {
            return Err(FoodError::MalformedRecord(format!(
                "'{name}' needs at least one ingredient"
            )));
        }

        let mut per_unit = Nutrients::default();
        for component in components {
            let child = self.lookup(&component.name)?;
            per_unit += child.per_unit.scale(component.amount);
        }

        let combined = Ingredient {
            name: name.to_string(),
            unit: unit.to_string(),
            contents: components.to_vec(),
            per_unit,
        };
        Ok(self.insert(combined.scale(1.0 / serving_amount)))
    }

    pub fn lookup(&self, name: &str) -> FoodResult<&Ingredient> {
        self.ingredients
            .get(name)
            .ok_or_else(|| FoodError::UnknownIngredient(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.ingredients.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    /// Ingredients in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.values()
    }

    fn insert(&mut self, ingredient: Ingredient) -> &Ingredient {
        // Duplicates are rejected before the record is built.
        self.ingredients
            .entry(ingredient.name.clone())
            .or_insert(ingredient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn kitchen() -> IngredientStore {
        let mut store = IngredientStore::new();
        store
            .define_primitive("butter", "cup", 1.0, Nutrients::new(1628.0, 0.1, 184.0, 1.9))
            .unwrap();
        store
            .define_primitive("boxmac", "serving", 1.0, Nutrients::new(250.0, 47.0, 3.0, 9.0))
            .unwrap();
        store
    }

    #[test]
    fn test_primitive_per_unit() {
        let mut store = IngredientStore::new();
        let cheese = store
            .define_primitive("cheddar", "g", 28.0, Nutrients::new(110.0, 0.0, 9.0, 7.0))
            .unwrap();
        assert!(cheese.is_primitive());
        assert!(close(cheese.per_unit.kcal, 110.0 / 28.0));
        assert!(close(cheese.per_unit.fat_g, 9.0 / 28.0));
        assert!(close(cheese.per_unit.protein_g, 0.25));
    }

    #[test]
    fn test_primitive_amount_one_is_identity() {
        let store = kitchen();
        let butter = store.lookup("butter").unwrap();
        assert_eq!(butter.per_unit, Nutrients::new(1628.0, 0.1, 184.0, 1.9));
    }

    #[test]
    fn test_primitive_zero_amount() {
        let mut store = IngredientStore::new();
        let err = store
            .define_primitive("air", "cup", 0.0, Nutrients::default())
            .unwrap_err();
        assert!(matches!(err, FoodError::InvalidQuantity(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_leaves_store_unchanged() {
        let mut store = kitchen();
        let err = store
            .define_primitive("butter", "g", 1.0, Nutrients::new(7.0, 0.0, 0.8, 0.0))
            .unwrap_err();
        assert_eq!(err, FoodError::DuplicateName("butter".to_string()));
        assert_eq!(store.len(), 2);
        assert!(close(store.lookup("butter").unwrap().per_unit.kcal, 1628.0));
    }

    #[test]
    fn test_composite_cheesy_mac() {
        let mut store = kitchen();
        let mac = store
            .define_composite(
                "cheesy_mac",
                &[Component::new("butter", 0.25), Component::new("boxmac", 1.5)],
                "serving",
                1.0,
            )
            .unwrap();
        assert!(!mac.is_primitive());
        assert!(close(mac.per_unit.kcal, 782.0));
        assert!(close(mac.per_unit.carbs_g, 0.025 + 70.5));
        assert!(close(mac.per_unit.fat_g, 46.0 + 4.5));
        assert!(close(mac.per_unit.protein_g, 0.475 + 13.5));
    }

    #[test]
    fn test_composite_serving_amount_normalizes() {
        let mut store = kitchen();
        let pot = store
            .define_composite(
                "mac_pot",
                &[Component::new("butter", 0.5), Component::new("boxmac", 3.0)],
                "bowl",
                4.0,
            )
            .unwrap();
        assert!(close(pot.per_unit.kcal, 1564.0 / 4.0));
        assert!(close(pot.contents[0].amount, 0.125));
        assert!(close(pot.contents[1].amount, 0.75));
        assert_eq!(pot.unit, "bowl");
    }

    #[test]
    fn test_composite_unknown_child() {
        let mut store = kitchen();
        let err = store
            .define_composite("toast", &[Component::new("bread", 2.0)], "serving", 1.0)
            .unwrap_err();
        assert_eq!(err, FoodError::UnknownIngredient("bread".to_string()));
        assert!(!store.contains("toast"));
    }

    #[test]
    fn test_composite_zero_serving() {
        let mut store = kitchen();
        let err = store
            .define_composite("x", &[Component::new("butter", 1.0)], "serving", 0.0)
            .unwrap_err();
        assert!(matches!(err, FoodError::InvalidQuantity(_)));
    }

    #[test]
    fn test_composite_cannot_reference_itself() {
        let mut store = kitchen();
        let err = store
            .define_composite("loop", &[Component::new("loop", 1.0)], "serving", 1.0)
            .unwrap_err();
        assert_eq!(err, FoodError::UnknownIngredient("loop".to_string()));
    }

    #[test]
    fn test_iter_is_name_ordered() {
        let store = kitchen();
        let names: Vec<&str> = store.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["boxmac", "butter"]);
    }

    #[test]
    fn test_lookup_unknown() {
        let store = kitchen();
        assert_eq!(
            store.lookup("kale").unwrap_err(),
            FoodError::UnknownIngredient("kale".to_string())
        );
    }
}

//! Nutrition rollup over the recipe graph

use serde::Serialize;

use crate::models::{Catalog, Component, Item, ItemKind, NutritionPerUnit};
use crate::traversal::{self, Issue, Resolved, Rollup, VisitPolicy};

/// Summed nutrition values. Units follow the stored records (kcal, g).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub energy_kcal: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub protein: f64,
    pub salt: f64,
}

impl NutritionTotals {
    /// Totals from a stored record; absent fields count as zero.
    /// The flag is set when any field was absent.
    fn from_record(record: &NutritionPerUnit) -> (Self, bool) {
        let fields = [
            record.energy_kcal,
            record.fat,
            record.carbohydrates,
            record.protein,
            record.salt,
        ];
        let incomplete = fields.iter().any(|f| f.is_none_or(|v| !v.is_finite()));
        let value = |f: Option<f64>| f.filter(|v| v.is_finite()).unwrap_or(0.0);

        let totals = NutritionTotals {
            energy_kcal: value(record.energy_kcal),
            fat: value(record.fat),
            carbohydrates: value(record.carbohydrates),
            protein: value(record.protein),
            salt: value(record.salt),
        };
        (totals, incomplete)
    }

    fn add_scaled(&mut self, other: &NutritionTotals, factor: f64) {
        self.energy_kcal += other.energy_kcal * factor;
        self.fat += other.fat * factor;
        self.carbohydrates += other.carbohydrates * factor;
        self.protein += other.protein * factor;
        self.salt += other.salt * factor;
    }

    pub fn divided_by(&self, divisor: f64) -> NutritionTotals {
        NutritionTotals {
            energy_kcal: self.energy_kcal / divisor,
            fat: self.fat / divisor,
            carbohydrates: self.carbohydrates / divisor,
            protein: self.protein / divisor,
            salt: self.salt / divisor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionResult {
    pub per_recipe: Option<NutritionTotals>,
    pub per_portion: Option<NutritionTotals>,
    pub has_missing_data: bool,
}

struct Nutrition;

impl Rollup for Nutrition {
    type Value = NutritionTotals;

    fn leaf(&self, item: &Item) -> Resolved<NutritionTotals> {
        match &item.nutrition {
            Some(record) => {
                let (value, incomplete) = NutritionTotals::from_record(record);
                Resolved {
                    value,
                    missing: incomplete,
                }
            }
            None => Resolved::missing(),
        }
    }

    fn accumulate(&self, total: &mut NutritionTotals, child: &NutritionTotals, quantity: f64) {
        total.add_scaled(child, quantity);
    }

    fn is_finite(&self, value: &NutritionTotals) -> bool {
        [value.energy_kcal, value.fat, value.carbohydrates, value.protein, value.salt]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Nutrition of `root` per recipe and per target portion.
///
/// Missing values anywhere below the root contribute zero and set the flag.
/// Only a root that yields nothing at all (a recipe without components, or a
/// purchased item without a record) has `per_recipe == None`.
pub fn compute_nutrition(
    root: &Item,
    catalog: &Catalog,
    live_components: Option<&[Component]>,
    policy: VisitPolicy,
) -> NutritionResult {
    let components = live_components.unwrap_or(&root.components);

    let (per_recipe, has_missing_data) = if components.is_empty() {
        match root.kind {
            ItemKind::Zukauf if root.nutrition.is_some() => {
                let leaf = Nutrition.leaf(root);
                (Some(leaf.value), leaf.missing)
            }
            ItemKind::Zukauf => (None, true),
            ItemKind::Eigenproduktion => {
                traversal::note(Issue::EmptyComposite, &root.id);
                (None, true)
            }
        }
    } else {
        let resolved = traversal::resolve_root(&Nutrition, catalog, root, components, policy);
        (Some(resolved.value), resolved.missing)
    };

    let per_portion = match (per_recipe, root.target_portions) {
        (Some(totals), Some(portions)) if portions.is_finite() && portions > 0.0 => {
            Some(totals.divided_by(portions))
        }
        _ => None,
    };

    NutritionResult {
        per_recipe,
        per_portion,
        has_missing_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kcal: f64, fat: f64, carbs: f64, protein: f64, salt: f64) -> NutritionPerUnit {
        NutritionPerUnit {
            energy_kcal: Some(kcal),
            fat: Some(fat),
            carbohydrates: Some(carbs),
            protein: Some(protein),
            salt: Some(salt),
        }
    }

    fn with_nutrition(mut item: Item, nutrition: NutritionPerUnit) -> Item {
        item.nutrition = Some(nutrition);
        item
    }

    #[test]
    fn test_weighted_totals() {
        let catalog = Catalog::new(vec![
            with_nutrition(Item::purchased("oats", "Haferflocken", "kg", 2.0), record(3700.0, 70.0, 590.0, 135.0, 0.1)),
            with_nutrition(Item::purchased("milk", "Milch", "L", 1.0), record(640.0, 35.0, 48.0, 33.0, 1.0)),
        ]);
        let mut porridge = Item::recipe(
            "porridge",
            "Porridge",
            "kg",
            vec![Component::new("oats", "0,2", "kg"), Component::new("milk", "0.5", "L")],
        );
        porridge.target_portions = Some(2.0);

        let result = compute_nutrition(&porridge, &catalog, None, VisitPolicy::BranchLocal);
        assert!(!result.has_missing_data);
        let per_recipe = result.per_recipe.unwrap();
        assert!((per_recipe.energy_kcal - 1060.0).abs() < 1e-9);
        assert!((per_recipe.fat - 31.5).abs() < 1e-9);
        assert!((per_recipe.salt - 0.52).abs() < 1e-9);

        let per_portion = result.per_portion.unwrap();
        assert!((per_portion.energy_kcal - 530.0).abs() < 1e-9);
        assert!((per_portion.protein - 21.75).abs() < 1e-9);
    }

    #[test]
    fn test_partial_field_contributes_zero() {
        let mut partial = record(100.0, 10.0, 20.0, 5.0, 1.0);
        partial.salt = None;
        let catalog = Catalog::new(vec![
            with_nutrition(Item::purchased("a", "A", "kg", 1.0), record(200.0, 2.0, 30.0, 4.0, 0.5)),
            with_nutrition(Item::purchased("b", "B", "kg", 1.0), partial),
        ]);
        let recipe = Item::recipe(
            "r",
            "R",
            "kg",
            vec![Component::new("a", "1", "kg"), Component::new("b", "2", "kg")],
        );

        let result = compute_nutrition(&recipe, &catalog, None, VisitPolicy::BranchLocal);
        assert!(result.has_missing_data);
        let totals = result.per_recipe.unwrap();
        assert_eq!(totals.energy_kcal, 400.0);
        assert_eq!(totals.salt, 0.5);
        assert_eq!(totals.fat, 22.0);
        assert!(result.per_portion.is_none());
    }

    #[test]
    fn test_leaf_without_record_keeps_partial_result() {
        let catalog = Catalog::new(vec![
            with_nutrition(Item::purchased("a", "A", "kg", 1.0), record(100.0, 1.0, 1.0, 1.0, 1.0)),
            Item::purchased("b", "B", "kg", 1.0),
        ]);
        let recipe = Item::recipe(
            "r",
            "R",
            "kg",
            vec![Component::new("a", "1", "kg"), Component::new("b", "1", "kg")],
        );

        let result = compute_nutrition(&recipe, &catalog, None, VisitPolicy::BranchLocal);
        assert!(result.has_missing_data);
        assert_eq!(result.per_recipe.unwrap().energy_kcal, 100.0);
    }

    #[test]
    fn test_empty_recipe_has_no_totals() {
        let catalog = Catalog::default();
        let mut recipe = Item::recipe("r", "R", "kg", Vec::new());
        recipe.target_portions = Some(4.0);
        let result = compute_nutrition(&recipe, &catalog, None, VisitPolicy::BranchLocal);
        assert_eq!(
            result,
            NutritionResult {
                per_recipe: None,
                per_portion: None,
                has_missing_data: true
            }
        );
    }

    #[test]
    fn test_purchased_root_yields_own_record() {
        let catalog = Catalog::default();
        let item = with_nutrition(Item::purchased("a", "A", "kg", 1.0), record(100.0, 1.0, 2.0, 3.0, 4.0));
        let result = compute_nutrition(&item, &catalog, None, VisitPolicy::BranchLocal);
        assert!(!result.has_missing_data);
        assert_eq!(result.per_recipe.unwrap().carbohydrates, 2.0);

        let bare = Item::purchased("b", "B", "kg", 1.0);
        let result = compute_nutrition(&bare, &catalog, None, VisitPolicy::BranchLocal);
        assert!(result.per_recipe.is_none());
        assert!(result.has_missing_data);
    }

    #[test]
    fn test_invalid_portion_count() {
        let catalog = Catalog::new(vec![with_nutrition(
            Item::purchased("a", "A", "kg", 1.0),
            record(100.0, 1.0, 1.0, 1.0, 1.0),
        )]);
        for portions in [Some(0.0), Some(-2.0), Some(f64::NAN), Some(f64::INFINITY), None] {
            let mut recipe = Item::recipe("r", "R", "kg", vec![Component::new("a", "1", "kg")]);
            recipe.target_portions = portions;
            let result = compute_nutrition(&recipe, &catalog, None, VisitPolicy::BranchLocal);
            assert!(result.per_recipe.is_some());
            assert!(result.per_portion.is_none());
        }
    }

    #[test]
    fn test_cycle_in_nutrition() {
        let catalog = Catalog::new(vec![
            Item::recipe("a", "A", "kg", vec![Component::new("b", "1", "kg")]),
            Item::recipe("b", "B", "kg", vec![Component::new("a", "1", "kg")]),
        ]);
        let a = catalog.get("a").unwrap();
        let result = compute_nutrition(a, &catalog, None, VisitPolicy::BranchLocal);
        assert!(result.has_missing_data);
        assert_eq!(result.per_recipe, Some(NutritionTotals::default()));
    }

    #[test]
    fn test_overflowing_quantity_is_flagged() {
        let catalog = Catalog::new(vec![
            with_nutrition(Item::purchased("a", "A", "kg", 1.0), record(100.0, 1.0, 1.0, 1.0, 1.0)),
            with_nutrition(Item::purchased("b", "B", "kg", 1.0), record(10.0, 0.0, 0.0, 0.0, 0.0)),
        ]);
        let recipe = Item::recipe(
            "r",
            "R",
            "kg",
            vec![Component::new("a", "1e307", "kg"), Component::new("b", "2", "kg")],
        );
        let result = compute_nutrition(&recipe, &catalog, None, VisitPolicy::BranchLocal);
        assert!(result.has_missing_data);
        assert_eq!(result.per_recipe.unwrap().energy_kcal, 20.0);
    }
}

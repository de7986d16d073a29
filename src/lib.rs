//! Kitchen costing
//!
//! Recursive cost, nutrition and allergen rollup over a catalog of purchased
//! goods and self-produced recipes.

pub mod allergens;
pub mod collate;
pub mod cost;
pub mod db;
pub mod economics;
pub mod error;
pub mod extract;
pub mod models;
pub mod nutrition;
pub mod report;
pub mod traversal;

pub use allergens::{collect_allergens, collect_ingredient_tags};
pub use cost::{compute_cost, CostResult};
pub use economics::{project_economics, Economics};
pub use models::{Catalog, Component, Item, ItemKind, NutritionPerUnit};
pub use nutrition::{compute_nutrition, NutritionResult, NutritionTotals};
pub use report::{evaluate_recipe, RecipeReport};
pub use traversal::VisitPolicy;

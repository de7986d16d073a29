//! Costing report for one item

use serde::Serialize;

use crate::allergens::{collect_allergens, collect_ingredient_tags};
use crate::cost::{compute_cost, cost_breakdown, BreakdownLine, CostResult};
use crate::economics::{project_economics, Economics};
use crate::models::{Catalog, Component, Item};
use crate::nutrition::{compute_nutrition, NutritionResult, NutritionTotals};
use crate::traversal::VisitPolicy;

/// Everything the engine computes for one item
#[derive(Debug, Clone, Serialize)]
pub struct RecipeReport {
    pub item_id: String,
    pub name: String,
    pub unit: String,
    pub cost: CostResult,
    pub economics: Economics,
    pub nutrition: NutritionResult,
    pub allergens: Vec<String>,
    pub ingredient_tags: Vec<String>,
    pub breakdown: Vec<BreakdownLine>,
}

/// Run all aggregations for `root` over the same snapshot
pub fn evaluate_recipe(
    root: &Item,
    catalog: &Catalog,
    live_components: Option<&[Component]>,
    policy: VisitPolicy,
) -> RecipeReport {
    let cost = compute_cost(root, catalog, live_components, policy);

    RecipeReport {
        item_id: root.id.clone(),
        name: root.name.clone(),
        unit: root.unit.clone(),
        cost,
        economics: project_economics(cost.total_cost, root.target_portions, root.target_sales_price),
        nutrition: compute_nutrition(root, catalog, live_components, policy),
        allergens: collect_allergens(root, catalog, live_components),
        ingredient_tags: collect_ingredient_tags(root, catalog, live_components),
        breakdown: cost_breakdown(root, catalog, live_components, policy),
    }
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2} €", v))
}

fn write_totals(f: &mut std::fmt::Formatter<'_>, label: &str, totals: &NutritionTotals) -> std::fmt::Result {
    writeln!(f, "  {}:", label)?;
    writeln!(f, "    Energy:        {:.0} kcal", totals.energy_kcal)?;
    writeln!(f, "    Fat:           {:.1} g", totals.fat)?;
    writeln!(f, "    Carbohydrates: {:.1} g", totals.carbohydrates)?;
    writeln!(f, "    Protein:       {:.1} g", totals.protein)?;
    writeln!(f, "    Salt:          {:.2} g", totals.salt)
}

impl RecipeReport {
    /// Direct components with their cost share, one per line
    pub fn format_breakdown(&self) -> String {
        let mut output = String::new();
        for line in &self.breakdown {
            let flag = if line.missing { "  (!)" } else { "" };
            output.push_str(&format!(
                "  {:<28} {:>8} {:<6} {:>10} {:>10}{}\n",
                line.name,
                line.quantity,
                line.unit,
                money(line.unit_cost),
                money(line.line_cost),
                flag
            ));
        }
        output
    }
}

impl std::fmt::Display for RecipeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== {} ({}) ===", self.name, self.item_id)?;
        writeln!(f)?;

        writeln!(f, "Cost:")?;
        writeln!(f, "  Total:          {}", money(Some(self.cost.total_cost)))?;
        writeln!(f, "  Per portion:    {}", money(self.economics.cost_per_portion))?;
        writeln!(f, "  Margin:         {}", money(self.economics.margin_per_portion))?;
        match self.economics.goods_share_percent {
            Some(share) => writeln!(f, "  Goods share:    {:.1} %", share)?,
            None => writeln!(f, "  Goods share:    -")?,
        }
        if self.cost.has_missing_prices {
            writeln!(f, "  Warning: some prices are missing or invalid")?;
        }
        writeln!(f)?;

        writeln!(f, "Nutrition:")?;
        match &self.nutrition.per_recipe {
            Some(totals) => write_totals(f, "Per recipe", totals)?,
            None => writeln!(f, "  No nutrition data")?,
        }
        if let Some(totals) = &self.nutrition.per_portion {
            write_totals(f, "Per portion", totals)?;
        }
        if self.nutrition.has_missing_data {
            writeln!(f, "  Warning: some nutrition values are missing")?;
        }
        writeln!(f)?;

        if self.allergens.is_empty() {
            writeln!(f, "Allergens: none declared")?;
        } else {
            writeln!(f, "Allergens: {}", self.allergens.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_combines_aggregations() {
        let mut cream = Item::purchased("cream", "Sahne", "L", 4.0);
        cream.allergens = vec!["Milch".to_string()];
        let catalog = Catalog::new(vec![cream, Item::purchased("pasta", "Pasta", "kg", 2.0)]);

        let mut dish = Item::recipe(
            "carbonara",
            "Carbonara",
            "Stück",
            vec![Component::new("pasta", "1", "kg"), Component::new("cream", "0,5", "L")],
        );
        dish.target_portions = Some(4.0);
        dish.target_sales_price = Some(5.0);

        let report = evaluate_recipe(&dish, &catalog, None, VisitPolicy::BranchLocal);
        assert_eq!(report.cost.total_cost, 4.0);
        assert_eq!(report.economics.cost_per_portion, Some(1.0));
        assert_eq!(report.economics.goods_share_percent, Some(20.0));
        assert_eq!(report.allergens, vec!["Milch"]);
        assert_eq!(report.ingredient_tags, vec!["Pasta", "Sahne"]);
        assert_eq!(report.breakdown.len(), 2);
        assert!(report.nutrition.has_missing_data);

        let text = report.to_string();
        assert!(text.contains("Carbonara"));
        assert!(text.contains("Allergens: Milch"));
        assert!(text.contains("No nutrition data") || text.contains("Per recipe"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cost"]["total_cost"], 4.0);
        assert_eq!(json["economics"]["margin_per_portion"], 4.0);
    }
}

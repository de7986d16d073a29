//! Recipe cost rollup

use serde::Serialize;

use crate::models::{Catalog, Component, Item, ItemKind};
use crate::traversal::{self, Issue, Resolved, Rollup, VisitPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostResult {
    pub total_cost: f64,
    pub has_missing_prices: bool,
}

/// Purchase price per unit for leaves
struct Cost;

impl Rollup for Cost {
    type Value = f64;

    fn leaf(&self, item: &Item) -> Resolved<f64> {
        let price = item.purchase_price;
        if price.is_finite() && price > 0.0 {
            Resolved::complete(price)
        } else {
            Resolved::missing()
        }
    }

    fn accumulate(&self, total: &mut f64, child: &f64, quantity: f64) {
        *total += child * quantity;
    }

    fn is_finite(&self, value: &f64) -> bool {
        value.is_finite()
    }
}

/// Total cost of `root`, using `live_components` in place of the stored list
/// when given.
///
/// A purchased item without components costs its own price. A recipe without
/// components is always reported as incomplete, even though nothing went
/// wrong while summing.
pub fn compute_cost(
    root: &Item,
    catalog: &Catalog,
    live_components: Option<&[Component]>,
    policy: VisitPolicy,
) -> CostResult {
    let components = live_components.unwrap_or(&root.components);

    if components.is_empty() && root.kind == ItemKind::Zukauf {
        let leaf = Cost.leaf(root);
        return CostResult {
            total_cost: leaf.value,
            has_missing_prices: leaf.missing,
        };
    }

    if components.is_empty() {
        traversal::note(Issue::EmptyComposite, &root.id);
        return CostResult {
            total_cost: 0.0,
            has_missing_prices: true,
        };
    }

    let resolved = traversal::resolve_root(&Cost, catalog, root, components, policy);
    CostResult {
        total_cost: resolved.value,
        has_missing_prices: resolved.missing,
    }
}

/// Resolved cost of one unit of `item`. Purchased items yield their price.
pub fn unit_cost(item: &Item, catalog: &Catalog, policy: VisitPolicy) -> Resolved<f64> {
    traversal::resolve_item(&Cost, catalog, item, policy)
}

/// One line of a recipe's direct components
#[derive(Debug, Clone, Serialize)]
pub struct BreakdownLine {
    pub name: String,
    pub quantity: String,
    pub unit: String,
    pub unit_cost: Option<f64>,
    pub line_cost: Option<f64>,
    pub missing: bool,
}

/// Cost of each direct component of `root`. Lines that cannot be priced
/// carry `None` and are flagged.
///
/// All lines are priced in one evaluation, so under either visit policy
/// their line costs add up to [`compute_cost`]'s total.
pub fn cost_breakdown(
    root: &Item,
    catalog: &Catalog,
    live_components: Option<&[Component]>,
    policy: VisitPolicy,
) -> Vec<BreakdownLine> {
    let components = live_components.unwrap_or(&root.components);
    let priced = traversal::resolve_root_lines(&Cost, catalog, root, components, policy);

    components
        .iter()
        .zip(priced.lines)
        .map(|(component, line)| {
            let child = component.item_id.as_deref().and_then(|id| catalog.get(id));
            let name = match (child, &component.deleted_item_name, &component.item_id) {
                (Some(item), _, _) => item.name.clone(),
                (None, Some(deleted), _) => format!("{} (deleted)", deleted),
                (None, None, Some(id)) => format!("{} (unknown)", id),
                (None, None, None) => "(unknown)".to_string(),
            };

            let (unit_cost, line_cost, missing) = match line {
                Some(line) if line.overflow => (Some(line.child.value), None, true),
                Some(line) => (
                    Some(line.child.value),
                    Some(line.child.value * line.quantity),
                    line.child.missing,
                ),
                None => (None, None, true),
            };

            BreakdownLine {
                name,
                quantity: component.quantity.clone(),
                unit: component.unit.clone(),
                unit_cost,
                line_cost,
                missing,
            }
        })
        .collect()
}

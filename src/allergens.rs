//! Allergen labels and ingredient tags inherited through the recipe graph
//!
//! Collection never fails: an item without allergen data simply adds nothing.
//! Every distinct reachable item counts once, so the result does not depend
//! on a visit policy.

use std::collections::HashSet;

use crate::collate;
use crate::models::{Catalog, Component, Item};
use crate::traversal;

fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut labels: Vec<String> = set.into_iter().collect();
    collate::sort(&mut labels);
    labels
}

/// Allergens declared on any component item reachable from `root`
pub fn collect_allergens(
    root: &Item,
    catalog: &Catalog,
    live_components: Option<&[Component]>,
) -> Vec<String> {
    let components = live_components.unwrap_or(&root.components);
    let mut found = HashSet::new();

    traversal::walk_reachable(catalog, root, components, |item| {
        for label in &item.allergens {
            let label = label.trim();
            if !label.is_empty() {
                found.insert(label.to_string());
            }
        }
    });

    sorted(found)
}

/// Names of every component item reachable from `root`, for tag completion
pub fn collect_ingredient_tags(
    root: &Item,
    catalog: &Catalog,
    live_components: Option<&[Component]>,
) -> Vec<String> {
    let components = live_components.unwrap_or(&root.components);
    let mut names = HashSet::new();

    traversal::walk_reachable(catalog, root, components, |item| {
        let name = item.name.trim();
        if !name.is_empty() {
            names.insert(name.to_string());
        }
    });

    sorted(names)
}

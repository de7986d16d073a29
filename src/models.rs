//! Data models for inventory items and recipe components

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Purchased good with a direct unit price
    Zukauf,
    /// Self-produced recipe, priced through its components
    Eigenproduktion,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Zukauf => "zukauf",
            ItemKind::Eigenproduktion => "eigenproduktion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "zukauf" => Some(ItemKind::Zukauf),
            "eigenproduktion" => Some(ItemKind::Eigenproduktion),
            _ => None,
        }
    }
}

/// Nutrition per one unit of the item's declared unit, as stored.
/// Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionPerUnit {
    pub energy_kcal: Option<f64>,
    pub fat: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub protein: Option<f64>,
    pub salt: Option<f64>,
}

impl NutritionPerUnit {
    pub fn is_empty(&self) -> bool {
        self.energy_kcal.is_none()
            && self.fat.is_none()
            && self.carbohydrates.is_none()
            && self.protein.is_none()
            && self.salt.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub unit: String, // Opaque label: kg, L, Stück, ...
    pub purchase_price: f64,
    pub nutrition: Option<NutritionPerUnit>,
    pub allergens: Vec<String>,
    pub target_portions: Option<f64>,
    pub target_sales_price: Option<f64>,
    pub components: Vec<Component>,
}

impl Item {
    pub fn purchased(id: &str, name: &str, unit: &str, purchase_price: f64) -> Self {
        Item {
            id: id.to_string(),
            name: name.to_string(),
            kind: ItemKind::Zukauf,
            unit: unit.to_string(),
            purchase_price,
            nutrition: None,
            allergens: Vec::new(),
            target_portions: None,
            target_sales_price: None,
            components: Vec::new(),
        }
    }

    pub fn recipe(id: &str, name: &str, unit: &str, components: Vec<Component>) -> Self {
        Item {
            kind: ItemKind::Eigenproduktion,
            purchase_price: 0.0,
            components,
            ..Item::purchased(id, name, unit, 0.0)
        }
    }
}

/// An edge in the recipe graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub item_id: Option<String>,
    /// Quantity as entered, in the child's declared unit. Decimal comma allowed.
    pub quantity: String,
    pub unit: String,
    pub deleted_item_name: Option<String>,
}

impl Component {
    pub fn new(item_id: &str, quantity: &str, unit: &str) -> Self {
        Component {
            item_id: Some(item_id.to_string()),
            quantity: quantity.to_string(),
            unit: unit.to_string(),
            deleted_item_name: None,
        }
    }

    /// A component whose item has been deleted
    pub fn ghost(deleted_item_name: &str, quantity: &str, unit: &str) -> Self {
        Component {
            item_id: None,
            quantity: quantity.to_string(),
            unit: unit.to_string(),
            deleted_item_name: Some(deleted_item_name.to_string()),
        }
    }
}

/// A component edge as persisted, keyed by its parent
#[derive(Debug, Clone)]
pub struct ComponentEdge {
    pub parent_item_id: String,
    pub component: Component,
}

/// Immutable snapshot of all items, with components grouped under their parent
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<String, Item>,
}

impl Catalog {
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Catalog {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    /// Build a catalog from items and a flat edge list. Edge order is kept per parent.
    pub fn from_snapshot(items: Vec<Item>, edges: Vec<ComponentEdge>) -> Self {
        let mut catalog = Catalog::new(items);
        for edge in edges {
            match catalog.items.get_mut(&edge.parent_item_id) {
                Some(parent) => parent.components.push(edge.component),
                None => tracing::warn!(
                    parent = %edge.parent_item_id,
                    "dropping component edge with unknown parent"
                ),
            }
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }
}

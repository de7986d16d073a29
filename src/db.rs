//! Catalog store: schema and operations

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::models::{Catalog, Component, ComponentEdge, Item, ItemKind, NutritionPerUnit};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Purchased goods and self-produced recipes
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            unit TEXT NOT NULL,
            purchase_price REAL NOT NULL DEFAULT 0,
            energy_kcal REAL,
            fat REAL,
            carbohydrates REAL,
            protein REAL,
            salt REAL,
            allergens TEXT NOT NULL DEFAULT '[]',  -- JSON array of labels
            target_portions REAL,
            target_sales_price REAL
        );

        -- Recipe edges; component_item_id is NULL once the component was deleted
        CREATE TABLE IF NOT EXISTS components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_item_id TEXT NOT NULL,
            component_item_id TEXT,
            quantity TEXT NOT NULL,
            unit TEXT NOT NULL,
            deleted_item_name TEXT,
            position INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_components_parent ON components(parent_item_id);
        CREATE INDEX IF NOT EXISTS idx_components_child ON components(component_item_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item. Its components are stored separately.
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    let allergens = serde_json::to_string(&item.allergens).map_err(|e| Error::Malformed {
        item: item.id.clone(),
        reason: e.to_string(),
    })?;
    let nutrition = item.nutrition.clone().unwrap_or_default();

    conn.execute(
        "INSERT OR REPLACE INTO items
            (id, name, kind, unit, purchase_price, energy_kcal, fat, carbohydrates, protein, salt,
             allergens, target_portions, target_sales_price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            &item.id,
            &item.name,
            item.kind.as_str(),
            &item.unit,
            item.purchase_price,
            nutrition.energy_kcal,
            nutrition.fat,
            nutrition.carbohydrates,
            nutrition.protein,
            nutrition.salt,
            allergens,
            item.target_portions,
            item.target_sales_price,
        ],
    )?;
    Ok(())
}

/// Append a component to the end of a recipe
pub fn insert_component(conn: &Connection, parent_item_id: &str, component: &Component) -> Result<()> {
    conn.execute(
        "INSERT INTO components
            (parent_item_id, component_item_id, quantity, unit, deleted_item_name, position)
         VALUES (?1, ?2, ?3, ?4, ?5,
            (SELECT COALESCE(MAX(position), -1) + 1 FROM components WHERE parent_item_id = ?1))",
        (
            parent_item_id,
            &component.item_id,
            &component.quantity,
            &component.unit,
            &component.deleted_item_name,
        ),
    )?;
    Ok(())
}

/// Write an edited component list back, replacing the stored one
pub fn replace_components(conn: &Connection, parent_item_id: &str, components: &[Component]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM components WHERE parent_item_id = ?1", [parent_item_id])?;
    for component in components {
        insert_component(&tx, parent_item_id, component)?;
    }
    tx.commit()?;
    Ok(())
}

/// Delete an item and its own components. Components in other recipes that
/// pointed at it become ghosts carrying its name.
///
/// Returns the number of ghosted components.
pub fn delete_item(conn: &Connection, id: &str) -> Result<usize> {
    let name: Option<String> = conn
        .query_row("SELECT name FROM items WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    let Some(name) = name else {
        return Err(Error::ItemNotFound(id.to_string()));
    };

    let tx = conn.unchecked_transaction()?;
    let ghosted = tx.execute(
        "UPDATE components SET component_item_id = NULL, deleted_item_name = ?2
         WHERE component_item_id = ?1",
        (id, &name),
    )?;
    tx.execute("DELETE FROM components WHERE parent_item_id = ?1", [id])?;
    tx.execute("DELETE FROM items WHERE id = ?1", [id])?;
    tx.commit()?;

    tracing::info!(item = id, ghosted, "deleted item");
    Ok(ghosted)
}

/// Point the ghost components of a recipe that carry `deleted_name` at a
/// replacement item. Returns the number of components updated.
pub fn replace_ghost(
    conn: &Connection,
    parent_item_id: &str,
    deleted_name: &str,
    replacement_id: &str,
) -> Result<usize> {
    let exists: Option<String> = conn
        .query_row("SELECT id FROM items WHERE id = ?1", [replacement_id], |row| row.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(Error::ItemNotFound(replacement_id.to_string()));
    }

    let updated = conn.execute(
        "UPDATE components SET component_item_id = ?3, deleted_item_name = NULL
         WHERE parent_item_id = ?1 AND component_item_id IS NULL AND deleted_item_name = ?2",
        (parent_item_id, deleted_name, replacement_id),
    )?;
    Ok(updated)
}

/// Clear all items and components
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM components;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

struct ItemRow {
    id: String,
    name: String,
    kind: String,
    unit: String,
    purchase_price: f64,
    nutrition: NutritionPerUnit,
    allergens: String,
    target_portions: Option<f64>,
    target_sales_price: Option<f64>,
}

const ITEM_COLUMNS: &str = "id, name, kind, unit, purchase_price, energy_kcal, fat, carbohydrates, protein, salt,
     allergens, target_portions, target_sales_price";

fn read_item_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        unit: row.get(3)?,
        purchase_price: row.get(4)?,
        nutrition: NutritionPerUnit {
            energy_kcal: row.get(5)?,
            fat: row.get(6)?,
            carbohydrates: row.get(7)?,
            protein: row.get(8)?,
            salt: row.get(9)?,
        },
        allergens: row.get(10)?,
        target_portions: row.get(11)?,
        target_sales_price: row.get(12)?,
    })
}

impl TryFrom<ItemRow> for Item {
    type Error = Error;

    fn try_from(row: ItemRow) -> Result<Item> {
        let kind = ItemKind::parse(&row.kind).ok_or_else(|| Error::Malformed {
            item: row.id.clone(),
            reason: format!("unknown kind '{}'", row.kind),
        })?;
        let allergens: Vec<String> = serde_json::from_str(&row.allergens).map_err(|e| Error::Malformed {
            item: row.id.clone(),
            reason: format!("allergens: {}", e),
        })?;

        Ok(Item {
            id: row.id,
            name: row.name,
            kind,
            unit: row.unit,
            purchase_price: row.purchase_price,
            nutrition: (!row.nutrition.is_empty()).then_some(row.nutrition),
            allergens,
            target_portions: row.target_portions,
            target_sales_price: row.target_sales_price,
            components: Vec::new(),
        })
    }
}

/// List all items ordered by name, without their components
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM items ORDER BY name", ITEM_COLUMNS))?;
    let rows = stmt.query_map([], read_item_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(Item::try_from(row?)?);
    }
    Ok(results)
}

/// Get all component edges, in recipe order
pub fn list_component_edges(conn: &Connection) -> Result<Vec<ComponentEdge>> {
    let mut stmt = conn.prepare(
        "SELECT parent_item_id, component_item_id, quantity, unit, deleted_item_name
         FROM components
         ORDER BY parent_item_id, position, id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ComponentEdge {
            parent_item_id: row.get(0)?,
            component: Component {
                item_id: row.get(1)?,
                quantity: row.get(2)?,
                unit: row.get(3)?,
                deleted_item_name: row.get(4)?,
            },
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Load a full snapshot of the catalog
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let items = list_items(conn)?;
    let edges = list_component_edges(conn)?;
    tracing::debug!(items = items.len(), edges = edges.len(), "loaded catalog");
    Ok(Catalog::from_snapshot(items, edges))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_item_round_trip_keeps_optional_fields() {
        let conn = memory_db();
        let mut item = Item::purchased("cream", "Sahne", "L", 4.2);
        item.allergens = vec!["Milch".to_string()];
        item.nutrition = Some(NutritionPerUnit {
            energy_kcal: Some(3000.0),
            fat: Some(300.0),
            ..Default::default()
        });
        upsert_item(&conn, &item).unwrap();
        upsert_item(&conn, &Item::purchased("salt", "Salz", "kg", 0.5)).unwrap();

        let items = list_items(&conn).unwrap();
        assert_eq!(items.len(), 2);
        let cream = items.iter().find(|i| i.id == "cream").unwrap();
        assert_eq!(cream.allergens, vec!["Milch"]);
        assert_eq!(cream.nutrition.as_ref().unwrap().fat, Some(300.0));
        assert_eq!(cream.nutrition.as_ref().unwrap().salt, None);
        let salt = items.iter().find(|i| i.id == "salt").unwrap();
        assert!(salt.nutrition.is_none());
    }

    #[test]
    fn test_components_keep_order() {
        let conn = memory_db();
        upsert_item(&conn, &Item::recipe("r", "R", "kg", Vec::new())).unwrap();
        for (id, qty) in [("c", "3"), ("a", "1"), ("b", "2")] {
            insert_component(&conn, "r", &Component::new(id, qty, "kg")).unwrap();
        }
        let catalog = load_catalog(&conn).unwrap();
        let ids: Vec<_> = catalog
            .get("r")
            .unwrap()
            .components
            .iter()
            .map(|c| c.item_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        replace_components(&conn, "r", &[Component::new("b", "1,5", "kg")]).unwrap();
        let catalog = load_catalog(&conn).unwrap();
        assert_eq!(catalog.get("r").unwrap().components, vec![Component::new("b", "1,5", "kg")]);
    }

    #[test]
    fn test_delete_turns_references_into_ghosts() {
        let conn = memory_db();
        upsert_item(&conn, &Item::purchased("leek", "Lauch", "kg", 2.0)).unwrap();
        upsert_item(&conn, &Item::recipe("soup", "Suppe", "L", Vec::new())).unwrap();
        insert_component(&conn, "soup", &Component::new("leek", "1", "kg")).unwrap();

        assert_eq!(delete_item(&conn, "leek").unwrap(), 1);
        let catalog = load_catalog(&conn).unwrap();
        assert!(catalog.get("leek").is_none());
        let soup = catalog.get("soup").unwrap();
        assert_eq!(soup.components, vec![Component::ghost("Lauch", "1", "kg")]);

        assert!(matches!(delete_item(&conn, "leek"), Err(Error::ItemNotFound(_))));
    }

    #[test]
    fn test_replace_ghost() {
        let conn = memory_db();
        upsert_item(&conn, &Item::recipe("soup", "Suppe", "L", Vec::new())).unwrap();
        insert_component(&conn, "soup", &Component::ghost("Lauch", "1", "kg")).unwrap();

        assert!(matches!(
            replace_ghost(&conn, "soup", "Lauch", "onion"),
            Err(Error::ItemNotFound(_))
        ));

        upsert_item(&conn, &Item::purchased("onion", "Zwiebel", "kg", 1.0)).unwrap();
        assert_eq!(replace_ghost(&conn, "soup", "Lauch", "onion").unwrap(), 1);
        let catalog = load_catalog(&conn).unwrap();
        assert_eq!(catalog.get("soup").unwrap().components, vec![Component::new("onion", "1", "kg")]);
    }

    #[test]
    fn test_malformed_kind() {
        let conn = memory_db();
        conn.execute(
            "INSERT INTO items (id, name, kind, unit) VALUES ('x', 'X', 'gift', 'kg')",
            [],
        )
        .unwrap();
        assert!(matches!(list_items(&conn), Err(Error::Malformed { .. })));
    }
}

//! Kitchen Costing
//!
//! Command-line front end for the recipe costing engine and its SQLite catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kitchen_costing::error::Error;
use kitchen_costing::{cost, db, extract, report};
use kitchen_costing::{Catalog, Component, Item, NutritionPerUnit, VisitPolicy};

#[derive(Parser)]
#[command(name = "kitchen-costing")]
#[command(about = "Recipe costing and nutrition rollup for kitchen inventory")]
#[command(version)]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "kitchen.db", env = "KITCHEN_DB")]
    database: PathBuf,

    /// How repeated items within one recipe tree are treated
    #[arg(long, value_enum, default_value_t = VisitPolicy::BranchLocal, env = "KITCHEN_VISIT_POLICY")]
    visit_policy: VisitPolicy,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load a small sample catalog
    LoadSample,

    /// Import purchased items from plain-text product sheets
    Import {
        /// Directory searched recursively for *.txt sheets
        dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },

    /// List all items in the catalog
    ListItems,

    /// Show details for a specific item
    Item {
        /// Item ID
        id: String,
    },

    /// Calculate cost, economics and nutrition for an item
    Calc {
        /// Item ID
        id: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Show the cost of each direct component
        #[arg(short, long)]
        verbose: bool,
    },

    /// List allergens inherited from all components
    Allergens {
        /// Item ID
        id: String,
    },

    /// List the names of all components, at any depth
    Tags {
        /// Item ID
        id: String,
    },

    /// Delete an item; recipes using it keep a ghost component
    Delete {
        /// Item ID
        id: String,
    },

    /// Point ghost components of a recipe at a replacement item
    ReplaceGhost {
        /// Recipe containing the ghost components
        parent: String,

        /// Name the deleted item had
        deleted_name: String,

        /// Replacement item ID
        replacement: String,
    },
}

fn find<'a>(catalog: &'a Catalog, id: &str) -> Result<&'a Item> {
    catalog
        .get(id)
        .ok_or_else(|| Error::ItemNotFound(id.to_string()).into())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kitchen_costing=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open database {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    let policy = cli.visit_policy;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }

        Commands::Import { dir, clear } => {
            if clear {
                info!("clearing existing catalog");
                db::clear_catalog(&conn)?;
            }

            let stats = extract::extract_to_database(&conn, &dir)
                .with_context(|| format!("Failed to import sheets from {}", dir.display()))?;
            println!("{}", stats);
        }

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<20} {:<30} {:<16} {:>6} {:>10}", "ID", "Name", "Kind", "Unit", "Price");
                println!("{}", "-".repeat(86));
                for item in items {
                    println!(
                        "{:<20} {:<30} {:<16} {:>6} {:>10.2}",
                        item.id,
                        item.name,
                        item.kind.as_str(),
                        item.unit,
                        item.purchase_price
                    );
                }
            }
        }

        Commands::Item { id } => {
            let catalog = db::load_catalog(&conn)?;
            let item = find(&catalog, &id)?;

            println!("Item: {}", item.name);
            println!("  ID: {}", item.id);
            println!("  Kind: {}", item.kind.as_str());
            println!("  Unit: {}", item.unit);
            println!("  Purchase price: {:.2}", item.purchase_price);

            let unit = cost::unit_cost(item, &catalog, policy);
            println!(
                "  Cost per {}: {:.2}{}",
                item.unit,
                unit.value,
                if unit.missing { " (incomplete)" } else { "" }
            );
            if !item.allergens.is_empty() {
                println!("  Allergens: {}", item.allergens.join(", "));
            }
            if let Some(portions) = item.target_portions {
                println!("  Target portions: {}", portions);
            }
            if let Some(price) = item.target_sales_price {
                println!("  Target sales price: {:.2}", price);
            }

            if !item.components.is_empty() {
                println!("  Components:");
                for c in &item.components {
                    match (&c.item_id, &c.deleted_item_name) {
                        (Some(child), _) => println!("    {} {} {}", c.quantity, c.unit, child),
                        (None, name) => println!(
                            "    {} {} {} (deleted)",
                            c.quantity,
                            c.unit,
                            name.as_deref().unwrap_or("?")
                        ),
                    }
                }
            }
        }

        Commands::Calc { id, json, verbose } => {
            let catalog = db::load_catalog(&conn)?;
            let item = find(&catalog, &id)?;
            let report = report::evaluate_recipe(item, &catalog, None, policy);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if verbose && !report.breakdown.is_empty() {
                    println!("Components:\n");
                    println!("{}", report.format_breakdown());
                }
                println!("{}", report);
            }
        }

        Commands::Allergens { id } => {
            let catalog = db::load_catalog(&conn)?;
            let item = find(&catalog, &id)?;
            for label in kitchen_costing::collect_allergens(item, &catalog, None) {
                println!("{}", label);
            }
        }

        Commands::Tags { id } => {
            let catalog = db::load_catalog(&conn)?;
            let item = find(&catalog, &id)?;
            for name in kitchen_costing::collect_ingredient_tags(item, &catalog, None) {
                println!("{}", name);
            }
        }

        Commands::Delete { id } => {
            let ghosted = db::delete_item(&conn, &id)?;
            println!("Deleted '{}' ({} recipe components now reference a deleted item)", id, ghosted);
        }

        Commands::ReplaceGhost {
            parent,
            deleted_name,
            replacement,
        } => {
            let updated = db::replace_ghost(&conn, &parent, &deleted_name, &replacement)?;
            if updated == 0 {
                println!("No ghost component '{}' in '{}'", deleted_name, parent);
            } else {
                println!("Replaced {} component(s) in '{}' with '{}'", updated, parent, replacement);
            }
        }
    }

    Ok(())
}

fn purchased(id: &str, name: &str, unit: &str, price: f64, allergens: &[&str], per_unit: [f64; 5]) -> Item {
    let [energy_kcal, fat, carbohydrates, protein, salt] = per_unit;
    let mut item = Item::purchased(id, name, unit, price);
    item.allergens = allergens.iter().map(|a| a.to_string()).collect();
    item.nutrition = Some(NutritionPerUnit {
        energy_kcal: Some(energy_kcal),
        fat: Some(fat),
        carbohydrates: Some(carbohydrates),
        protein: Some(protein),
        salt: Some(salt),
    });
    item
}

fn store_recipe(conn: &Connection, recipe: &Item, components: &[Component]) -> Result<()> {
    db::upsert_item(conn, recipe)?;
    db::replace_components(conn, &recipe.id, components)?;
    Ok(())
}

/// Load a small bakery catalog for trying the calculator
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_catalog(conn)?;

    // Nutrition per one unit of the item's own unit
    let goods = [
        purchased("mehl", "Weizenmehl Type 405", "kg", 0.89, &["Gluten"], [3480.0, 10.0, 720.0, 100.0, 0.01]),
        purchased("butter", "Butter", "kg", 8.50, &["Milch"], [7410.0, 830.0, 6.0, 7.0, 0.1]),
        purchased("zucker", "Zucker", "kg", 1.10, &[], [4000.0, 0.0, 1000.0, 0.0, 0.0]),
        purchased("eier", "Eier", "Stück", 0.35, &["Ei"], [85.0, 6.0, 0.5, 7.5, 0.2]),
        purchased("milch", "Vollmilch", "L", 1.15, &["Milch"], [640.0, 35.0, 48.0, 33.0, 1.0]),
        purchased("salz", "Salz", "kg", 0.60, &[], [0.0, 0.0, 0.0, 0.0, 1000.0]),
        purchased("sellerie", "Knollensellerie", "kg", 2.40, &["Sellerie"], [180.0, 3.0, 23.0, 15.0, 2.0]),
        purchased("senf", "Senf mittelscharf", "kg", 6.00, &["Senf"], [900.0, 45.0, 60.0, 60.0, 40.0]),
    ];
    for item in &goods {
        db::upsert_item(conn, item)?;
    }

    let dough = Item::recipe("muerbeteig", "Mürbeteig", "kg", Vec::new());
    store_recipe(
        conn,
        &dough,
        &[
            Component::new("mehl", "0,5", "kg"),
            Component::new("butter", "0,25", "kg"),
            Component::new("zucker", "0,125", "kg"),
            Component::new("eier", "1", "Stück"),
        ],
    )?;

    let bechamel = Item::recipe("bechamel", "Béchamel", "L", Vec::new());
    store_recipe(
        conn,
        &bechamel,
        &[
            Component::new("milch", "1", "L"),
            Component::new("butter", "0,05", "kg"),
            Component::new("mehl", "0,05", "kg"),
            Component::new("salz", "0,005", "kg"),
        ],
    )?;

    let mut quiche = Item::recipe("quiche", "Sellerie-Quiche", "Stück", Vec::new());
    quiche.target_portions = Some(8.0);
    quiche.target_sales_price = Some(4.50);
    store_recipe(
        conn,
        &quiche,
        &[
            Component::new("muerbeteig", "0,4", "kg"),
            Component::new("bechamel", "0,5", "L"),
            Component::new("sellerie", "0,3", "kg"),
            Component::new("eier", "4", "Stück"),
            Component::new("senf", "0,02", "kg"),
        ],
    )?;

    info!(items = goods.len() + 3, "sample catalog loaded");
    Ok(())
}

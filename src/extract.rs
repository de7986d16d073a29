//! Plain-text product sheet import
//!
//! Reads supplier product sheets (`*.txt`) and stores them as purchased
//! items. A sheet is a list of `Label: value` lines, e.g.
//!
//! ```text
//! Artikel: Schlagsahne 30%
//! Einheit: L
//! Preis: 4,29 €
//! Energie: 1202 kJ / 292 kcal
//! Fett: 30 g
//! Allergene: Milch
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use rusqlite::Connection;
use walkdir::WalkDir;

use crate::collate;
use crate::db;
use crate::error::Result;
use crate::models::{Item, NutritionPerUnit};

/// Product data read from one sheet before database insertion
#[derive(Debug, Default, PartialEq)]
pub struct ExtractedProduct {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub price: Option<f64>,
    pub nutrition: NutritionPerUnit,
    pub allergens: Vec<String>,
}

impl ExtractedProduct {
    pub fn into_item(self) -> Item {
        let mut item = Item::purchased(&self.id, &self.name, &self.unit, self.price.unwrap_or(0.0));
        item.nutrition = (!self.nutrition.is_empty()).then_some(self.nutrition);
        item.allergens = self.allergens;
        item
    }
}

const NUMBER: &str = r"(\d+(?:[.,]\d+)?)";

/// Compiled line patterns for product sheets
pub struct SheetPatterns {
    name: Regex,
    id: Regex,
    unit: Regex,
    price: Regex,
    energy: Regex,
    fat: Regex,
    carbohydrates: Regex,
    protein: Regex,
    salt: Regex,
    allergens: Regex,
}

impl SheetPatterns {
    pub fn new() -> Result<Self> {
        let field = |label: &str| Regex::new(&format!(r"(?im)^\s*(?:{})\b[^\S\n]*:?[^\S\n]*{}", label, NUMBER));

        Ok(SheetPatterns {
            name: Regex::new(r"(?im)^\s*(?:Artikel|Name|Produkt)[^\S\n]*:[^\S\n]*(.+?)[^\S\n]*$")?,
            id: Regex::new(r"(?im)^\s*(?:ID|Artikelnummer)[^\S\n]*:[^\S\n]*(\S+)[^\S\n]*$")?,
            unit: Regex::new(r"(?im)^\s*Einheit[^\S\n]*:[^\S\n]*(.+?)[^\S\n]*$")?,
            price: Regex::new(&format!(r"(?im)^\s*Preis\b[^\d\n]*{}", NUMBER))?,
            // Energy lines often carry kJ first; take the kcal figure
            energy: Regex::new(&format!(r"(?im)^\s*(?:Energie|Brennwert)\b[^\n]*?{}\s*kcal", NUMBER))?,
            fat: field("Fett")?,
            carbohydrates: field("Kohlenhydrate")?,
            protein: field("Eiweiß|Eiweiss|Protein")?,
            salt: field("Salz")?,
            allergens: Regex::new(r"(?im)^\s*Allergene[^\S\n]*:[^\S\n]*(.*?)[^\S\n]*$")?,
        })
    }

    fn number(re: &Regex, content: &str) -> Option<f64> {
        re.captures(content)
            .and_then(|cap| cap[1].replace(',', ".").parse::<f64>().ok())
    }

    fn text(re: &Regex, content: &str) -> Option<String> {
        re.captures(content)
            .map(|cap| cap[1].trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Parse the text of one sheet. Returns None if the sheet names no product,
    /// or if no id is given and none can be derived from the name.
    pub fn parse(&self, content: &str) -> Option<ExtractedProduct> {
        let name = Self::text(&self.name, content)?;
        let id = Self::text(&self.id, content).unwrap_or_else(|| slug(&name));
        if id.is_empty() {
            tracing::debug!(name = %name, "no usable id for product");
            return None;
        }

        let allergens: Vec<String> = Self::text(&self.allergens, content)
            .map(|list| {
                list.split([',', ';'])
                    .map(str::trim)
                    .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case("keine"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(ExtractedProduct {
            id,
            name,
            unit: Self::text(&self.unit, content).unwrap_or_else(|| "Stück".to_string()),
            price: Self::number(&self.price, content),
            nutrition: NutritionPerUnit {
                energy_kcal: Self::number(&self.energy, content),
                fat: Self::number(&self.fat, content),
                carbohydrates: Self::number(&self.carbohydrates, content),
                protein: Self::number(&self.protein, content),
                salt: Self::number(&self.salt, content),
            },
            allergens,
        })
    }
}

/// Identifier derived from a product name: `Schlagsahne 30%` -> `schlagsahne-30`.
/// Empty when the name holds no letters or digits.
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in collate::collation_key(name).chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Find all product sheets below a directory
pub fn find_sheet_files(dir: &Path) -> Vec<PathBuf> {
    let mut sheets: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("txt")))
        .collect();
    sheets.sort();
    sheets
}

/// Import every product sheet below `dir` into the catalog
pub fn extract_to_database(conn: &Connection, dir: &Path) -> Result<ImportStats> {
    let patterns = SheetPatterns::new()?;
    let sheets = find_sheet_files(dir);
    tracing::info!(dir = %dir.display(), sheets = sheets.len(), "importing product sheets");

    let mut stats = ImportStats::default();

    for path in &sheets {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read sheet");
                stats.errors += 1;
                continue;
            }
        };

        match patterns.parse(&content) {
            Some(product) => {
                if product.price.is_none() {
                    tracing::warn!(item = %product.id, "sheet has no price");
                }
                tracing::info!(
                    item = %product.id,
                    name = %product.name,
                    allergens = product.allergens.len(),
                    "parsed sheet"
                );
                db::upsert_item(conn, &product.into_item())?;
                stats.imported += 1;
            }
            None => {
                tracing::debug!(path = %path.display(), "no product name or id, skipping");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} products. Skipped: {}, Errors: {}",
            self.imported, self.skipped, self.errors
        )
    }
}

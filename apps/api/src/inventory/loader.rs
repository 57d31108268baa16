//! Inventory snapshot builder — loose records in, canonical products out.
//!
//! Header names are normalized (lower-cased, non-alphanumerics stripped)
//! before lookup, so `Unit Cost`, `unit_cost`, and `UNITCOST` all resolve to
//! the same canonical field. Numeric fields degrade to 0 on missing or
//! unparsable input; a bad row never aborts the rest of the batch.

use std::collections::HashMap;
use std::io::Read;

use serde_json::Value;
use tracing::warn;

use crate::inventory::Product;

/// Accepted header aliases per canonical field, in lookup priority order.
/// Keys here are already normalized.
const ID_ALIASES: &[&str] = &["ingredient", "product", "id"];
const NAME_ALIASES: &[&str] = &["ingredient", "name", "product"];
const CATEGORY_ALIASES: &[&str] = &["category"];
const SUPPLIER_ALIASES: &[&str] = &["supplier"];
const STOCK_LEVEL_ALIASES: &[&str] = &["stocklevellbs", "stocklevel"];
const ABC_CLASS_ALIASES: &[&str] = &["abcclass"];
const UNIT_COST_ALIASES: &[&str] = &["unitcost"];
const SHIPPING_ALIASES: &[&str] = &["shipping"];
const STORAGE_ALIASES: &[&str] = &["storage", "storagemonth"];
const CARRYING_COST_ALIASES: &[&str] = &["carryingcost"];
const DAYS_IN_INVENTORY_ALIASES: &[&str] = &["daysininventory"];
const MARGIN_ALIASES: &[&str] = &["margin"];
const TURNOVER_ALIASES: &[&str] = &["turnover"];

/// Lower-cases and strips everything but ASCII alphanumerics.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Builds products from a CSV stream (header row expected).
///
/// Returns an error only when the input has no readable header row; row-level
/// failures are logged and skipped.
pub fn products_from_csv<R: Read>(reader: R) -> Result<Vec<Product>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_key)
        .collect();

    let mut products = Vec::new();
    for (idx, result) in csv_reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable CSV row {}: {e}", idx + 2);
                continue;
            }
        };
        let mut row: HashMap<String, Value> = HashMap::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if !header.is_empty() {
                row.insert(header.clone(), Value::String(field.to_string()));
            }
        }
        products.push(build_product(&row, idx));
    }
    Ok(products)
}

/// Builds products from loose JSON records (objects with arbitrary keys).
/// Non-object elements are skipped with a log line.
pub fn products_from_records(records: &[Value]) -> Vec<Product> {
    let mut products = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let Some(object) = record.as_object() else {
            warn!("Skipping non-object inventory record at index {idx}");
            continue;
        };
        let row: HashMap<String, Value> = object
            .iter()
            .map(|(k, v)| (normalize_key(k), v.clone()))
            .collect();
        products.push(build_product(&row, idx));
    }
    products
}

fn build_product(row: &HashMap<String, Value>, idx: usize) -> Product {
    let id = text_field(row, ID_ALIASES).unwrap_or_else(|| format!("CSV-{idx}"));
    let name = text_field(row, NAME_ALIASES).unwrap_or_default();

    let mut product = Product {
        id,
        name,
        category: text_field(row, CATEGORY_ALIASES),
        supplier: text_field(row, SUPPLIER_ALIASES),
        stock_level: text_field(row, STOCK_LEVEL_ALIASES),
        abc_class: text_field(row, ABC_CLASS_ALIASES),
        unit_cost: numeric_field(row, UNIT_COST_ALIASES),
        shipping: numeric_field(row, SHIPPING_ALIASES),
        storage: numeric_field(row, STORAGE_ALIASES),
        carrying_cost: numeric_field(row, CARRYING_COST_ALIASES),
        days_in_inventory: numeric_field(row, DAYS_IN_INVENTORY_ALIASES),
        margin: numeric_field(row, MARGIN_ALIASES),
        turnover: numeric_field(row, TURNOVER_ALIASES),
        total_landed: 0.0,
    };
    product.recompute_total_landed();
    product
}

/// First non-empty string value among the aliases.
fn text_field(row: &HashMap<String, Value>, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        match row.get(*alias) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First parsable numeric value among the aliases; 0 when absent or malformed.
fn numeric_field(row: &HashMap<String, Value>, aliases: &[&str]) -> f64 {
    for alias in aliases {
        match row.get(*alias) {
            Some(Value::Number(n)) => return n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => {
                if let Ok(parsed) = s.trim().parse::<f64>() {
                    return parsed;
                }
            }
            _ => {}
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE_CSV: &str = "\
Product,Name,Category,Supplier,Unit Cost,Shipping,Storage/Month,Carrying Cost %,Days In Inventory,Margin %,Turnover
WDG-001,Wireless Headphones,Electronics,Acme,45.0,3.5,0.8,15,87,48.0,4.2
SMT-002,Phone Case,Accessories,Globex,8.5,1.2,0.15,12,54,46.7,6.8
";

    #[test]
    fn test_normalize_key_variants() {
        assert_eq!(normalize_key("Unit Cost"), "unitcost");
        assert_eq!(normalize_key("unit_cost"), "unitcost");
        assert_eq!(normalize_key("UNITCOST"), "unitcost");
        assert_eq!(normalize_key("Carrying Cost %"), "carryingcost");
        assert_eq!(normalize_key("Stock Level (lbs)"), "stocklevellbs");
    }

    #[test]
    fn test_csv_header_normalization_populates_unit_cost() {
        let csv = "Unit Cost,Product\n12.5,ABC-1\n";
        let products = products_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(products.len(), 1);
        assert!((products[0].unit_cost - 12.5).abs() < 1e-9);
        assert_eq!(products[0].id, "ABC-1");
    }

    #[test]
    fn test_sample_csv_full_row() {
        let products = products_from_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(products.len(), 2);
        let p = &products[0];
        assert_eq!(p.id, "WDG-001");
        assert_eq!(p.category.as_deref(), Some("Electronics"));
        assert!((p.total_landed - 56.05).abs() < 1e-9);
        assert!((p.days_in_inventory - 87.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_id_synthesized_from_index() {
        let csv = "Unit Cost\n10\n20\n";
        let products = products_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(products[0].id, "CSV-0");
        assert_eq!(products[1].id, "CSV-1");
    }

    #[test]
    fn test_malformed_numeric_degrades_to_zero() {
        let csv = "Product,Unit Cost,Shipping\nA,not-a-number,2.5\n";
        let products = products_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(products[0].unit_cost, 0.0);
        assert!((products[0].shipping - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_ragged_rows_do_not_abort_batch() {
        // Second row is short a field, third has an extra one.
        let csv = "Product,Unit Cost,Shipping\nA,10,1\nB,20\nC,30,3,junk\n";
        let products = products_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[1].shipping, 0.0);
        assert!((products[2].unit_cost - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_records_accept_numbers_and_strings() {
        let records = vec![
            json!({"id": "X-1", "name": "Widget", "unitCost": 12.5, "shipping": "1.5"}),
            json!("not an object"),
            json!({"Unit Cost": "7.25"}),
        ];
        let products = products_from_records(&records);
        assert_eq!(products.len(), 2);
        assert!((products[0].unit_cost - 12.5).abs() < 1e-9);
        assert!((products[0].shipping - 1.5).abs() < 1e-9);
        assert!((products[1].unit_cost - 7.25).abs() < 1e-9);
        // Index 2 in the original list, but ids are synthesized per record order.
        assert_eq!(products[1].id, "CSV-2");
    }

    #[test]
    fn test_ingredient_alias_maps_to_id_and_name() {
        let csv = "Ingredient,Unit Cost\nFlour,3.2\n";
        let products = products_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(products[0].id, "Flour");
        assert_eq!(products[0].name, "Flour");
    }
}

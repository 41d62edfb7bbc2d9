//! Force generator output into the fixed eight-column table.

use crate::output::{DescriptionRecord, DescriptionTable, RawDescription, COLUMNS, FILL_VALUE};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Build the table, one record per description, in input order.
///
/// Keys outside [`COLUMNS`] are dropped; missing columns get [`FILL_VALUE`].
pub fn build_table(descriptions: &[RawDescription]) -> DescriptionTable {
    debug!("Available columns: {:?}", available_columns(descriptions));

    let records = descriptions
        .iter()
        .map(|d| {
            let [
                style_number,
                product_title,
                product_description,
                tags,
                product_category,
                product_type,
                option2_value,
                keywords,
            ] = COLUMNS.map(|col| column_value(d, col));
            DescriptionRecord {
                style_number,
                product_title,
                product_description,
                tags,
                product_category,
                product_type,
                option2_value,
                keywords,
            }
        })
        .collect();

    DescriptionTable { records }
}

fn column_value(description: &RawDescription, column: &str) -> String {
    description
        .get(column)
        .map(cell_value)
        .unwrap_or_else(|| FILL_VALUE.to_string())
}

/// Every key any description returned, sorted.
pub fn available_columns(descriptions: &[RawDescription]) -> Vec<String> {
    descriptions
        .iter()
        .flat_map(|d| d.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Render one JSON value as a sheet cell.
pub fn cell_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => FILL_VALUE.to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(cell_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn is_scalar(v: &Value) -> bool {
    !matches!(v, Value::Array(_) | Value::Object(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawDescription {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn missing_fields_are_filled() {
        let table = build_table(&[raw(json!({
            "Style Number": "A-1",
            "Product Title": "Linen Shirt"
        }))]);
        let row = table.records[0].to_row();
        assert_eq!(row.len(), 8);
        assert_eq!(row[0], "A-1");
        assert_eq!(row[1], "Linen Shirt");
        assert!(row[2..].iter().all(|c| c == FILL_VALUE));
    }

    #[test]
    fn extra_keys_are_dropped() {
        let table = build_table(&[raw(json!({
            "Style Number": "A-1",
            "Price": "$40",
            "Fabric": "linen"
        }))]);
        assert_eq!(table.to_values()[1].len(), COLUMNS.len());
        assert!(!table.to_values()[1].iter().any(|c| c == "$40"));
    }

    #[test]
    fn values_are_flattened() {
        assert_eq!(cell_value(&json!(["linen", "summer"])), "linen, summer");
        assert_eq!(cell_value(&json!(null)), "N/A");
        assert_eq!(cell_value(&json!(42)), "42");
        assert_eq!(cell_value(&json!(true)), "true");
        assert_eq!(cell_value(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(cell_value(&json!([["x"]])), r#"[["x"]]"#);
        assert_eq!(cell_value(&json!([null, "y"])), "N/A, y");
    }

    #[test]
    fn order_follows_input() {
        let table = build_table(&[
            raw(json!({"Style Number": "B"})),
            raw(json!({"Style Number": "A"})),
        ]);
        let styles: Vec<_> = table.records.iter().map(|r| r.style_number.as_str()).collect();
        assert_eq!(styles, ["B", "A"]);
    }

    #[test]
    fn empty_description_is_all_placeholders() {
        let table = build_table(&[RawDescription::new()]);
        assert!(table.records[0].to_row().iter().all(|c| c == FILL_VALUE));
    }

    #[test]
    fn available_columns_is_a_sorted_union() {
        let cols = available_columns(&[
            raw(json!({"Tags": "x", "Style Number": "1"})),
            raw(json!({"Price": "2", "Tags": "y"})),
        ]);
        assert_eq!(cols, ["Price", "Style Number", "Tags"]);
    }
}

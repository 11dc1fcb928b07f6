use crate::types::{CategoryTotal, ReceiptItem, SummaryRow};
use serde_json::Value;
use std::collections::BTreeMap;

/// Text field with the documented "Unknown" fallback. Numbers are rendered
/// as text since the model occasionally returns e.g. a numeric date.
fn text_or_unknown(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Numeric field with the documented 0 fallback. Numeric strings such as
/// "1 299,50" are parsed after stripping grouping characters.
fn number_or_zero(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let cleaned = s.replace(' ', "").replace(',', ".");
            cleaned.trim().parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Build the summary row from the extraction result. Every field is optional
/// in the model output; missing ones fall back to "Unknown" / 0.
pub fn build_summary(result: &Value, paid_by: &str) -> SummaryRow {
    SummaryRow {
        company: text_or_unknown(result.get("Company")),
        date: text_or_unknown(result.get("Date")),
        discount: number_or_zero(result.get("Deduction")),
        total: text_or_unknown(result.get("Total")),
        paid_by: paid_by.to_string(),
    }
}

/// Build the items table. A missing or non-array Items field is an error;
/// missing fields inside an item fall back to defaults instead.
pub fn build_items(result: &Value) -> Result<Vec<ReceiptItem>, String> {
    let items = result
        .get("Items")
        .and_then(|v| v.as_array())
        .ok_or("No items in extraction result.")?;
    let rows = items
        .iter()
        .map(|item| ReceiptItem {
            description: text_or_unknown(item.get("Description")),
            quantity: number_or_zero(item.get("Quantity")),
            unit_price: number_or_zero(item.get("Unit Price")),
            total: number_or_zero(item.get("Total")),
            discounted_total: number_or_zero(item.get("Discounted Total")),
            product_type: text_or_unknown(item.get("ProductType")),
        })
        .collect();
    Ok(rows)
}

/// Group items by product type. Sums "Total" when the receipt has no
/// deduction, otherwise "Discounted Total". Output is sorted by category
/// name so tables and charts render deterministically.
pub fn aggregate_categories(items: &[ReceiptItem], discount: f64) -> Result<Vec<CategoryTotal>, String> {
    if items.is_empty() {
        return Err("No line items to aggregate.".to_string());
    }
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for item in items {
        let amount = if discount == 0.0 {
            item.total
        } else {
            item.discounted_total
        };
        *sums.entry(item.product_type.clone()).or_insert(0.0) += amount;
    }
    Ok(sums
        .into_iter()
        .map(|(product_type, total)| CategoryTotal { product_type, total })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(product_type: &str, total: f64, discounted_total: f64) -> ReceiptItem {
        ReceiptItem {
            description: "x".to_string(),
            quantity: 1.0,
            unit_price: total,
            total,
            discounted_total,
            product_type: product_type.to_string(),
        }
    }

    #[test]
    fn summary_defaults_missing_fields() {
        let result = json!({});
        let summary = build_summary(&result, "Zita");
        assert_eq!(summary.company, "Unknown");
        assert_eq!(summary.date, "Unknown");
        assert_eq!(summary.discount, 0.0);
        assert_eq!(summary.total, "Unknown");
        assert_eq!(summary.paid_by, "Zita");
    }

    #[test]
    fn summary_keeps_extracted_values() {
        let result = json!({
            "Company": "Aldi",
            "Date": "2024-11-03",
            "Deduction": 250,
            "Total": 4890,
        });
        let summary = build_summary(&result, "Mátyás");
        assert_eq!(summary.company, "Aldi");
        assert_eq!(summary.date, "2024-11-03");
        assert_eq!(summary.discount, 250.0);
        assert_eq!(summary.total, "4890");
    }

    #[test]
    fn items_default_missing_fields() {
        let result = json!({"Items": [{"Description": "Bread"}]});
        let items = build_items(&result).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Bread");
        assert_eq!(items[0].quantity, 0.0);
        assert_eq!(items[0].total, 0.0);
        assert_eq!(items[0].product_type, "Unknown");
    }

    #[test]
    fn items_parse_numeric_strings() {
        let result = json!({"Items": [{"Description": "Wine", "Total": "1 299,50", "Quantity": "2"}]});
        let items = build_items(&result).unwrap();
        assert_eq!(items[0].total, 1299.50);
        assert_eq!(items[0].quantity, 2.0);
    }

    #[test]
    fn missing_items_is_an_error() {
        assert!(build_items(&json!({})).is_err());
        assert!(build_items(&json!({"Items": "not a list"})).is_err());
    }

    #[test]
    fn aggregation_sums_total_without_deduction() {
        let items = vec![
            item("food", 100.0, 80.0),
            item("food", 50.0, 40.0),
            item("petrol", 200.0, 200.0),
        ];
        let grouped = aggregate_categories(&items, 0.0).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].product_type, "food");
        assert_eq!(grouped[0].total, 150.0);
        assert_eq!(grouped[1].product_type, "petrol");
        assert_eq!(grouped[1].total, 200.0);
    }

    #[test]
    fn aggregation_sums_discounted_total_with_deduction() {
        let items = vec![item("food", 100.0, 80.0), item("food", 50.0, 40.0)];
        let grouped = aggregate_categories(&items, 30.0).unwrap();
        assert_eq!(grouped[0].total, 120.0);
    }

    #[test]
    fn aggregation_fails_on_empty_items() {
        assert!(aggregate_categories(&[], 0.0).is_err());
    }
}

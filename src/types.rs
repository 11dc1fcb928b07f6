use serde::{Deserialize, Serialize};

/// One extracted line item. Missing fields are already defaulted by the
/// result shaper ("Unknown" for text, 0 for numbers).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
    pub discounted_total: f64,
    pub product_type: String,
}

/// Summary row for one processed receipt. Ephemeral: lives only for the
/// current upload, never persisted except as an exported file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub company: String,
    pub date: String,
    pub discount: f64,
    /// Kept as text: the model sometimes returns a formatted amount.
    pub total: String,
    pub paid_by: String,
}

/// Per-category sum of item totals, used for the breakdown table and bar chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub product_type: String,
    pub total: f64,
}

/// Everything the page renders after a successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptReport {
    pub summary: SummaryRow,
    pub items: Vec<ReceiptItem>,
    pub categories: Vec<CategoryTotal>,
    /// Set when category aggregation failed; the rest of the report is still usable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_warning: Option<String>,
}

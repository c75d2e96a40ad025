use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// A single detail tuple belonging to exactly one master, keyed by
/// `(master_id, detail_id)`. `transaction_data` is the embedded JSONB
/// document; every nested object in it is optional (see [`TransactionDocument`]).
#[derive(Debug, Clone)]
pub struct DetailRow {
    pub master_id: i64,
    pub detail_id: i64,
    pub account_number: Option<String>,
    pub customer_name: Option<String>,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub transaction_data: Option<Value>,
}

/// The shape of `transaction_data` when present. Every nested object and the
/// `items` array are optional; unknown extra fields are ignored
/// (forward-compatible). This is strictly tree-shaped — there is no
/// provision for, and no attempt to handle, cyclic references.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDocument {
    pub transaction_id: Option<String>,
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub merchant: Option<Merchant>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub items: Option<Vec<Item>>,
    pub risk_score: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    pub customer_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Merchant {
    pub merchant_id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub last_four: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    pub item_id: Option<String>,
}

/// The output record: scalar detail columns plus the fixed set of
/// JSON-derived fields the output contract commits to. All JSON-derived
/// fields are empty when `transaction_data` was absent or failed to parse.
#[derive(Debug, Clone, Default)]
pub struct FlatProjection {
    pub detail_id: i64,
    pub account_number: String,
    pub customer_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub transaction_date: String,

    pub transaction_id: String,
    pub transaction_type: String,
    pub risk_score: Option<f64>,
    pub status: String,

    pub customer_id: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_city: String,
    pub customer_state: String,
    pub customer_country: String,

    pub merchant_id: String,
    pub merchant_name: String,
    pub merchant_category: String,

    pub payment_type: String,
    pub payment_last_four: String,
    pub payment_brand: String,

    pub item_count: usize,
}

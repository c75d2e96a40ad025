use drain_schemas::{DetailRow, FlatProjection, TransactionDocument};
use tracing::warn;

/// Flattens a detail row and its optional embedded JSON document into a
/// [`FlatProjection`]. A parse failure on the document never fails the row:
/// JSON-derived fields are left empty and a warning is logged instead.
pub fn project(row: &DetailRow) -> FlatProjection {
    let mut out = FlatProjection {
        detail_id: row.detail_id,
        account_number: row.account_number.clone().unwrap_or_default(),
        customer_name: row.customer_name.clone().unwrap_or_default(),
        amount: row.amount,
        currency: row.currency.clone().unwrap_or_default(),
        description: row.description.clone().unwrap_or_default(),
        transaction_date: row
            .transaction_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_default(),
        ..Default::default()
    };

    let Some(document) = &row.transaction_data else {
        return out;
    };

    let parsed: TransactionDocument = match serde_json::from_value(document.clone()) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(
                master_id = row.master_id,
                detail_id = row.detail_id,
                error = %err,
                "embedded transaction_data failed to parse; JSON-derived fields left empty"
            );
            return out;
        }
    };

    out.transaction_id = parsed.transaction_id.unwrap_or_default();
    out.transaction_type = parsed.transaction_type.unwrap_or_default();
    out.risk_score = parsed.risk_score;
    out.status = parsed.status.unwrap_or_default();

    if let Some(customer) = &parsed.customer {
        out.customer_id = customer.customer_id.clone().unwrap_or_default();
        out.customer_email = customer.email.clone().unwrap_or_default();
        out.customer_phone = customer.phone.clone().unwrap_or_default();
        if let Some(address) = &customer.address {
            out.customer_city = address.city.clone().unwrap_or_default();
            out.customer_state = address.state.clone().unwrap_or_default();
            out.customer_country = address.country.clone().unwrap_or_default();
        }
    }

    if let Some(merchant) = &parsed.merchant {
        out.merchant_id = merchant.merchant_id.clone().unwrap_or_default();
        out.merchant_name = merchant.name.clone().unwrap_or_default();
        out.merchant_category = merchant.category.clone().unwrap_or_default();
    }

    if let Some(payment) = &parsed.payment_method {
        out.payment_type = payment.kind.clone().unwrap_or_default();
        out.payment_last_four = payment.last_four.clone().unwrap_or_default();
        out.payment_brand = payment.brand.clone().unwrap_or_default();
    }

    out.item_count = parsed.items.as_ref().map(|items| items.len()).unwrap_or(0);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn base_row() -> DetailRow {
        DetailRow {
            master_id: 1,
            detail_id: 1,
            account_number: Some("ACC1".to_string()),
            customer_name: Some("Alice".to_string()),
            amount: Decimal::new(1000, 2),
            currency: Some("USD".to_string()),
            description: Some("desc".to_string()),
            transaction_date: Some(Utc::now()),
            created_at: Some(Utc::now()),
            transaction_data: None,
        }
    }

    #[test]
    fn absent_document_yields_empty_json_fields() {
        let proj = project(&base_row());
        assert_eq!(proj.transaction_id, "");
        assert_eq!(proj.customer_id, "");
        assert_eq!(proj.item_count, 0);
        assert_eq!(proj.account_number, "ACC1");
    }

    #[test]
    fn full_document_flattens_every_field() {
        let mut row = base_row();
        row.transaction_data = Some(json!({
            "transaction_id": "T1",
            "transaction_type": "PURCHASE",
            "risk_score": 42.5,
            "status": "COMPLETED",
            "customer": {
                "customer_id": "C1",
                "email": "a@b",
                "phone": "555",
                "address": { "city": "NYC", "state": "NY", "country": "US" }
            },
            "merchant": { "merchant_id": "M1", "name": "M", "category": "retail" },
            "payment_method": { "type": "CREDIT_CARD", "last_four": "4242", "brand": "visa" },
            "items": [{}, {}]
        }));

        let proj = project(&row);
        assert_eq!(proj.transaction_id, "T1");
        assert_eq!(proj.customer_id, "C1");
        assert_eq!(proj.customer_email, "a@b");
        assert_eq!(proj.customer_city, "NYC");
        assert_eq!(proj.merchant_name, "M");
        assert_eq!(proj.payment_type, "CREDIT_CARD");
        assert_eq!(proj.item_count, 2);
        assert_eq!(proj.risk_score, Some(42.5));
    }

    #[test]
    fn malformed_document_does_not_panic_and_leaves_fields_empty() {
        let mut row = base_row();
        // risk_score as a string where a number is expected
        row.transaction_data = Some(json!({ "risk_score": "not-a-number" }));

        let proj = project(&row);
        assert_eq!(proj.transaction_id, "");
        assert_eq!(proj.risk_score, None);
    }

    #[test]
    fn missing_nested_objects_leave_only_their_fields_empty() {
        let mut row = base_row();
        row.transaction_data = Some(json!({ "transaction_id": "T2" }));

        let proj = project(&row);
        assert_eq!(proj.transaction_id, "T2");
        assert_eq!(proj.customer_id, "");
        assert_eq!(proj.merchant_id, "");
        assert_eq!(proj.item_count, 0);
    }
}

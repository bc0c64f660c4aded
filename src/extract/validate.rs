//! Structural validation of extracted agent responses.
//!
//! Validation only answers yes/no. Nothing is coerced or repaired; callers
//! swap in fallback data when a response does not validate.

use serde_json::{Map, Value};

use super::Shape;

/// Fields every expense line item must carry.
pub const EXPENSE_FIELDS: &[&str] = &[
    "category",
    "business_name",
    "city",
    "price",
    "contact",
    "details",
];

/// Fields every alternative supplier candidate must carry.
pub const ALTERNATIVE_FIELDS: &[&str] = &[
    "business_name",
    "city",
    "estimated_price",
    "contact_email",
];

/// Fields an email draft must carry, all strings.
pub const EMAIL_FIELDS: &[&str] = &["subject", "body", "to_email"];

/// Validate `value` against the record kind named by `shape`.
pub fn is_valid(value: &Value, shape: Shape) -> bool {
    match shape {
        Shape::Receipt => is_valid_receipt(value),
        Shape::Alternatives => is_valid_alternatives(value),
        Shape::EmailDraft => is_valid_email_draft(value),
    }
}

/// `{"expenses": [{..EXPENSE_FIELDS..}], "total_amount": <number>}`
pub fn is_valid_receipt(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    let expenses_ok = obj
        .get("expenses")
        .and_then(Value::as_array)
        .map(|items| items.iter().all(|e| has_fields(e, EXPENSE_FIELDS)))
        .unwrap_or(false);

    let total_ok = obj.get("total_amount").is_some_and(Value::is_number);

    expenses_ok && total_ok
}

/// `{"alternatives": [{..ALTERNATIVE_FIELDS..}]}` with numeric prices.
pub fn is_valid_alternatives(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("alternatives"))
        .and_then(Value::as_array)
        .map(|items| {
            items.iter().all(|candidate| {
                has_fields(candidate, ALTERNATIVE_FIELDS)
                    && candidate
                        .get("estimated_price")
                        .is_some_and(Value::is_number)
            })
        })
        .unwrap_or(false)
}

/// `{"subject": str, "body": str, "to_email": str}`
pub fn is_valid_email_draft(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| {
            EMAIL_FIELDS
                .iter()
                .all(|field| obj.get(*field).is_some_and(Value::is_string))
        })
        .unwrap_or(false)
}

fn has_fields(value: &Value, fields: &[&str]) -> bool {
    value
        .as_object()
        .map(|obj: &Map<String, Value>| fields.iter().all(|f| obj.contains_key(*f)))
        .unwrap_or(false)
}

//! Receipt line items.

use serde::{Deserialize, Serialize};

/// A single vendor charge pulled from a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Usually "material", "printing" or "shipping", but free-form
    pub category: String,

    pub business_name: String,

    pub city: String,

    /// Unit price paid, never negative
    pub price: f64,

    /// Vendor contact (usually an email address)
    pub contact: String,

    pub details: String,
}

/// Vendor header block printed on some receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VendorDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// Structured receipt returned by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParsedReceipt {
    /// Line items in receipt order
    pub expenses: Vec<ExpenseRecord>,

    pub total_amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_details: Option<VendorDetails>,
}

impl ParsedReceipt {
    /// Clamp negative prices and round all amounts to cents.
    pub fn normalized(mut self) -> Self {
        for expense in &mut self.expenses {
            expense.price = crate::extract::normalize::round_currency(expense.price.max(0.0));
        }
        self.total_amount = crate::extract::normalize::round_currency(self.total_amount.max(0.0));
        self
    }
}

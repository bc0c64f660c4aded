//! Supplier candidates and the request payloads that reference them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An alternative supplier found by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSupplier {
    pub business_name: String,

    pub city: String,

    /// Quoted unit price, never negative after normalization
    pub estimated_price: f64,

    pub contact_email: String,

    /// Derived from the caller's current price
    #[serde(default)]
    pub potential_savings: f64,

    /// Free-form, e.g. "2 miles"
    #[serde(default)]
    pub distance_from_original: String,
}

/// Search response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlternativesResponse {
    pub alternatives: Vec<AlternativeSupplier>,
}

/// Who an email is addressed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierInfo {
    pub business_name: String,

    #[serde(default)]
    pub contact_email: String,
}

/// Competitive pricing context for a negotiation email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub average_market_price: f64,

    pub lowest_competitor_price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_competitor_price: Option<f64>,

    /// Any extra research fields the client sent along
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarketData {
    /// Summarize a set of alternatives the way the dashboard does.
    pub fn from_alternatives(alternatives: &[AlternativeSupplier]) -> Option<Self> {
        if alternatives.is_empty() {
            return None;
        }

        let prices: Vec<f64> = alternatives.iter().map(|a| a.estimated_price).collect();
        let average = prices.iter().sum::<f64>() / prices.len() as f64;
        let lowest = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let highest = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            average_market_price: crate::extract::normalize::round_currency(average),
            lowest_competitor_price: lowest,
            highest_competitor_price: Some(highest),
            extra: Map::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt(price: f64) -> AlternativeSupplier {
        AlternativeSupplier {
            business_name: "Alt".to_string(),
            city: "Oakland".to_string(),
            estimated_price: price,
            contact_email: "alt@example.com".to_string(),
            potential_savings: 0.0,
            distance_from_original: String::new(),
        }
    }

    #[test]
    fn test_alternative_defaults_when_missing() {
        let parsed: AlternativeSupplier = serde_json::from_str(
            r#"{"business_name": "X", "city": "Y", "estimated_price": 4.0, "contact_email": "x@y.com"}"#,
        )
        .unwrap();
        assert_eq!(parsed.potential_savings, 0.0);
        assert_eq!(parsed.distance_from_original, "");
    }

    #[test]
    fn test_market_data_from_alternatives() {
        let data = MarketData::from_alternatives(&[alt(20.0), alt(18.0), alt(28.0)]).unwrap();
        assert_eq!(data.average_market_price, 22.0);
        assert_eq!(data.lowest_competitor_price, 18.0);
        assert_eq!(data.highest_competitor_price, Some(28.0));
        assert!(MarketData::from_alternatives(&[]).is_none());
    }

    #[test]
    fn test_market_data_keeps_extra_fields() {
        let data: MarketData = serde_json::from_str(
            r#"{"average_market_price": 20, "lowest_competitor_price": 18, "region": "bay area"}"#,
        )
        .unwrap();
        assert_eq!(data.extra.get("region").unwrap(), "bay area");

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["region"], "bay area");
        assert!(json.get("highest_competitor_price").is_none());
    }

    #[test]
    fn test_supplier_info_email_optional() {
        let info: SupplierInfo =
            serde_json::from_str(r#"{"business_name": "Example Hoodies Inc"}"#).unwrap();
        assert!(info.contact_email.is_empty());
    }
}

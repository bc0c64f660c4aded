//! Demo dataset.
//!
//! One table holds the demo receipt and the per-category supplier
//! alternatives. It is embedded at build time and can be replaced at runtime
//! with a JSON file of the same layout. Demo mode serves it directly; live
//! mode uses the receipt as the fallback when model output fails validation.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AlternativeSupplier, ParsedReceipt};

const EMBEDDED_FIXTURES: &str = include_str!("../fixtures/demo.json");

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse fixtures: {0}")]
    Json(#[from] serde_json::Error),
}

/// Demo receipt plus alternatives keyed by lower-case category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoFixtures {
    pub receipt: ParsedReceipt,

    #[serde(default)]
    pub alternatives: HashMap<String, Vec<AlternativeSupplier>>,
}

impl DemoFixtures {
    /// The table compiled into the binary.
    pub fn embedded() -> Result<Self, FixtureError> {
        Self::from_json(EMBEDDED_FIXTURES)
    }

    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let mut fixtures: DemoFixtures = serde_json::from_str(json)?;
        fixtures.alternatives = fixtures
            .alternatives
            .into_iter()
            .map(|(category, list)| (category.to_lowercase(), list))
            .collect();
        Ok(fixtures)
    }

    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Use the override file when given, the embedded table otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, FixtureError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::embedded(),
        }
    }

    /// Alternatives for `category` (case-insensitive), empty when unknown.
    pub fn alternatives_for(&self, category: &str) -> Vec<AlternativeSupplier> {
        self.alternatives
            .get(&category.trim().to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_fixtures_load() {
        let fixtures = DemoFixtures::embedded().unwrap();
        assert_eq!(fixtures.receipt.expenses.len(), 3);
        assert_eq!(fixtures.receipt.total_amount, 39.25);
        let mut categories: Vec<&str> = fixtures.alternatives.keys().map(String::as_str).collect();
        categories.sort();
        assert_eq!(categories, vec!["material", "printing", "shipping"]);
    }

    #[test]
    fn test_embedded_receipt_validates() {
        let fixtures = DemoFixtures::embedded().unwrap();
        let value = serde_json::to_value(&fixtures.receipt).unwrap();
        assert!(crate::extract::validate::is_valid_receipt(&value));
    }

    #[test]
    fn test_alternatives_lookup_case_insensitive() {
        let fixtures = DemoFixtures::embedded().unwrap();
        let material = fixtures.alternatives_for("Material");
        assert_eq!(material.len(), 3);
        assert_eq!(material[0].business_name, "EcoHoodies Manufacturing");
        assert!(fixtures.alternatives_for("catering").is_empty());
    }

    #[test]
    fn test_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "receipt": {{"expenses": [], "total_amount": 0}},
                "alternatives": {{"Packaging": [{{
                    "business_name": "BoxCo", "city": "Fremont",
                    "estimated_price": 1.2, "contact_email": "hi@boxco.com"
                }}]}}
            }}"#
        )
        .unwrap();

        let fixtures = DemoFixtures::load(Some(file.path())).unwrap();
        assert!(fixtures.receipt.expenses.is_empty());
        assert_eq!(fixtures.alternatives_for("packaging")[0].business_name, "BoxCo");
    }

    #[test]
    fn test_bad_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            DemoFixtures::from_file(file.path()),
            Err(FixtureError::Json(_))
        ));
    }
}

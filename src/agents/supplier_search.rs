//! Supplier Search Agent.
//!
//! Finds cheaper suppliers for an expense category near a city.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::backend::{AiBackend, ChatMessage, ChatRequest};
use super::{complete, Agent, AgentMode, AgentOutput, Provenance};
use crate::extract::normalize::{normalize_alternatives, rescale_by_ratio};
use crate::extract::{self, validate, Shape};
use crate::fixtures::DemoFixtures;
use crate::models::{AlternativeSupplier, AlternativesResponse};

/// Input for the Supplier Search agent.
#[derive(Debug, Clone)]
pub struct SupplierSearchInput {
    pub category: String,
    pub city: String,
    /// What the business pays today, per unit
    pub current_price: f64,
}

/// Settings shared by every search.
#[derive(Debug, Clone)]
pub struct SupplierSearchSettings {
    pub mode: AgentMode,
    pub timeout: Duration,
    /// Upper bound on returned candidates
    pub max_alternatives: usize,
    /// Tool servers offered to the model for web lookups
    pub web_search_tools: Vec<String>,
}

/// Supplier Search agent implementation.
pub struct SupplierSearchAgent {
    backend: Arc<dyn AiBackend>,
    fixtures: Arc<DemoFixtures>,
    settings: SupplierSearchSettings,
}

impl SupplierSearchAgent {
    pub fn new(
        backend: Arc<dyn AiBackend>,
        fixtures: Arc<DemoFixtures>,
        settings: SupplierSearchSettings,
    ) -> Self {
        Self {
            backend,
            fixtures,
            settings,
        }
    }

    fn build_prompt(&self, input: &SupplierSearchInput) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SUPPLIER_SEARCH_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Category: {}\nCity: {}\nCurrent price per unit: ${:.2}\nReturn at most {} suppliers.",
                input.category, input.city, input.current_price, self.settings.max_alternatives
            )),
        ]
    }

    fn parse_response(&self, response: &str) -> Option<Vec<AlternativeSupplier>> {
        let value = extract::extract_or_default(response, Shape::Alternatives);
        if !validate::is_valid_alternatives(&value) {
            warn!("Supplier search response failed schema validation");
            return None;
        }

        match serde_json::from_value::<AlternativesResponse>(value) {
            Ok(parsed) => Some(parsed.alternatives),
            Err(e) => {
                warn!("Supplier search response has wrong field types: {}", e);
                None
            }
        }
    }

    fn search_fixtures(&self, input: &SupplierSearchInput) -> AgentOutput<AlternativesResponse> {
        let candidates = self.fixtures.alternatives_for(&input.category);
        if candidates.is_empty() {
            debug!("No fixture alternatives for category {}", input.category);
        }
        let alternatives = rescale_by_ratio(
            candidates,
            input.current_price,
            self.settings.max_alternatives,
        );
        AgentOutput::new(AlternativesResponse { alternatives }, Provenance::Fixture)
    }
}

const SUPPLIER_SEARCH_SYSTEM_PROMPT: &str = r#"You are a procurement researcher finding alternative suppliers for a small business.

Search the web for real businesses near the given city that supply the given category
(material = blank apparel and fabric, printing = garment printing, shipping = local delivery and logistics).

For each supplier, extract:
- business_name: the business's name
- city: city where it operates
- estimated_price: estimated per-unit price as a number (no currency symbol)
- contact_email: a public sales or contact email
- distance_from_original: rough distance from the given city, e.g. "8 miles"

Prefer suppliers that are cheaper than the current price.

Return JSON in this exact format:
{
  "alternatives": [
    {
      "business_name": "Bay Area Apparel Co.",
      "city": "Oakland",
      "estimated_price": 21.50,
      "contact_email": "wholesale@bayapparel.com",
      "distance_from_original": "8 miles"
    }
  ]
}

If no suppliers are found, return: {"alternatives": []}

IMPORTANT:
- Do NOT invent businesses or email addresses
- Return only the JSON object"#;

#[async_trait]
impl Agent for SupplierSearchAgent {
    type Input = SupplierSearchInput;
    type Output = AlternativesResponse;

    fn name(&self) -> &'static str {
        "supplier_search"
    }

    async fn execute(&self, input: Self::Input) -> AgentOutput<Self::Output> {
        info!(
            "Searching {} suppliers near {} (current ${:.2}, {} mode)",
            input.category, input.city, input.current_price, self.settings.mode
        );

        if self.settings.mode == AgentMode::Demo {
            return self.search_fixtures(&input);
        }

        let request = ChatRequest::new(self.build_prompt(&input))
            .with_json_mode()
            .with_tools(self.settings.web_search_tools.clone());

        let response = match complete(self.backend.as_ref(), request, self.settings.timeout).await {
            Ok(text) => text,
            Err(e) => {
                return AgentOutput::new(AlternativesResponse::default(), Provenance::Fallback)
                    .with_note(e.to_string())
            }
        };
        debug!("AI response: {}", response);

        match self.parse_response(&response) {
            Some(candidates) => {
                let alternatives = normalize_alternatives(
                    candidates,
                    input.current_price,
                    self.settings.max_alternatives,
                );
                info!("Supplier Search found {} alternatives", alternatives.len());
                AgentOutput::new(AlternativesResponse { alternatives }, Provenance::Model)
            }
            None => AgentOutput::new(AlternativesResponse::default(), Provenance::Fallback)
                .with_note("model response did not match the alternatives schema"),
        }
    }
}

//! Receipt Parser Agent.
//!
//! Turns receipt text into vendor line items grouped by expense category.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::backend::{AiBackend, ChatMessage, ChatRequest};
use super::{complete, Agent, AgentMode, AgentOutput, Provenance};
use crate::extract::{self, validate};
use crate::fixtures::DemoFixtures;
use crate::models::ParsedReceipt;

/// Input for the Receipt Parser agent.
#[derive(Debug, Clone)]
pub struct ReceiptParserInput {
    /// Text extracted from the uploaded receipt
    pub text: String,

    /// Original file name, for logging
    pub file_name: Option<String>,
}

/// Receipt Parser agent implementation.
pub struct ReceiptParserAgent {
    backend: Arc<dyn AiBackend>,
    fixtures: Arc<DemoFixtures>,
    mode: AgentMode,
    timeout: Duration,
}

impl ReceiptParserAgent {
    pub fn new(
        backend: Arc<dyn AiBackend>,
        fixtures: Arc<DemoFixtures>,
        mode: AgentMode,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            fixtures,
            mode,
            timeout,
        }
    }

    fn build_prompt(&self, text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(RECEIPT_PARSER_SYSTEM_PROMPT),
            ChatMessage::user(format!("Receipt text:\n\n{}", text)),
        ]
    }

    /// Extract, validate and deserialize a model response.
    ///
    /// Returns `None` when the response has no JSON object or does not match
    /// the receipt schema.
    fn parse_response(&self, response: &str) -> Option<ParsedReceipt> {
        let Some(value) = extract::extract_json(response) else {
            warn!(
                "Receipt parser found no JSON. Response start: {}",
                response.chars().take(200).collect::<String>()
            );
            return None;
        };

        if !validate::is_valid_receipt(&value) {
            warn!("Receipt parser response failed schema validation");
            return None;
        }

        match serde_json::from_value::<ParsedReceipt>(value) {
            Ok(receipt) => Some(receipt.normalized()),
            Err(e) => {
                warn!("Receipt parser response has wrong field types: {}", e);
                None
            }
        }
    }

    fn fallback(&self, reason: impl Into<String>) -> AgentOutput<ParsedReceipt> {
        AgentOutput::new(self.fixtures.receipt.clone(), Provenance::Fallback).with_note(reason)
    }
}

const RECEIPT_PARSER_SYSTEM_PROMPT: &str = r#"You are reading a business receipt and extracting the vendors and what was paid to each.

For every vendor on the receipt, produce one expense with:
- category: one of "material", "printing", "shipping" (or a short lower-case label if none fit)
- business_name: vendor name as printed
- city: vendor city
- price: unit price paid as a number (no currency symbol)
- contact: vendor email, or phone if no email is printed
- details: short description of what was bought

Also extract:
- total_amount: grand total as a number
- receipt_date: YYYY-MM-DD if printed, otherwise null

Return JSON in this exact format:
{
  "expenses": [
    {
      "category": "material",
      "business_name": "Premium Hoodies Co.",
      "city": "San Francisco",
      "price": 25.00,
      "contact": "sales@premiumhoodies.com",
      "details": "100 blank hoodies"
    }
  ],
  "total_amount": 2500.00,
  "receipt_date": null
}

IMPORTANT:
- Do NOT invent vendors, prices or contacts
- Use the per-item price, not the line total, for "price"
- Return only the JSON object"#;

#[async_trait]
impl Agent for ReceiptParserAgent {
    type Input = ReceiptParserInput;
    type Output = ParsedReceipt;

    fn name(&self) -> &'static str {
        "receipt_parser"
    }

    async fn execute(&self, input: Self::Input) -> AgentOutput<Self::Output> {
        let label = input.file_name.as_deref().unwrap_or("<inline>");
        info!("Running Receipt Parser on {} ({} mode)", label, self.mode);

        if self.mode == AgentMode::Demo {
            return AgentOutput::new(self.fixtures.receipt.clone(), Provenance::Fixture);
        }

        if input.text.trim().is_empty() {
            warn!("No text could be read from {}", label);
            return self.fallback("receipt text was empty");
        }

        let request = ChatRequest::new(self.build_prompt(&input.text)).with_json_mode();
        let response = match complete(self.backend.as_ref(), request, self.timeout).await {
            Ok(text) => text,
            Err(e) => return self.fallback(e.to_string()),
        };
        debug!("AI response: {}", response);

        match self.parse_response(&response) {
            Some(receipt) => {
                info!("Receipt Parser found {} expenses", receipt.expenses.len());
                AgentOutput::new(receipt, Provenance::Model)
            }
            None => self.fallback("model response did not match the receipt schema"),
        }
    }
}

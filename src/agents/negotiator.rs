//! Negotiation Agent.
//!
//! Drafts outreach emails: an inquiry to a prospective supplier, or a
//! price-adjustment request to the current supplier backed by market data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::backend::{AiBackend, ChatMessage, ChatRequest};
use super::{complete, Agent, AgentMode, AgentOutput, Provenance};
use crate::extract::{self, validate, Shape};
use crate::models::{EmailDraft, MarketData, SupplierInfo};

/// Which email to write.
#[derive(Debug, Clone)]
pub enum EmailKind {
    /// Inquiry to a supplier we do not use yet
    NewSupplier,
    /// Price-adjustment request to our current supplier
    Negotiation { market_data: MarketData },
}

/// Input for the Negotiation agent.
#[derive(Debug, Clone)]
pub struct NegotiationInput {
    pub supplier: SupplierInfo,
    pub category: String,
    pub current_price: f64,
    pub kind: EmailKind,
}

/// Negotiation agent implementation.
pub struct NegotiationAgent {
    backend: Arc<dyn AiBackend>,
    mode: AgentMode,
    timeout: Duration,
}

impl NegotiationAgent {
    pub fn new(backend: Arc<dyn AiBackend>, mode: AgentMode, timeout: Duration) -> Self {
        Self {
            backend,
            mode,
            timeout,
        }
    }

    /// Draft an inquiry email to a prospective supplier.
    pub async fn draft_new_supplier_email(
        &self,
        supplier: SupplierInfo,
        category: &str,
        current_price: f64,
    ) -> AgentOutput<EmailDraft> {
        self.execute(NegotiationInput {
            supplier,
            category: category.to_string(),
            current_price,
            kind: EmailKind::NewSupplier,
        })
        .await
    }

    /// Draft a negotiation email to the current supplier.
    pub async fn draft_negotiation_email(
        &self,
        supplier: SupplierInfo,
        category: &str,
        current_price: f64,
        market_data: MarketData,
    ) -> AgentOutput<EmailDraft> {
        self.execute(NegotiationInput {
            supplier,
            category: category.to_string(),
            current_price,
            kind: EmailKind::Negotiation { market_data },
        })
        .await
    }

    fn build_prompt(&self, input: &NegotiationInput) -> Vec<ChatMessage> {
        let task = match &input.kind {
            EmailKind::NewSupplier => format!(
                "Draft a professional email to {} inquiring about their {} services.\n\
                 Include:\n\
                 - Brief introduction of our business\n\
                 - Current supplier charges ${:.2}\n\
                 - Interest in potentially switching suppliers\n\
                 - Request for pricing details and minimum order quantities\n\
                 - Request for samples if applicable",
                input.supplier.business_name, input.category, input.current_price
            ),
            EmailKind::Negotiation { market_data } => format!(
                "Draft a professional negotiation email to our current supplier {} for {}.\n\
                 Use this market research data:\n{}\n\n\
                 Current price: ${:.2}\n\n\
                 Include:\n\
                 - Value we place on our business relationship\n\
                 - Market research showing competitive prices\n\
                 - Request for price adjustment\n\
                 - Commitment to long-term partnership if terms are agreeable",
                input.supplier.business_name,
                input.category,
                serde_json::to_string_pretty(market_data).unwrap_or_default(),
                input.current_price
            ),
        };

        vec![
            ChatMessage::system(NEGOTIATION_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "{}\n\nThe recipient address is {}.",
                task, input.supplier.contact_email
            )),
        ]
    }

    /// `to_email` is often left out; the supplier's address stands in for it.
    fn parse_response(&self, response: &str, default_recipient: &str) -> Option<EmailDraft> {
        let mut value = extract::extract_or_default(response, Shape::EmailDraft);
        if let Some(map) = value.as_object_mut() {
            if map.get("to_email").map_or(true, |v| v.is_null()) {
                map.insert("to_email".to_string(), default_recipient.into());
            }
        }
        if !validate::is_valid_email_draft(&value) {
            warn!("Negotiation response failed schema validation");
            return None;
        }
        serde_json::from_value::<EmailDraft>(value)
            .ok()
            .filter(|draft| !draft.is_empty())
    }

    /// Template email used in demo mode.
    fn render_template(&self, input: &NegotiationInput) -> EmailDraft {
        let name = &input.supplier.business_name;
        let (subject, body) = match &input.kind {
            EmailKind::NewSupplier => (
                format!("Inquiry about {} services", input.category),
                format!(
                    "Hello {name},\n\n\
                     We are a small apparel business reviewing our {category} suppliers. \
                     We currently pay ${price:.2} per unit and are interested in switching \
                     if the terms are right.\n\n\
                     Could you share your pricing, minimum order quantities and, if \
                     possible, samples?\n\n\
                     Best regards",
                    name = name,
                    category = input.category,
                    price = input.current_price
                ),
            ),
            EmailKind::Negotiation { market_data } => (
                format!("Pricing review for {}", input.category),
                format!(
                    "Hello {name},\n\n\
                     We value our partnership and would like to continue working with you. \
                     Our recent market research puts the average price for {category} at \
                     ${avg:.2}, with competitors quoting as low as ${low:.2}, against the \
                     ${price:.2} we pay today.\n\n\
                     Would you consider adjusting your pricing? We are ready to commit to a \
                     longer-term agreement on terms that work for both of us.\n\n\
                     Best regards",
                    name = name,
                    category = input.category,
                    avg = market_data.average_market_price,
                    low = market_data.lowest_competitor_price,
                    price = input.current_price
                ),
            ),
        };

        EmailDraft {
            subject,
            body,
            to_email: input.supplier.contact_email.clone(),
        }
    }
}

const NEGOTIATION_SYSTEM_PROMPT: &str = r#"You write concise, professional procurement emails on behalf of a small business.

Return JSON in this exact format:
{
  "subject": "",
  "body": "",
  "to_email": ""
}

IMPORTANT:
- Use the recipient address you are given for "to_email"
- Do NOT invent prices beyond the figures provided
- Return only the JSON object"#;

#[async_trait]
impl Agent for NegotiationAgent {
    type Input = NegotiationInput;
    type Output = EmailDraft;

    fn name(&self) -> &'static str {
        "negotiator"
    }

    async fn execute(&self, input: Self::Input) -> AgentOutput<Self::Output> {
        info!(
            "Drafting email to {} ({}, {} mode)",
            input.supplier.business_name,
            match input.kind {
                EmailKind::NewSupplier => "new supplier",
                EmailKind::Negotiation { .. } => "negotiation",
            },
            self.mode
        );

        if self.mode == AgentMode::Demo {
            return AgentOutput::new(self.render_template(&input), Provenance::Fixture);
        }

        let request = ChatRequest::new(self.build_prompt(&input)).with_json_mode();
        let response = match complete(self.backend.as_ref(), request, self.timeout).await {
            Ok(text) => text,
            Err(e) => {
                return AgentOutput::new(EmailDraft::default(), Provenance::Fallback)
                    .with_note(e.to_string())
            }
        };
        debug!("AI response: {}", response);

        match self.parse_response(&response, &input.supplier.contact_email) {
            Some(draft) => AgentOutput::new(
                draft.with_default_recipient(&input.supplier.contact_email),
                Provenance::Model,
            ),
            None => AgentOutput::new(EmailDraft::default(), Provenance::Fallback)
                .with_note("model response did not contain an email draft"),
        }
    }
}

use std::sync::Arc;

use thiserror::Error;

use crate::agents::backend::{create_backend, AiBackend};
use crate::agents::negotiator::NegotiationAgent;
use crate::agents::receipt_parser::ReceiptParserAgent;
use crate::agents::supplier_search::{SupplierSearchAgent, SupplierSearchSettings};
use crate::agents::{AgentError, AgentMode};
use crate::config::{AppConfig, ConfigError};
use crate::fixtures::{DemoFixtures, FixtureError};
use crate::knot::{KnotClient, KnotError};
use crate::storage::ReceiptArchive;

/// Failure while wiring up shared state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] AgentError),

    #[error(transparent)]
    Fixtures(#[from] FixtureError),

    #[error(transparent)]
    Knot(#[from] KnotError),
}

#[derive(Clone)]
pub struct AppState {
    pub mode: AgentMode,
    pub receipt_parser: Arc<ReceiptParserAgent>,
    pub supplier_search: Arc<SupplierSearchAgent>,
    pub negotiator: Arc<NegotiationAgent>,
    pub knot: Arc<KnotClient>,
    pub archive: Arc<ReceiptArchive>,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build state from config, creating the configured AI backend.
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let backend = create_backend(&config.ai.backend_config()?)?;
        Self::with_backend(config, backend)
    }

    /// Build state around an existing backend.
    pub fn with_backend(
        config: &AppConfig,
        backend: Arc<dyn AiBackend>,
    ) -> Result<Self, StateError> {
        let fixtures = Arc::new(DemoFixtures::load(config.fixtures_path.as_deref())?);
        let timeout = config.ai.timeout();

        let receipt_parser =
            ReceiptParserAgent::new(backend.clone(), fixtures.clone(), config.mode, timeout);
        let supplier_search = SupplierSearchAgent::new(
            backend.clone(),
            fixtures,
            SupplierSearchSettings {
                mode: config.mode,
                timeout,
                max_alternatives: config.search.max_alternatives,
                web_search_tools: config.ai.web_search_tools.clone(),
            },
        );
        let negotiator = NegotiationAgent::new(backend, config.mode, timeout);

        Ok(Self {
            mode: config.mode,
            receipt_parser: Arc::new(receipt_parser),
            supplier_search: Arc::new(supplier_search),
            negotiator: Arc::new(negotiator),
            knot: Arc::new(KnotClient::from_config(&config.knot)?),
            archive: Arc::new(ReceiptArchive::new(
                config.storage.receipts_dir.clone(),
                config.storage.enabled,
            )),
            cors_origin: config.server.cors_origin.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State over `backend` with archiving into `receipts_dir` and a mock Knot client.
    pub fn state(
        backend: Arc<dyn AiBackend>,
        mode: AgentMode,
        receipts_dir: &std::path::Path,
    ) -> AppState {
        let mut config = AppConfig::default();
        config.mode = mode;
        config.storage.receipts_dir = receipts_dir.to_path_buf();

        let mut state = AppState::with_backend(&config, backend).unwrap();
        state.knot = Arc::new(KnotClient::new(&config.knot, None, None).unwrap());
        state
    }
}

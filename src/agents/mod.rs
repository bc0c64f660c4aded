//! LLM-backed procurement agents.
//!
//! Each agent sends one prompt to an AI backend and runs the completion
//! through the structured-response extractor. Agents never surface backend
//! failures to their callers: a failed, late or malformed response is logged
//! and replaced with fallback data. All agents implement the `Agent` trait.

pub mod backend;
pub mod negotiator;
pub mod receipt_parser;
pub mod supplier_search;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use backend::{AiBackend, ChatRequest};

/// Errors that can occur during agent execution.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("AI backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("AI response unparseable: {0}")]
    ResponseParseError(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Which behaviour the agents run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Serve the fixture dataset; no backend calls
    #[default]
    Demo,
    /// Call the configured AI backend, falling back on failure
    Live,
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentMode::Demo => write!(f, "demo"),
            AgentMode::Live => write!(f, "live"),
        }
    }
}

impl std::str::FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(AgentMode::Demo),
            "live" => Ok(AgentMode::Live),
            other => Err(format!("unknown mode: {} (expected demo or live)", other)),
        }
    }
}

/// Where an agent's answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Parsed and validated model output
    Model,
    /// Fixture data served in demo mode
    Fixture,
    /// Substituted after a failure
    Fallback,
}

/// Output wrapper recording provenance and any fallback reasons.
#[derive(Debug, Clone)]
pub struct AgentOutput<T> {
    pub data: T,
    pub provenance: Provenance,
    pub notes: Vec<String>,
}

impl<T> AgentOutput<T> {
    pub fn new(data: T, provenance: Provenance) -> Self {
        Self {
            data,
            provenance,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

/// Core trait for all AI agents.
#[async_trait]
pub trait Agent {
    type Input;
    type Output;

    /// Agent identifier for logging.
    fn name(&self) -> &'static str;

    /// Execute the agent's task. Infallible by contract: failures become
    /// fallback output.
    async fn execute(&self, input: Self::Input) -> AgentOutput<Self::Output>;
}

/// One backend attempt bounded by `timeout`. Returns the raw completion text.
pub async fn complete(
    backend: &dyn AiBackend,
    request: ChatRequest,
    timeout: Duration,
) -> Result<String, AgentError> {
    match tokio::time::timeout(timeout, backend.chat(request)).await {
        Ok(Ok(response)) => {
            debug!(
                "{} responded with {} chars (model {})",
                backend.name(),
                response.content.len(),
                response.model
            );
            Ok(response.content)
        }
        Ok(Err(e)) => {
            warn!("{} request failed: {}", backend.name(), e);
            Err(e)
        }
        Err(_) => {
            warn!(
                "{} request timed out after {}s",
                backend.name(),
                timeout.as_secs()
            );
            Err(AgentError::Timeout(timeout.as_secs()))
        }
    }
}

//! # Procure Agent
//!
//! Procurement assistant backend: reads receipts, finds cheaper suppliers
//! and drafts outreach emails using an LLM, degrading to demo data when the
//! model is unavailable or answers badly.
//!
//! ## Architecture
//!
//! - **extract**: Pulls JSON out of free-form model output, validates and normalizes it
//! - **agents**: AI backends and the receipt/search/negotiation agents
//! - **models**: Core data structures (receipts, suppliers, emails)
//! - **document**: Text extraction from uploaded receipts
//! - **knot**: Knot payment-aggregator client
//! - **storage**: Receipt archive
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod agents;
pub mod api;
pub mod config;
pub mod document;
pub mod extract;
pub mod fixtures;
pub mod knot;
pub mod models;
pub mod storage;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "2m", "90s", "1h").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}

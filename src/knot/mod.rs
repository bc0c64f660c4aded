//! Knot payment-aggregator client.
//!
//! Thin HTTP wrapper around the Knot session and transaction-sync APIs.
//! The client never fails its caller: missing credentials put it in mock
//! mode, and upstream errors are folded into mock or error-shaped responses
//! so the dashboard can keep going.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::KnotConfig;

/// Session id returned when no credentials are configured.
pub const MOCK_SESSION_ID: &str = "mock-session-123";

#[derive(Debug, Error)]
pub enum KnotError {
    #[error("Invalid Knot URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Body of `POST /api/session/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(rename = "type", default = "default_session_type")]
    pub session_type: String,

    #[serde(default = "default_external_user_id")]
    pub external_user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_token: Option<String>,
}

fn default_session_type() -> String {
    "transaction_link".to_string()
}

fn default_external_user_id() -> String {
    "demo-user-1".to_string()
}

impl Default for CreateSessionRequest {
    fn default() -> Self {
        Self {
            session_type: default_session_type(),
            external_user_id: default_external_user_id(),
            card_id: None,
            phone_number: None,
            email: None,
            processor_token: None,
        }
    }
}

/// Body of `POST /api/transactions/sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTransactionsRequest {
    #[serde(default = "default_merchant_id")]
    pub merchant_id: i64,

    #[serde(default = "default_external_user_id")]
    pub external_user_id: String,

    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_merchant_id() -> i64 {
    44
}

fn default_limit() -> u32 {
    5
}

impl SyncTransactionsRequest {
    /// Copy of the request with `limit` capped at `max`.
    pub fn capped(&self, max: u32) -> Self {
        Self {
            limit: self.limit.min(max),
            ..self.clone()
        }
    }
}

/// Session handed to the frontend SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnotSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,

    pub mock: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl KnotSession {
    fn mock(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            mock: true,
            error: None,
            status: None,
        }
    }

    fn with_error(mut self, error: impl Into<String>, status: Option<u16>) -> Self {
        self.error = Some(error.into());
        self.status = status;
        self
    }
}

struct Credentials {
    client_id: String,
    secret: String,
}

/// Knot API client.
pub struct KnotClient {
    client: Client,
    base_url: Url,
    sync_url: Url,
    version: String,
    max_sync_limit: u32,
    credentials: Option<Credentials>,
}

impl KnotClient {
    /// Build a client, reading credentials from the configured env vars.
    pub fn from_config(config: &KnotConfig) -> Result<Self, KnotError> {
        let client_id = std::env::var(&config.client_id_env).ok();
        let secret = std::env::var(&config.secret_env).ok();
        Self::new(config, client_id, secret)
    }

    pub fn new(
        config: &KnotConfig,
        client_id: Option<String>,
        secret: Option<String>,
    ) -> Result<Self, KnotError> {
        let credentials = match (client_id, secret) {
            (Some(client_id), Some(secret)) if !client_id.is_empty() && !secret.is_empty() => {
                Some(Credentials { client_id, secret })
            }
            _ => {
                info!("Knot credentials not set, using mock sessions");
                None
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: parse_url(&config.base_url)?,
            sync_url: parse_url(&config.sync_url)?,
            version: config.version.clone(),
            max_sync_limit: config.max_sync_limit,
            credentials,
        })
    }

    /// True when no credentials are configured.
    pub fn is_mock(&self) -> bool {
        self.credentials.is_none()
    }

    fn session_url(&self) -> String {
        format!("{}/session/create", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Create a Knot session. Never fails; falls back to a mock session.
    pub async fn create_session(&self, request: &CreateSessionRequest) -> KnotSession {
        let Some(credentials) = &self.credentials else {
            return KnotSession::mock(MOCK_SESSION_ID);
        };

        let url = self.session_url();
        debug!("Creating Knot session at {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.client_id, Some(&credentials.secret))
            .header("Knot-Version", &self.version)
            .json(request)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("Knot session request failed: {}", e);
                return KnotSession::mock("mock-session-ex").with_error(e.to_string(), None);
            }
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Knot session request returned {}", status);
            return KnotSession::mock("mock-session-err").with_error(body, Some(status.as_u16()));
        }

        match response.json::<Value>().await {
            Ok(data) => match session_id_from(&data) {
                Some(session_id) => {
                    info!("Created Knot session");
                    KnotSession {
                        session_id,
                        mock: false,
                        error: None,
                        status: None,
                    }
                }
                None => KnotSession::mock("mock-session-missing")
                    .with_error("response did not include a session id", None),
            },
            Err(e) => KnotSession::mock("mock-session-ex").with_error(e.to_string(), None),
        }
    }

    /// Fetch transactions for a merchant account.
    ///
    /// Returns the upstream JSON, synthetic transactions in mock mode, or an
    /// error-shaped object on failure. `limit` is capped at the configured
    /// maximum in both cases.
    pub async fn sync_transactions(&self, request: &SyncTransactionsRequest) -> Value {
        if request.limit > self.max_sync_limit {
            debug!(
                "Capping sync limit {} at {}",
                request.limit, self.max_sync_limit
            );
        }
        let request = &request.capped(self.max_sync_limit);

        if self.is_mock() {
            return mock_transactions(request);
        }

        let response = self
            .client
            .post(self.sync_url.as_str())
            .json(request)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("Knot transaction sync failed: {}", e);
                return json!({ "error": e.to_string(), "merchant_id": request.merchant_id });
            }
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return json!({
                "error": body,
                "status": status.as_u16(),
                "merchant_id": request.merchant_id,
            });
        }

        response.json::<Value>().await.unwrap_or_else(|e| {
            json!({ "error": e.to_string(), "merchant_id": request.merchant_id })
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, KnotError> {
    Url::parse(raw).map_err(|e| KnotError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// The API has returned the id under several names over time.
fn session_id_from(data: &Value) -> Option<String> {
    ["session", "sessionId", "id", "session_id"]
        .iter()
        .filter_map(|key| data.get(*key))
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
}

const MOCK_MERCHANTS: &[(&str, &str)] = &[
    ("Wholesale Supply Co.", "Blank hoodies (bulk)"),
    ("FastPrint Solutions", "Screen printing"),
    ("QuickShip Logistics", "Local delivery"),
];

fn mock_transactions(request: &SyncTransactionsRequest) -> Value {
    let now = Utc::now();
    let transactions: Vec<Value> = (0..request.limit as usize)
        .map(|i| {
            let (merchant, description) = MOCK_MERCHANTS[i % MOCK_MERCHANTS.len()];
            json!({
                "id": Uuid::new_v4().to_string(),
                "merchant": merchant,
                "description": description,
                "amount": 25.0 + (i as f64) * 4.5,
                "currency": "USD",
                "datetime": (now - ChronoDuration::days(i as i64)).to_rfc3339(),
            })
        })
        .collect();

    json!({
        "merchant_id": request.merchant_id,
        "external_user_id": request.external_user_id,
        "transactions": transactions,
        "mock": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KnotConfig {
        KnotConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            sync_url: "http://127.0.0.1:1/transactions/sync".to_string(),
            timeout_seconds: 2,
            ..KnotConfig::default()
        }
    }

    #[tokio::test]
    async fn test_mock_session_without_credentials() {
        let client = KnotClient::new(&config(), None, None).unwrap();
        assert!(client.is_mock());

        let session = client.create_session(&CreateSessionRequest::default()).await;
        assert_eq!(session.session_id, MOCK_SESSION_ID);
        assert!(session.mock);

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json, json!({"sessionId": "mock-session-123", "mock": true}));
    }

    #[test]
    fn test_blank_credentials_are_mock() {
        let client =
            KnotClient::new(&config(), Some("id".to_string()), Some(String::new())).unwrap();
        assert!(client.is_mock());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_falls_back() {
        let client =
            KnotClient::new(&config(), Some("id".to_string()), Some("secret".to_string())).unwrap();
        assert!(!client.is_mock());

        let session = client.create_session(&CreateSessionRequest::default()).await;
        assert_eq!(session.session_id, "mock-session-ex");
        assert!(session.mock);
        assert!(session.error.is_some());

        let request = SyncTransactionsRequest {
            merchant_id: 19,
            external_user_id: "u".to_string(),
            limit: 3,
        };
        let result = client.sync_transactions(&request).await;
        assert_eq!(result["merchant_id"], 19);
        assert!(result["error"].is_string());
    }

    #[tokio::test]
    async fn test_mock_transactions_respect_limit() {
        let client = KnotClient::new(&config(), None, None).unwrap();
        let request = SyncTransactionsRequest {
            merchant_id: 44,
            external_user_id: "demo-user-1".to_string(),
            limit: 4,
        };
        let result = client.sync_transactions(&request).await;
        assert_eq!(result["transactions"].as_array().unwrap().len(), 4);
        assert_eq!(result["mock"], true);
    }

    #[tokio::test]
    async fn test_oversized_limit_is_capped() {
        let client = KnotClient::new(&config(), None, None).unwrap();
        let request = SyncTransactionsRequest {
            merchant_id: 44,
            external_user_id: "demo-user-1".to_string(),
            limit: u32::MAX,
        };
        let result = client.sync_transactions(&request).await;
        assert_eq!(result["transactions"].as_array().unwrap().len(), 100);
    }

    #[test]
    fn test_capped_keeps_smaller_limit() {
        let request = SyncTransactionsRequest {
            merchant_id: 7,
            external_user_id: "u".to_string(),
            limit: 3,
        };
        assert_eq!(request.capped(100).limit, 3);
        assert_eq!(request.capped(2).limit, 2);
        assert_eq!(request.capped(2).merchant_id, 7);
    }

    #[test]
    fn test_session_id_aliases() {
        assert_eq!(session_id_from(&json!({"session": "s1"})).as_deref(), Some("s1"));
        assert_eq!(session_id_from(&json!({"sessionId": "s2"})).as_deref(), Some("s2"));
        assert_eq!(session_id_from(&json!({"id": "s3"})).as_deref(), Some("s3"));
        assert_eq!(session_id_from(&json!({"session_id": "s4"})).as_deref(), Some("s4"));
        assert_eq!(session_id_from(&json!({"session": ""})), None);
        assert_eq!(session_id_from(&json!({"other": "x"})), None);
    }

    #[test]
    fn test_request_defaults() {
        let request: CreateSessionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.session_type, "transaction_link");
        assert_eq!(request.external_user_id, "demo-user-1");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({"type": "transaction_link", "external_user_id": "demo-user-1"}));

        let sync: SyncTransactionsRequest =
            serde_json::from_str(r#"{"external_user_id": "u", "limit": 5}"#).unwrap();
        assert_eq!(sync.merchant_id, 44);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = KnotConfig {
            base_url: "not a url".to_string(),
            ..KnotConfig::default()
        };
        assert!(matches!(
            KnotClient::new(&config, None, None),
            Err(KnotError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_session_url() {
        let client = KnotClient::new(&KnotConfig::default(), None, None).unwrap();
        assert_eq!(
            client.session_url(),
            "https://development.knotapi.com/session/create"
        );
    }
}

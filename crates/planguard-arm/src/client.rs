// crates/planguard-arm/src/client.rs
// ============================================================================
// Module: ARM Client
// Description: Shared blocking REST client for Resource Manager.
// Purpose: Execute authenticated JSON calls with a pinned api-version.
// Dependencies: reqwest, serde, serde_json, thiserror, tracing, url
// ============================================================================

//! ## Overview
//! One client instance is constructed per run and shared read-only by the
//! dispatch workers. Requests carry a bearer token from the configured
//! credential, an `api-version` query, and JSON accept/content types. A
//! non-2xx status becomes an error carrying the status code and body text;
//! validation calls are never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::credential::CredentialError;
use crate::credential::TokenCredential;

/// Public-cloud Resource Manager endpoint.
pub const RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";

/// Full-request timeout for validation calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// User agent sent on every request.
const USER_AGENT: &str = concat!("planguard/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// ARM call errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ArmError {
    /// The HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    Build(String),
    /// Credential acquisition failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// The request URL did not parse.
    #[error("invalid request url: {0}")]
    Url(String),
    /// The transport failed before a response arrived.
    #[error("request failed: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Response body text.
        body: String,
    },
    /// The response body did not decode.
    #[error("decoding response body: {0}")]
    Decode(#[from] serde_json::Error),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Shared Resource Manager client.
///
/// # Invariants
/// - Read-only after construction; safe to share across dispatch workers.
pub struct ArmClient {
    host: String,
    http: Client,
    credential: Box<dyn TokenCredential>,
}

impl ArmClient {
    /// Builds a client against the public-cloud endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Build`] when the HTTP client cannot be created.
    pub fn new(credential: Box<dyn TokenCredential>) -> Result<Self, ArmError> {
        Self::with_host(RESOURCE_MANAGER_ENDPOINT.to_string(), credential)
    }

    /// Builds a client against a specific host; used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Build`] when the HTTP client cannot be created.
    pub fn with_host(
        host: String,
        credential: Box<dyn TokenCredential>,
    ) -> Result<Self, ArmError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ArmError::Build(err.to_string()))?;
        Ok(Self {
            host,
            http,
            credential,
        })
    }

    /// Executes a POST with an `api-version` query and a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError`] on credential, transport, status, or decode
    /// failures.
    pub fn post_json<B, R>(&self, path: &str, api_version: &str, body: &B) -> Result<R, ArmError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let mut request_url = Url::parse(&format!("{}{path}", self.host))
            .map_err(|err| ArmError::Url(err.to_string()))?;
        request_url
            .query_pairs_mut()
            .append_pair("api-version", api_version);
        tracing::debug!(url = %request_url, "executing request");

        let token = self.credential.token()?;
        let response = self
            .http
            .post(request_url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .map_err(|err| ArmError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| ArmError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(ArmError::Status { status, body: text });
        }
        tracing::debug!(status = %status, "response received");
        if text.is_empty() {
            return Ok(serde_json::from_str("null")?);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

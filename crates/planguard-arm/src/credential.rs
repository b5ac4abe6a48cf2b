// crates/planguard-arm/src/credential.rs
// ============================================================================
// Module: Token Credentials
// Description: Bearer token acquisition for Resource Manager calls.
// Purpose: Support static CI tokens and local Azure CLI logins.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Two credential sources cover the supported environments: a static token
//! taken from `AZURE_ACCESS_TOKEN` (CI and debugging; the token is used
//! as-is with a conservative one-hour expiry since externally supplied
//! tokens carry no metadata), and the Azure CLI's cached login. The trait
//! keeps the seam open for richer chains.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use thiserror::Error;

use crate::account::AccountError;
use crate::account::json_from_az_cmd;

/// Environment variable supplying a static bearer token.
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Token resource for Resource Manager.
const MANAGEMENT_RESOURCE: &str = "https://management.azure.com";

/// Expiry assumed for tokens without metadata.
const STATIC_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Refresh margin applied before a cached token's expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Credential acquisition errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The Azure CLI token lookup failed.
    #[error("acquiring token from Azure CLI: {0}")]
    Cli(#[from] AccountError),
}

// ============================================================================
// SECTION: Credential Contract
// ============================================================================

/// A source of Resource Manager bearer tokens.
pub trait TokenCredential: Send + Sync {
    /// Returns a bearer token valid for Resource Manager.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when no token can be acquired.
    fn token(&self) -> Result<String, CredentialError>;
}

/// Builds the default credential: the static environment token when present,
/// the Azure CLI otherwise.
#[must_use]
pub fn default_credential() -> Box<dyn TokenCredential> {
    match env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.is_empty() => Box::new(StaticTokenCredential::new(token)),
        _ => Box::new(AzureCliCredential::default()),
    }
}

// ============================================================================
// SECTION: Static Token
// ============================================================================

/// Static token credential for CI and debugging.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    /// Wraps a pre-acquired token.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl TokenCredential for StaticTokenCredential {
    fn token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }
}

// ============================================================================
// SECTION: Azure CLI Credential
// ============================================================================

/// Azure CLI credential with a refresh-margin cache.
#[derive(Debug, Default)]
pub struct AzureCliCredential {
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    acquired_at: Instant,
}

/// `az account get-access-token` output subset.
#[derive(Debug, Deserialize)]
struct AccessTokenModel {
    /// The bearer token.
    #[serde(rename = "accessToken")]
    access_token: String,
}

impl TokenCredential for AzureCliCredential {
    fn token(&self) -> Result<String, CredentialError> {
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(entry) = cached.as_ref() {
            if entry.acquired_at.elapsed() + REFRESH_MARGIN < STATIC_TOKEN_LIFETIME {
                return Ok(entry.token.clone());
            }
        }
        let model: AccessTokenModel = json_from_az_cmd(&[
            "account",
            "get-access-token",
            "--resource",
            MANAGEMENT_RESOURCE,
        ])?;
        *cached = Some(CachedToken {
            token: model.access_token.clone(),
            acquired_at: Instant::now(),
        });
        Ok(model.access_token)
    }
}

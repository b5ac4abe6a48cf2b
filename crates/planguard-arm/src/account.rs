// crates/planguard-arm/src/account.rs
// ============================================================================
// Module: Resource Manager Account
// Description: Subscription discovery via environment or the Azure CLI.
// Purpose: Resolve the subscription everything in a run is scoped to.
// Dependencies: serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! The subscription ID comes from `ARM_SUBSCRIPTION_ID` when set; otherwise
//! `az account show` is invoked once and its `id` field cached. Discovery
//! failure is non-fatal: callers fall back to the zero subscription and
//! placeholder IDs simply keep it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::process::Command;
use std::sync::Mutex;

use serde::Deserialize;
use thiserror::Error;

/// Environment override for the subscription ID.
pub const SUBSCRIPTION_ID_ENV: &str = "ARM_SUBSCRIPTION_ID";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Azure CLI invocation errors.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The CLI could not be launched.
    #[error("launching Azure CLI: {0}")]
    Launch(String),
    /// The CLI exited unsuccessfully.
    #[error("running Azure CLI: {0}")]
    Run(String),
    /// The CLI output did not decode.
    #[error("unmarshaling the output of Azure CLI: {0}")]
    Decode(#[from] serde_json::Error),
}

// ============================================================================
// SECTION: Account
// ============================================================================

/// Cached subscription discovery.
///
/// # Invariants
/// - The CLI is consulted at most once per account instance.
#[derive(Debug, Default)]
pub struct ResourceManagerAccount {
    subscription_id: Mutex<Option<String>>,
}

/// `az account show` output subset.
#[derive(Debug, Deserialize)]
struct AccountModel {
    /// Default subscription ID.
    id: String,
}

impl ResourceManagerAccount {
    /// Creates an account seeded from the environment override, if any.
    #[must_use]
    pub fn new() -> Self {
        let seeded = env::var(SUBSCRIPTION_ID_ENV)
            .ok()
            .filter(|value| !value.is_empty());
        Self {
            subscription_id: Mutex::new(seeded),
        }
    }

    /// Returns the subscription ID, consulting the Azure CLI on first use.
    ///
    /// Returns `None` when neither the environment nor the CLI yields one.
    #[must_use]
    pub fn subscription_id(&self) -> Option<String> {
        let mut cached = self
            .subscription_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if cached.is_some() {
            return cached.clone();
        }
        match load_default_from_az_cli() {
            Ok(subscription_id) => {
                *cached = Some(subscription_id.clone());
                Some(subscription_id)
            }
            Err(err) => {
                tracing::debug!("error getting default subscription ID: {err}");
                None
            }
        }
    }
}

/// Reads the default subscription from `az account show -o=json`.
fn load_default_from_az_cli() -> Result<String, AccountError> {
    let model: AccountModel = json_from_az_cmd(&["account", "show"])?;
    Ok(model.id)
}

/// Executes an Azure CLI command and decodes its JSON output.
pub(crate) fn json_from_az_cmd<T>(args: &[&str]) -> Result<T, AccountError>
where
    T: for<'de> Deserialize<'de>,
{
    let output = Command::new("az")
        .args(args)
        .arg("-o=json")
        .output()
        .map_err(|err| AccountError::Launch(err.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AccountError::Run(stderr.trim().to_string()));
    }
    Ok(serde_json::from_slice(&output.stdout)?)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/planguard-core/src/intercept.rs
// ============================================================================
// Module: Interception Driver
// Description: Boots a provider so every outbound call is trapped.
// Purpose: Provoke apply failures whose diagnostics embed the real request.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! The driver configures the provider with all-zero credentials and the
//! detected (or zero) subscription so configuration succeeds but any outbound
//! call is guaranteed to fail at the HTTP layer. Each apply call runs on a
//! worker thread behind a short timeout and a panic guard; whatever comes
//! back, diagnostics, transport error, panic, or timeout, is rendered into a
//! single string for the trap-error parsers. The point of the call is to
//! provoke, not to succeed.
//!
//! The configured provider instance is not safe to drive concurrently; the
//! serial extraction stage owns it exclusively.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::placeholder::ZERO_SUBSCRIPTION_ID;
use crate::provider::ApplyResourceChange;
use crate::provider::Diagnostic;
use crate::provider::DiagnosticSeverity;
use crate::provider::ProviderError;
use crate::provider::ProviderServer;
use crate::schema::SchemaType;

/// Behaviour switch disabling the provider's deep schema validation.
pub const ENHANCED_VALIDATION_ENV: &str = "ARM_PROVIDER_ENHANCED_VALIDATION";

/// Behaviour switch disabling the provider's registration side effects.
pub const SKIP_PROVIDER_REGISTRATION_ENV: &str = "ARM_SKIP_PROVIDER_REGISTRATION";

/// Upper bound on a single provider apply call.
const APPLY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Driver initialisation errors; these abort the whole run.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// The provider could not be booted or queried.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The provider rejected the intercepting configuration.
    #[error("provider rejected configuration: {0}")]
    Configure(String),
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// A booted, intercept-configured provider plus its schema map.
///
/// # Invariants
/// - `resource_schemas` is read-only after construction.
/// - Apply calls are serialized by the owning pipeline stage.
pub struct InterceptClient {
    provider: Arc<dyn ProviderServer>,
    resource_schemas: BTreeMap<String, SchemaType>,
    apply_timeout: Duration,
}

impl InterceptClient {
    /// Boots the provider: sets the behaviour switches, fetches the schema,
    /// and configures with the trap credential bundle.
    ///
    /// # Errors
    ///
    /// Returns [`InterceptError`] when the schema fetch fails or the provider
    /// rejects the configuration.
    pub fn new(
        provider: Arc<dyn ProviderServer>,
        subscription_id: Option<&str>,
    ) -> Result<Self, InterceptError> {
        env::set_var(ENHANCED_VALIDATION_ENV, "false");
        env::set_var(SKIP_PROVIDER_REGISTRATION_ENV, "true");

        let schema = provider.schema()?;
        tracing::debug!(resources = schema.resources.len(), "fetched provider schema");

        let config = trap_provider_config(subscription_id);
        let diagnostics = provider.configure(&config)?;
        let errors = render_error_diagnostics(&diagnostics);
        if !errors.is_empty() {
            return Err(InterceptError::Configure(errors));
        }

        Ok(Self {
            provider,
            resource_schemas: schema.resources,
            apply_timeout: APPLY_TIMEOUT,
        })
    }

    /// Returns the value type of a resource, if the provider knows it.
    #[must_use]
    pub fn value_type(&self, resource_type: &str) -> Option<&SchemaType> {
        self.resource_schemas.get(resource_type)
    }

    /// Applies a resource change and returns the rendered diagnostics.
    ///
    /// The call runs on a worker thread bounded by the apply timeout and a
    /// panic guard; every outcome is rendered to a string suitable for the
    /// trap-error parsers.
    #[must_use]
    pub fn apply_resource(&self, resource_type: &str, planned: &Value) -> String {
        if !self.resource_schemas.contains_key(resource_type) {
            return format!("resource type {resource_type} not found in provider schema");
        }

        let request = ApplyResourceChange {
            type_name: resource_type.to_string(),
            prior_state: Value::Null,
            planned_state: planned.clone(),
            config: planned.clone(),
        };

        let provider = Arc::clone(&self.provider);
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("provider-apply".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    provider.apply_resource_change(request)
                }));
                let _ = sender.send(outcome);
            });
        if let Err(err) = spawned {
            return format!("failed to spawn provider apply worker: {err}");
        }

        match receiver.recv_timeout(self.apply_timeout) {
            Ok(Ok(Ok(diagnostics))) => render_apply_diagnostics(&diagnostics),
            Ok(Ok(Err(err))) => err.to_string(),
            Ok(Err(payload)) => {
                format!("provider call panicked: {}", panic_message(payload.as_ref()))
            }
            Err(_) => format!(
                "provider call timed out after {} seconds",
                self.apply_timeout.as_secs()
            ),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the intercepting provider configuration: all-zero credentials and
/// the detected-or-zero subscription.
fn trap_provider_config(subscription_id: Option<&str>) -> Value {
    let subscription = subscription_id
        .filter(|s| !s.is_empty())
        .unwrap_or(ZERO_SUBSCRIPTION_ID);
    json!({
        "features": [{}],
        "use_cli": false,
        "subscription_id": subscription,
        "tenant_id": ZERO_SUBSCRIPTION_ID,
        "client_id": ZERO_SUBSCRIPTION_ID,
        "client_secret": ZERO_SUBSCRIPTION_ID,
    })
}

/// Concatenates apply diagnostics into the parser input string.
fn render_apply_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut message = String::from("error applying resource change: ");
    for diagnostic in diagnostics {
        message.push_str(&diagnostic.summary);
        message.push('\n');
        if diagnostic.detail != diagnostic.summary {
            message.push_str(&diagnostic.detail);
            message.push('\n');
        }
    }
    message
}

/// Joins error-severity diagnostics into one line.
fn render_error_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .map(|d| d.summary.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Best-effort extraction of a panic payload message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return (*text).to_string();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    "unknown panic".to_string()
}

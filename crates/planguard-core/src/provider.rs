// crates/planguard-core/src/provider.rs
// ============================================================================
// Module: Provider Protocol Seam
// Description: Backend-agnostic interface to a Terraform resource provider.
// Purpose: Expose the plugin operations the extraction pipeline drives.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! The pipeline drives a resource provider through three operations of the
//! plugin protocol: fetch schema, configure, and apply a resource change.
//! [`ProviderServer`] is that contract surface; `planguard-plugin` implements
//! it over the provider's RPC transport and tests implement it with stubs.
//! Implementations must be safe to share across threads; the driver calls
//! `apply_resource_change` from a worker thread to bound its runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::schema::SchemaType;

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Diagnostic severity reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// Severity was not set.
    Invalid,
    /// The operation failed.
    Error,
    /// The operation succeeded with a warning.
    Warning,
}

/// One provider diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Diagnostic severity.
    pub severity: DiagnosticSeverity,
    /// Short description.
    pub summary: String,
    /// Long description; often repeats the summary.
    pub detail: String,
}

// ============================================================================
// SECTION: Provider Contract
// ============================================================================

/// Provider schema response: the provider configuration block type and one
/// value type per resource.
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    /// Value type of the provider configuration block.
    pub provider: SchemaType,
    /// Resource type name to value type.
    pub resources: BTreeMap<String, SchemaType>,
}

/// Apply request for one resource change.
///
/// # Invariants
/// - `prior_state` is the typed null for creations; the pipeline never
///   replays existing state.
#[derive(Debug, Clone)]
pub struct ApplyResourceChange {
    /// Resource type name.
    pub type_name: String,
    /// Prior state value.
    pub prior_state: Value,
    /// Planned state value.
    pub planned_state: Value,
    /// Configuration value; the pipeline passes the planned state.
    pub config: Value,
}

/// Provider transport and protocol errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider process could not be started or exited early.
    #[error("provider process error: {0}")]
    Process(String),
    /// The RPC transport failed.
    #[error("provider transport error: {0}")]
    Transport(String),
    /// The provider returned an unusable schema.
    #[error("provider schema error: {0}")]
    Schema(String),
}

/// The plugin-protocol operations the extraction pipeline uses.
pub trait ProviderServer: Send + Sync {
    /// Fetches the provider schema.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the schema cannot be fetched or parsed.
    fn schema(&self) -> Result<ProviderSchema, ProviderError>;

    /// Configures the provider with the given configuration value.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure; rejected configuration
    /// surfaces as error diagnostics instead.
    fn configure(&self, config: &Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Applies a resource change and returns the resulting diagnostics.
    ///
    /// Under an intercepting configuration the call is expected to fail with
    /// diagnostics that embed the trapped request.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure.
    fn apply_resource_change(
        &self,
        request: ApplyResourceChange,
    ) -> Result<Vec<Diagnostic>, ProviderError>;
}

// crates/planguard-arm/src/lib.rs
// ============================================================================
// Module: Planguard ARM Surface
// Description: Azure Resource Manager client, preflight, and policy calls.
// Purpose: Dispatch captured request models to validation endpoints.
// Dependencies: planguard-core, reqwest, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! This crate owns everything that talks to Azure Resource Manager: account
//! and credential discovery, the shared blocking REST client, the preflight
//! validation dispatcher, and the policy restriction check. Validation calls
//! are side-effect free and never retried.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod account;
pub mod client;
pub mod credential;
pub mod policy;
pub mod preflight;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use account::ResourceManagerAccount;
pub use client::ArmClient;
pub use client::ArmError;
pub use credential::AzureCliCredential;
pub use credential::StaticTokenCredential;
pub use credential::TokenCredential;
pub use credential::default_credential;
pub use policy::PolicyError;
pub use policy::check_policy_restrictions;
pub use preflight::PreflightError;
pub use preflight::PreflightRequest;
pub use preflight::build_preflight_request;
pub use preflight::normalize_location;
pub use preflight::preflight;
pub use preflight::preflight_in_batch;

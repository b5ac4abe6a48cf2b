// crates/planguard-core/src/lib.rs
// ============================================================================
// Module: Planguard Core
// Description: Payload extraction pipeline for Terraform plan preflight.
// Purpose: Turn a parsed plan into ordered, concrete ARM request bodies.
// Dependencies: regex, serde, serde_json, thiserror, tracing, url
// ============================================================================

//! ## Overview
//! This crate implements the payload extraction pipeline: it walks a parsed
//! Terraform plan, schedules resources in dependency order, completes each
//! planned value with type-correct placeholders, drives an intercepted
//! provider whose outbound calls are guaranteed to fail, and parses the trap
//! diagnostics back into `(URL, body)` request models.
//! Invariants:
//! - The pipeline never mutates cloud state; the provider is configured so
//!   every outbound call is trapped at the transport layer.
//! - Requests are processed in an order consistent with their references;
//!   captured resource IDs are propagated into downstream configurations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod complete;
pub mod export;
pub mod expression;
pub mod extract;
pub mod intercept;
pub mod placeholder;
pub mod plan;
pub mod provider;
pub mod resource_id;
pub mod schedule;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use complete::planned_value;
pub use complete::propagate_known_values;
pub use export::ExportError;
pub use export::export_payloads;
pub use expression::ConstantValue;
pub use expression::Expression;
pub use extract::ErrorParser;
pub use extract::FailedCase;
pub use extract::RequestModel;
pub use extract::TrapErrorParsers;
pub use intercept::InterceptClient;
pub use intercept::InterceptError;
pub use placeholder::PlaceholderRegistry;
pub use placeholder::PlaceholderError;
pub use placeholder::ZERO_SUBSCRIPTION_ID;
pub use plan::ApplyRequest;
pub use plan::Plan;
pub use plan::collect_apply_requests;
pub use provider::ApplyResourceChange;
pub use provider::Diagnostic;
pub use provider::DiagnosticSeverity;
pub use provider::ProviderError;
pub use provider::ProviderSchema;
pub use provider::ProviderServer;
pub use resource_id::ResourceId;
pub use resource_id::ResourceIdError;
pub use resource_id::ResourceType;
pub use schedule::sort_requests;
pub use schema::Primitive;
pub use schema::SchemaError;
pub use schema::SchemaType;

// crates/planguard-core/src/export.rs
// ============================================================================
// Module: Export Pipeline
// Description: Serial extraction pipeline from plan to request models.
// Purpose: Walk, schedule, complete, provoke, parse, and propagate in order.
// Dependencies: serde_json, tracing, url
// ============================================================================

//! ## Overview
//! The serial prefix of the system: each scheduled request is completed,
//! applied against the intercepted provider, and parsed; the resource ID
//! captured from the first extracted request is fed into every not-yet
//! processed downstream configuration before the next iteration. The stage
//! must stay serial because propagation mutates downstream requests in place
//! and the provider instance is exclusive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use url::Url;

use crate::complete::planned_value;
use crate::complete::propagate_known_values;
use crate::extract::FailedCase;
use crate::extract::RequestModel;
use crate::extract::TrapErrorParsers;
use crate::intercept::InterceptClient;
use crate::placeholder::PlaceholderRegistry;
use crate::plan::Plan;
use crate::plan::collect_apply_requests;
use crate::resource_id::ResourceId;
use crate::schedule::sort_requests;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pipeline setup errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A trap-error parser failed to compile.
    #[error("trap parser setup failed: {0}")]
    Parser(#[from] regex::Error),
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Extracts the would-be ARM requests for every in-scope planned resource.
///
/// Output order follows the dependency schedule. A resource whose apply
/// diagnostics match no parser is emitted with a [`FailedCase`] instead of a
/// request; the pipeline continues past it.
///
/// # Errors
///
/// Returns [`ExportError`] only for setup failures; per-resource extraction
/// failures are part of the output.
pub fn export_payloads(
    plan: &Plan,
    client: &InterceptClient,
    registry: &PlaceholderRegistry,
) -> Result<Vec<RequestModel>, ExportError> {
    let parsers = TrapErrorParsers::new()?;
    let mut requests = sort_requests(collect_apply_requests(plan));
    tracing::debug!(count = requests.len(), "scheduled apply requests");

    let mut out = Vec::new();
    for position in 0..requests.len() {
        let (processed, remaining) = requests.split_at_mut(position + 1);
        let request = &processed[position];

        let value_type = client.value_type(&request.resource_type);
        let planned = planned_value(
            request.after_value.as_ref(),
            request.config.as_ref(),
            value_type,
            &request.resource_type,
            registry,
        );

        let diagnostics = client.apply_resource(&request.resource_type, &planned);
        let mut models = parsers.parse(&diagnostics);
        if models.is_empty() {
            tracing::debug!(address = %request.address, "no request extracted");
            out.push(RequestModel {
                address: request.address.clone(),
                failed: Some(FailedCase {
                    detail: diagnostics,
                }),
                ..RequestModel::default()
            });
            continue;
        }
        for model in &mut models {
            model.address = request.address.clone();
        }
        tracing::debug!(address = %request.address, count = models.len(), "extracted requests");

        let captured_url = models[0].url.clone();
        out.extend(models);

        let Some(resolved_id) = captured_resource_id(&captured_url) else {
            continue;
        };
        let mut ref_values = BTreeMap::new();
        ref_values.insert(format!("{}.id", request.address), resolved_id);
        for downstream in remaining.iter_mut() {
            let value_type = client.value_type(&downstream.resource_type);
            if let Some(config) = downstream.config.as_mut() {
                propagate_known_values(config, &ref_values, value_type);
            }
        }
    }
    Ok(out)
}

/// Parses the captured URL into a canonical resource ID for propagation.
///
/// Spring service IDs are case-fixed so downstream references match the form
/// the control plane reports.
fn captured_resource_id(captured_url: &str) -> Option<String> {
    let parsed = Url::parse(captured_url).ok()?;
    let resource_id = ResourceId::parse(parsed.path()).ok()?;
    Some(
        resource_id
            .to_string()
            .replace("/Microsoft.AppPlatform/Spring", "/Microsoft.AppPlatform/spring"),
    )
}

// crates/planguard-arm/src/policy.rs
// ============================================================================
// Module: Policy Restriction Check
// Description: Policy evaluation of a captured resource payload.
// Purpose: Surface policy denials before any resource exists.
// Dependencies: planguard-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The same captured `(url, body)` pair the preflight path consumes can be
//! shipped to the policy-check endpoint. The scope defaults to the
//! subscription; when the captured resource's immediate parent is a resource
//! group, the group becomes the scope. Any policy evaluation whose result is
//! not `NotApplicable` is a non-compliance failure carrying the raw response
//! so operators can see the offending rule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use planguard_core::ResourceId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::client::ArmClient;
use crate::client::ArmError;

/// Pinned policy api-version.
const CHECK_POLICY_API_VERSION: &str = "2023-03-01";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy check errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The captured URL did not parse.
    #[error("invalid captured url: {0}")]
    InvalidUrl(String),
    /// The captured URL path was not a resource ID.
    #[error("invalid resource id: {0}")]
    InvalidResourceId(String),
    /// The captured body was not a JSON object.
    #[error("invalid captured body: {0}")]
    InvalidBody(String),
    /// The policy endpoint call failed.
    #[error(transparent)]
    Call(#[from] ArmError),
    /// A policy evaluation denied the resource.
    #[error("resource is not compliant with policy: {response}")]
    NonCompliant {
        /// Raw response text for operator inspection.
        response: String,
    },
}

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// Policy check request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct CheckPolicyRestrictionsRequest {
    /// Resource under evaluation.
    #[serde(rename = "resourceDetails")]
    pub resource_details: ResourceDetails,
    /// Audit effects are excluded from evaluation.
    #[serde(rename = "includeAuditEffect")]
    pub include_audit_effect: bool,
}

/// Resource content wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDetails {
    /// Resource body with `type` and `name` injected.
    #[serde(rename = "resourceContent")]
    pub resource_content: Map<String, Value>,
    /// Api-version the captured request targeted.
    #[serde(rename = "apiVersion")]
    pub api_version: String,
}

/// Policy check response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckPolicyRestrictionsResponse {
    /// Field-level restrictions.
    #[serde(default, rename = "fieldRestrictions")]
    pub field_restrictions: Vec<Value>,
    /// Content evaluation outcome.
    #[serde(default, rename = "contentEvaluationResult")]
    pub content_evaluation_result: ContentEvaluationResult,
}

/// Evaluations produced for the submitted content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentEvaluationResult {
    /// Per-policy evaluations.
    #[serde(default, rename = "policyEvaluations")]
    pub policy_evaluations: Vec<PolicyEvaluation>,
}

/// One policy evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    /// Policy metadata.
    #[serde(default, rename = "policyInfo")]
    pub policy_info: Map<String, Value>,
    /// Evaluation result; `NotApplicable` means the policy does not bind.
    #[serde(default, rename = "evaluationResult")]
    pub evaluation_result: String,
    /// Evaluation details.
    #[serde(default, rename = "evaluationDetails")]
    pub evaluation_details: Map<String, Value>,
    /// Effect details.
    #[serde(default, rename = "effectDetails")]
    pub effect_details: Map<String, Value>,
}

// ============================================================================
// SECTION: Policy Check
// ============================================================================

/// Builds the policy envelope and scope for a captured `(url, body)` pair.
///
/// # Errors
///
/// Returns [`PolicyError`] when the captured request cannot be interpreted.
pub fn build_policy_request(
    request_url: &str,
    payload_json: &str,
    subscription_id: &str,
) -> Result<(String, CheckPolicyRestrictionsRequest), PolicyError> {
    let parsed_url =
        Url::parse(request_url).map_err(|err| PolicyError::InvalidUrl(err.to_string()))?;
    let resource_id = ResourceId::parse(parsed_url.path())
        .map_err(|err| PolicyError::InvalidResourceId(err.to_string()))?;
    let mut payload: Map<String, Value> = serde_json::from_str(payload_json)
        .map_err(|err| PolicyError::InvalidBody(err.to_string()))?;

    payload.insert(
        "type".to_string(),
        Value::String(resource_id.resource_type.to_string()),
    );
    payload.insert("name".to_string(), Value::String(resource_id.name.clone()));

    let api_version = parsed_url
        .query_pairs()
        .find(|(key, _)| key == "api-version")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    let mut scope = format!("/subscriptions/{subscription_id}");
    if let Some(parent) = resource_id.parent.as_deref() {
        if parent.is_resource_group() {
            scope = parent.to_string();
        }
    }

    Ok((
        scope,
        CheckPolicyRestrictionsRequest {
            resource_details: ResourceDetails {
                resource_content: payload,
                api_version,
            },
            include_audit_effect: false,
        },
    ))
}

/// Checks a captured request against policy restrictions.
///
/// # Errors
///
/// Returns [`PolicyError::NonCompliant`] when any evaluation result is not
/// `NotApplicable`, and other variants for transport or shaping failures.
pub fn check_policy_restrictions(
    client: &ArmClient,
    request_url: &str,
    payload_json: &str,
    subscription_id: &str,
) -> Result<CheckPolicyRestrictionsResponse, PolicyError> {
    let (scope, envelope) = build_policy_request(request_url, payload_json, subscription_id)?;
    let path = format!("{scope}/providers/Microsoft.PolicyInsights/checkPolicyRestrictions");
    let response: CheckPolicyRestrictionsResponse =
        client.post_json(&path, CHECK_POLICY_API_VERSION, &envelope)?;

    let binding = response
        .content_evaluation_result
        .policy_evaluations
        .iter()
        .find(|evaluation| evaluation.evaluation_result != "NotApplicable")
        .is_some_and(|evaluation| !evaluation.evaluation_result.is_empty());
    if binding {
        let rendered = serde_json::to_string_pretty(&response).unwrap_or_default();
        return Err(PolicyError::NonCompliant { response: rendered });
    }
    Ok(response)
}

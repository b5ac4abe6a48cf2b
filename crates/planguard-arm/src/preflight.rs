// crates/planguard-arm/src/preflight.rs
// ============================================================================
// Module: Preflight Dispatch
// Description: Request shaping, grouping, and bounded-concurrency dispatch.
// Purpose: Submit captured request bodies to the ARM validation endpoint.
// Dependencies: planguard-core, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each captured `(url, body)` pair is shaped into a validation envelope: the
//! URL path is parsed as a resource ID, the scope promoted to the nearest
//! routable container, the location normalised, and `apiVersion`/`name`
//! merged into the resource body. Envelopes with identical
//! `(provider, type, location, scope)` tuples are merged by concatenating
//! their `resources` arrays; the cloud endpoint accepts batched validation.
//! Dispatch fans grouped requests out to workers bounded by the configured
//! concurrency; failures are collected, never retried, and in-flight peers
//! are not cancelled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Mutex;
use std::thread;

use planguard_core::RequestModel;
use planguard_core::ResourceId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::client::ArmClient;
use crate::client::ArmError;

/// Validation endpoint path.
const VALIDATE_RESOURCES_PATH: &str = "/providers/Microsoft.Resources/validateResources";

/// Pinned validation api-version.
const VALIDATE_RESOURCES_API_VERSION: &str = "2020-10-01";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Preflight shaping and dispatch errors.
#[derive(Debug, Error)]
pub enum PreflightError {
    /// A captured URL did not parse.
    #[error("address: {address}, invalid captured url: {detail}")]
    InvalidUrl {
        /// Originating resource address.
        address: String,
        /// Parse failure detail.
        detail: String,
    },
    /// A captured URL path was not a resource ID.
    #[error("address: {address}, invalid resource id: {detail}")]
    InvalidResourceId {
        /// Originating resource address.
        address: String,
        /// Parse failure detail.
        detail: String,
    },
    /// A captured body was not a JSON object.
    #[error("address: {address}, invalid captured body: {detail}")]
    InvalidBody {
        /// Originating resource address.
        address: String,
        /// Decode failure detail.
        detail: String,
    },
    /// The validation call failed for a group.
    #[error("group {group}: {source}")]
    Dispatch {
        /// Group key `(provider|type|location|scope)`.
        group: String,
        /// Underlying call error.
        source: ArmError,
    },
}

// ============================================================================
// SECTION: Request Shaping
// ============================================================================

/// Validation envelope for one `(provider, type, location, scope)` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreflightRequest {
    /// Provider namespace.
    pub provider: String,
    /// Provider-relative resource type, slash-joined when nested.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Normalised location.
    pub location: String,
    /// Routing scope the call is addressed to.
    pub scope: String,
    /// Resource bodies with `apiVersion` and `name` merged in.
    pub resources: Vec<Map<String, Value>>,
}

impl PreflightRequest {
    /// Returns the grouping key.
    #[must_use]
    pub fn group_key(&self) -> String {
        [
            self.provider.as_str(),
            self.resource_type.as_str(),
            self.location.as_str(),
            self.scope.as_str(),
        ]
        .join("|")
    }
}

/// Validation response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreflightResponse {
    /// Response properties.
    #[serde(default)]
    pub properties: PreflightProperties,
}

/// Validation response properties.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreflightProperties {
    /// IDs of the resources the service validated.
    #[serde(default, rename = "validatedResources")]
    pub validated_resources: Vec<Value>,
}

/// Lowercases a location and strips spaces.
#[must_use]
pub fn normalize_location(input: &str) -> String {
    input.to_lowercase().replace(' ', "")
}

/// Shapes one captured request model into a validation envelope.
///
/// # Errors
///
/// Returns [`PreflightError`] when the captured URL, resource ID, or body
/// cannot be interpreted.
pub fn build_preflight_request(model: &RequestModel) -> Result<PreflightRequest, PreflightError> {
    let parsed_url = Url::parse(&model.url).map_err(|err| PreflightError::InvalidUrl {
        address: model.address.clone(),
        detail: err.to_string(),
    })?;
    let resource_id =
        ResourceId::parse(parsed_url.path()).map_err(|err| PreflightError::InvalidResourceId {
            address: model.address.clone(),
            detail: err.to_string(),
        })?;
    let mut payload: Map<String, Value> =
        serde_json::from_str(&model.body).map_err(|err| PreflightError::InvalidBody {
            address: model.address.clone(),
            detail: err.to_string(),
        })?;

    let location = payload
        .get("location")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let api_version = parsed_url
        .query_pairs()
        .find(|(key, _)| key == "api-version")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    let scope = resource_id
        .routing_scope()
        .map(ToString::to_string)
        .unwrap_or_default();

    payload.insert("apiVersion".to_string(), Value::String(api_version));
    payload.insert("name".to_string(), Value::String(resource_id.name.clone()));

    Ok(PreflightRequest {
        provider: resource_id.resource_type.namespace.clone(),
        resource_type: resource_id.resource_type.type_name.clone(),
        location: normalize_location(&location),
        scope,
        resources: vec![payload],
    })
}

/// Groups shaped requests by their `(provider, type, location, scope)` key,
/// concatenating `resources` in input order within each group.
#[must_use]
pub fn group_preflight_requests(requests: Vec<PreflightRequest>) -> Vec<PreflightRequest> {
    let mut grouped: BTreeMap<String, PreflightRequest> = BTreeMap::new();
    for request in requests {
        match grouped.entry(request.group_key()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().resources.extend(request.resources);
            }
            Entry::Vacant(entry) => {
                entry.insert(request);
            }
        }
    }
    grouped.into_values().collect()
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Submits one validation envelope.
///
/// # Errors
///
/// Returns [`ArmError`] when the call fails or answers non-2xx.
pub fn preflight(
    client: &ArmClient,
    request: &PreflightRequest,
) -> Result<PreflightResponse, ArmError> {
    client.post_json(
        VALIDATE_RESOURCES_PATH,
        VALIDATE_RESOURCES_API_VERSION,
        request,
    )
}

/// Shapes, groups, and dispatches captured request models under a
/// concurrency bound.
///
/// Models that fail shaping contribute an error without blocking the rest.
/// Returns the collected errors; an empty list means every group validated.
#[must_use]
pub fn preflight_in_batch(
    client: &ArmClient,
    models: &[RequestModel],
    concurrency: usize,
) -> Vec<PreflightError> {
    let mut errors = Vec::new();
    let mut shaped = Vec::with_capacity(models.len());
    for model in models {
        match build_preflight_request(model) {
            Ok(request) => shaped.push(request),
            Err(err) => errors.push(err),
        }
    }

    let shaped_count = shaped.len();
    let groups = group_preflight_requests(shaped);
    tracing::debug!(
        requests = shaped_count,
        groups = groups.len(),
        "grouped preflight requests"
    );

    let workers = concurrency.max(1).min(groups.len().max(1));
    let queue = Mutex::new(groups.into_iter());
    let collected = Mutex::new(Vec::new());
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let Some(group) = queue
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .next()
                else {
                    break;
                };
                if let Err(err) = preflight(client, &group) {
                    collected
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .push(PreflightError::Dispatch {
                            group: group.group_key(),
                            source: err,
                        });
                }
            });
        }
    });

    errors.extend(
        collected
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner),
    );
    errors
}

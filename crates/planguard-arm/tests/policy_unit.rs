// crates/planguard-arm/tests/policy_unit.rs
// ============================================================================
// Module: Policy Check Tests
// Description: Policy envelope construction and evaluation scanning.
// Purpose: Pin scope defaulting and the non-compliance decision rule.
// Dependencies: planguard-arm, serde_json
// ============================================================================

//! Policy restriction envelope and response-scan behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use planguard_arm::policy::CheckPolicyRestrictionsResponse;
use planguard_arm::policy::build_policy_request;
use serde_json::json;

#[test]
fn builds_envelope_with_type_and_name_injected() {
    let (scope, envelope) = build_policy_request(
        "https://management.azure.com/subscriptions/S/resourceGroups/myResourceGroup/providers/Microsoft.Network/networkSecurityGroups/mysg?api-version=2024-01-01",
        r#"{"location":"eastus","properties":{"securityRules":[]}}"#,
        "S",
    )
    .unwrap();

    assert_eq!(scope, "/subscriptions/S/resourceGroups/myResourceGroup");
    assert!(!envelope.include_audit_effect);
    assert_eq!(envelope.resource_details.api_version, "2024-01-01");
    assert_eq!(
        envelope.resource_details.resource_content["type"],
        json!("Microsoft.Network/networkSecurityGroups")
    );
    assert_eq!(
        envelope.resource_details.resource_content["name"],
        json!("mysg")
    );
}

#[test]
fn defaults_scope_to_subscription_for_nested_resources() {
    let (scope, _) = build_policy_request(
        "https://management.azure.com/subscriptions/S/resourceGroups/R/providers/Microsoft.AppPlatform/Spring/sp/apps/ap?api-version=2023-05-01-preview",
        "{}",
        "S",
    )
    .unwrap();
    // The immediate parent is the Spring service, not a resource group.
    assert_eq!(scope, "/subscriptions/S");
}

#[test]
fn response_scan_treats_not_applicable_as_compliant() {
    let response: CheckPolicyRestrictionsResponse = serde_json::from_value(json!({
        "contentEvaluationResult": {
            "policyEvaluations": [
                {"evaluationResult": "NotApplicable"},
                {"evaluationResult": "NotApplicable"}
            ]
        }
    }))
    .unwrap();
    let denied = response
        .content_evaluation_result
        .policy_evaluations
        .iter()
        .any(|evaluation| {
            evaluation.evaluation_result != "NotApplicable"
                && !evaluation.evaluation_result.is_empty()
        });
    assert!(!denied);
}

#[test]
fn response_scan_flags_deny_evaluations() {
    let response: CheckPolicyRestrictionsResponse = serde_json::from_value(json!({
        "contentEvaluationResult": {
            "policyEvaluations": [
                {"evaluationResult": "NotApplicable"},
                {
                    "evaluationResult": "Deny",
                    "policyInfo": {"policyEffect": "Deny"}
                }
            ]
        }
    }))
    .unwrap();
    let denied = response
        .content_evaluation_result
        .policy_evaluations
        .iter()
        .find(|evaluation| evaluation.evaluation_result != "NotApplicable");
    assert_eq!(denied.unwrap().evaluation_result, "Deny");
}

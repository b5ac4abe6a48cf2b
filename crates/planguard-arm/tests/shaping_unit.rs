// crates/planguard-arm/tests/shaping_unit.rs
// ============================================================================
// Module: Request Shaping Tests
// Description: Envelope construction, scope promotion, and grouping.
// Purpose: Pin the preflight envelope contract for captured requests.
// Dependencies: planguard-arm, planguard-core, serde_json
// ============================================================================

//! Preflight shaping and grouping behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use planguard_arm::PreflightRequest;
use planguard_arm::build_preflight_request;
use planguard_arm::normalize_location;
use planguard_arm::preflight::group_preflight_requests;
use planguard_core::RequestModel;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

fn model(url: &str, body: &str) -> RequestModel {
    RequestModel {
        url: url.to_string(),
        body: body.to_string(),
        address: "azurerm_example.test".to_string(),
        failed: None,
    }
}

#[test]
fn shapes_storage_account_request() {
    let shaped = build_preflight_request(&model(
        "https://management.azure.com/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myrg/providers/Microsoft.Storage/storageAccounts/sa1?api-version=2023-01-01",
        r#"{"location":"East US","properties":{"kind":"StorageV2"}}"#,
    ))
    .unwrap();

    assert_eq!(shaped.provider, "Microsoft.Storage");
    assert_eq!(shaped.resource_type, "storageAccounts");
    assert_eq!(shaped.location, "eastus");
    assert_eq!(
        shaped.scope,
        "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myrg"
    );
    assert_eq!(shaped.resources.len(), 1);
    assert_eq!(shaped.resources[0]["apiVersion"], json!("2023-01-01"));
    assert_eq!(shaped.resources[0]["name"], json!("sa1"));
}

#[test]
fn promotes_nested_resources_to_their_container_scope() {
    let shaped = build_preflight_request(&model(
        "https://management.azure.com/subscriptions/S/resourceGroups/R/providers/Microsoft.AppPlatform/Spring/sp/apps/ap?api-version=2023-05-01-preview",
        r#"{"properties":{"public":false}}"#,
    ))
    .unwrap();

    assert_eq!(shaped.scope, "/subscriptions/S/resourceGroups/R");
    assert_eq!(shaped.provider, "Microsoft.AppPlatform");
    assert_eq!(shaped.resource_type, "Spring/apps");
    assert_eq!(shaped.resources[0]["name"], json!("ap"));
    assert_eq!(
        shaped.resources[0]["apiVersion"],
        json!("2023-05-01-preview")
    );
    // No location in the body normalises to the empty string.
    assert_eq!(shaped.location, "");
}

#[test]
fn normalises_location_at_envelope_construction() {
    let shaped = build_preflight_request(&model(
        "https://management.azure.com/subscriptions/S/resourceGroups/R/providers/Microsoft.Network/virtualNetworks/v?api-version=2024-01-01",
        r#"{"location":"East US"}"#,
    ))
    .unwrap();
    assert_eq!(shaped.location, "eastus");
}

#[test]
fn rejects_unparseable_captures() {
    assert!(build_preflight_request(&model("not a url", "{}")).is_err());
    assert!(build_preflight_request(&model(
        "https://myKeyVault.vault.azure.net/keys/myKey?api-version=7.4",
        "{}"
    ))
    .is_err());
    assert!(build_preflight_request(&model(
        "https://management.azure.com/subscriptions/S/resourceGroups/R/providers/Microsoft.Network/virtualNetworks/v?api-version=2024-01-01",
        "[1,2]"
    ))
    .is_err());
}

#[test]
fn group_key_joins_the_four_fields() {
    let request = PreflightRequest {
        provider: "Microsoft.Storage".to_string(),
        resource_type: "storageAccounts".to_string(),
        location: normalize_location("West US"),
        scope: "/subscriptions/000/resourceGroups/rg".to_string(),
        resources: Vec::new(),
    };
    assert_eq!(
        request.group_key(),
        "Microsoft.Storage|storageAccounts|westus|/subscriptions/000/resourceGroups/rg"
    );
}

#[test]
fn grouping_merges_equal_tuples_in_input_order() {
    let body = |name: &str| -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(name.to_string()));
        map
    };
    let make = |name: &str, location: &str| PreflightRequest {
        provider: "Microsoft.Storage".to_string(),
        resource_type: "storageAccounts".to_string(),
        location: location.to_string(),
        scope: "/subscriptions/S".to_string(),
        resources: vec![body(name)],
    };

    let grouped = group_preflight_requests(vec![
        make("first", "eastus"),
        make("other-region", "westus"),
        make("second", "eastus"),
    ]);
    assert_eq!(grouped.len(), 2);

    let east = grouped
        .iter()
        .find(|g| g.location == "eastus")
        .unwrap();
    let names: Vec<&str> = east
        .resources
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn normalize_location_is_idempotent() {
    for input in ["East US", "eastus", "North Europe", ""] {
        let once = normalize_location(input);
        assert_eq!(normalize_location(&once), once);
        assert!(!once.contains(' '));
        assert!(!once.chars().any(char::is_uppercase));
    }
}

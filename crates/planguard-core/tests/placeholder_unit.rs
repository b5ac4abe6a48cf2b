// crates/planguard-core/tests/placeholder_unit.rs
// ============================================================================
// Module: Placeholder Registry Tests
// Description: Catalog materialization and the three lookup contracts.
// Purpose: Pin placeholder shapes and subscription substitution.
// Dependencies: planguard-core, serde_json
// ============================================================================

//! Placeholder registry behavior tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use planguard_core::PlaceholderRegistry;
use planguard_core::Primitive;
use planguard_core::SchemaType;
use serde_json::Value;
use serde_json::json;

fn string_list() -> SchemaType {
    SchemaType::List {
        element: Box::new(SchemaType::Primitive(Primitive::String)),
    }
}

#[test]
fn materializes_catalog_id_patterns() {
    let registry = PlaceholderRegistry::load(None).unwrap();
    assert_eq!(
        registry.for_resource_type_path("azurerm_resource_group", "id"),
        Some("/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup")
    );
    assert_eq!(
        registry.for_resource_type_path("azurerm_storage_account", "id"),
        Some(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Storage/storageAccounts/storageAccountsName"
        )
    );
    assert!(registry.for_resource_type_path("azurerm_absent", "id").is_none());
}

#[test]
fn every_registered_type_gets_identity_placeholders() {
    let registry = PlaceholderRegistry::load(None).unwrap();
    assert_eq!(
        registry.for_resource_type_path("azurerm_storage_account", "identity[0].principal_id"),
        Some("00000000-0000-0000-0000-000000000000")
    );
    assert_eq!(
        registry.for_resource_type_path("azurerm_kubernetes_cluster", "identity[0].tenant_id"),
        Some("00000000-0000-0000-0000-000000000000")
    );
}

#[test]
fn substitutes_detected_subscription_into_ids() {
    let registry =
        PlaceholderRegistry::load(Some("11111111-2222-3333-4444-555555555555")).unwrap();
    let id = registry
        .for_resource_type_path("azurerm_storage_account", "id")
        .unwrap();
    assert!(id.starts_with("/subscriptions/11111111-2222-3333-4444-555555555555/"));

    // Free-form values without the subscription prefix are untouched.
    assert_eq!(
        registry.for_resource_type_path("azurerm_storage_account", "primary_access_key"),
        Some("ZmFrZV9hY2Nlc3Nfa2V5")
    );
    assert_eq!(
        registry.for_resource_type_path("azurerm_application_insights", "instrumentation_key"),
        Some("00000000-0000-0000-0000-000000000000")
    );
}

#[test]
fn unknown_reference_returns_scalar_by_default() {
    let registry = PlaceholderRegistry::load(None).unwrap();
    let value = registry
        .for_unknown_reference(&["azurerm_resource_group.test.id".to_string()], None)
        .unwrap();
    assert_eq!(
        value,
        json!("/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup")
    );
}

#[test]
fn unknown_reference_returns_list_for_string_collections() {
    let registry = PlaceholderRegistry::load(None).unwrap();
    for value_type in [
        string_list(),
        SchemaType::Set {
            element: Box::new(SchemaType::Primitive(Primitive::String)),
        },
        SchemaType::Tuple {
            elements: vec![SchemaType::Primitive(Primitive::String)],
        },
    ] {
        let value = registry
            .for_unknown_reference(
                &["azurerm_resource_group.test.id".to_string()],
                Some(&value_type),
            )
            .unwrap();
        let Value::Array(items) = value else {
            panic!("expected list placeholder, got {value}");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0],
            json!(
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup"
            )
        );
    }
}

#[test]
fn unknown_reference_skips_unmatched_shapes() {
    let registry = PlaceholderRegistry::load(None).unwrap();
    assert!(registry.for_unknown_reference(&[], None).is_none());
    assert!(registry
        .for_unknown_reference(&["var.location".to_string()], None)
        .is_none());
    assert!(registry
        .for_unknown_reference(&["azurerm_absent_kind.x.id".to_string()], None)
        .is_none());
    // Non-string collections get the first hit as a scalar.
    let number_list = SchemaType::List {
        element: Box::new(SchemaType::Primitive(Primitive::Number)),
    };
    let value = registry
        .for_unknown_reference(
            &["azurerm_resource_group.test.id".to_string()],
            Some(&number_list),
        )
        .unwrap();
    assert!(value.is_string());
}

#[test]
fn parent_sensitive_paths_resolve() {
    let registry = PlaceholderRegistry::load(None).unwrap();
    let value = registry
        .for_path("azurerm_virtual_network_gateway.ip_configuration.0.subnet_id")
        .unwrap();
    let Value::String(id) = value else {
        panic!("expected string path placeholder");
    };
    assert!(id.ends_with("subnets/GatewaySubnet"));
    assert!(registry.for_path("azurerm_absent.path").is_none());
}

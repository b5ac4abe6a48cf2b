// crates/planguard-core/tests/schedule_unit.rs
// ============================================================================
// Module: Scheduler Tests
// Description: Topological ordering behavior of the dependency scheduler.
// Purpose: Pin producer-before-dependent order and cycle drop semantics.
// Dependencies: planguard-core
// ============================================================================

//! Ordering tests for the Kahn scheduler over apply requests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use planguard_core::ApplyRequest;
use planguard_core::sort_requests;

fn request(address: &str, depends_on: &[&str]) -> ApplyRequest {
    ApplyRequest {
        address: address.to_string(),
        depends_on: depends_on.iter().map(ToString::to_string).collect(),
        ..ApplyRequest::default()
    }
}

fn addresses(requests: &[ApplyRequest]) -> Vec<&str> {
    requests.iter().map(|r| r.address.as_str()).collect()
}

#[test]
fn orders_producer_before_dependent() {
    let sorted = sort_requests(vec![
        request("azurerm_storage_account.test", &["azurerm_resource_group.test"]),
        request("azurerm_resource_group.test", &[]),
    ]);
    assert_eq!(
        addresses(&sorted),
        vec!["azurerm_resource_group.test", "azurerm_storage_account.test"]
    );
}

#[test]
fn orders_three_stage_chain() {
    let sorted = sort_requests(vec![
        request("azurerm_storage_account.test", &["azurerm_resource_group.test"]),
        request("azurerm_resource_group.test", &[]),
        request("azurerm_synapse_workspace.test", &["azurerm_storage_account.test"]),
    ]);
    assert_eq!(
        addresses(&sorted),
        vec![
            "azurerm_resource_group.test",
            "azurerm_storage_account.test",
            "azurerm_synapse_workspace.test"
        ]
    );
}

#[test]
fn ignores_references_outside_the_batch() {
    let sorted = sort_requests(vec![
        request("azurerm_subnet.test", &["azurerm_virtual_network.absent"]),
        request("azurerm_resource_group.test", &[]),
    ]);
    assert_eq!(
        addresses(&sorted),
        vec!["azurerm_subnet.test", "azurerm_resource_group.test"]
    );
}

#[test]
fn preserves_insertion_order_for_equally_ready_requests() {
    let sorted = sort_requests(vec![
        request("azurerm_resource_group.b", &[]),
        request("azurerm_resource_group.a", &[]),
        request("azurerm_resource_group.c", &[]),
    ]);
    assert_eq!(
        addresses(&sorted),
        vec![
            "azurerm_resource_group.b",
            "azurerm_resource_group.a",
            "azurerm_resource_group.c"
        ]
    );
}

#[test]
fn drops_cycle_members() {
    let sorted = sort_requests(vec![
        request("azurerm_lb.a", &["azurerm_lb.b"]),
        request("azurerm_lb.b", &["azurerm_lb.a"]),
        request("azurerm_resource_group.test", &[]),
    ]);
    assert_eq!(addresses(&sorted), vec!["azurerm_resource_group.test"]);
}

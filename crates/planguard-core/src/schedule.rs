// crates/planguard-core/src/schedule.rs
// ============================================================================
// Module: Dependency Scheduler
// Description: Topological ordering of apply requests by reference edges.
// Purpose: Process producers before the resources that reference them.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The scheduler builds a forward adjacency graph from resource addresses to
//! their dependents and emits a Kahn traversal over it. Only references to
//! addresses present in the batch count as edges; everything else is outside
//! the plan and ignored. Requests that are ready at the same time keep their
//! plan order, so the result is deterministic for a fixed input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::plan::ApplyRequest;

// ============================================================================
// SECTION: Topological Sort
// ============================================================================

/// Orders apply requests so dependencies come before their dependents.
///
/// Cycles never reach zero in-degree and are silently dropped from the
/// output, matching the documented pipeline limitation.
#[must_use]
pub fn sort_requests(requests: Vec<ApplyRequest>) -> Vec<ApplyRequest> {
    let index_by_address: HashMap<&str, usize> = requests
        .iter()
        .enumerate()
        .map(|(index, request)| (request.address.as_str(), index))
        .collect();

    let mut in_degree = vec![0_usize; requests.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); requests.len()];
    for (index, request) in requests.iter().enumerate() {
        for dependency in &request.depends_on {
            if let Some(&producer) = index_by_address.get(dependency.as_str()) {
                in_degree[index] += 1;
                dependents[producer].push(index);
            }
        }
    }

    let mut ready: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect();

    let mut order = Vec::with_capacity(requests.len());
    while let Some(index) = ready.pop_front() {
        order.push(index);
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    let mut slots: Vec<Option<ApplyRequest>> = requests.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

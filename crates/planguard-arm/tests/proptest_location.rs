// crates/planguard-arm/tests/proptest_location.rs
// ============================================================================
// Module: Location Normalisation Property Tests
// Description: Randomized checks of location normalisation laws.
// Purpose: Ensure idempotence and the no-space, no-uppercase guarantees.
// Dependencies: planguard-arm, proptest
// ============================================================================

//! Property tests for location normalisation.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use planguard_arm::normalize_location;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalisation_is_idempotent(input in "[A-Za-z0-9 ]{0,32}") {
        let once = normalize_location(&input);
        prop_assert_eq!(normalize_location(&once), once.clone());
        prop_assert!(!once.contains(' '));
        prop_assert!(!once.chars().any(char::is_uppercase));
    }
}

// crates/planguard-core/tests/intercept_unit.rs
// ============================================================================
// Module: Interception Driver Tests
// Description: Apply bounds and diagnostics rendering of the driver.
// Purpose: Pin timeout, panic guard, schema-miss, and render behavior.
// Dependencies: planguard-core, serde_json
// ============================================================================

//! Interception driver behavior tests against stub providers.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use planguard_core::ApplyResourceChange;
use planguard_core::Diagnostic;
use planguard_core::DiagnosticSeverity;
use planguard_core::InterceptClient;
use planguard_core::ProviderError;
use planguard_core::ProviderSchema;
use planguard_core::ProviderServer;
use planguard_core::SchemaType;
use serde_json::Value;
use serde_json::json;

/// Stub provider whose apply behavior is selected per test.
struct StubProvider {
    behavior: Behavior,
}

enum Behavior {
    Diagnostics(Vec<Diagnostic>),
    Panic,
    Hang,
    TransportError,
}

fn stub_schema() -> ProviderSchema {
    let mut resources = BTreeMap::new();
    resources.insert(
        "azurerm_resource_group".to_string(),
        SchemaType::Object {
            attributes: BTreeMap::new(),
        },
    );
    ProviderSchema {
        provider: SchemaType::Object {
            attributes: BTreeMap::new(),
        },
        resources,
    }
}

impl ProviderServer for StubProvider {
    fn schema(&self) -> Result<ProviderSchema, ProviderError> {
        Ok(stub_schema())
    }

    fn configure(&self, _config: &Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(Vec::new())
    }

    fn apply_resource_change(
        &self,
        _request: ApplyResourceChange,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        match &self.behavior {
            Behavior::Diagnostics(diagnostics) => Ok(diagnostics.clone()),
            Behavior::Panic => panic!("stub provider exploded"),
            Behavior::Hang => {
                thread::sleep(Duration::from_secs(30));
                Ok(Vec::new())
            }
            Behavior::TransportError => {
                Err(ProviderError::Transport("socket closed".to_string()))
            }
        }
    }
}

fn client(behavior: Behavior) -> InterceptClient {
    InterceptClient::new(Arc::new(StubProvider { behavior }), Some("S")).unwrap()
}

#[test]
fn renders_summary_and_distinct_detail() {
    let client = client(Behavior::Diagnostics(vec![
        Diagnostic {
            severity: DiagnosticSeverity::Error,
            summary: "first".to_string(),
            detail: "first".to_string(),
        },
        Diagnostic {
            severity: DiagnosticSeverity::Error,
            summary: "second".to_string(),
            detail: "second detail".to_string(),
        },
    ]));
    let rendered = client.apply_resource("azurerm_resource_group", &json!({}));
    assert_eq!(
        rendered,
        "error applying resource change: first\nsecond\nsecond detail\n"
    );
}

#[test]
fn reports_missing_resource_types() {
    let client = client(Behavior::Diagnostics(Vec::new()));
    let rendered = client.apply_resource("azurerm_absent", &json!({}));
    assert_eq!(
        rendered,
        "resource type azurerm_absent not found in provider schema"
    );
}

#[test]
fn converts_panics_into_parser_input() {
    let client = client(Behavior::Panic);
    let rendered = client.apply_resource("azurerm_resource_group", &json!({}));
    assert!(rendered.contains("provider call panicked"));
    assert!(rendered.contains("stub provider exploded"));
}

#[test]
fn bounds_hanging_applies_with_a_timeout() {
    let client = client(Behavior::Hang);
    let rendered = client.apply_resource("azurerm_resource_group", &json!({}));
    assert!(rendered.contains("timed out"));
}

#[test]
fn surfaces_transport_errors_as_text() {
    let client = client(Behavior::TransportError);
    let rendered = client.apply_resource("azurerm_resource_group", &json!({}));
    assert_eq!(rendered, "provider transport error: socket closed");
}

#[test]
fn exposes_resource_value_types() {
    let client = client(Behavior::Diagnostics(Vec::new()));
    assert!(client.value_type("azurerm_resource_group").is_some());
    assert!(client.value_type("azurerm_absent").is_none());
    assert!(matches!(
        client.value_type("azurerm_resource_group"),
        Some(SchemaType::Object { .. })
    ));
}

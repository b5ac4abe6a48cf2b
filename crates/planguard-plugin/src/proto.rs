// crates/planguard-plugin/src/proto.rs
// ============================================================================
// Module: tfplugin5 Wire Messages
// Description: Hand-written prost structs for the protocol subset in use.
// Purpose: Encode the four plugin operations without generated code.
// Dependencies: planguard-core, prost, serde_json
// ============================================================================

//! ## Overview
//! Field numbers follow the published `tfplugin5.proto`; only the messages
//! the pipeline exercises are declared, and unknown fields are skipped on
//! decode. Attribute types arrive as cty type JSON inside `bytes` fields and
//! convert into [`planguard_core::SchemaType`] via the core parser.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use planguard_core::Diagnostic;
use planguard_core::DiagnosticSeverity;
use planguard_core::ProviderError;
use planguard_core::SchemaType;
use prost::Message;

// ============================================================================
// SECTION: Common Messages
// ============================================================================

/// A value in one of the protocol's two encodings; exactly one side is set.
#[derive(Clone, PartialEq, Message)]
pub struct DynamicValue {
    /// Msgpack encoding.
    #[prost(bytes = "vec", tag = "1")]
    pub msgpack: Vec<u8>,
    /// JSON encoding.
    #[prost(bytes = "vec", tag = "2")]
    pub json: Vec<u8>,
}

impl DynamicValue {
    /// Wraps a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when serialization fails.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ProviderError> {
        Ok(Self {
            msgpack: Vec::new(),
            json: serde_json::to_vec(value)
                .map_err(|err| ProviderError::Transport(err.to_string()))?,
        })
    }
}

/// Wire diagnostic; severity is the protocol enum as a bare integer.
#[derive(Clone, PartialEq, Message)]
pub struct WireDiagnostic {
    /// 0 invalid, 1 error, 2 warning.
    #[prost(int32, tag = "1")]
    pub severity: i32,
    /// Short description.
    #[prost(string, tag = "2")]
    pub summary: String,
    /// Long description.
    #[prost(string, tag = "3")]
    pub detail: String,
}

impl From<WireDiagnostic> for Diagnostic {
    fn from(wire: WireDiagnostic) -> Self {
        let severity = match wire.severity {
            1 => DiagnosticSeverity::Error,
            2 => DiagnosticSeverity::Warning,
            _ => DiagnosticSeverity::Invalid,
        };
        Self {
            severity,
            summary: wire.summary,
            detail: wire.detail,
        }
    }
}

/// Converts a diagnostics list off the wire.
pub fn convert_diagnostics(wire: Vec<WireDiagnostic>) -> Vec<Diagnostic> {
    wire.into_iter().map(Diagnostic::from).collect()
}

// ============================================================================
// SECTION: Schema Messages
// ============================================================================

/// Resource or provider schema.
#[derive(Clone, PartialEq, Message)]
pub struct Schema {
    /// Schema version.
    #[prost(int64, tag = "1")]
    pub version: i64,
    /// Root block.
    #[prost(message, optional, tag = "2")]
    pub block: Option<SchemaBlock>,
}

/// One schema block.
#[derive(Clone, PartialEq, Message)]
pub struct SchemaBlock {
    /// Block version.
    #[prost(int64, tag = "1")]
    pub version: i64,
    /// Leaf attributes.
    #[prost(message, repeated, tag = "2")]
    pub attributes: Vec<SchemaAttribute>,
    /// Nested block types.
    #[prost(message, repeated, tag = "3")]
    pub block_types: Vec<SchemaNestedBlock>,
}

/// One leaf attribute.
#[derive(Clone, PartialEq, Message)]
pub struct SchemaAttribute {
    /// Attribute name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// cty type JSON.
    #[prost(bytes = "vec", tag = "2")]
    pub type_json: Vec<u8>,
    /// Attribute description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Required flag.
    #[prost(bool, tag = "4")]
    pub required: bool,
    /// Optional flag.
    #[prost(bool, tag = "5")]
    pub optional: bool,
    /// Computed flag.
    #[prost(bool, tag = "6")]
    pub computed: bool,
    /// Sensitive flag.
    #[prost(bool, tag = "7")]
    pub sensitive: bool,
}

/// Block nesting modes.
pub mod nesting {
    /// Mode was not set.
    pub const INVALID: i32 = 0;
    /// A single nested object.
    pub const SINGLE: i32 = 1;
    /// A list of nested objects.
    pub const LIST: i32 = 2;
    /// A set of nested objects.
    pub const SET: i32 = 3;
    /// A map of nested objects.
    pub const MAP: i32 = 4;
    /// A single object that is always present.
    pub const GROUP: i32 = 5;
}

/// One nested block type.
#[derive(Clone, PartialEq, Message)]
pub struct SchemaNestedBlock {
    /// Block type name.
    #[prost(string, tag = "1")]
    pub type_name: String,
    /// Nested block body.
    #[prost(message, optional, tag = "2")]
    pub block: Option<SchemaBlock>,
    /// Nesting mode; see [`nesting`].
    #[prost(int32, tag = "3")]
    pub nesting: i32,
    /// Minimum items.
    #[prost(int64, tag = "4")]
    pub min_items: i64,
    /// Maximum items.
    #[prost(int64, tag = "5")]
    pub max_items: i64,
}

/// Derives the value type of a schema block: attributes plus nested block
/// types folded into one object schema.
///
/// # Errors
///
/// Returns [`ProviderError::Schema`] when an attribute type fails to parse.
pub fn block_value_type(block: &SchemaBlock) -> Result<SchemaType, ProviderError> {
    let mut attributes = BTreeMap::new();
    for attribute in &block.attributes {
        let cty: serde_json::Value = serde_json::from_slice(&attribute.type_json)
            .map_err(|err| ProviderError::Schema(format!("{}: {err}", attribute.name)))?;
        let parsed = SchemaType::from_cty_json(&cty)
            .map_err(|err| ProviderError::Schema(format!("{}: {err}", attribute.name)))?;
        attributes.insert(attribute.name.clone(), parsed);
    }
    for nested in &block.block_types {
        let empty = SchemaBlock::default();
        let inner = block_value_type(nested.block.as_ref().unwrap_or(&empty))?;
        let folded = match nested.nesting {
            nesting::LIST => SchemaType::List {
                element: Box::new(inner),
            },
            nesting::SET => SchemaType::Set {
                element: Box::new(inner),
            },
            nesting::MAP => SchemaType::Map {
                element: Box::new(inner),
            },
            _ => inner,
        };
        attributes.insert(nested.type_name.clone(), folded);
    }
    Ok(SchemaType::Object { attributes })
}

// ============================================================================
// SECTION: Operation Messages
// ============================================================================

/// `GetSchema` request.
#[derive(Clone, PartialEq, Message)]
pub struct GetProviderSchemaRequest {}

/// `GetSchema` response subset.
#[derive(Clone, PartialEq, Message)]
pub struct GetProviderSchemaResponse {
    /// Provider configuration schema.
    #[prost(message, optional, tag = "1")]
    pub provider: Option<Schema>,
    /// Resource schemas by type name.
    #[prost(btree_map = "string, message", tag = "2")]
    pub resource_schemas: BTreeMap<String, Schema>,
    /// Data source schemas by type name.
    #[prost(btree_map = "string, message", tag = "3")]
    pub data_source_schemas: BTreeMap<String, Schema>,
    /// Fetch diagnostics.
    #[prost(message, repeated, tag = "4")]
    pub diagnostics: Vec<WireDiagnostic>,
}

/// `Configure` request.
#[derive(Clone, PartialEq, Message)]
pub struct ConfigureRequest {
    /// Terraform version string announced to the provider.
    #[prost(string, tag = "1")]
    pub terraform_version: String,
    /// Provider configuration value.
    #[prost(message, optional, tag = "2")]
    pub config: Option<DynamicValue>,
}

/// `Configure` response.
#[derive(Clone, PartialEq, Message)]
pub struct ConfigureResponse {
    /// Configure diagnostics.
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: Vec<WireDiagnostic>,
}

/// `ApplyResourceChange` request.
#[derive(Clone, PartialEq, Message)]
pub struct ApplyResourceChangeRequest {
    /// Resource type name.
    #[prost(string, tag = "1")]
    pub type_name: String,
    /// Prior state.
    #[prost(message, optional, tag = "2")]
    pub prior_state: Option<DynamicValue>,
    /// Planned state.
    #[prost(message, optional, tag = "3")]
    pub planned_state: Option<DynamicValue>,
    /// Configuration value.
    #[prost(message, optional, tag = "4")]
    pub config: Option<DynamicValue>,
    /// Opaque planned private state.
    #[prost(bytes = "vec", tag = "5")]
    pub planned_private: Vec<u8>,
    /// Provider metadata value.
    #[prost(message, optional, tag = "6")]
    pub provider_meta: Option<DynamicValue>,
}

/// `ApplyResourceChange` response subset.
#[derive(Clone, PartialEq, Message)]
pub struct ApplyResourceChangeResponse {
    /// New state value.
    #[prost(message, optional, tag = "1")]
    pub new_state: Option<DynamicValue>,
    /// Opaque private state.
    #[prost(bytes = "vec", tag = "2")]
    pub private: Vec<u8>,
    /// Apply diagnostics; under interception these embed the trapped request.
    #[prost(message, repeated, tag = "3")]
    pub diagnostics: Vec<WireDiagnostic>,
    /// Legacy type system marker.
    #[prost(bool, tag = "4")]
    pub legacy_type_system: bool,
}

/// `Stop` request.
#[derive(Clone, PartialEq, Message)]
pub struct StopRequest {}

/// `Stop` response.
#[derive(Clone, PartialEq, Message)]
pub struct StopResponse {
    /// Error text, empty on success.
    #[prost(string, tag = "1")]
    pub error: String,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use planguard_core::SchemaType;
    use prost::Message;

    use super::SchemaAttribute;
    use super::SchemaBlock;
    use super::SchemaNestedBlock;
    use super::WireDiagnostic;
    use super::block_value_type;
    use super::nesting;

    fn attribute(name: &str, cty: &str) -> SchemaAttribute {
        SchemaAttribute {
            name: name.to_string(),
            type_json: cty.as_bytes().to_vec(),
            ..SchemaAttribute::default()
        }
    }

    #[test]
    fn folds_attributes_and_nested_blocks_into_an_object() {
        let block = SchemaBlock {
            version: 0,
            attributes: vec![
                attribute("name", "\"string\""),
                attribute("tags", "[\"map\",\"string\"]"),
            ],
            block_types: vec![SchemaNestedBlock {
                type_name: "ip_configuration".to_string(),
                block: Some(SchemaBlock {
                    version: 0,
                    attributes: vec![attribute("subnet_id", "\"string\"")],
                    block_types: Vec::new(),
                }),
                nesting: nesting::LIST,
                min_items: 0,
                max_items: 0,
            }],
        };

        let value_type = block_value_type(&block).unwrap();
        let SchemaType::Object { attributes } = &value_type else {
            panic!("expected object schema");
        };
        assert!(attributes["name"].is_string());
        assert!(matches!(attributes["ip_configuration"], SchemaType::List { .. }));
        let element = attributes["ip_configuration"].element_type(0).unwrap();
        assert!(element.attribute("subnet_id").is_some());
    }

    #[test]
    fn rejects_malformed_attribute_types() {
        let block = SchemaBlock {
            version: 0,
            attributes: vec![attribute("broken", "not json")],
            block_types: Vec::new(),
        };
        assert!(block_value_type(&block).is_err());
    }

    #[test]
    fn wire_messages_round_trip() {
        let diagnostic = WireDiagnostic {
            severity: 1,
            summary: "summary".to_string(),
            detail: "detail".to_string(),
        };
        let bytes = diagnostic.encode_to_vec();
        let decoded = WireDiagnostic::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, diagnostic);
    }
}

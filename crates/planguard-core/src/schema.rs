// crates/planguard-core/src/schema.rs
// ============================================================================
// Module: Schema Types
// Description: Tagged schema variants and the cty type-JSON parser.
// Purpose: Steer placeholder choice and list/scalar coercion during completion.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Provider schemas describe every resource as a tree of typed attributes.
//! [`SchemaType`] models that tree as a closed tagged variant so the value
//! completion engine can dispatch once per recursion step. Types arrive on the
//! wire as cty type JSON (`"string"`, `["list","string"]`,
//! `["object",{...}]`); [`SchemaType::from_cty_json`] parses that encoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema parsing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The cty type JSON used an unknown primitive or container keyword.
    #[error("unsupported cty type: {0}")]
    UnsupportedType(String),
    /// The cty type JSON was structurally malformed.
    #[error("malformed cty type: {0}")]
    Malformed(String),
}

// ============================================================================
// SECTION: Schema Variants
// ============================================================================

/// Primitive schema kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// A string attribute.
    String,
    /// A numeric attribute.
    Number,
    /// A boolean attribute.
    Bool,
}

/// Recursively-defined schema type for a planned value position.
///
/// # Invariants
/// - The completion engine dispatches on `Primitive`, `Object`, `List`, `Set`,
///   and `Tuple`; `Map` and `Dynamic` exist so real provider schemas parse and
///   behave as lookup misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    /// A primitive leaf.
    Primitive(Primitive),
    /// An object with named attributes.
    Object {
        /// Attribute name to schema type.
        attributes: BTreeMap<String, SchemaType>,
    },
    /// A list with a homogeneous element type.
    List {
        /// Element schema type.
        element: Box<SchemaType>,
    },
    /// A set with a homogeneous element type.
    Set {
        /// Element schema type.
        element: Box<SchemaType>,
    },
    /// A map with a homogeneous element type.
    Map {
        /// Element schema type.
        element: Box<SchemaType>,
    },
    /// A tuple with positional element types.
    Tuple {
        /// Positional element schema types.
        elements: Vec<SchemaType>,
    },
    /// The dynamic pseudo-type; carries no structural information.
    Dynamic,
}

impl SchemaType {
    /// Returns the named attribute type when this is an object.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&SchemaType> {
        match self {
            Self::Object { attributes } => attributes.get(name),
            _ => None,
        }
    }

    /// Returns true for the string primitive.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::Primitive(Primitive::String))
    }

    /// Returns true for list, set, and tuple containers.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::List { .. } | Self::Set { .. } | Self::Tuple { .. })
    }

    /// Returns true when this is a collection of strings.
    ///
    /// Tuples qualify by their first element type, mirroring how planned
    /// sequences are paired element-by-element with block zero.
    #[must_use]
    pub fn is_string_collection(&self) -> bool {
        match self {
            Self::List { element } | Self::Set { element } => element.is_string(),
            Self::Tuple { elements } => elements.first().is_some_and(SchemaType::is_string),
            _ => false,
        }
    }

    /// Returns the element type paired with sequence position `index`.
    #[must_use]
    pub fn element_type(&self, index: usize) -> Option<&SchemaType> {
        match self {
            Self::List { element } | Self::Set { element } | Self::Map { element } => {
                Some(element)
            }
            Self::Tuple { elements } => elements.get(index).or_else(|| elements.first()),
            _ => None,
        }
    }

    /// Parses a cty type JSON document into a schema type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the document uses an unknown keyword or is
    /// structurally malformed.
    pub fn from_cty_json(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(name) => match name.as_str() {
                "string" => Ok(Self::Primitive(Primitive::String)),
                "number" => Ok(Self::Primitive(Primitive::Number)),
                "bool" => Ok(Self::Primitive(Primitive::Bool)),
                "dynamic" => Ok(Self::Dynamic),
                other => Err(SchemaError::UnsupportedType(other.to_string())),
            },
            Value::Array(parts) => Self::from_cty_container(parts),
            other => Err(SchemaError::Malformed(other.to_string())),
        }
    }

    /// Parses the `[kind, argument]` container form of a cty type.
    fn from_cty_container(parts: &[Value]) -> Result<Self, SchemaError> {
        let Some(Value::String(kind)) = parts.first() else {
            return Err(SchemaError::Malformed(format!("{parts:?}")));
        };
        let argument = parts
            .get(1)
            .ok_or_else(|| SchemaError::Malformed(format!("{kind} without argument")))?;
        match kind.as_str() {
            "list" => Ok(Self::List {
                element: Box::new(Self::from_cty_json(argument)?),
            }),
            "set" => Ok(Self::Set {
                element: Box::new(Self::from_cty_json(argument)?),
            }),
            "map" => Ok(Self::Map {
                element: Box::new(Self::from_cty_json(argument)?),
            }),
            "object" => {
                let Value::Object(attributes) = argument else {
                    return Err(SchemaError::Malformed("object without attribute map".into()));
                };
                let mut parsed = BTreeMap::new();
                for (name, attr) in attributes {
                    parsed.insert(name.clone(), Self::from_cty_json(attr)?);
                }
                Ok(Self::Object { attributes: parsed })
            }
            "tuple" => {
                let Value::Array(elements) = argument else {
                    return Err(SchemaError::Malformed("tuple without element list".into()));
                };
                let mut parsed = Vec::with_capacity(elements.len());
                for element in elements {
                    parsed.push(Self::from_cty_json(element)?);
                }
                Ok(Self::Tuple { elements: parsed })
            }
            other => Err(SchemaError::UnsupportedType(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Primitive;
    use super::SchemaType;

    #[test]
    fn parses_primitives() {
        let parsed = SchemaType::from_cty_json(&json!("string")).unwrap();
        assert_eq!(parsed, SchemaType::Primitive(Primitive::String));
        let parsed = SchemaType::from_cty_json(&json!("bool")).unwrap();
        assert_eq!(parsed, SchemaType::Primitive(Primitive::Bool));
        assert!(SchemaType::from_cty_json(&json!("uuid")).is_err());
    }

    #[test]
    fn parses_containers() {
        let parsed = SchemaType::from_cty_json(&json!(["list", "string"])).unwrap();
        assert!(parsed.is_string_collection());

        let parsed = SchemaType::from_cty_json(&json!([
            "object",
            {"name": "string", "tags": ["map", "string"]}
        ]))
        .unwrap();
        assert!(parsed.attribute("name").is_some_and(SchemaType::is_string));
        assert!(parsed.attribute("tags").is_some());
        assert!(parsed.attribute("missing").is_none());

        let parsed = SchemaType::from_cty_json(&json!(["tuple", ["string", "number"]])).unwrap();
        assert!(parsed.is_string_collection());
        assert_eq!(
            parsed.element_type(1),
            Some(&SchemaType::Primitive(Primitive::Number))
        );
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(SchemaType::from_cty_json(&json!(["list"])).is_err());
        assert!(SchemaType::from_cty_json(&json!(["object", ["name"]])).is_err());
        assert!(SchemaType::from_cty_json(&json!(42)).is_err());
    }
}

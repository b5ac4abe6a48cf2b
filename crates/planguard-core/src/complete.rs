// crates/planguard-core/src/complete.rs
// ============================================================================
// Module: Value Completion Engine
// Description: Schema-directed merge of after-state with configured values.
// Purpose: Produce a tree the provider accepts as fully known at plan time.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Completion walks the after-state tree and the configuration expression
//! tree in parallel, guided by the schema type at each position. Every hole
//! that the provider expects as known is filled with, in order: the user's
//! constant, a path-specific placeholder, a placeholder derived from the
//! expression's references, or a synthetic `<path>-unknown` sentinel.
//! A second pass, [`propagate_known_values`], rewrites downstream expression
//! trees in place once an upstream resource ID has been captured.
//! Invariants:
//! - Completion is pure: identical inputs produce byte-identical outputs.
//! - Sequence elements pair with nested block `i`, falling back to block
//!   zero, and extend the path with `.0` regardless of index.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;

use crate::expression::ConstantValue;
use crate::expression::Expression;
use crate::placeholder::PlaceholderRegistry;
use crate::schema::SchemaType;

// ============================================================================
// SECTION: Completion
// ============================================================================

/// Completes a planned value.
///
/// `input` is the (possibly partial) after-state at this position, `config`
/// the matching expression subtree, `value_type` the schema type steering
/// placeholder choice, and `path` the dotted logical path from the resource
/// type root.
#[must_use]
pub fn planned_value(
    input: Option<&Value>,
    config: Option<&Expression>,
    value_type: Option<&SchemaType>,
    path: &str,
    registry: &PlaceholderRegistry,
) -> Value {
    let input = match input {
        None | Some(Value::Null) => return complete_missing(config, value_type, path, registry),
        Some(value) => value,
    };

    match input {
        Value::Object(map) => {
            let block = config.and_then(|c| c.nested_blocks.first());
            let object_type = value_type.filter(|t| matches!(t, SchemaType::Object { .. }));

            let mut out = Map::new();
            for (key, value) in map {
                let attr_type = object_type.and_then(|t| t.attribute(key));
                let sub_config = block.and_then(|b| b.get(key));
                out.insert(
                    key.clone(),
                    planned_value(Some(value), sub_config, attr_type, &format!("{path}.{key}"), registry),
                );
            }

            // Attributes configured but absent from the after-state are
            // synthesized so the provider sees a complete object.
            if let Some(block) = block {
                for (key, expression) in block {
                    if out.get(key).map_or(true, Value::is_null) {
                        let attr_type = object_type.and_then(|t| t.attribute(key));
                        out.insert(
                            key.clone(),
                            planned_value(
                                None,
                                Some(expression),
                                attr_type,
                                &format!("{path}.{key}"),
                                registry,
                            ),
                        );
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let Some(config) = config else {
                return input.clone();
            };
            if config.nested_blocks.is_empty() {
                return input.clone();
            }
            let mut out = Vec::with_capacity(items.len());
            for (index, value) in items.iter().enumerate() {
                let block = config
                    .nested_blocks
                    .get(index)
                    .unwrap_or(&config.nested_blocks[0]);
                let element_config = Expression::single_block(block.clone());
                let element_type = value_type.and_then(|t| t.element_type(index));
                out.push(planned_value(
                    Some(value),
                    Some(&element_config),
                    element_type,
                    &format!("{path}.0"),
                    registry,
                ));
            }
            Value::Array(out)
        }
        primitive => primitive.clone(),
    }
}

/// Fills a position with no after-state value.
fn complete_missing(
    config: Option<&Expression>,
    value_type: Option<&SchemaType>,
    path: &str,
    registry: &PlaceholderRegistry,
) -> Value {
    let Some(config) = config else {
        return registry.for_path(path).unwrap_or(Value::Null);
    };
    if let Some(constant) = config.known_value() {
        return constant.clone();
    }
    if let Some(placeholder) = registry.for_path(path) {
        return placeholder;
    }
    if let Some(placeholder) = registry.for_unknown_reference(&config.references, value_type) {
        return placeholder;
    }
    Value::String(format!("{path}-unknown"))
}

// ============================================================================
// SECTION: Reference Propagation
// ============================================================================

/// Rewrites an expression tree with captured resource IDs.
///
/// Any node whose references include a resolved `<address>.id` gets that ID
/// installed as its constant and its references cleared; when the node's
/// schema type is a collection the ID is wrapped as a one-element list.
pub fn propagate_known_values(
    config: &mut Expression,
    ref_values: &BTreeMap<String, String>,
    value_type: Option<&SchemaType>,
) {
    if config.known_value().is_some() {
        return;
    }
    if !config.references.is_empty() {
        let resolved = config
            .references
            .iter()
            .find_map(|reference| ref_values.get(reference))
            .cloned();
        if let Some(resolved) = resolved {
            let constant = if value_type.is_some_and(SchemaType::is_collection) {
                Value::Array(vec![Value::String(resolved.clone())])
            } else {
                Value::String(resolved)
            };
            config.constant_value = Some(ConstantValue::Known(constant));
            config.references.clear();
        }
        return;
    }

    for (index, block) in config.nested_blocks.iter_mut().enumerate() {
        let object_type = block_object_type(value_type, index);
        for (key, expression) in block.iter_mut() {
            let attr_type = object_type.and_then(|t| t.attribute(key));
            propagate_known_values(expression, ref_values, attr_type);
        }
    }
}

/// Resolves the object schema paired with nested block `index`.
fn block_object_type(value_type: Option<&SchemaType>, index: usize) -> Option<&SchemaType> {
    match value_type? {
        object @ SchemaType::Object { .. } => Some(object),
        SchemaType::List { element } | SchemaType::Set { element } => as_object(element),
        SchemaType::Tuple { elements } => elements.get(index).and_then(as_object),
        _ => None,
    }
}

/// Narrows a schema type to its object case.
fn as_object(value_type: &SchemaType) -> Option<&SchemaType> {
    match value_type {
        object @ SchemaType::Object { .. } => Some(object),
        _ => None,
    }
}

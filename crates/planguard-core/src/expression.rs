// crates/planguard-core/src/expression.rs
// ============================================================================
// Module: Config Expressions
// Description: Terraform configuration expression tree and reference walk.
// Purpose: Model constants, unknowns, references, and nested blocks uniformly.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every configured attribute in a plan is an expression: a constant, an
//! unknown marker, a list of references to other resource addresses, or a
//! mapping of named sub-blocks each holding a sequence of expression maps.
//! [`Expression`] models that shape directly and decodes the representation
//! emitted by `terraform show -json`, where nested blocks are flattened into
//! the enclosing attribute map.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;

// ============================================================================
// SECTION: Expression Tree
// ============================================================================

/// A resolved-or-unresolved constant position in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// The constant is known at plan time.
    Known(Value),
    /// The constant only becomes known at apply time.
    Unknown,
}

/// One node of the configuration expression tree.
///
/// # Invariants
/// - A node carries at most one of: a constant, references, or nested blocks.
///   Decoding never produces more than one; reference propagation clears
///   `references` when it installs a constant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    /// Constant value, when the configuration is literal.
    pub constant_value: Option<ConstantValue>,
    /// Addresses this expression refers to.
    pub references: Vec<String>,
    /// Nested block sequence; each entry maps attribute names to expressions.
    pub nested_blocks: Vec<BTreeMap<String, Expression>>,
}

impl Expression {
    /// Wraps a single attribute map as a one-block expression.
    #[must_use]
    pub fn single_block(block: BTreeMap<String, Expression>) -> Self {
        Self {
            nested_blocks: vec![block],
            ..Self::default()
        }
    }

    /// Creates a known-constant leaf expression.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self {
            constant_value: Some(ConstantValue::Known(value)),
            ..Self::default()
        }
    }

    /// Creates a reference leaf expression.
    #[must_use]
    pub fn references(references: Vec<String>) -> Self {
        Self {
            references,
            ..Self::default()
        }
    }

    /// Returns the constant when it is known at plan time.
    #[must_use]
    pub fn known_value(&self) -> Option<&Value> {
        match self.constant_value.as_ref()? {
            ConstantValue::Known(value) => Some(value),
            ConstantValue::Unknown => None,
        }
    }

    /// Collects the addresses this expression depends on.
    ///
    /// A node with a known constant contributes nothing; a node with
    /// references contributes exactly those; otherwise nested blocks recurse.
    #[must_use]
    pub fn depends_on(&self) -> Vec<String> {
        if self.known_value().is_some() {
            return Vec::new();
        }
        if !self.references.is_empty() {
            return self.references.clone();
        }
        let mut out = Vec::new();
        for block in &self.nested_blocks {
            for expression in block.values() {
                out.extend(expression.depends_on());
            }
        }
        out
    }

    /// Decodes the plan-JSON representation of an expression.
    ///
    /// An array is a nested block sequence; an object with `constant_value`
    /// or `references` keys is a leaf; any other object is a single nested
    /// block whose values decode recursively. A `constant_value` of JSON
    /// `null` is treated as absent, matching the plan emitter.
    #[must_use]
    pub fn from_plan_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self {
                nested_blocks: items.iter().map(block_from_plan_value).collect(),
                ..Self::default()
            },
            Value::Object(map) => {
                if map.contains_key("constant_value") || map.contains_key("references") {
                    let constant_value = map
                        .get("constant_value")
                        .filter(|v| !v.is_null())
                        .map(|v| ConstantValue::Known(v.clone()));
                    let references = map
                        .get("references")
                        .and_then(Value::as_array)
                        .map(|refs| {
                            refs.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    Self {
                        constant_value,
                        references,
                        nested_blocks: Vec::new(),
                    }
                } else {
                    Self::single_block(block_from_plan_value(value))
                }
            }
            other => Self::constant(other.clone()),
        }
    }
}

/// Decodes one nested block entry from its plan-JSON object form.
fn block_from_plan_value(value: &Value) -> BTreeMap<String, Expression> {
    let Value::Object(map) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(name, entry)| (name.clone(), Expression::from_plan_value(entry)))
        .collect()
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_plan_value(&value))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Expression;

    #[test]
    fn decodes_leaf_and_block_forms() {
        let leaf = Expression::from_plan_value(&json!({"constant_value": "eastus"}));
        assert_eq!(leaf.known_value(), Some(&json!("eastus")));

        let refs = Expression::from_plan_value(&json!({
            "references": ["azurerm_resource_group.test.name", "azurerm_resource_group.test"]
        }));
        assert!(refs.known_value().is_none());
        assert_eq!(refs.references.len(), 2);

        let blocks = Expression::from_plan_value(&json!([
            {"subnet_id": {"references": ["azurerm_subnet.test.id"]}},
            {"subnet_id": {"constant_value": "/known"}}
        ]));
        assert_eq!(blocks.nested_blocks.len(), 2);
        assert!(blocks.nested_blocks[0]["subnet_id"].known_value().is_none());
        assert_eq!(
            blocks.nested_blocks[1]["subnet_id"].known_value(),
            Some(&json!("/known"))
        );
    }

    #[test]
    fn null_constant_is_absent() {
        let leaf = Expression::from_plan_value(&json!({"constant_value": null}));
        assert!(leaf.constant_value.is_none());
    }

    #[test]
    fn depends_on_walks_blocks_and_skips_constants() {
        let expression = Expression::from_plan_value(&json!([{
            "location": {"constant_value": "eastus"},
            "ip_configuration": [{
                "subnet_id": {"references": ["azurerm_subnet.test.id", "azurerm_subnet.test"]}
            }]
        }]));
        let deps = expression.depends_on();
        assert_eq!(
            deps,
            vec!["azurerm_subnet.test.id".to_string(), "azurerm_subnet.test".to_string()]
        );
    }

    #[test]
    fn constant_node_shadows_nested_references() {
        let expression = Expression::constant(json!({"anything": true}));
        assert!(expression.depends_on().is_empty());
    }
}

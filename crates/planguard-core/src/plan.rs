// crates/planguard-core/src/plan.rs
// ============================================================================
// Module: Plan Walker
// Description: Plan document model and in-scope resource extraction.
// Purpose: Turn plan resource changes into uniform apply requests.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The plan walker consumes the structured output of `terraform show -json`.
//! It keeps the resource changes that originate from the azurerm provider and
//! are being created or updated, locates each resource's configuration module
//! by descending the module call tree, and emits one [`ApplyRequest`] per
//! kept change. A change whose configuration cannot be located is still
//! emitted with a null config; the completion engine tolerates that.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::expression::Expression;

/// Provider source address of in-scope resources.
pub const AZURERM_PROVIDER_NAME: &str = "registry.terraform.io/hashicorp/azurerm";

// ============================================================================
// SECTION: Plan Document Model
// ============================================================================

/// Parsed plan document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Plan {
    /// Planned resource changes.
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
    /// Configuration snapshot backing the plan.
    #[serde(default)]
    pub configuration: Option<Configuration>,
}

impl Plan {
    /// Parses a plan from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying decode error when the document is not a plan.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// One planned resource change.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceChange {
    /// Fully qualified address, including module prefix and instance keys.
    pub address: String,
    /// Module address prefix, absent at root.
    #[serde(default)]
    pub module_address: Option<String>,
    /// Resource type name.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Provider source address.
    #[serde(default)]
    pub provider_name: String,
    /// The change itself.
    pub change: Change,
}

/// Action set and after-state of a change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    /// Planned actions.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// After-state value tree; `null` positions are unknown at plan time.
    #[serde(default)]
    pub after: Option<Value>,
}

/// Planned action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// No operation.
    NoOp,
    /// Resource will be created.
    Create,
    /// Resource will be read.
    Read,
    /// Resource will be updated in place.
    Update,
    /// Resource will be destroyed.
    Delete,
}

/// Configuration snapshot of the plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    /// Root configuration module.
    #[serde(default)]
    pub root_module: ConfigModule,
}

/// One configuration module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigModule {
    /// Resources declared in this module.
    #[serde(default)]
    pub resources: Vec<ConfigResource>,
    /// Child module calls, keyed by call name.
    #[serde(default)]
    pub module_calls: BTreeMap<String, ModuleCall>,
}

/// One resource declaration within a module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigResource {
    /// Module-local resource address.
    #[serde(default)]
    pub address: String,
    /// Configured attribute expressions.
    #[serde(default)]
    pub expressions: BTreeMap<String, Expression>,
}

/// One module call entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleCall {
    /// The called module body.
    #[serde(default)]
    pub module: ConfigModule,
}

// ============================================================================
// SECTION: Apply Requests
// ============================================================================

/// One in-scope planned resource, ready for scheduling and completion.
///
/// # Invariants
/// - Constructed once per plan entry and not reordered after scheduling;
///   only the embedded `config` tree is rewritten by reference propagation.
#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    /// Fully qualified resource address.
    pub address: String,
    /// Resource type name.
    pub resource_type: String,
    /// Possibly-partial after-state tree.
    pub after_value: Option<Value>,
    /// Configured expression tree, wrapped as a single block; `None` when the
    /// configuration could not be located.
    pub config: Option<Expression>,
    /// Addresses referenced by the configuration.
    pub depends_on: Vec<String>,
}

/// Walks the plan and collects apply requests for in-scope changes.
///
/// A change is in scope iff it comes from the azurerm provider and its action
/// set contains create or update.
#[must_use]
pub fn collect_apply_requests(plan: &Plan) -> Vec<ApplyRequest> {
    let mut requests = Vec::new();
    for change in &plan.resource_changes {
        if change.provider_name != AZURERM_PROVIDER_NAME {
            continue;
        }
        let actions = &change.change.actions;
        if !actions.contains(&Action::Create) && !actions.contains(&Action::Update) {
            continue;
        }

        let mut config_address = format!("{}.{}", change.resource_type, change.name);
        if let Some(module_address) = change.module_address.as_deref().filter(|m| !m.is_empty()) {
            config_address = format!("{module_address}.{config_address}");
        }
        let config = plan
            .configuration
            .as_ref()
            .and_then(|configuration| find_config_module(&configuration.root_module, &config_address));

        requests.push(ApplyRequest {
            address: change.address.clone(),
            resource_type: change.resource_type.clone(),
            after_value: change.change.after.clone(),
            depends_on: config.as_ref().map(Expression::depends_on).unwrap_or_default(),
            config,
        });
    }
    requests
}

/// Locates a resource's configuration by descending module calls.
///
/// Each leading `module.<name>` pair descends into the named child module;
/// the remaining suffix is matched against module-local resource addresses.
/// The resource's expression map is wrapped as a single-block expression so
/// the rest of the pipeline sees a uniform shape.
#[must_use]
pub fn find_config_module(module: &ConfigModule, address: &str) -> Option<Expression> {
    let parts: Vec<&str> = address.split('.').collect();
    if parts.first() == Some(&"module") {
        let name = parts.get(1)?;
        let call = module.module_calls.get(*name)?;
        return find_config_module(&call.module, &parts[2..].join("."));
    }

    module
        .resources
        .iter()
        .find(|resource| resource.address == address)
        .map(|resource| Expression::single_block(resource.expressions.clone()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Plan;
    use super::collect_apply_requests;
    use super::find_config_module;

    fn sample_plan() -> Plan {
        let document = json!({
            "resource_changes": [
                {
                    "address": "azurerm_resource_group.test",
                    "type": "azurerm_resource_group",
                    "name": "test",
                    "provider_name": "registry.terraform.io/hashicorp/azurerm",
                    "change": {
                        "actions": ["create"],
                        "after": {"name": "test", "location": "eastus"}
                    }
                },
                {
                    "address": "azurerm_storage_account.test",
                    "type": "azurerm_storage_account",
                    "name": "test",
                    "provider_name": "registry.terraform.io/hashicorp/azurerm",
                    "change": {
                        "actions": ["create"],
                        "after": {"name": "sa", "location": "eastus"}
                    }
                },
                {
                    "address": "random_pet.name",
                    "type": "random_pet",
                    "name": "name",
                    "provider_name": "registry.terraform.io/hashicorp/random",
                    "change": {"actions": ["create"], "after": {}}
                },
                {
                    "address": "azurerm_key_vault.gone",
                    "type": "azurerm_key_vault",
                    "name": "gone",
                    "provider_name": "registry.terraform.io/hashicorp/azurerm",
                    "change": {"actions": ["delete"], "after": null}
                },
                {
                    "address": "module.net.azurerm_virtual_network.main",
                    "module_address": "module.net",
                    "type": "azurerm_virtual_network",
                    "name": "main",
                    "provider_name": "registry.terraform.io/hashicorp/azurerm",
                    "change": {"actions": ["update"], "after": {"name": "vnet"}}
                }
            ],
            "configuration": {
                "root_module": {
                    "resources": [
                        {
                            "address": "azurerm_resource_group.test",
                            "expressions": {
                                "name": {"constant_value": "test"},
                                "location": {"constant_value": "eastus"}
                            }
                        },
                        {
                            "address": "azurerm_storage_account.test",
                            "expressions": {
                                "resource_group_name": {
                                    "references": [
                                        "azurerm_resource_group.test.name",
                                        "azurerm_resource_group.test"
                                    ]
                                }
                            }
                        }
                    ],
                    "module_calls": {
                        "net": {
                            "module": {
                                "resources": [
                                    {
                                        "address": "azurerm_virtual_network.main",
                                        "expressions": {
                                            "name": {"constant_value": "vnet"}
                                        }
                                    }
                                ]
                            }
                        }
                    }
                }
            }
        });
        serde_json::from_value(document).unwrap()
    }

    #[test]
    fn keeps_azurerm_create_and_update_changes() {
        let plan = sample_plan();
        let requests = collect_apply_requests(&plan);
        let addresses: Vec<&str> = requests.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "azurerm_resource_group.test",
                "azurerm_storage_account.test",
                "module.net.azurerm_virtual_network.main"
            ]
        );
    }

    #[test]
    fn wires_dependencies_from_config() {
        let plan = sample_plan();
        let requests = collect_apply_requests(&plan);
        let storage = requests
            .iter()
            .find(|r| r.address == "azurerm_storage_account.test")
            .unwrap();
        assert!(storage
            .depends_on
            .contains(&"azurerm_resource_group.test".to_string()));
    }

    #[test]
    fn descends_module_calls() {
        let plan = sample_plan();
        let config = find_config_module(
            &plan.configuration.as_ref().unwrap().root_module,
            "module.net.azurerm_virtual_network.main",
        );
        let config = config.unwrap();
        assert_eq!(config.nested_blocks.len(), 1);
        assert!(config.nested_blocks[0].contains_key("name"));
    }

    #[test]
    fn missing_config_yields_none() {
        let plan = sample_plan();
        let root = &plan.configuration.as_ref().unwrap().root_module;
        assert!(find_config_module(root, "azurerm_lb.absent").is_none());
        assert!(find_config_module(root, "module.absent.azurerm_lb.x").is_none());
    }
}

// crates/planguard-core/src/placeholder.rs
// ============================================================================
// Module: Placeholder Registry
// Description: Synthetic, type-correct stand-ins for unknown plan values.
// Purpose: Fill unknown holes so provider-side validation accepts the value.
// Dependencies: regex, serde, serde_json
// ============================================================================

//! ## Overview
//! The registry maps `(resource_type, attribute_path)` pairs and dotted
//! logical paths to synthetic values. It is built once from an embedded
//! ID-pattern catalog plus a hardcoded override table, then never mutated.
//! Every registered value is a syntactically valid instance of its attribute
//! type: resource IDs, URLs, keys, addresses. The zero subscription ID inside
//! registered IDs is replaced with the detected subscription at build time so
//! resources that both consume "the subscription" produce consistent IDs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::schema::SchemaType;

/// The all-zero subscription ID used in registered values.
pub const ZERO_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Embedded ID-pattern catalog.
const ID_PATTERNS: &str = include_str!("../assets/id_patterns.json");

/// The zero UUID used for identity principal and tenant placeholders.
const ZERO_UUID: &str = "00000000-0000-0000-0000-000000000000";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry construction errors.
#[derive(Debug, Error)]
pub enum PlaceholderError {
    /// The embedded catalog failed to decode.
    #[error("embedded id-pattern catalog is invalid: {0}")]
    Catalog(#[from] serde_json::Error),
    /// The reference pattern failed to compile.
    #[error("reference pattern is invalid: {0}")]
    Pattern(#[from] regex::Error),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// One entry of the embedded catalog.
#[derive(Debug, Deserialize)]
struct IdPatternEntry {
    /// Resource type the pattern belongs to.
    #[serde(rename = "resourceType")]
    resource_type: String,
    /// Slash-separated ID pattern, e.g.
    /// `/subscriptions/resourceGroups/providers/Microsoft.Storage/storageAccounts`.
    #[serde(rename = "idPattern")]
    id_pattern: String,
}

/// Immutable placeholder lookup tables.
///
/// # Invariants
/// - Read-only after construction; thread it by reference, never as a global.
/// - `type_attrs` values are strings; `paths` values may be any JSON value.
#[derive(Debug)]
pub struct PlaceholderRegistry {
    /// `(resource_type, attribute_path)` to placeholder string.
    type_attrs: BTreeMap<String, BTreeMap<String, String>>,
    /// Dotted logical path to placeholder value.
    paths: BTreeMap<String, Value>,
    /// Reference shape `azurerm_<type>.<name>.<attr>`.
    reference: Regex,
}

impl PlaceholderRegistry {
    /// Builds the registry from the embedded catalog and override tables.
    ///
    /// When `subscription_id` is present, the zero subscription segment in
    /// every registered ID is replaced with it.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceholderError`] when the embedded catalog is invalid.
    pub fn load(subscription_id: Option<&str>) -> Result<Self, PlaceholderError> {
        let entries: Vec<IdPatternEntry> = serde_json::from_str(ID_PATTERNS)?;

        let mut type_attrs: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for entry in entries {
            type_attrs
                .entry(entry.resource_type)
                .or_default()
                .insert("id".to_string(), materialize_id_pattern(&entry.id_pattern));
        }

        for (resource_type, overrides) in hardcoded_overrides() {
            let slot = type_attrs.entry(resource_type.to_string()).or_default();
            for (attr, value) in overrides {
                slot.insert(attr.to_string(), value.to_string());
            }
        }

        for attrs in type_attrs.values_mut() {
            attrs.insert("identity[0].principal_id".to_string(), ZERO_UUID.to_string());
            attrs.insert("identity[0].tenant_id".to_string(), ZERO_UUID.to_string());
        }

        let mut paths: BTreeMap<String, Value> = path_placeholders()
            .into_iter()
            .map(|(path, value)| (path.to_string(), Value::String(value.to_string())))
            .collect();

        if let Some(subscription_id) = subscription_id.filter(|s| !s.is_empty()) {
            let zero = format!("/subscriptions/{ZERO_SUBSCRIPTION_ID}");
            let detected = format!("/subscriptions/{subscription_id}");
            for attrs in type_attrs.values_mut() {
                for value in attrs.values_mut() {
                    *value = value.replace(&zero, &detected);
                }
            }
            for value in paths.values_mut() {
                if let Value::String(text) = value {
                    *value = Value::String(text.replace(&zero, &detected));
                }
            }
        } else {
            tracing::warn!(
                "no subscription ID detected; placeholder IDs keep the zero subscription"
            );
        }

        Ok(Self {
            type_attrs,
            paths,
            reference: Regex::new(r#"azurerm_(\w+)\.[\w\[\]"\-]+\.(.+)"#)?,
        })
    }

    /// Looks up a placeholder by dotted logical path.
    #[must_use]
    pub fn for_path(&self, path: &str) -> Option<Value> {
        self.paths.get(path).cloned()
    }

    /// Looks up a placeholder by resource type and attribute path.
    #[must_use]
    pub fn for_resource_type_path(&self, resource_type: &str, attr_path: &str) -> Option<&str> {
        self.type_attrs
            .get(resource_type)?
            .get(attr_path)
            .map(String::as_str)
    }

    /// Resolves references of shape `azurerm_<type>.<name>.<attr>` into
    /// placeholder values.
    ///
    /// Returns the full hit list when `value_type` is a collection of
    /// strings, the first hit otherwise, and `None` when nothing matched.
    #[must_use]
    pub fn for_unknown_reference(
        &self,
        references: &[String],
        value_type: Option<&SchemaType>,
    ) -> Option<Value> {
        if references.is_empty() {
            return None;
        }
        let mut hits = Vec::new();
        for reference in references {
            let Some(captures) = self.reference.captures(reference) else {
                continue;
            };
            let resource_type = format!("azurerm_{}", &captures[1]);
            if let Some(placeholder) = self.for_resource_type_path(&resource_type, &captures[2]) {
                hits.push(placeholder.to_string());
            }
        }
        if hits.is_empty() {
            return None;
        }
        if value_type.is_some_and(SchemaType::is_string_collection) {
            return Some(Value::Array(hits.into_iter().map(Value::String).collect()));
        }
        Some(Value::String(hits.swap_remove(0)))
    }
}

// ============================================================================
// SECTION: Pattern Materialization
// ============================================================================

/// Expands an ID pattern into a concrete placeholder resource ID.
///
/// `subscriptions` and `resourceGroups` segments expand to fixed scope
/// segments, `providers` keeps the following namespace verbatim, and every
/// other segment `X` expands to `/X/XName`.
fn materialize_id_pattern(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        match *segment {
            "" => {}
            "subscriptions" => {
                out.push_str("/subscriptions/");
                out.push_str(ZERO_SUBSCRIPTION_ID);
            }
            "resourceGroups" => out.push_str("/resourceGroups/myResourceGroup"),
            "providers" => out.push_str("/providers"),
            other => {
                if index > 0 && segments[index - 1] == "providers" {
                    out.push('/');
                    out.push_str(other);
                } else {
                    out.push('/');
                    out.push_str(other);
                    out.push('/');
                    out.push_str(other);
                    out.push_str("Name");
                }
            }
        }
    }
    out
}

// ============================================================================
// SECTION: Override Tables
// ============================================================================

/// Hardcoded `(resource_type, attribute_path)` overrides: IDs the catalog
/// cannot express plus free-form values such as access keys, endpoints, and
/// IP addresses.
fn hardcoded_overrides() -> Vec<(&'static str, Vec<(&'static str, &'static str)>)> {
    vec![
        (
            "azurerm_subscription",
            vec![("id", "/subscriptions/00000000-0000-0000-0000-000000000000")],
        ),
        (
            "azurerm_storage_container",
            vec![(
                "resource_manager_id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Storage/storageAccounts/myStorageAccount/blobServices/default/containers/myContainer",
            )],
        ),
        (
            "azurerm_lb",
            vec![
                (
                    "frontend_ip_configuration[0].id",
                    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/loadBalancers/myLB/frontendIPConfigurations/myFrontendIPConfiguration",
                ),
                (
                    "id",
                    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/loadBalancers/myLB",
                ),
            ],
        ),
        (
            "azurerm_vpn_site",
            vec![(
                "link[0].id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/vpnSites/myVpnSite/links/myLink",
            )],
        ),
        (
            "azurerm_storage_account",
            vec![
                ("primary_access_key", "ZmFrZV9hY2Nlc3Nfa2V5"),
                ("primary_blob_endpoint", "https://myStorageAccount.blob.core.windows.net/"),
                (
                    "primary_blob_connection_string",
                    "DefaultEndpointsProtocol=https;AccountName=myStorageAccount;AccountKey=ZmFrZV9hY2Nlc3Nfa2V5;EndpointSuffix=core.windows.net",
                ),
            ],
        ),
        (
            "azurerm_sentinel_log_analytics_workspace_onboarding",
            vec![(
                "workspace_id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.OperationalInsights/workspaces/myWorkspace",
            )],
        ),
        (
            "azurerm_application_insights",
            vec![("instrumentation_key", "00000000-0000-0000-0000-000000000000")],
        ),
        ("azurerm_public_ip", vec![("ip_address", "123.123.123.123")]),
        (
            "azurerm_databricks_virtual_network_peering",
            vec![(
                "virtual_network_id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/virtualNetworks/myVnet",
            )],
        ),
        (
            "azurerm_eventhub_namespace",
            vec![("default_primary_key", "ZmFrZV9hY2Nlc3Nfa2V5")],
        ),
        (
            "azurerm_app_service",
            vec![
                ("default_site_hostname", "myAppService.azurewebsites.net"),
                ("custom_domain_verification_id", "myCustomDomainVerificationId"),
            ],
        ),
        (
            "azurerm_storage_data_lake_gen2_filesystem",
            vec![(
                "id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Storage/storageAccounts/myStorageAccount/filesystems/myFileSystem",
            )],
        ),
        (
            "azurerm_sentinel_alert_rule_anomaly",
            vec![(
                "id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.OperationalInsights/workspaces/myWorkspace/providers/Microsoft.SecurityInsights/securityMLAnalyticsSettings/mySecurityMLAnalyticsSetting",
            )],
        ),
        (
            "azurerm_resource_group_policy_assignment",
            vec![(
                "resource_group_id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup",
            )],
        ),
        (
            "azurerm_virtual_desktop_host_pool",
            vec![(
                "id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.DesktopVirtualization/hostPools/myHostPool",
            )],
        ),
        (
            "azurerm_managed_api",
            vec![(
                "id",
                "/subscriptions/12345678-1234-9876-4563-123456789012/providers/Microsoft.Web/locations/locationName/managedApis/managedApiName",
            )],
        ),
        (
            "azurerm_policy_definition",
            vec![(
                "id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/providers/Microsoft.Authorization/policyDefinitions/myPolicyDefinition",
            )],
        ),
        (
            "azurerm_backup_container_storage_account",
            vec![(
                "storage_account_id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Storage/storageAccounts/myStorageAccount",
            )],
        ),
        (
            "azurerm_vmware_private_cloud",
            vec![(
                "circuit[0].express_route_id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/expressRouteCircuits/myExpressRouteCircuit",
            )],
        ),
        (
            "azurerm_eventgrid_topic",
            vec![
                ("endpoint", "https://myeventgridtopic.westus-1.eventgrid.azure.net/api/events"),
                ("primary_access_key", "ZmFrZV9hY2Nlc3Nfa2V5"),
                ("secondary_access_key", "ZmFrZV9hY2Nlc3Nfa2V5"),
            ],
        ),
        (
            "azurerm_user_assigned_identity",
            vec![("principal_id", "00000000-0000-0000-0000-000000000000")],
        ),
        (
            "azurerm_storage_blob",
            vec![("id", "https://myStorageAccount.blob.core.windows.net/myContainer/myBlob")],
        ),
        (
            "azurerm_chaos_studio_target",
            vec![(
                "id",
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Chaos/targets/myTarget",
            )],
        ),
        (
            "azurerm_key_vault_key",
            vec![("id", "https://myKeyVault.vault.azure.net/keys/myKey/00000000000000000000000000000000")],
        ),
    ]
}

/// Dotted logical paths whose placeholder depends on the parent field.
fn path_placeholders() -> Vec<(&'static str, &'static str)> {
    vec![
        ("azurerm_spring_cloud_app.addon_json", "{}"),
        (
            "azurerm_virtual_network_gateway.ip_configuration.0.subnet_id",
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/virtualNetworks/myVnet/subnets/GatewaySubnet",
        ),
        (
            "azurerm_firewall.ip_configuration.0.subnet_id",
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/virtualNetworks/myVnet/subnets/AzureFirewallSubnet",
        ),
        (
            "azurerm_network_interface_application_gateway_backend_address_pool_association.backend_address_pool_id",
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/applicationGateways/myAppGateway/backendAddressPools/myBackendAddressPool",
        ),
        (
            "azurerm_dev_center_dev_box_definition.image_reference_id",
            "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.DevCenter/devCenters/devCenterName/galleries/galleryName/images/imageName",
        ),
        (
            "azurerm_sentinel_alert_rule_machine_learning_behavior_analytics.alert_rule_template_guid",
            "00000000-0000-0000-0000-000000000000",
        ),
        (
            "azurerm_frontdoor_custom_https_configuration.frontend_endpoint_id",
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/frontDoors/myFrontDoor/frontendEndpoints/myFrontendEndpoint",
        ),
        (
            "azurerm_bastion_host.ip_configuration.0.subnet_id",
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/virtualNetworks/myVnet/subnets/AzureBastionSubnet",
        ),
        (
            "azurerm_sentinel_alert_rule_threat_intelligence.alert_rule_template_guid",
            "00000000-0000-0000-0000-000000000000",
        ),
        (
            "azurerm_sentinel_alert_rule_fusion.alert_rule_template_guid",
            "00000000-0000-0000-0000-000000000000",
        ),
        (
            "azurerm_vmware_netapp_volume_attachment.vmware_cluster_id",
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.AVS/privateClouds/myPrivateCloud/clusters/myCluster",
        ),
        (
            "azurerm_vpn_gateway_connection.vpn_link.0.vpn_site_link_id",
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/myResourceGroup/providers/Microsoft.Network/vpnSites/myVpnSite/vpnSiteLinks/myVpnSiteLink",
        ),
    ]
}

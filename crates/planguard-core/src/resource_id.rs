// crates/planguard-core/src/resource_id.rs
// ============================================================================
// Module: ARM Resource IDs
// Description: Parse and format Azure Resource Manager resource IDs.
// Purpose: Recover namespace, type, name, and the parent chain from a path.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! ARM resource IDs are hierarchical paths. Parsing yields a chain of
//! [`ResourceId`] nodes rooted at the tenant: a subscription, optionally a
//! resource group, then provider-namespaced resources whose type accumulates
//! slash-separated segments (`Spring/apps` for a nested resource). Key
//! segments compare case-insensitively and render in canonical casing, so a
//! lowercase `resourcegroups` URL round-trips to `resourceGroups`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resource ID parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceIdError {
    /// The path is empty or does not start with a known scope segment.
    #[error("invalid resource id: {0}")]
    Invalid(String),
    /// A key segment is missing its value segment.
    #[error("resource id segment {0} has no value")]
    MissingValue(String),
}

// ============================================================================
// SECTION: Resource Types
// ============================================================================

/// Namespace-qualified resource type.
///
/// `type_name` is the full slash-joined type chain relative to the
/// namespace, e.g. `storageAccounts` or `Spring/apps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    /// Provider namespace, e.g. `Microsoft.Storage`.
    pub namespace: String,
    /// Slash-joined type chain.
    pub type_name: String,
}

impl ResourceType {
    /// The tenant root type.
    #[must_use]
    pub fn tenant() -> Self {
        Self::resources("tenants")
    }

    /// The subscription scope type.
    #[must_use]
    pub fn subscription() -> Self {
        Self::resources("subscriptions")
    }

    /// The resource group scope type.
    #[must_use]
    pub fn resource_group() -> Self {
        Self::resources("resourceGroups")
    }

    fn resources(type_name: &str) -> Self {
        Self {
            namespace: "Microsoft.Resources".to_string(),
            type_name: type_name.to_string(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.type_name)
    }
}

// ============================================================================
// SECTION: Resource IDs
// ============================================================================

/// One node of a parsed resource ID chain.
///
/// # Invariants
/// - The chain is rooted at a tenant node whose `parent` is `None`.
/// - Scope nodes store their value in `name` (subscription ID, group name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    /// Enclosing scope or resource, absent for the tenant root.
    pub parent: Option<Box<ResourceId>>,
    /// Resource type of this node.
    pub resource_type: ResourceType,
    /// Name of this node; empty for the tenant root.
    pub name: String,
}

impl ResourceId {
    /// The tenant root.
    #[must_use]
    pub fn tenant() -> Self {
        Self {
            parent: None,
            resource_type: ResourceType::tenant(),
            name: String::new(),
        }
    }

    /// Returns true for the tenant root node.
    #[must_use]
    pub fn is_tenant(&self) -> bool {
        self.resource_type == ResourceType::tenant()
    }

    /// Returns true for subscription scope nodes.
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        self.resource_type == ResourceType::subscription()
    }

    /// Returns true for resource group scope nodes.
    #[must_use]
    pub fn is_resource_group(&self) -> bool {
        self.resource_type == ResourceType::resource_group()
    }

    /// Returns true for nodes that can scope a routable request:
    /// subscription, resource group, or tenant.
    #[must_use]
    pub fn is_scope(&self) -> bool {
        self.is_subscription() || self.is_resource_group() || self.is_tenant()
    }

    /// Walks up the parent chain to the nearest routable scope.
    ///
    /// Starts at this node's parent, promoting nested child resources to the
    /// container their validation call must be addressed to.
    #[must_use]
    pub fn routing_scope(&self) -> Option<&ResourceId> {
        let mut scope = self.parent.as_deref()?;
        while let Some(parent) = scope.parent.as_deref() {
            if scope.is_scope() {
                break;
            }
            scope = parent;
        }
        Some(scope)
    }

    /// Parses an ID from a URL path.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceIdError`] when the path does not follow the ARM
    /// hierarchy.
    pub fn parse(path: &str) -> Result<Self, ResourceIdError> {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(ResourceIdError::Invalid(path.to_string()));
        }

        let mut current = Self::tenant();
        let mut index = 0;
        while index < segments.len() {
            let key = segments[index];
            if key.eq_ignore_ascii_case("subscriptions") && current.is_tenant() {
                let value = value_segment(&segments, index, key)?;
                current = current.child(ResourceType::subscription(), value);
                index += 2;
            } else if key.eq_ignore_ascii_case("resourcegroups") && current.is_subscription() {
                let value = value_segment(&segments, index, key)?;
                current = current.child(ResourceType::resource_group(), value);
                index += 2;
            } else if key.eq_ignore_ascii_case("providers") {
                let namespace = value_segment(&segments, index, key)?;
                index += 2;
                let mut type_chain = String::new();
                while index < segments.len()
                    && !segments[index].eq_ignore_ascii_case("providers")
                {
                    let type_segment = segments[index];
                    let name = segments.get(index + 1).copied().unwrap_or_default();
                    if !type_chain.is_empty() {
                        type_chain.push('/');
                    }
                    type_chain.push_str(type_segment);
                    current = current.child(
                        ResourceType {
                            namespace: namespace.to_string(),
                            type_name: type_chain.clone(),
                        },
                        name,
                    );
                    index += 2;
                }
            } else {
                return Err(ResourceIdError::Invalid(path.to_string()));
            }
        }

        if current.is_tenant() {
            return Err(ResourceIdError::Invalid(path.to_string()));
        }
        Ok(current)
    }

    fn child(self, resource_type: ResourceType, name: &str) -> Self {
        Self {
            parent: Some(Box::new(self)),
            resource_type,
            name: name.to_string(),
        }
    }
}

/// Fetches the value segment following a key segment.
fn value_segment<'a>(
    segments: &[&'a str],
    index: usize,
    key: &str,
) -> Result<&'a str, ResourceIdError> {
    segments
        .get(index + 1)
        .copied()
        .ok_or_else(|| ResourceIdError::MissingValue(key.to_string()))
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tenant() {
            return write!(f, "/");
        }
        if self.is_subscription() {
            return write!(f, "/subscriptions/{}", self.name);
        }
        if self.is_resource_group() {
            let parent = self.parent.as_deref().map(ToString::to_string).unwrap_or_default();
            return write!(f, "{parent}/resourceGroups/{}", self.name);
        }

        let parent = self.parent.as_deref();
        let parent_text = match parent {
            Some(node) if node.is_tenant() => String::new(),
            Some(node) => node.to_string(),
            None => String::new(),
        };
        let last_segment = self
            .resource_type
            .type_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.resource_type.type_name);
        let nested_same_namespace = parent.is_some_and(|node| {
            !node.is_scope() && node.resource_type.namespace == self.resource_type.namespace
        });
        if nested_same_namespace {
            write!(f, "{parent_text}/{last_segment}/{}", self.name)
        } else {
            write!(
                f,
                "{parent_text}/providers/{}/{last_segment}/{}",
                self.resource_type.namespace, self.name
            )
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

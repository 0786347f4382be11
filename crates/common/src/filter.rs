//! Resource selection by kind and category

use crate::{Category, DiscoveryOptions, Infrastructure, Resource, ResourceType};

/// Selects resources by kind or category.
///
/// A non-empty kind allow-list takes strict precedence: the category
/// allow-list is ignored whenever kinds are given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceFilter {
    resource_types: Vec<ResourceType>,
    categories: Vec<Category>,
}

impl ResourceFilter {
    pub fn new(resource_types: Vec<ResourceType>, categories: Vec<Category>) -> Self {
        Self {
            resource_types,
            categories,
        }
    }

    pub fn from_options(options: &DiscoveryOptions) -> Self {
        Self::new(options.resource_types.clone(), options.categories.clone())
    }

    /// True when nothing is filtered out
    pub fn is_unrestricted(&self) -> bool {
        self.resource_types.is_empty() && self.categories.is_empty()
    }

    /// Decide for a kind before any resource of it exists (used to skip
    /// live scans entirely)
    pub fn includes_type(&self, resource_type: &ResourceType) -> bool {
        if !self.resource_types.is_empty() {
            return self.lists_kind(resource_type);
        }
        if !self.categories.is_empty() {
            return self.categories.contains(&resource_type.category());
        }
        true
    }

    pub fn includes(&self, resource: &Resource) -> bool {
        if !self.resource_types.is_empty() {
            return self.lists_kind(&resource.resource_type);
        }
        if !self.categories.is_empty() {
            return self.categories.contains(&resource.category);
        }
        true
    }

    fn lists_kind(&self, resource_type: &ResourceType) -> bool {
        self.resource_types
            .iter()
            .any(|listed| same_kind(listed, resource_type))
    }

    /// Keep only the included resources; resources themselves are untouched
    pub fn apply(&self, infrastructure: Infrastructure) -> Infrastructure {
        if self.is_unrestricted() {
            return infrastructure;
        }

        let mut selected = Infrastructure::new(infrastructure.provider);
        for (key, value) in infrastructure.metadata() {
            selected.set_metadata(key.clone(), value.clone());
        }
        for resource in infrastructure.into_resources() {
            if self.includes(&resource) {
                selected.insert(resource);
            }
        }
        selected
    }
}

/// Uncatalogued kinds compare without regard to ASCII case
fn same_kind(a: &ResourceType, b: &ResourceType) -> bool {
    match (a, b) {
        (ResourceType::Other(a), ResourceType::Other(b)) => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}

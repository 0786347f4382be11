//! Normalized infrastructure model shared by every extractor

use crate::{Category, Provider, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema-less configuration bag mirroring whatever the source exposes
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// A single configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Render scalars as plain text (used for tags and convenience fields)
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Integer(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    /// Convert a string map value into tags, skipping non-scalar entries
    pub fn to_tags(&self) -> BTreeMap<String, String> {
        self.as_map()
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.to_plain_string().map(|v| (k.clone(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(b) => ConfigValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => ConfigValue::String(s),
            serde_json::Value::Array(items) => {
                ConfigValue::List(items.into_iter().map(ConfigValue::from).collect())
            },
            serde_json::Value::Object(map) => ConfigValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

/// One discovered infrastructure item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Format-specific composite ID, unique within one infrastructure
    pub id: String,

    /// Display name
    pub name: String,

    /// Canonical kind
    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    /// Derived from the canonical kind
    pub category: Category,

    /// Region or location (empty when the source does not say)
    #[serde(default)]
    pub region: String,

    /// Provider-assigned unique identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_id: Option<String>,

    #[serde(default)]
    pub config: ConfigMap,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// IDs of resources this one depends on; may dangle
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        resource_type: ResourceType,
    ) -> Self {
        let category = resource_type.category();
        Self {
            id: id.into(),
            name: name.into(),
            resource_type,
            category,
            region: String::new(),
            native_id: None,
            config: ConfigMap::new(),
            tags: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_native_id(mut self, native_id: impl Into<String>) -> Self {
        self.native_id = Some(native_id.into());
        self
    }

    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }

    pub fn set_config(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.config.insert(key.into(), value);
    }

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Append a dependency, ignoring duplicates and self references
    pub fn add_dependency(&mut self, id: impl Into<String>) {
        let id = id.into();
        if id.is_empty() || id == self.id || self.dependencies.contains(&id) {
            return;
        }
        self.dependencies.push(id);
    }
}

/// Everything discovered in one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    pub provider: Provider,

    resources: BTreeMap<String, Resource>,

    #[serde(default)]
    metadata: ConfigMap,
}

impl Infrastructure {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            resources: BTreeMap::new(),
            metadata: ConfigMap::new(),
        }
    }

    /// Insert a resource; an existing resource with the same ID is replaced
    /// and returned (last writer wins)
    pub fn insert(&mut self, resource: Resource) -> Option<Resource> {
        self.resources.insert(resource.id.clone(), resource)
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Resources ordered by ID
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self) -> &ConfigMap {
        &self.metadata
    }

    /// Merge another infrastructure into this one; on ID collision the
    /// incoming resource wins
    pub fn merge(&mut self, other: Infrastructure) {
        self.resources.extend(other.resources);
        self.metadata.extend(other.metadata);
    }

    /// Dependency edges whose target is not part of this infrastructure,
    /// as `(resource id, missing dependency id)` pairs
    pub fn dangling_dependencies(&self) -> Vec<(&str, &str)> {
        self.resources
            .values()
            .flat_map(|resource| {
                resource
                    .dependencies
                    .iter()
                    .filter(|dep| !self.resources.contains_key(dep.as_str()))
                    .map(move |dep| (resource.id.as_str(), dep.as_str()))
            })
            .collect()
    }

    /// Count of resources per category
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for resource in self.resources.values() {
            *counts.entry(resource.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_resources(self) -> impl Iterator<Item = Resource> {
        self.resources.into_values()
    }
}

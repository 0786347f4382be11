//! ARM deployment template type definitions
//!
//! Only the parts of the template schema that carry resources, their edges
//! and the declarations recorded as metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Deployment template root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmTemplate {
    /// Schema URL (e.g. `.../2019-04-01/deploymentTemplate.json#`)
    #[serde(rename = "$schema", default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub content_version: Option<String>,

    #[serde(default)]
    pub parameters: BTreeMap<String, ArmParameter>,

    /// Variables may be any JSON value, including expressions
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    #[serde(default)]
    pub resources: Vec<ArmResource>,

    #[serde(default)]
    pub outputs: BTreeMap<String, ArmOutput>,
}

/// Template parameter declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmParameter {
    /// Declared type (`string`, `int`, `securestring`, ...)
    #[serde(rename = "type", default)]
    pub param_type: String,

    #[serde(default)]
    pub default_value: Option<Value>,

    #[serde(default)]
    pub allowed_values: Vec<Value>,
}

impl ArmParameter {
    /// `securestring` and `secureobject` values never leave the template
    pub fn is_secure(&self) -> bool {
        self.param_type.to_lowercase().starts_with("secure")
    }
}

/// Template output declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmOutput {
    #[serde(rename = "type", default)]
    pub output_type: String,

    #[serde(default)]
    pub value: Option<Value>,
}

/// One resource declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmResource {
    /// Native type, e.g. `Microsoft.Storage/storageAccounts`; for nested
    /// children usually just the trailing segment
    #[serde(rename = "type")]
    pub resource_type: String,

    pub name: String,

    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub sku: Option<Value>,

    #[serde(default)]
    pub tags: Option<Value>,

    #[serde(default)]
    pub properties: Option<Value>,

    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Child resources declared inline
    #[serde(default)]
    pub resources: Vec<ArmResource>,
}

impl ArmResource {
    /// Inline nested deployment carrying its own template
    pub fn nested_template(&self) -> Option<&Value> {
        if !self
            .resource_type
            .eq_ignore_ascii_case("Microsoft.Resources/deployments")
        {
            return None;
        }
        self.properties.as_ref()?.get("template")
    }
}

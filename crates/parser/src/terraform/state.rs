//! Terraform state snapshot extraction
//!
//! Supports the current JSON layout (version 4, with `resources[].instances`)
//! and the legacy version 3 `modules[].resources` layout. Attributes are
//! copied into `config` exactly as recorded; state is already the source of
//! truth for secrets, so nothing is redacted here.

use crate::TypeMapper;
use infra_discovery_common::{
    ConfigMap, ConfigValue, DiscoveryError, DiscoveryReport, Infrastructure, Provider, Resource,
    Result,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::OnceLock;
use tracing::debug;

/// State format versions this reader understands
pub const SUPPORTED_VERSIONS: RangeInclusive<i64> = 3..=4;

fn state_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""type"\s*:\s*"([^"]+)""#).expect("type pattern is valid"))
}

/// Whether JSON text looks like a state snapshot holding `provider` resources
pub fn is_state_document(content: &str, provider: Provider) -> bool {
    content.contains("\"terraform_version\"")
        && state_type_regex()
            .captures_iter(content)
            .any(|caps| caps[1].starts_with(provider.terraform_prefix()))
}

#[derive(Debug, Deserialize)]
struct StateDocument {
    version: i64,
    #[serde(default)]
    terraform_version: Option<String>,
    #[serde(default)]
    serial: Option<i64>,
    #[serde(default)]
    lineage: Option<String>,
    #[serde(default)]
    resources: Vec<StateResource>,
    /// Version 3 layout
    #[serde(default)]
    modules: Vec<LegacyModule>,
}

#[derive(Debug, Deserialize)]
struct StateResource {
    /// Module address such as `module.network` or `module.env["prod"]`;
    /// absent for the root module
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    instances: Vec<StateInstance>,
}

#[derive(Debug, Deserialize)]
struct StateInstance {
    #[serde(default)]
    index_key: Option<Value>,
    #[serde(default)]
    attributes: Option<Value>,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyModule {
    /// `["root"]` or `["root", "network", ...]`
    #[serde(default)]
    path: Vec<String>,
    #[serde(default)]
    resources: BTreeMap<String, LegacyResource>,
}

#[derive(Debug, Deserialize)]
struct LegacyResource {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    primary: Option<LegacyPrimary>,
}

#[derive(Debug, Deserialize)]
struct LegacyPrimary {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

/// Parse a state document into a report for `provider`
pub fn parse_state(
    content: &str,
    unit: &str,
    provider: Provider,
) -> Result<DiscoveryReport> {
    let document: StateDocument = serde_json::from_str(content)
        .map_err(|e| DiscoveryError::Parse(format!("Invalid Terraform state {}: {}", unit, e)))?;

    if !SUPPORTED_VERSIONS.contains(&document.version) {
        return Err(DiscoveryError::Parse(format!(
            "{}: unsupported state version {} (expected {} to {})",
            unit,
            document.version,
            SUPPORTED_VERSIONS.start(),
            SUPPORTED_VERSIONS.end()
        )));
    }

    let mut infra = Infrastructure::new(provider);
    infra.set_metadata("version", document.version);
    if let Some(version) = &document.terraform_version {
        infra.set_metadata("terraform_version", version.as_str());
    }
    if let Some(serial) = document.serial {
        infra.set_metadata("serial", serial);
    }
    if let Some(lineage) = &document.lineage {
        infra.set_metadata("lineage", lineage.as_str());
    }

    let prefix = provider.terraform_prefix();
    for resource in &document.resources {
        if resource.mode != "managed" || !resource.resource_type.starts_with(prefix) {
            continue;
        }
        for instance in &resource.instances {
            let converted = convert_instance(resource, instance);
            debug!(id = %converted.id, "Converted state instance");
            infra.insert(converted);
        }
    }

    for module in &document.modules {
        let module_prefix = legacy_module_prefix(&module.path);
        for (address, resource) in &module.resources {
            if address.starts_with("data.") || !resource.resource_type.starts_with(prefix) {
                continue;
            }
            infra.insert(convert_legacy(&module_prefix, address, resource));
        }
    }

    Ok(DiscoveryReport::new(infra))
}

fn convert_instance(resource: &StateResource, instance: &StateInstance) -> Resource {
    let module_prefix = match resource.module.as_deref() {
        Some(module) if !module.is_empty() => format!("{module}."),
        _ => String::new(),
    };
    let id = format!(
        "{}{}.{}{}",
        module_prefix,
        resource.resource_type,
        resource.name,
        index_suffix(instance.index_key.as_ref())
    );

    let config = match instance.attributes.clone().map(ConfigValue::from) {
        Some(ConfigValue::Map(attributes)) => attributes,
        _ => ConfigMap::new(),
    };

    let name = config
        .get("name")
        .and_then(ConfigValue::as_str)
        .unwrap_or(&resource.name)
        .to_string();
    let mut converted = Resource::new(
        id,
        name,
        TypeMapper::map_terraform_type(&resource.resource_type),
    );
    lift_common_attributes(&mut converted, &config);
    converted.config = config;

    // Version 4 records dependencies as absolute addresses
    for dependency in &instance.dependencies {
        converted.add_dependency(dependency.as_str());
    }
    converted
}

fn convert_legacy(module_prefix: &str, address: &str, resource: &LegacyResource) -> Resource {
    // `type.name` or `type.name.<count index>`
    let mut parts = address.splitn(3, '.');
    let resource_type = parts.next().unwrap_or_default();
    let block_name = parts.next().unwrap_or_default();
    let id = match parts.next() {
        Some(index) => format!("{module_prefix}{resource_type}.{block_name}[{index}]"),
        None => format!("{module_prefix}{resource_type}.{block_name}"),
    };

    let config: ConfigMap = resource
        .primary
        .as_ref()
        .map(|p| {
            p.attributes
                .iter()
                .map(|(k, v)| (k.clone(), ConfigValue::from(v.as_str())))
                .collect()
        })
        .unwrap_or_default();

    let name = config
        .get("name")
        .and_then(ConfigValue::as_str)
        .unwrap_or(block_name)
        .to_string();
    let mut converted = Resource::new(
        id,
        name,
        TypeMapper::map_terraform_type(&resource.resource_type),
    );
    lift_common_attributes(&mut converted, &config);
    if let Some(primary_id) = resource.primary.as_ref().and_then(|p| p.id.as_deref()) {
        converted.native_id = Some(primary_id.to_string());
    }
    // Legacy flat attributes spell tags as `tags.<key>`
    for (key, value) in &config {
        if let (Some(tag), Some(value)) = (key.strip_prefix("tags."), value.as_str()) {
            if tag != "%" {
                converted.add_tag(tag, value);
            }
        }
    }
    converted.config = config;

    // Version 3 dependencies are relative to the declaring module
    for dependency in &resource.depends_on {
        converted.add_dependency(format!("{module_prefix}{dependency}"));
    }
    converted
}

/// Lift name-independent convenience fields shared by both layouts
fn lift_common_attributes(resource: &mut Resource, config: &ConfigMap) {
    if let Some(region) = config
        .get("location")
        .or_else(|| config.get("region"))
        .and_then(ConfigValue::as_str)
    {
        resource.region = region.to_string();
    }
    if let Some(tags) = config.get("tags").or_else(|| config.get("labels")) {
        resource.tags = tags.to_tags();
    }
    if let Some(id) = config.get("id").and_then(ConfigValue::as_str) {
        resource.native_id = Some(id.to_string());
    }
}

/// `[0]` for count instances, `["key"]` for for_each instances
fn index_suffix(index_key: Option<&Value>) -> String {
    match index_key {
        Some(Value::Number(n)) => format!("[{n}]"),
        Some(Value::String(s)) => format!("[\"{s}\"]"),
        _ => String::new(),
    }
}

/// `module.a.module.b.` for a version 3 path of `["root", "a", "b"]`
fn legacy_module_prefix(path: &[String]) -> String {
    path.iter()
        .skip_while(|segment| segment.as_str() == "root")
        .map(|segment| format!("module.{segment}."))
        .collect()
}

//! Terraform configuration (`.tf`) extraction
//!
//! Attributes are evaluated with an empty HCL context, so only literal
//! values survive. Anything referring to variables, locals, other resources
//! or functions is left out of the config and reported as unresolved.

use crate::TypeMapper;
use hcl::eval::{Context, Evaluate};
use hcl::{Block, Body, Expression};
use infra_discovery_common::sensitive;
use infra_discovery_common::{
    ConfigMap, ConfigValue, DiscoveryError, DiscoveryOptions, DiscoveryReport, DiscoveryWarning,
    Infrastructure, Provider, Resource, Result, WarningKind,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Meta-arguments that never end up in the config
const META_ARGUMENTS: &[&str] = &["depends_on", "provider", "lifecycle"];

fn block_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*(resource|provider)\s+"([^"]+)""#).expect("block pattern is valid")
    })
}

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(data\.)?\b([a-z][a-z0-9]*_[a-z0-9_]+)\.([A-Za-z_][A-Za-z0-9_-]*)")
            .expect("reference pattern is valid")
    })
}

/// Whether `.tf` text declares a resource or provider block for `provider`
pub fn is_config_document(content: &str, provider: Provider) -> bool {
    block_header_regex()
        .captures_iter(content)
        .any(|caps| match &caps[1] {
            "resource" => caps[2].starts_with(provider.terraform_prefix()),
            _ => &caps[2] == provider.terraform_name(),
        })
}

/// Result of reading one `.tf` file
#[derive(Debug)]
pub struct ConfigFile {
    pub report: DiscoveryReport,
    /// Number of `locals` entries declared in the file
    pub locals: usize,
}

/// Parse `.tf` text into a report for `provider`
pub fn parse_config(
    content: &str,
    unit: &str,
    provider: Provider,
    options: &DiscoveryOptions,
) -> Result<ConfigFile> {
    let body = hcl::parse(content)
        .map_err(|e| DiscoveryError::Parse(format!("Invalid Terraform file {}: {}", unit, e)))?;

    let extractor = ConfigExtractor {
        provider,
        options,
        context: Context::new(),
    };
    let mut report = DiscoveryReport::new(Infrastructure::new(provider));
    let mut locals = 0;

    for block in body.blocks() {
        match block.identifier() {
            "resource" => {
                if let Some(resource) = extractor.convert_resource(block, &mut report) {
                    debug!(id = %resource.id, "Converted Terraform resource block");
                    report.infrastructure.insert(resource);
                }
            },
            "variable" => extractor.record_variable(block, &mut report.infrastructure),
            "output" => extractor.record_output(block, &mut report.infrastructure),
            "locals" => locals += block.body().attributes().count(),
            _ => {},
        }
    }

    Ok(ConfigFile { report, locals })
}

struct ConfigExtractor<'a> {
    provider: Provider,
    options: &'a DiscoveryOptions,
    /// Empty: no variables, no functions
    context: Context<'a>,
}

impl ConfigExtractor<'_> {
    fn convert_resource(&self, block: &Block, report: &mut DiscoveryReport) -> Option<Resource> {
        let labels = block.labels();
        let resource_type = labels.first()?.as_str();
        let block_name = labels.get(1)?.as_str();
        if !resource_type.starts_with(self.provider.terraform_prefix()) {
            return None;
        }

        let address = format!("{resource_type}.{block_name}");
        let mut dependencies = Vec::new();
        let mut config = self.body_to_map(block.body(), &address, &mut dependencies, report);
        if !self.options.include_sensitive_data {
            sensitive::redact(&mut config);
        }

        let name = config
            .get("name")
            .and_then(ConfigValue::as_str)
            .unwrap_or(block_name)
            .to_string();
        let mut resource = Resource::new(
            address.clone(),
            name,
            TypeMapper::map_terraform_type(resource_type),
        );
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
        resource.config = config;

        for dependency in dependencies {
            if dependency != address {
                resource.add_dependency(dependency);
            }
        }
        Some(resource)
    }

    /// Evaluate every attribute of a body and nest its blocks. Unresolved
    /// attributes are dropped with a warning and their references collected.
    fn body_to_map(
        &self,
        body: &Body,
        address: &str,
        dependencies: &mut Vec<String>,
        report: &mut DiscoveryReport,
    ) -> ConfigMap {
        let mut map = ConfigMap::new();

        for attribute in body.attributes() {
            let key = attribute.key();
            if key == "depends_on" {
                dependencies.extend(self.references(attribute.expr()));
                continue;
            }
            if META_ARGUMENTS.contains(&key) {
                continue;
            }

            match attribute.expr().evaluate(&self.context) {
                Ok(value) => {
                    map.insert(key.to_string(), convert_value(value));
                },
                Err(e) => {
                    dependencies.extend(self.references(attribute.expr()));
                    report.warn(DiscoveryWarning::new(
                        format!("{address}.{key}"),
                        WarningKind::UnresolvedAttribute,
                        format!("not a static value: {e}"),
                    ));
                },
            }
        }

        let mut nested: BTreeMap<String, Vec<ConfigValue>> = BTreeMap::new();
        for block in body.blocks() {
            let key = block.identifier();
            if META_ARGUMENTS.contains(&key) {
                continue;
            }
            let path = format!("{address}.{key}");
            let value = self.body_to_map(block.body(), &path, dependencies, report);
            nested
                .entry(key.to_string())
                .or_default()
                .push(ConfigValue::Map(value));
        }
        for (key, mut values) in nested {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                ConfigValue::List(values)
            };
            map.insert(key, value);
        }

        map
    }

    /// `<type>.<name>` addresses of managed resources an expression mentions
    fn references(&self, expr: &Expression) -> Vec<String> {
        let Ok(text) = hcl::format::to_string(expr) else {
            return Vec::new();
        };
        let prefix = self.provider.terraform_prefix();

        let mut found = Vec::new();
        for caps in reference_regex().captures_iter(&text) {
            if caps.get(1).is_some() || !caps[2].starts_with(prefix) {
                continue;
            }
            let reference = format!("{}.{}", &caps[2], &caps[3]);
            if !found.contains(&reference) {
                found.push(reference);
            }
        }
        found
    }

    fn record_variable(&self, block: &Block, infra: &mut Infrastructure) {
        let Some(name) = block.labels().first().map(|l| l.as_str()) else {
            return;
        };
        let default = block
            .body()
            .attributes()
            .find(|a| a.key() == "default")
            .and_then(|a| a.expr().evaluate(&self.context).ok())
            .map(convert_value);
        let value = match default {
            Some(_) if !self.options.include_sensitive_data && self.is_sensitive_block(block, name) => {
                ConfigValue::from(sensitive::REDACTED)
            },
            Some(value) => value,
            None => ConfigValue::Null,
        };
        infra.set_metadata(format!("var.{name}"), value);
    }

    fn record_output(&self, block: &Block, infra: &mut Infrastructure) {
        let Some(name) = block.labels().first().map(|l| l.as_str()) else {
            return;
        };
        let value = block
            .body()
            .attributes()
            .find(|a| a.key() == "value")
            .map(|a| match a.expr().evaluate(&self.context) {
                Ok(value) => convert_value(value),
                Err(_) => hcl::format::to_string(a.expr())
                    .map(ConfigValue::from)
                    .unwrap_or(ConfigValue::Null),
            })
            .unwrap_or(ConfigValue::Null);
        infra.set_metadata(format!("output.{name}"), value);
    }

    fn is_sensitive_block(&self, block: &Block, name: &str) -> bool {
        let flagged = block
            .body()
            .attributes()
            .any(|a| a.key() == "sensitive" && matches!(a.expr(), Expression::Bool(true)));
        flagged || sensitive::is_sensitive(name)
    }
}

/// Convert an evaluated HCL value, keeping object key order irrelevant
fn convert_value(value: hcl::Value) -> ConfigValue {
    match value {
        hcl::Value::Null => ConfigValue::Null,
        hcl::Value::Bool(b) => ConfigValue::Bool(b),
        hcl::Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Integer(i),
            None => ConfigValue::Float(n.as_f64().unwrap_or_default()),
        },
        hcl::Value::String(s) => ConfigValue::String(s),
        hcl::Value::Array(items) => ConfigValue::List(items.into_iter().map(convert_value).collect()),
        hcl::Value::Object(map) => ConfigValue::Map(
            map.into_iter()
                .map(|(k, v)| (k, convert_value(v)))
                .collect(),
        ),
    }
}

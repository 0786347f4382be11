//! Converts a deserialized ARM template into the normalized model

use super::types::{ArmResource, ArmTemplate};
use crate::TypeMapper;
use infra_discovery_common::sensitive;
use infra_discovery_common::{
    ConfigMap, ConfigValue, DiscoveryOptions, DiscoveryReport, DiscoveryWarning, Infrastructure,
    Provider, Resource, WarningKind,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// How many `variables('x')` hops are followed when a variable is itself an
/// expression
const MAX_EXPRESSION_HOPS: usize = 4;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[\s*(parameters|variables)\s*\(\s*'([^']*)'\s*\)\s*\]$")
            .expect("reference pattern is valid")
    })
}

/// Converts one template (and any inline nested templates) into a report
pub struct ArmConverter<'a> {
    options: &'a DiscoveryOptions,
    /// Label used for warnings, normally the file path
    unit: String,
}

impl<'a> ArmConverter<'a> {
    pub fn new(options: &'a DiscoveryOptions, unit: impl Into<String>) -> Self {
        Self {
            options,
            unit: unit.into(),
        }
    }

    /// Convert the template to a report
    pub fn convert(&self, template: &ArmTemplate) -> DiscoveryReport {
        let mut report = DiscoveryReport::new(Infrastructure::new(Provider::Azure));
        self.record_metadata(template, &mut report.infrastructure);
        self.convert_template(template, 0, &mut report);
        report
    }

    fn record_metadata(&self, template: &ArmTemplate, infra: &mut Infrastructure) {
        if let Some(schema) = &template.schema {
            infra.set_metadata("schema", schema.as_str());
        }
        if let Some(version) = &template.content_version {
            infra.set_metadata("contentVersion", version.as_str());
        }

        for (name, param) in &template.parameters {
            let value = match &param.default_value {
                Some(_) if param.is_secure() && !self.options.include_sensitive_data => {
                    ConfigValue::from(sensitive::REDACTED)
                },
                Some(default) => ConfigValue::from(default.clone()),
                None => ConfigValue::from(param.param_type.as_str()),
            };
            infra.set_metadata(format!("param.{name}"), value);
        }

        for (name, value) in &template.variables {
            infra.set_metadata(format!("var.{name}"), ConfigValue::from(value.clone()));
        }

        for (name, output) in &template.outputs {
            let value = match &output.value {
                Some(value) => ConfigValue::from(value.clone()),
                None => ConfigValue::from(output.output_type.as_str()),
            };
            infra.set_metadata(format!("output.{name}"), value);
        }
    }

    fn convert_template(&self, template: &ArmTemplate, depth: usize, report: &mut DiscoveryReport) {
        for resource in &template.resources {
            self.convert_resource(template, resource, None, depth, report);
        }
    }

    fn convert_resource(
        &self,
        template: &ArmTemplate,
        resource: &ArmResource,
        parent: Option<(&str, &str, &str)>,
        depth: usize,
        report: &mut DiscoveryReport,
    ) {
        let own_name = self.resolve(template, &resource.name);
        let (native_type, name) = match parent {
            Some((parent_type, parent_name, _)) => (
                child_type(parent_type, &resource.resource_type),
                format!("{parent_name}/{own_name}"),
            ),
            None => (resource.resource_type.clone(), own_name),
        };

        let mut converted = self.build_resource(template, resource, &native_type, &name);
        if let Some((_, _, parent_id)) = parent {
            converted.add_dependency(parent_id);
        }
        let id = converted.id.clone();
        debug!(id = %id, kind = %converted.resource_type, "Converted ARM resource");
        report.infrastructure.insert(converted);

        for child in &resource.resources {
            let parent = Some((native_type.as_str(), name.as_str(), id.as_str()));
            self.convert_resource(template, child, parent, depth, report);
        }

        if let Some(nested) = resource.nested_template() {
            self.expand_nested(&id, nested, depth, report);
        } else if is_linked_deployment(resource) && self.options.follow_nested_templates {
            report.warn(DiscoveryWarning::new(
                format!("{}#{}", self.unit, id),
                WarningKind::UnresolvedModule,
                "linked templates are not fetched",
            ));
        }
    }

    fn build_resource(
        &self,
        template: &ArmTemplate,
        resource: &ArmResource,
        native_type: &str,
        name: &str,
    ) -> Resource {
        let resource_type = TypeMapper::refine_by_kind(
            TypeMapper::map_arm_type(native_type),
            resource.kind.as_deref(),
        );
        let mut converted = Resource::new(format!("{native_type}/{name}"), name, resource_type);

        if let Some(location) = &resource.location {
            converted.region = self.resolve(template, location);
        }

        let mut config = ConfigMap::new();
        match resource.properties.clone().map(ConfigValue::from) {
            Some(ConfigValue::Map(properties)) => config = properties,
            Some(other) => {
                config.insert("properties".to_string(), other);
            },
            None => {},
        }
        if let Some(sku) = &resource.sku {
            config
                .entry("sku".to_string())
                .or_insert_with(|| ConfigValue::from(sku.clone()));
        }
        if let Some(kind) = &resource.kind {
            config
                .entry("kind".to_string())
                .or_insert_with(|| ConfigValue::from(kind.as_str()));
        }
        if let Some(api_version) = &resource.api_version {
            config
                .entry("apiVersion".to_string())
                .or_insert_with(|| ConfigValue::from(api_version.as_str()));
        }
        if !self.options.include_sensitive_data {
            sensitive::redact(&mut config);
        }
        converted.config = config;

        if let Some(tags) = &resource.tags {
            converted.tags = ConfigValue::from(tags.clone()).to_tags();
        }

        for dependency in &resource.depends_on {
            converted.add_dependency(dependency.as_str());
        }

        converted
    }

    fn expand_nested(&self, id: &str, nested: &Value, depth: usize, report: &mut DiscoveryReport) {
        if !self.options.follow_nested_templates {
            return;
        }
        let unit = format!("{}#{}", self.unit, id);

        if !self.options.allows_depth(depth) {
            warn!("Not expanding nested template {}: maximum depth {} reached", id, depth);
            report.warn(DiscoveryWarning::new(
                unit,
                WarningKind::UnresolvedModule,
                format!("maximum nesting depth {} reached", self.options.max_recursion_depth),
            ));
            return;
        }

        match serde_json::from_value::<ArmTemplate>(nested.clone()) {
            Ok(template) => {
                debug!(
                    deployment = %id,
                    resources = template.resources.len(),
                    "Expanding nested template"
                );
                self.convert_template(&template, depth + 1, report);
            },
            Err(e) => report.warn(DiscoveryWarning::new(
                unit,
                WarningKind::UnresolvedModule,
                format!("invalid nested template: {e}"),
            )),
        }
    }

    /// Resolve `[parameters('x')]` and `[variables('x')]` to their literal
    /// values; anything else is kept verbatim
    fn resolve(&self, template: &ArmTemplate, raw: &str) -> String {
        let mut current = raw.to_string();
        for _ in 0..MAX_EXPRESSION_HOPS {
            let literal = {
                let Some(captures) = reference_regex().captures(&current) else {
                    break;
                };
                let key = &captures[2];
                match &captures[1] {
                    "parameters" => template
                        .parameters
                        .get(key)
                        .and_then(|p| p.default_value.as_ref())
                        .and_then(scalar_text),
                    _ => template.variables.get(key).and_then(scalar_text),
                }
            };
            match literal {
                Some(literal) => current = literal,
                None => break,
            }
        }
        current
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Full type of an inline child; a child may already carry the namespace
fn child_type(parent_type: &str, child_type: &str) -> String {
    if child_type.contains('.') {
        child_type.to_string()
    } else {
        format!("{parent_type}/{child_type}")
    }
}

fn is_linked_deployment(resource: &ArmResource) -> bool {
    resource
        .resource_type
        .eq_ignore_ascii_case("Microsoft.Resources/deployments")
        && resource
            .properties
            .as_ref()
            .and_then(|p| p.get("templateLink"))
            .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use infra_discovery_common::ResourceType;
    use serde_json::json;

    fn template(value: Value) -> ArmTemplate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_resolves_parameter_and_variable_references() {
        let template = template(json!({
            "parameters": {
                "location": {"type": "string", "defaultValue": "westeurope"},
                "noDefault": {"type": "string"}
            },
            "variables": {
                "accountName": "[parameters('prefixed')]",
                "vaultName": "kv-prod"
            },
            "resources": []
        }));
        let options = DiscoveryOptions::default();
        let converter = ArmConverter::new(&options, "t.json");

        assert_eq!(converter.resolve(&template, "[parameters('location')]"), "westeurope");
        assert_eq!(converter.resolve(&template, "[variables('vaultName')]"), "kv-prod");
        assert_eq!(
            converter.resolve(&template, "[parameters('noDefault')]"),
            "[parameters('noDefault')]"
        );
        assert_eq!(
            converter.resolve(&template, "[variables('accountName')]"),
            "[parameters('prefixed')]"
        );
        assert_eq!(
            converter.resolve(&template, "[concat('a', 'b')]"),
            "[concat('a', 'b')]"
        );
    }

    #[test]
    fn test_child_resources_are_flattened() {
        let template = template(json!({
            "resources": [{
                "type": "Microsoft.Sql/servers",
                "name": "sqlsrv",
                "location": "eastus",
                "resources": [{
                    "type": "databases",
                    "name": "appdb",
                    "location": "eastus"
                }]
            }]
        }));
        let options = DiscoveryOptions::default();
        let report = ArmConverter::new(&options, "t.json").convert(&template);
        let infra = &report.infrastructure;

        assert_eq!(infra.len(), 2);
        let db = infra.get("Microsoft.Sql/servers/databases/sqlsrv/appdb").unwrap();
        assert_eq!(db.resource_type, ResourceType::SqlDatabase);
        assert_eq!(db.name, "sqlsrv/appdb");
        assert_eq!(db.dependencies, vec!["Microsoft.Sql/servers/sqlsrv"]);
    }

    #[test]
    fn test_config_holds_properties_and_envelope_fields() {
        let template = template(json!({
            "resources": [{
                "type": "Microsoft.Web/sites",
                "apiVersion": "2022-03-01",
                "name": "fn",
                "kind": "functionapp,linux",
                "sku": {"name": "Y1"},
                "properties": {
                    "httpsOnly": true,
                    "siteConfig": {"storageAccountConnectionString": "DefaultEndpoints..."}
                }
            }]
        }));
        let options = DiscoveryOptions::default();
        let report = ArmConverter::new(&options, "t.json").convert(&template);
        let site = report.infrastructure.get("Microsoft.Web/sites/fn").unwrap();

        assert_eq!(site.resource_type, ResourceType::FunctionApp);
        assert_eq!(site.config["httpsOnly"], ConfigValue::Bool(true));
        assert_eq!(site.config["apiVersion"], ConfigValue::from("2022-03-01"));
        assert_eq!(site.config["sku"].get("name"), Some(&ConfigValue::from("Y1")));
        assert_eq!(
            site.config["siteConfig"].get("storageAccountConnectionString"),
            Some(&ConfigValue::from(sensitive::REDACTED))
        );
    }

    #[test]
    fn test_nested_deployment_respects_depth() {
        let template = template(json!({
            "resources": [{
                "type": "Microsoft.Resources/deployments",
                "name": "outer",
                "properties": {
                    "template": {
                        "resources": [{
                            "type": "Microsoft.Resources/deployments",
                            "name": "inner",
                            "properties": {
                                "template": {
                                    "resources": [{
                                        "type": "Microsoft.KeyVault/vaults",
                                        "name": "deep"
                                    }]
                                }
                            }
                        }]
                    }
                }
            }]
        }));

        let unlimited = DiscoveryOptions::default();
        let report = ArmConverter::new(&unlimited, "t.json").convert(&template);
        assert!(report.infrastructure.contains("Microsoft.KeyVault/vaults/deep"));
        assert!(report.is_clean());

        let shallow = DiscoveryOptions {
            max_recursion_depth: 1,
            ..Default::default()
        };
        let report = ArmConverter::new(&shallow, "t.json").convert(&template);
        assert!(report
            .infrastructure
            .contains("Microsoft.Resources/deployments/inner"));
        assert!(!report.infrastructure.contains("Microsoft.KeyVault/vaults/deep"));
        assert_eq!(report.warnings_of(WarningKind::UnresolvedModule).count(), 1);

        let disabled = DiscoveryOptions {
            follow_nested_templates: false,
            ..Default::default()
        };
        let report = ArmConverter::new(&disabled, "t.json").convert(&template);
        assert_eq!(report.infrastructure.len(), 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_secure_parameter_defaults_are_redacted() {
        let template = template(json!({
            "parameters": {
                "adminPassword": {"type": "securestring", "defaultValue": "hunter2"},
                "sku": {"type": "string", "defaultValue": "Standard_LRS"},
                "count": {"type": "int"}
            },
            "outputs": {"endpoint": {"type": "string", "value": "[reference('x').primaryEndpoints.blob]"}}
        }));
        let options = DiscoveryOptions::default();
        let report = ArmConverter::new(&options, "t.json").convert(&template);
        let metadata = report.infrastructure.metadata();

        assert_eq!(metadata["param.adminPassword"], ConfigValue::from(sensitive::REDACTED));
        assert_eq!(metadata["param.sku"], ConfigValue::from("Standard_LRS"));
        assert_eq!(metadata["param.count"], ConfigValue::from("int"));
        assert!(metadata.contains_key("output.endpoint"));
    }
}

//! Bicep file parser

use super::blocks;
use crate::source_files::{self, FileKind};
use crate::TypeMapper;
use infra_discovery_common::sensitive;
use infra_discovery_common::{
    ConfigMap, ConfigValue, DiscoveryContext, DiscoveryError, DiscoveryOptions, DiscoveryReport,
    DiscoveryWarning, Infrastructure, InfrastructureParser, Provider, Resource, ResourceFilter,
    Result, SourceFormat, WarningKind,
};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const FILE_KINDS: &[FileKind] = &[FileKind::new(&["bicep"])];

/// Identifiers that look like `symbol.property` but are built-ins
const PSEUDO_SYMBOLS: &[&str] = &[
    "resourceGroup",
    "subscription",
    "deployment",
    "environment",
    "tenant",
    "managementGroup",
    "az",
    "sys",
];

fn resource_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*resource\s+([A-Za-z_]\w*)\s+'([^'@]+)@([^']*)'\s*(existing\s*)?=")
            .expect("resource pattern is valid")
    })
}

fn module_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*module\s+([A-Za-z_]\w*)\s+'([^']+)'\s*=")
            .expect("module pattern is valid")
    })
}

fn param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*param\s+([A-Za-z_]\w*)\s+(\w+)[ \t]*(?:=[ \t]*(.*))?$")
            .expect("param pattern is valid")
    })
}

fn var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*var\s+([A-Za-z_]\w*)\s*=[ \t]*(.*)$").expect("var pattern is valid")
    })
}

fn output_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*output\s+([A-Za-z_]\w*)\s+(\w+)\s*=[ \t]*(.*)$")
            .expect("output pattern is valid")
    })
}

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_]\w*)\.[A-Za-z_]\w*").expect("reference pattern is valid")
    })
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*resource\s+[A-Za-z_]\w*\s+'Microsoft\.")
            .expect("marker pattern is valid")
    })
}

/// Whether Bicep text declares at least one `Microsoft.*` resource
pub fn is_bicep_template(content: &str) -> bool {
    marker_regex().is_match(content)
}

/// A `resource` statement located in the text
struct ResourceHeader {
    symbol: String,
    kind: String,
    existing: bool,
    /// Offset right after the `=`
    body_start: usize,
}

/// A `module` statement located in the text
struct ModuleHeader {
    symbol: String,
    source: String,
}

/// Extractor for Bicep files
///
/// Statements are located with line-anchored patterns and resource bodies
/// are bounded by counting braces. There is no Bicep grammar behind this.
#[derive(Debug, Default, Clone, Copy)]
pub struct BicepParser;

impl BicepParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse Bicep source text. `origin` resolves relative module paths;
    /// without it modules are reported as unresolved.
    pub fn parse_str(
        &self,
        content: &str,
        origin: Option<&Path>,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport> {
        let mut report = DiscoveryReport::new(Infrastructure::new(Provider::Azure));
        let unit = origin
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<inline>".to_string());

        let literals = record_declarations(content, options, &mut report.infrastructure);
        let file = FileScope {
            content,
            origin,
            unit: &unit,
            prefix: String::new(),
            depth: 0,
            literals: &literals,
        };
        self.parse_scope(&file, options, &mut report)?;
        Ok(report)
    }

    fn parse_scope(
        &self,
        scope: &FileScope<'_>,
        options: &DiscoveryOptions,
        report: &mut DiscoveryReport,
    ) -> Result<()> {
        let resources = find_resources(scope.content);
        let modules = find_modules(scope.content);

        // symbol -> resource ID, for dependency edges
        let mut symbols: BTreeMap<String, String> = resources
            .iter()
            .map(|h| (h.symbol.clone(), scope.resource_id(&h.kind, &h.symbol)))
            .collect();
        for module in &modules {
            symbols.insert(module.symbol.clone(), format!("{}module.{}", scope.prefix, module.symbol));
        }

        for header in &resources {
            let resource = self.build_resource(scope, header, &symbols, options)?;
            debug!(id = %resource.id, kind = %resource.resource_type, "Converted Bicep resource");
            report.infrastructure.insert(resource);
        }

        for module in &modules {
            self.follow_module(scope, module, options, report)?;
        }
        Ok(())
    }

    fn build_resource(
        &self,
        scope: &FileScope<'_>,
        header: &ResourceHeader,
        symbols: &BTreeMap<String, String>,
        options: &DiscoveryOptions,
    ) -> Result<Resource> {
        let (open, close) = blocks::find_block(scope.content, header.body_start).ok_or_else(|| {
            DiscoveryError::Parse(format!(
                "{}: unbalanced braces in resource '{}'",
                scope.unit, header.symbol
            ))
        })?;
        let body = &scope.content[open + 1..close];
        let mut config = blocks::parse_object(body);

        let name = config
            .get("name")
            .and_then(ConfigValue::as_str)
            .map(|n| scope.literal(n))
            .unwrap_or_else(|| header.symbol.clone());
        let resource_type = TypeMapper::refine_by_kind(
            TypeMapper::map_arm_type(&header.kind),
            config.get("kind").and_then(ConfigValue::as_str),
        );

        let mut resource = Resource::new(
            scope.resource_id(&header.kind, &header.symbol),
            name,
            resource_type,
        );
        if let Some(location) = config.get("location").and_then(ConfigValue::as_str) {
            resource.region = scope.literal(location);
        }
        if let Some(tags) = config.get("tags") {
            resource.tags = tags.to_tags();
        }

        for symbol in explicit_dependencies(&config) {
            if let Some(id) = symbols.get(&symbol) {
                resource.add_dependency(id.as_str());
            }
        }
        for symbol in referenced_symbols(body) {
            if symbol == header.symbol {
                continue;
            }
            if let Some(id) = symbols.get(&symbol) {
                resource.add_dependency(id.as_str());
            }
        }

        if header.existing {
            config.insert("existing".to_string(), ConfigValue::Bool(true));
        }
        if !options.include_sensitive_data {
            sensitive::redact(&mut config);
        }
        resource.config = config;
        Ok(resource)
    }

    fn follow_module(
        &self,
        scope: &FileScope<'_>,
        module: &ModuleHeader,
        options: &DiscoveryOptions,
        report: &mut DiscoveryReport,
    ) -> Result<()> {
        if !options.follow_nested_templates {
            return Ok(());
        }
        let unit = format!("{}#module.{}", scope.unit, module.symbol);
        let unresolved = |report: &mut DiscoveryReport, message: String| {
            warn!("{}: {}", unit, message);
            report.warn(DiscoveryWarning::new(
                unit.clone(),
                WarningKind::UnresolvedModule,
                message,
            ));
        };

        if !module.source.ends_with(".bicep") || module.source.contains(':') {
            unresolved(report, format!("registry module '{}' is not fetched", module.source));
            return Ok(());
        }
        if !options.allows_depth(scope.depth) {
            unresolved(
                report,
                format!("maximum nesting depth {} reached", options.max_recursion_depth),
            );
            return Ok(());
        }
        let Some(path) = scope.module_path(&module.source) else {
            unresolved(report, format!("cannot locate '{}' without a file path", module.source));
            return Ok(());
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                unresolved(report, format!("cannot read {}: {}", path.display(), e));
                return Ok(());
            },
        };

        let literals = collect_literals(&content);
        let module_unit = path.display().to_string();
        let nested = FileScope {
            content: &content,
            origin: Some(path.as_path()),
            unit: &module_unit,
            prefix: format!("{}module.{}.", scope.prefix, module.symbol),
            depth: scope.depth + 1,
            literals: &literals,
        };
        debug!(module = %module.symbol, path = %path.display(), "Following Bicep module");
        self.parse_scope(&nested, options, report)
    }
}

/// One file being parsed, possibly as a module of another
struct FileScope<'a> {
    content: &'a str,
    origin: Option<&'a Path>,
    unit: &'a str,
    /// `module.<symbol>.` chain for resources inside modules
    prefix: String,
    depth: usize,
    /// Parameters and variables with literal values
    literals: &'a BTreeMap<String, String>,
}

impl FileScope<'_> {
    fn resource_id(&self, kind: &str, symbol: &str) -> String {
        format!("{}{}.{}", self.prefix, kind, symbol)
    }

    /// Replace a bare parameter/variable reference with its literal value
    fn literal(&self, value: &str) -> String {
        self.literals
            .get(value)
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    fn module_path(&self, source: &str) -> Option<PathBuf> {
        let dir = self.origin?.parent()?;
        Some(dir.join(source))
    }
}

fn find_resources(content: &str) -> Vec<ResourceHeader> {
    resource_regex()
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(ResourceHeader {
                symbol: caps[1].to_string(),
                kind: caps[2].to_string(),
                existing: caps.get(4).is_some(),
                body_start: whole.end(),
            })
        })
        .collect()
}

fn find_modules(content: &str) -> Vec<ModuleHeader> {
    module_regex()
        .captures_iter(content)
        .map(|caps| ModuleHeader {
            symbol: caps[1].to_string(),
            source: caps[2].to_string(),
        })
        .collect()
}

/// Symbols named in `dependsOn` and `parent`
fn explicit_dependencies(config: &ConfigMap) -> Vec<String> {
    let mut symbols = Vec::new();
    if let Some(items) = config.get("dependsOn").and_then(ConfigValue::as_list) {
        symbols.extend(items.iter().filter_map(|v| v.as_str().map(str::to_string)));
    }
    if let Some(parent) = config.get("parent").and_then(ConfigValue::as_str) {
        symbols.push(parent.to_string());
    }
    symbols
}

/// Distinct `symbol` prefixes of `symbol.property` references, pseudo
/// symbols excluded
fn referenced_symbols(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    reference_regex()
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .filter(|symbol| !PSEUDO_SYMBOLS.contains(&symbol.as_str()))
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Parameters and variables whose value is a plain single-line literal
fn collect_literals(content: &str) -> BTreeMap<String, String> {
    let mut literals = BTreeMap::new();
    for caps in param_regex().captures_iter(content) {
        if let Some(value) = caps.get(3).and_then(|m| literal_text(m.as_str())) {
            literals.insert(caps[1].to_string(), value);
        }
    }
    for caps in var_regex().captures_iter(content) {
        if let Some(value) = literal_text(&caps[2]) {
            literals.insert(caps[1].to_string(), value);
        }
    }
    literals
}

fn literal_text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    // Interpolated strings are expressions
    if raw.contains("${") {
        return None;
    }
    match blocks::parse_scalar(raw) {
        ConfigValue::String(s) if raw.starts_with('\'') => Some(s),
        ConfigValue::Integer(i) => Some(i.to_string()),
        ConfigValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Value of a declaration, reading a following `{`/`[` block when the
/// value opens one
fn declaration_value(content: &str, value_start: usize, raw: &str) -> ConfigValue {
    let raw = raw.trim();
    if raw == "{" {
        if let Some((open, close)) = blocks::find_block(content, value_start) {
            return ConfigValue::Map(blocks::parse_object(&content[open + 1..close]));
        }
    }
    if raw == "[" {
        if let Some((open, close)) = blocks::find_list(content, value_start) {
            return ConfigValue::List(blocks::parse_list(&content[open + 1..close]));
        }
    }
    blocks::parse_scalar(raw)
}

/// Whether the line above a declaration carries `@secure()`
fn is_secure_declaration(content: &str, start: usize) -> bool {
    content[..start]
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().starts_with("@secure"))
        .unwrap_or(false)
}

/// Record params, vars and outputs as metadata; returns the literal values
/// usable for name/location resolution
fn record_declarations(
    content: &str,
    options: &DiscoveryOptions,
    infra: &mut Infrastructure,
) -> BTreeMap<String, String> {
    for caps in param_regex().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[1];
        let value = match caps.get(3) {
            Some(_)
                if !options.include_sensitive_data
                    && (is_secure_declaration(content, whole.start())
                        || sensitive::is_sensitive(name)) =>
            {
                ConfigValue::from(sensitive::REDACTED)
            },
            Some(default) => declaration_value(content, default.start(), default.as_str()),
            None => ConfigValue::from(&caps[2]),
        };
        infra.set_metadata(format!("param.{name}"), value);
    }

    for caps in var_regex().captures_iter(content) {
        let Some(raw) = caps.get(2) else { continue };
        let value = declaration_value(content, raw.start(), raw.as_str());
        infra.set_metadata(format!("var.{}", &caps[1]), value);
    }

    for caps in output_regex().captures_iter(content) {
        let Some(raw) = caps.get(3) else { continue };
        let value = declaration_value(content, raw.start(), raw.as_str());
        infra.set_metadata(format!("output.{}", &caps[1]), value);
    }

    collect_literals(content)
}

/// Drop walked files that another walked file pulls in as a module; their
/// resources are reached through the `module` statement with its prefix.
fn standalone_files(files: Vec<PathBuf>, options: &DiscoveryOptions) -> Vec<PathBuf> {
    if !options.follow_nested_templates || files.len() < 2 {
        return files;
    }

    let mut referenced = HashSet::new();
    for file in &files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let Some(dir) = file.parent() else {
            continue;
        };
        for module in find_modules(&content) {
            if module.source.ends_with(".bicep") && !module.source.contains(':') {
                if let Ok(target) = dir.join(&module.source).canonicalize() {
                    referenced.insert(target);
                }
            }
        }
    }

    files
        .into_iter()
        .filter(|file| match file.canonicalize() {
            Ok(canonical) if referenced.contains(&canonical) => {
                debug!(path = %file.display(), "Skipping module file, read through its parent");
                false
            },
            _ => true,
        })
        .collect()
}

impl InfrastructureParser for BicepParser {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Bicep]
    }

    fn validate(&self, path: &Path) -> Result<()> {
        source_files::validate(path, FILE_KINDS, is_bicep_template)
    }

    fn auto_detect(&self, path: &Path) -> (bool, f32) {
        source_files::detect(path, FILE_KINDS, is_bicep_template)
    }

    fn parse(
        &self,
        ctx: &DiscoveryContext,
        path: &Path,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport> {
        let files = standalone_files(source_files::collect(path, FILE_KINDS, options)?, options);

        let mut report = DiscoveryReport::new(Infrastructure::new(Provider::Azure));
        source_files::parse_each(ctx, &files, options, &mut report, |file| {
            let content = source_files::read(file)?;
            self.parse_str(&content, Some(file), options)
        })?;

        report.infrastructure = ResourceFilter::from_options(options).apply(report.infrastructure);
        info!(
            "Parsed {} Bicep file(s) from {}: {} resources, {} warnings",
            files.len(),
            path.display(),
            report.infrastructure.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infra_discovery_common::ResourceType;

    const STORAGE: &str = r#"
param location string = 'westeurope'
param storageName string = 'stacct001'
@secure()
param adminPassword string = 'changeme'

var prefix = 'app'

resource storage 'Microsoft.Storage/storageAccounts@2023-01-01' = {
  name: storageName
  location: location
  kind: 'StorageV2'
  sku: {
    name: 'Standard_LRS'
  }
  tags: {
    env: 'prod'
  }
}

resource plan 'Microsoft.Web/serverfarms@2022-03-01' = {
  name: '${prefix}-plan'
  location: resourceGroup().location
}

resource site 'Microsoft.Web/sites@2022-03-01' = {
  name: '${prefix}-web'
  location: location
  kind: 'functionapp'
  properties: {
    serverFarmId: plan.id
    storage: storage.properties.primaryEndpoints.blob
  }
  dependsOn: [
    storage
  ]
}

output blobEndpoint string = storage.properties.primaryEndpoints.blob
"#;

    #[test]
    fn test_resources_and_ids() {
        let report = BicepParser::new().parse_str(STORAGE, None, &Default::default()).unwrap();
        let infra = &report.infrastructure;

        assert_eq!(infra.len(), 3);
        let storage = infra.get("Microsoft.Storage/storageAccounts.storage").unwrap();
        assert_eq!(storage.name, "stacct001");
        assert_eq!(storage.region, "westeurope");
        assert_eq!(storage.resource_type, ResourceType::StorageAccount);
        assert_eq!(storage.tags["env"], "prod");
        assert_eq!(storage.config["sku"].get("name"), Some(&ConfigValue::from("Standard_LRS")));

        let plan = infra.get("Microsoft.Web/serverfarms.plan").unwrap();
        assert_eq!(plan.region, "resourceGroup().location");
        assert!(plan.dependencies.is_empty());
    }

    #[test]
    fn test_reference_and_explicit_dependencies() {
        let report = BicepParser::new().parse_str(STORAGE, None, &Default::default()).unwrap();
        let site = report.infrastructure.get("Microsoft.Web/sites.site").unwrap();

        assert_eq!(site.resource_type, ResourceType::FunctionApp);
        assert_eq!(
            site.dependencies,
            vec![
                "Microsoft.Storage/storageAccounts.storage",
                "Microsoft.Web/serverfarms.plan"
            ]
        );
    }

    #[test]
    fn test_declarations_recorded_as_metadata() {
        let report = BicepParser::new().parse_str(STORAGE, None, &Default::default()).unwrap();
        let metadata = report.infrastructure.metadata();

        assert_eq!(metadata["param.location"], ConfigValue::from("westeurope"));
        assert_eq!(metadata["param.adminPassword"], ConfigValue::from(sensitive::REDACTED));
        assert_eq!(metadata["var.prefix"], ConfigValue::from("app"));
        assert_eq!(
            metadata["output.blobEndpoint"],
            ConfigValue::from("storage.properties.primaryEndpoints.blob")
        );
    }

    #[test]
    fn test_existing_resources_are_marked() {
        let content = "resource kv 'Microsoft.KeyVault/vaults@2023-02-01' existing = {\n  name: 'shared-kv'\n}\n";
        let report = BicepParser::new().parse_str(content, None, &Default::default()).unwrap();
        let kv = report.infrastructure.get("Microsoft.KeyVault/vaults.kv").unwrap();
        assert_eq!(kv.config["existing"], ConfigValue::Bool(true));
        assert_eq!(kv.name, "shared-kv");
    }

    #[test]
    fn test_pseudo_symbols_are_not_dependencies() {
        let symbols = referenced_symbols("location: resourceGroup().location\nx: subscription().id\ny: vnet.id");
        assert_eq!(symbols, vec!["vnet"]);
    }

    #[test]
    fn test_unbalanced_resource_is_parse_error() {
        let content = "resource a 'Microsoft.Storage/storageAccounts@2023-01-01' = {\n  name: 'a'\n";
        let result = BicepParser::new().parse_str(content, None, &Default::default());
        assert!(matches!(result, Err(DiscoveryError::Parse(_))));
    }

    #[test]
    fn test_module_without_origin_is_unresolved() {
        let content = "module net './network.bicep' = {\n  name: 'net'\n}\n";
        let report = BicepParser::new().parse_str(content, None, &Default::default()).unwrap();
        assert_eq!(report.warnings_of(WarningKind::UnresolvedModule).count(), 1);
        assert!(report.infrastructure.is_empty());
    }

    #[test]
    fn test_marker() {
        assert!(is_bicep_template("resource x 'Microsoft.Network/virtualNetworks@2023-01-01' = {"));
        assert!(!is_bicep_template("param location string"));
    }
}

//! Live Azure Resource Manager scanner

use crate::catalog::{azure_catalog, ScanDefinition};
use crate::client::{ArmClient, HttpArmClient, ListPage, MANAGEMENT_ENDPOINT};
use crate::credential::{self, Credential, CredentialProvider, CredentialSource};
use infra_discovery_common::{
    confidence, sensitive, ConfigMap, ConfigValue, DiscoveryContext, DiscoveryError,
    DiscoveryOptions, DiscoveryReport, DiscoveryWarning, Infrastructure, InfrastructureParser,
    Provider, Resource, ResourceFilter, Result, SourceFormat, WarningKind,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scheme marking a path as a live scan target (`azure://<subscription>`)
pub const LIVE_SCHEME: &str = "azure://";

/// Deadline for the credential probe run by `validate` and `auto_detect`
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscription override carried by a live target path.
///
/// `None` when the path is not a live target; `Some(None)` for the empty
/// path or a bare `azure://`.
pub fn live_target(path: &Path) -> Option<Option<String>> {
    let raw = path.to_str()?;
    if raw.is_empty() {
        return Some(None);
    }
    let subscription = raw.strip_prefix(LIVE_SCHEME)?.trim_matches('/');
    Some((!subscription.is_empty()).then(|| subscription.to_string()))
}

/// Lists every catalogued kind in one subscription, one kind at a time
pub struct AzureLiveScanner {
    credentials: Box<dyn CredentialProvider>,
    client: Box<dyn ArmClient>,
    catalog: Vec<ScanDefinition>,
    endpoint: String,
}

impl AzureLiveScanner {
    pub fn new(credentials: Box<dyn CredentialProvider>, client: Box<dyn ArmClient>) -> Self {
        Self {
            credentials,
            client,
            catalog: azure_catalog(),
            endpoint: MANAGEMENT_ENDPOINT.to_string(),
        }
    }

    /// Scanner wired to the HTTP client, with credentials from the options
    /// map when present and the environment otherwise
    pub fn from_options(options: &DiscoveryOptions) -> Result<Self> {
        Ok(Self::new(
            credential::from_options(&options.credentials)?,
            Box::new(HttpArmClient::new()?),
        ))
    }

    pub fn with_catalog(mut self, catalog: Vec<ScanDefinition>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn catalog(&self) -> &[ScanDefinition] {
        &self.catalog
    }

    fn probe(&self) -> Result<CredentialSource> {
        let ctx = DiscoveryContext::new().with_timeout(PROBE_TIMEOUT);
        self.credentials.get_credential(&ctx)?;
        Ok(self.credentials.source())
    }

    fn subscription_url(&self, subscription: &str, arm_type: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}/providers/{}?api-version={}",
            self.endpoint, subscription, arm_type, api_version
        )
    }

    /// Follow `nextLink` until the collection is exhausted
    fn drain(&self, ctx: &DiscoveryContext, credential: &Credential, url: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut next = url.to_string();
        loop {
            ctx.check()?;
            let ListPage { value, next_link } = self.client.list(ctx, credential, &next)?;
            items.extend(value);
            match next_link {
                Some(link) if !link.is_empty() && link != next => next = link,
                _ => break,
            }
        }
        Ok(items)
    }

    /// Subscription-wide collection, listed at most once per pass
    fn collection<'c>(
        &self,
        ctx: &DiscoveryContext,
        credential: &Credential,
        url: String,
        cache: &'c mut HashMap<String, Vec<Value>>,
    ) -> Result<&'c [Value]> {
        if !cache.contains_key(&url) {
            let items = self.drain(ctx, credential, &url)?;
            cache.insert(url.clone(), items);
        } else {
            debug!("Reusing listed collection {}", url);
        }
        Ok(cache.get(&url).map(Vec::as_slice).unwrap_or_default())
    }

    fn scan_kind(
        &self,
        ctx: &DiscoveryContext,
        credential: &Credential,
        subscription: &str,
        definition: &ScanDefinition,
        cache: &mut HashMap<String, Vec<Value>>,
        options: &DiscoveryOptions,
    ) -> Result<Vec<Resource>> {
        let Some(parent) = &definition.parent else {
            let url = self.subscription_url(subscription, definition.arm_type, definition.api_version);
            let items = self.collection(ctx, credential, url, cache)?;
            return Ok(items
                .iter()
                .filter(|item| definition.kind_match.matches(item["kind"].as_str()))
                .filter_map(|item| to_resource(definition, item, None, options))
                .collect());
        };

        let url = self.subscription_url(subscription, parent.arm_type, parent.api_version);
        let parents = self.collection(ctx, credential, url, cache)?.to_vec();

        let mut resources = Vec::new();
        for parent_item in &parents {
            let Some(parent_id) = parent_item["id"].as_str() else {
                continue;
            };
            let url = format!(
                "{}{}/{}?api-version={}",
                self.endpoint, parent_id, parent.path, definition.api_version
            );
            for item in self.drain(ctx, credential, &url)? {
                if let Some(resource) = to_resource(definition, &item, Some(parent_item), options) {
                    resources.push(resource);
                }
            }
        }
        Ok(resources)
    }
}

/// Normalize one ARM list item; items without an ID are dropped
fn to_resource(
    definition: &ScanDefinition,
    item: &Value,
    parent: Option<&Value>,
    options: &DiscoveryOptions,
) -> Option<Resource> {
    let Some(id) = item["id"].as_str() else {
        debug!("Dropping {} item without an id", definition.arm_type);
        return None;
    };
    let name = item["name"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| id.rsplit('/').next().unwrap_or(id).to_string());
    let region = item["location"]
        .as_str()
        .or_else(|| parent.and_then(|p| p["location"].as_str()))
        .unwrap_or_default();

    let mut config = ConfigMap::new();
    for (key, pointer) in definition.fields {
        match item.pointer(pointer) {
            None | Some(Value::Null) => {},
            Some(value) => {
                config.insert(key.to_string(), ConfigValue::from(value.clone()));
            },
        }
    }
    if !options.include_sensitive_data {
        sensitive::redact(&mut config);
    }

    let mut resource = Resource::new(id, name, definition.resource_type.clone())
        .with_region(region)
        .with_native_id(id)
        .with_config(config);
    resource.tags = ConfigValue::from(item["tags"].clone()).to_tags();
    if let Some(parent_id) = parent.and_then(|p| p["id"].as_str()) {
        resource.add_dependency(parent_id);
    }
    Some(resource)
}

impl InfrastructureParser for AzureLiveScanner {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::AzureLive]
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if live_target(path).is_none() {
            return Err(DiscoveryError::UnsupportedFormat(format!(
                "{} is not a live scan target (expected {LIVE_SCHEME}<subscription>)",
                path.display()
            )));
        }
        self.probe().map(|_| ())
    }

    fn auto_detect(&self, path: &Path) -> (bool, f32) {
        if live_target(path).is_none() {
            return (false, 0.0);
        }
        match self.probe() {
            Ok(CredentialSource::Explicit) => (true, confidence::EXPLICIT_CREDENTIALS),
            Ok(CredentialSource::DefaultChain) => (true, confidence::DEFAULT_CREDENTIAL_CHAIN),
            Err(e) => {
                debug!("Credential probe failed: {}", e);
                (false, 0.0)
            },
        }
    }

    fn parse(
        &self,
        ctx: &DiscoveryContext,
        path: &Path,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport> {
        let target = live_target(path).ok_or_else(|| {
            DiscoveryError::UnsupportedFormat(format!("{} is not a live scan target", path.display()))
        })?;
        ctx.check()?;

        let credential = self.credentials.get_credential(ctx)?;
        let account = self.credentials.account_id();
        let subscription = target
            .or(account)
            .unwrap_or_else(|| credential.subscription_id.clone());
        info!("Scanning subscription {}", subscription);

        let filter = ResourceFilter::from_options(options);
        let mut infrastructure = Infrastructure::new(Provider::Azure);
        infrastructure.set_metadata("subscription_id", subscription.as_str());
        let mut report = DiscoveryReport::new(infrastructure);
        let mut cache = HashMap::new();

        for definition in &self.catalog {
            ctx.check()?;
            if !filter.includes_type(&definition.resource_type) {
                debug!("Skipping {} (filtered out)", definition.resource_type);
                continue;
            }

            match self.scan_kind(ctx, &credential, &subscription, definition, &mut cache, options) {
                Ok(resources) => {
                    let listed = resources.len();
                    let mut kept = 0;
                    for resource in resources {
                        if options.allows_region(&resource.region) {
                            report.infrastructure.insert(resource);
                            kept += 1;
                        }
                    }
                    debug!(
                        "Scanned {}: {} listed, {} kept",
                        definition.arm_type, listed, kept
                    );
                },
                Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
                Err(e) if options.ignore_errors => {
                    warn!("Scan of {} failed: {}", definition.arm_type, e);
                    report.warn(DiscoveryWarning::new(
                        definition.arm_type,
                        WarningKind::FailedScan,
                        e.to_string(),
                    ));
                },
                Err(e) => return Err(e),
            }
        }

        info!(
            "Discovered {} Azure resources ({} warnings)",
            report.infrastructure.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

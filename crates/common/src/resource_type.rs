//! Canonical resource kinds and categories
//!
//! Every native kind string (ARM type, Terraform type, ...) is mapped onto a
//! [`ResourceType`]. Kinds that no table knows about are carried through as
//! [`ResourceType::Other`] holding the raw native string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse grouping of canonical kinds used for broad filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Compute,
    Container,
    Storage,
    Database,
    Network,
    Security,
    Messaging,
    Integration,
    Management,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Compute => "compute",
            Category::Container => "container",
            Category::Storage => "storage",
            Category::Database => "database",
            Category::Network => "network",
            Category::Security => "security",
            Category::Messaging => "messaging",
            Category::Integration => "integration",
            Category::Management => "management",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::DiscoveryError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "compute" => Ok(Category::Compute),
            "container" | "containers" => Ok(Category::Container),
            "storage" => Ok(Category::Storage),
            "database" | "databases" => Ok(Category::Database),
            "network" | "networking" => Ok(Category::Network),
            "security" | "identity" => Ok(Category::Security),
            "messaging" => Ok(Category::Messaging),
            "integration" | "workflow" => Ok(Category::Integration),
            "management" => Ok(Category::Management),
            "other" => Ok(Category::Other),
            other => Err(crate::DiscoveryError::Config(format!(
                "unknown category '{other}'"
            ))),
        }
    }
}

/// Provider-agnostic resource kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    // Compute
    VirtualMachine,
    VmScaleSet,
    WebApp,
    AppServicePlan,
    FunctionApp,
    ContainerInstance,
    // Container platforms
    KubernetesCluster,
    ContainerRegistry,
    ContainerApp,
    ContainerAppEnvironment,
    // Storage
    StorageAccount,
    StorageBucket,
    StorageQueue,
    StorageTable,
    FileShare,
    ManagedDisk,
    // Databases
    SqlServer,
    SqlDatabase,
    PostgresServer,
    MySqlServer,
    NoSqlDatabase,
    Cache,
    // Network
    VirtualNetwork,
    Subnet,
    NetworkInterface,
    SecurityGroup,
    PublicIp,
    LoadBalancer,
    ApplicationGateway,
    DnsZone,
    CdnProfile,
    FrontDoor,
    Firewall,
    ApiGateway,
    // Security and identity
    KeyVault,
    ManagedIdentity,
    DirectoryService,
    // Messaging
    MessagingNamespace,
    MessageQueue,
    MessageTopic,
    EventStreamNamespace,
    EventStream,
    EventTopic,
    // Workflow and automation
    Workflow,
    AutomationAccount,
    // Management
    ResourceGroup,
    /// Native kind with no canonical mapping, carried verbatim
    Other(String),
}

/// Every canonical kind with its string form and category
const CANONICAL: &[(ResourceType, &str, Category)] = &[
    (ResourceType::VirtualMachine, "virtual_machine", Category::Compute),
    (ResourceType::VmScaleSet, "vm_scale_set", Category::Compute),
    (ResourceType::WebApp, "web_app", Category::Compute),
    (ResourceType::AppServicePlan, "app_service_plan", Category::Compute),
    (ResourceType::FunctionApp, "function_app", Category::Compute),
    (ResourceType::ContainerInstance, "container_instance", Category::Container),
    (ResourceType::KubernetesCluster, "kubernetes_cluster", Category::Container),
    (ResourceType::ContainerRegistry, "container_registry", Category::Container),
    (ResourceType::ContainerApp, "container_app", Category::Container),
    (
        ResourceType::ContainerAppEnvironment,
        "container_app_environment",
        Category::Container,
    ),
    (ResourceType::StorageAccount, "storage_account", Category::Storage),
    (ResourceType::StorageBucket, "storage_bucket", Category::Storage),
    (ResourceType::StorageQueue, "storage_queue", Category::Storage),
    (ResourceType::StorageTable, "storage_table", Category::Storage),
    (ResourceType::FileShare, "file_share", Category::Storage),
    (ResourceType::ManagedDisk, "managed_disk", Category::Storage),
    (ResourceType::SqlServer, "sql_server", Category::Database),
    (ResourceType::SqlDatabase, "sql_database", Category::Database),
    (ResourceType::PostgresServer, "postgresql_server", Category::Database),
    (ResourceType::MySqlServer, "mysql_server", Category::Database),
    (ResourceType::NoSqlDatabase, "nosql_database", Category::Database),
    (ResourceType::Cache, "cache", Category::Database),
    (ResourceType::VirtualNetwork, "virtual_network", Category::Network),
    (ResourceType::Subnet, "subnet", Category::Network),
    (ResourceType::NetworkInterface, "network_interface", Category::Network),
    (ResourceType::SecurityGroup, "security_group", Category::Network),
    (ResourceType::PublicIp, "public_ip", Category::Network),
    (ResourceType::LoadBalancer, "load_balancer", Category::Network),
    (ResourceType::ApplicationGateway, "application_gateway", Category::Network),
    (ResourceType::DnsZone, "dns_zone", Category::Network),
    (ResourceType::CdnProfile, "cdn_profile", Category::Network),
    (ResourceType::FrontDoor, "front_door", Category::Network),
    (ResourceType::Firewall, "firewall", Category::Network),
    (ResourceType::ApiGateway, "api_gateway", Category::Network),
    (ResourceType::KeyVault, "key_vault", Category::Security),
    (ResourceType::ManagedIdentity, "managed_identity", Category::Security),
    (ResourceType::DirectoryService, "directory_service", Category::Security),
    (ResourceType::MessagingNamespace, "messaging_namespace", Category::Messaging),
    (ResourceType::MessageQueue, "message_queue", Category::Messaging),
    (ResourceType::MessageTopic, "message_topic", Category::Messaging),
    (
        ResourceType::EventStreamNamespace,
        "event_stream_namespace",
        Category::Messaging,
    ),
    (ResourceType::EventStream, "event_stream", Category::Messaging),
    (ResourceType::EventTopic, "event_topic", Category::Messaging),
    (ResourceType::Workflow, "workflow", Category::Integration),
    (ResourceType::AutomationAccount, "automation_account", Category::Integration),
    (ResourceType::ResourceGroup, "resource_group", Category::Management),
];

impl ResourceType {
    /// Canonical string form; `Other` yields the raw native string
    pub fn as_str(&self) -> &str {
        if let ResourceType::Other(raw) = self {
            return raw;
        }
        CANONICAL
            .iter()
            .find(|(kind, _, _)| kind == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("other")
    }

    pub fn category(&self) -> Category {
        CANONICAL
            .iter()
            .find(|(kind, _, _)| kind == self)
            .map(|(_, _, category)| *category)
            .unwrap_or(Category::Other)
    }

    /// Look up a canonical kind by its string form
    pub fn from_canonical(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        CANONICAL
            .iter()
            .find(|(_, canonical, _)| *canonical == lower)
            .map(|(kind, _, _)| kind.clone())
    }

    /// All canonical kinds, in declaration order
    pub fn all() -> impl Iterator<Item = &'static ResourceType> {
        CANONICAL.iter().map(|(kind, _, _)| kind)
    }

    pub fn is_other(&self) -> bool {
        matches!(self, ResourceType::Other(_))
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        ResourceType::from_canonical(&value).unwrap_or(ResourceType::Other(value))
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        match value {
            ResourceType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ResourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ResourceType::from(s.to_string()))
    }
}

//! Data-driven catalog of Azure resource kinds the live scanner lists
//!
//! Each entry names the ARM collection to list, the canonical kind it
//! yields and the fields projected into the resource config (JSON pointers
//! into the ARM response item). Nested kinds are listed under every item
//! of their parent collection.

use infra_discovery_common::ResourceType;

/// Parent collection of a nested kind
#[derive(Debug, Clone, PartialEq)]
pub struct ParentCollection {
    /// ARM type of the parent, listed subscription-wide
    pub arm_type: &'static str,
    pub api_version: &'static str,
    /// Path appended to each parent's resource ID
    pub path: &'static str,
}

/// Restricts a collection shared by several kinds (`Microsoft.Web/sites`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindMatch {
    Any,
    /// Item `kind` contains the marker (case-insensitive)
    Contains(&'static str),
    /// Item `kind` does not contain the marker
    Excludes(&'static str),
}

impl KindMatch {
    pub fn matches(&self, kind: Option<&str>) -> bool {
        let kind = kind.unwrap_or_default().to_lowercase();
        match self {
            KindMatch::Any => true,
            KindMatch::Contains(marker) => kind.contains(marker),
            KindMatch::Excludes(marker) => !kind.contains(marker),
        }
    }
}

/// How to list and project one resource kind
#[derive(Debug, Clone, PartialEq)]
pub struct ScanDefinition {
    pub resource_type: ResourceType,
    /// ARM type, e.g. `Microsoft.Compute/virtualMachines`
    pub arm_type: &'static str,
    pub api_version: &'static str,
    pub parent: Option<ParentCollection>,
    pub kind_match: KindMatch,
    /// `(config key, JSON pointer)` pairs
    pub fields: &'static [(&'static str, &'static str)],
}

impl ScanDefinition {
    /// Subscription-wide kind
    pub const fn new(
        resource_type: ResourceType,
        arm_type: &'static str,
        api_version: &'static str,
        fields: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            resource_type,
            arm_type,
            api_version,
            parent: None,
            kind_match: KindMatch::Any,
            fields,
        }
    }

    /// Kind listed under each item of a parent collection
    pub const fn nested(
        resource_type: ResourceType,
        arm_type: &'static str,
        api_version: &'static str,
        parent: ParentCollection,
        fields: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            resource_type,
            arm_type,
            api_version,
            parent: Some(parent),
            kind_match: KindMatch::Any,
            fields,
        }
    }

    pub const fn with_kind_match(mut self, kind_match: KindMatch) -> Self {
        self.kind_match = kind_match;
        self
    }
}

const STORAGE_ACCOUNTS: &str = "Microsoft.Storage/storageAccounts";
const STORAGE_API: &str = "2023-01-01";
const SQL_SERVERS: &str = "Microsoft.Sql/servers";
const SQL_API: &str = "2023-05-01-preview";
const SERVICE_BUS: &str = "Microsoft.ServiceBus/namespaces";
const SERVICE_BUS_API: &str = "2022-10-01-preview";
const EVENT_HUBS: &str = "Microsoft.EventHub/namespaces";
const EVENT_HUBS_API: &str = "2024-01-01";
const WEB_SITES: &str = "Microsoft.Web/sites";
const WEB_API: &str = "2022-09-01";

const fn storage_child(path: &'static str) -> ParentCollection {
    ParentCollection {
        arm_type: STORAGE_ACCOUNTS,
        api_version: STORAGE_API,
        path,
    }
}

const PROVISIONING: (&str, &str) = ("provisioningState", "/properties/provisioningState");
const SKU_NAME: (&str, &str) = ("sku", "/sku/name");

const SITE_FIELDS: &[(&str, &str)] = &[
    ("kind", "/kind"),
    ("state", "/properties/state"),
    ("defaultHostName", "/properties/defaultHostName"),
    ("httpsOnly", "/properties/httpsOnly"),
    ("serverFarmId", "/properties/serverFarmId"),
];

/// Every kind the scanner knows, in scan order
pub fn azure_catalog() -> Vec<ScanDefinition> {
    vec![
        // Compute
        ScanDefinition::new(
            ResourceType::VirtualMachine,
            "Microsoft.Compute/virtualMachines",
            "2023-09-01",
            &[
                ("vmSize", "/properties/hardwareProfile/vmSize"),
                ("osType", "/properties/storageProfile/osDisk/osType"),
                ("zones", "/zones"),
                PROVISIONING,
            ],
        ),
        ScanDefinition::new(
            ResourceType::VmScaleSet,
            "Microsoft.Compute/virtualMachineScaleSets",
            "2023-09-01",
            &[SKU_NAME, ("capacity", "/sku/capacity"), PROVISIONING],
        ),
        ScanDefinition::new(
            ResourceType::ManagedDisk,
            "Microsoft.Compute/disks",
            "2023-04-02",
            &[
                SKU_NAME,
                ("diskSizeGB", "/properties/diskSizeGB"),
                ("diskState", "/properties/diskState"),
            ],
        ),
        ScanDefinition::new(ResourceType::WebApp, WEB_SITES, WEB_API, SITE_FIELDS)
            .with_kind_match(KindMatch::Excludes("functionapp")),
        ScanDefinition::new(ResourceType::FunctionApp, WEB_SITES, WEB_API, SITE_FIELDS)
            .with_kind_match(KindMatch::Contains("functionapp")),
        ScanDefinition::new(
            ResourceType::AppServicePlan,
            "Microsoft.Web/serverfarms",
            WEB_API,
            &[SKU_NAME, ("tier", "/sku/tier"), ("numberOfSites", "/properties/numberOfSites")],
        ),
        // Containers
        ScanDefinition::new(
            ResourceType::KubernetesCluster,
            "Microsoft.ContainerService/managedClusters",
            "2023-10-01",
            &[
                ("kubernetesVersion", "/properties/kubernetesVersion"),
                ("fqdn", "/properties/fqdn"),
                ("nodeResourceGroup", "/properties/nodeResourceGroup"),
                ("agentPoolProfiles", "/properties/agentPoolProfiles"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::ContainerRegistry,
            "Microsoft.ContainerRegistry/registries",
            "2023-07-01",
            &[
                SKU_NAME,
                ("loginServer", "/properties/loginServer"),
                ("adminUserEnabled", "/properties/adminUserEnabled"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::ContainerApp,
            "Microsoft.App/containerApps",
            "2023-05-01",
            &[
                ("environmentId", "/properties/managedEnvironmentId"),
                ("fqdn", "/properties/configuration/ingress/fqdn"),
                PROVISIONING,
            ],
        ),
        ScanDefinition::new(
            ResourceType::ContainerInstance,
            "Microsoft.ContainerInstance/containerGroups",
            "2023-05-01",
            &[
                ("osType", "/properties/osType"),
                ("ipAddress", "/properties/ipAddress/ip"),
                ("restartPolicy", "/properties/restartPolicy"),
            ],
        ),
        // Storage
        ScanDefinition::new(
            ResourceType::StorageAccount,
            STORAGE_ACCOUNTS,
            STORAGE_API,
            &[
                SKU_NAME,
                ("kind", "/kind"),
                ("accessTier", "/properties/accessTier"),
                ("httpsOnly", "/properties/supportsHttpsTrafficOnly"),
                ("minimumTlsVersion", "/properties/minimumTlsVersion"),
            ],
        ),
        ScanDefinition::nested(
            ResourceType::StorageBucket,
            "Microsoft.Storage/storageAccounts/blobServices/containers",
            STORAGE_API,
            storage_child("blobServices/default/containers"),
            &[("publicAccess", "/properties/publicAccess")],
        ),
        ScanDefinition::nested(
            ResourceType::StorageQueue,
            "Microsoft.Storage/storageAccounts/queueServices/queues",
            STORAGE_API,
            storage_child("queueServices/default/queues"),
            &[("metadata", "/properties/metadata")],
        ),
        ScanDefinition::nested(
            ResourceType::StorageTable,
            "Microsoft.Storage/storageAccounts/tableServices/tables",
            STORAGE_API,
            storage_child("tableServices/default/tables"),
            &[("tableName", "/properties/tableName")],
        ),
        ScanDefinition::nested(
            ResourceType::FileShare,
            "Microsoft.Storage/storageAccounts/fileServices/shares",
            STORAGE_API,
            storage_child("fileServices/default/shares"),
            &[
                ("shareQuota", "/properties/shareQuota"),
                ("accessTier", "/properties/accessTier"),
            ],
        ),
        // Databases
        ScanDefinition::new(
            ResourceType::SqlServer,
            SQL_SERVERS,
            SQL_API,
            &[
                ("version", "/properties/version"),
                ("fqdn", "/properties/fullyQualifiedDomainName"),
                ("publicNetworkAccess", "/properties/publicNetworkAccess"),
            ],
        ),
        ScanDefinition::nested(
            ResourceType::SqlDatabase,
            "Microsoft.Sql/servers/databases",
            SQL_API,
            ParentCollection {
                arm_type: SQL_SERVERS,
                api_version: SQL_API,
                path: "databases",
            },
            &[
                SKU_NAME,
                ("maxSizeBytes", "/properties/maxSizeBytes"),
                ("status", "/properties/status"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::PostgresServer,
            "Microsoft.DBforPostgreSQL/flexibleServers",
            "2022-12-01",
            &[
                SKU_NAME,
                ("version", "/properties/version"),
                ("storageSizeGB", "/properties/storage/storageSizeGB"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::MySqlServer,
            "Microsoft.DBforMySQL/flexibleServers",
            "2023-06-30",
            &[
                SKU_NAME,
                ("version", "/properties/version"),
                ("storageSizeGB", "/properties/storage/storageSizeGB"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::NoSqlDatabase,
            "Microsoft.DocumentDB/databaseAccounts",
            "2023-04-15",
            &[
                ("kind", "/kind"),
                ("consistencyLevel", "/properties/consistencyPolicy/defaultConsistencyLevel"),
                ("documentEndpoint", "/properties/documentEndpoint"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::Cache,
            "Microsoft.Cache/redis",
            "2023-08-01",
            &[
                ("sku", "/properties/sku/name"),
                ("hostName", "/properties/hostName"),
                ("redisVersion", "/properties/redisVersion"),
            ],
        ),
        // Network
        ScanDefinition::new(
            ResourceType::DnsZone,
            "Microsoft.Network/dnszones",
            "2018-05-01",
            &[
                ("zoneType", "/properties/zoneType"),
                ("numberOfRecordSets", "/properties/numberOfRecordSets"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::CdnProfile,
            "Microsoft.Cdn/profiles",
            "2023-05-01",
            &[SKU_NAME, PROVISIONING],
        ),
        ScanDefinition::new(
            ResourceType::FrontDoor,
            "Microsoft.Network/frontDoors",
            "2021-06-01",
            &[
                ("cname", "/properties/cname"),
                ("enabledState", "/properties/enabledState"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::LoadBalancer,
            "Microsoft.Network/loadBalancers",
            "2023-05-01",
            &[SKU_NAME, ("frontendIpConfigurations", "/properties/frontendIPConfigurations")],
        ),
        ScanDefinition::new(
            ResourceType::ApplicationGateway,
            "Microsoft.Network/applicationGateways",
            "2023-05-01",
            &[
                ("sku", "/properties/sku/name"),
                ("operationalState", "/properties/operationalState"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::Firewall,
            "Microsoft.Network/azureFirewalls",
            "2023-05-01",
            &[
                ("skuTier", "/properties/sku/tier"),
                ("threatIntelMode", "/properties/threatIntelMode"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::SecurityGroup,
            "Microsoft.Network/networkSecurityGroups",
            "2023-05-01",
            &[("securityRules", "/properties/securityRules")],
        ),
        ScanDefinition::new(
            ResourceType::PublicIp,
            "Microsoft.Network/publicIPAddresses",
            "2023-05-01",
            &[
                ("ipAddress", "/properties/ipAddress"),
                ("allocationMethod", "/properties/publicIPAllocationMethod"),
                SKU_NAME,
            ],
        ),
        ScanDefinition::new(
            ResourceType::VirtualNetwork,
            "Microsoft.Network/virtualNetworks",
            "2023-05-01",
            &[("addressPrefixes", "/properties/addressSpace/addressPrefixes")],
        ),
        // Messaging
        ScanDefinition::new(
            ResourceType::MessagingNamespace,
            SERVICE_BUS,
            SERVICE_BUS_API,
            &[SKU_NAME, ("endpoint", "/properties/serviceBusEndpoint")],
        ),
        ScanDefinition::nested(
            ResourceType::MessageQueue,
            "Microsoft.ServiceBus/namespaces/queues",
            SERVICE_BUS_API,
            ParentCollection {
                arm_type: SERVICE_BUS,
                api_version: SERVICE_BUS_API,
                path: "queues",
            },
            &[
                ("maxSizeInMegabytes", "/properties/maxSizeInMegabytes"),
                ("status", "/properties/status"),
            ],
        ),
        ScanDefinition::nested(
            ResourceType::MessageTopic,
            "Microsoft.ServiceBus/namespaces/topics",
            SERVICE_BUS_API,
            ParentCollection {
                arm_type: SERVICE_BUS,
                api_version: SERVICE_BUS_API,
                path: "topics",
            },
            &[
                ("maxSizeInMegabytes", "/properties/maxSizeInMegabytes"),
                ("status", "/properties/status"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::EventStreamNamespace,
            EVENT_HUBS,
            EVENT_HUBS_API,
            &[SKU_NAME, ("kafkaEnabled", "/properties/kafkaEnabled")],
        ),
        ScanDefinition::nested(
            ResourceType::EventStream,
            "Microsoft.EventHub/namespaces/eventhubs",
            EVENT_HUBS_API,
            ParentCollection {
                arm_type: EVENT_HUBS,
                api_version: EVENT_HUBS_API,
                path: "eventhubs",
            },
            &[
                ("partitionCount", "/properties/partitionCount"),
                ("messageRetentionInDays", "/properties/messageRetentionInDays"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::EventTopic,
            "Microsoft.EventGrid/topics",
            "2022-06-15",
            &[
                ("endpoint", "/properties/endpoint"),
                ("inputSchema", "/properties/inputSchema"),
            ],
        ),
        // Integration and management
        ScanDefinition::new(
            ResourceType::Workflow,
            "Microsoft.Logic/workflows",
            "2019-05-01",
            &[("state", "/properties/state")],
        ),
        ScanDefinition::new(
            ResourceType::AutomationAccount,
            "Microsoft.Automation/automationAccounts",
            "2023-11-01",
            &[("sku", "/properties/sku/name"), ("state", "/properties/state")],
        ),
        ScanDefinition::new(
            ResourceType::ApiGateway,
            "Microsoft.ApiManagement/service",
            "2022-08-01",
            &[SKU_NAME, ("gatewayUrl", "/properties/gatewayUrl")],
        ),
        // Security and identity
        ScanDefinition::new(
            ResourceType::KeyVault,
            "Microsoft.KeyVault/vaults",
            "2023-07-01",
            &[
                ("sku", "/properties/sku/name"),
                ("vaultUri", "/properties/vaultUri"),
                ("enableSoftDelete", "/properties/enableSoftDelete"),
                ("enableRbacAuthorization", "/properties/enableRbacAuthorization"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::ManagedIdentity,
            "Microsoft.ManagedIdentity/userAssignedIdentities",
            "2023-01-31",
            &[
                ("clientId", "/properties/clientId"),
                ("principalId", "/properties/principalId"),
            ],
        ),
        ScanDefinition::new(
            ResourceType::DirectoryService,
            "Microsoft.AAD/domainServices",
            "2022-12-01",
            &[
                ("domainName", "/properties/domainName"),
                ("sku", "/properties/sku"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_each_kind_is_scanned_once() {
        let catalog = azure_catalog();
        let kinds: HashSet<&ResourceType> = catalog.iter().map(|d| &d.resource_type).collect();
        assert_eq!(kinds.len(), catalog.len());
        assert!(catalog.len() >= 35);
    }

    #[test]
    fn test_parents_are_catalogued() {
        let catalog = azure_catalog();
        for definition in catalog.iter().filter(|d| d.parent.is_some()) {
            let parent = definition.parent.as_ref().unwrap();
            assert!(
                catalog
                    .iter()
                    .any(|d| d.arm_type == parent.arm_type && d.api_version == parent.api_version),
                "{} has an unknown parent",
                definition.arm_type
            );
        }
    }

    #[test]
    fn test_projection_pointers_are_absolute() {
        for definition in azure_catalog() {
            for (key, pointer) in definition.fields {
                assert!(pointer.starts_with('/'), "{}.{key}", definition.arm_type);
            }
        }
    }

    #[test]
    fn test_kind_match() {
        assert!(KindMatch::Any.matches(None));
        assert!(KindMatch::Contains("functionapp").matches(Some("functionapp,linux")));
        assert!(!KindMatch::Contains("functionapp").matches(Some("app")));
        assert!(KindMatch::Excludes("functionapp").matches(Some("app,linux")));
        assert!(KindMatch::Excludes("functionapp").matches(None));
    }
}

//! Type mapping from native resource kinds to canonical kinds
//!
//! Lookup is exact on the lower-cased native string first, then by substring
//! containment (the longest contained table key wins, which tolerates
//! versioned or suffixed kinds), then falls back to passing the raw native
//! string through as [`ResourceType::Other`].

use infra_discovery_common::ResourceType;

/// Maps native kind strings to canonical kinds
pub struct TypeMapper;

const ARM_TYPES: &[(&str, ResourceType)] = &[
    ("microsoft.compute/virtualmachines", ResourceType::VirtualMachine),
    ("microsoft.compute/virtualmachinescalesets", ResourceType::VmScaleSet),
    ("microsoft.compute/disks", ResourceType::ManagedDisk),
    ("microsoft.web/sites", ResourceType::WebApp),
    ("microsoft.web/serverfarms", ResourceType::AppServicePlan),
    ("microsoft.containerinstance/containergroups", ResourceType::ContainerInstance),
    ("microsoft.containerservice/managedclusters", ResourceType::KubernetesCluster),
    ("microsoft.containerregistry/registries", ResourceType::ContainerRegistry),
    ("microsoft.app/containerapps", ResourceType::ContainerApp),
    ("microsoft.app/managedenvironments", ResourceType::ContainerAppEnvironment),
    ("microsoft.storage/storageaccounts", ResourceType::StorageAccount),
    (
        "microsoft.storage/storageaccounts/blobservices/containers",
        ResourceType::StorageBucket,
    ),
    (
        "microsoft.storage/storageaccounts/queueservices/queues",
        ResourceType::StorageQueue,
    ),
    (
        "microsoft.storage/storageaccounts/tableservices/tables",
        ResourceType::StorageTable,
    ),
    (
        "microsoft.storage/storageaccounts/fileservices/shares",
        ResourceType::FileShare,
    ),
    ("microsoft.sql/servers", ResourceType::SqlServer),
    ("microsoft.sql/servers/databases", ResourceType::SqlDatabase),
    ("microsoft.dbforpostgresql/flexibleservers", ResourceType::PostgresServer),
    ("microsoft.dbforpostgresql/servers", ResourceType::PostgresServer),
    ("microsoft.dbformysql/flexibleservers", ResourceType::MySqlServer),
    ("microsoft.dbformysql/servers", ResourceType::MySqlServer),
    ("microsoft.documentdb/databaseaccounts", ResourceType::NoSqlDatabase),
    ("microsoft.cache/redis", ResourceType::Cache),
    ("microsoft.network/virtualnetworks", ResourceType::VirtualNetwork),
    ("microsoft.network/virtualnetworks/subnets", ResourceType::Subnet),
    ("microsoft.network/networkinterfaces", ResourceType::NetworkInterface),
    ("microsoft.network/networksecuritygroups", ResourceType::SecurityGroup),
    ("microsoft.network/publicipaddresses", ResourceType::PublicIp),
    ("microsoft.network/loadbalancers", ResourceType::LoadBalancer),
    ("microsoft.network/applicationgateways", ResourceType::ApplicationGateway),
    ("microsoft.network/dnszones", ResourceType::DnsZone),
    ("microsoft.network/privatednszones", ResourceType::DnsZone),
    ("microsoft.network/frontdoors", ResourceType::FrontDoor),
    ("microsoft.network/azurefirewalls", ResourceType::Firewall),
    ("microsoft.cdn/profiles", ResourceType::CdnProfile),
    ("microsoft.apimanagement/service", ResourceType::ApiGateway),
    ("microsoft.keyvault/vaults", ResourceType::KeyVault),
    (
        "microsoft.managedidentity/userassignedidentities",
        ResourceType::ManagedIdentity,
    ),
    ("microsoft.aad/domainservices", ResourceType::DirectoryService),
    ("microsoft.servicebus/namespaces", ResourceType::MessagingNamespace),
    ("microsoft.servicebus/namespaces/queues", ResourceType::MessageQueue),
    ("microsoft.servicebus/namespaces/topics", ResourceType::MessageTopic),
    ("microsoft.eventhub/namespaces", ResourceType::EventStreamNamespace),
    ("microsoft.eventhub/namespaces/eventhubs", ResourceType::EventStream),
    ("microsoft.eventgrid/topics", ResourceType::EventTopic),
    ("microsoft.logic/workflows", ResourceType::Workflow),
    ("microsoft.automation/automationaccounts", ResourceType::AutomationAccount),
    ("microsoft.resources/resourcegroups", ResourceType::ResourceGroup),
];

const TERRAFORM_TYPES: &[(&str, ResourceType)] = &[
    // azurerm
    ("azurerm_linux_virtual_machine", ResourceType::VirtualMachine),
    ("azurerm_windows_virtual_machine", ResourceType::VirtualMachine),
    ("azurerm_virtual_machine", ResourceType::VirtualMachine),
    ("azurerm_linux_virtual_machine_scale_set", ResourceType::VmScaleSet),
    ("azurerm_windows_virtual_machine_scale_set", ResourceType::VmScaleSet),
    ("azurerm_virtual_machine_scale_set", ResourceType::VmScaleSet),
    ("azurerm_orchestrated_virtual_machine_scale_set", ResourceType::VmScaleSet),
    ("azurerm_managed_disk", ResourceType::ManagedDisk),
    ("azurerm_linux_web_app", ResourceType::WebApp),
    ("azurerm_windows_web_app", ResourceType::WebApp),
    ("azurerm_app_service", ResourceType::WebApp),
    ("azurerm_service_plan", ResourceType::AppServicePlan),
    ("azurerm_app_service_plan", ResourceType::AppServicePlan),
    ("azurerm_linux_function_app", ResourceType::FunctionApp),
    ("azurerm_windows_function_app", ResourceType::FunctionApp),
    ("azurerm_function_app", ResourceType::FunctionApp),
    ("azurerm_container_group", ResourceType::ContainerInstance),
    ("azurerm_kubernetes_cluster", ResourceType::KubernetesCluster),
    ("azurerm_container_registry", ResourceType::ContainerRegistry),
    ("azurerm_container_app", ResourceType::ContainerApp),
    ("azurerm_container_app_environment", ResourceType::ContainerAppEnvironment),
    ("azurerm_storage_account", ResourceType::StorageAccount),
    ("azurerm_storage_container", ResourceType::StorageBucket),
    ("azurerm_storage_queue", ResourceType::StorageQueue),
    ("azurerm_storage_table", ResourceType::StorageTable),
    ("azurerm_storage_share", ResourceType::FileShare),
    ("azurerm_mssql_server", ResourceType::SqlServer),
    ("azurerm_sql_server", ResourceType::SqlServer),
    ("azurerm_mssql_database", ResourceType::SqlDatabase),
    ("azurerm_sql_database", ResourceType::SqlDatabase),
    ("azurerm_postgresql_flexible_server", ResourceType::PostgresServer),
    ("azurerm_postgresql_server", ResourceType::PostgresServer),
    ("azurerm_mysql_flexible_server", ResourceType::MySqlServer),
    ("azurerm_mysql_server", ResourceType::MySqlServer),
    ("azurerm_cosmosdb_account", ResourceType::NoSqlDatabase),
    ("azurerm_redis_cache", ResourceType::Cache),
    ("azurerm_virtual_network", ResourceType::VirtualNetwork),
    ("azurerm_subnet", ResourceType::Subnet),
    ("azurerm_network_interface", ResourceType::NetworkInterface),
    ("azurerm_network_security_group", ResourceType::SecurityGroup),
    ("azurerm_public_ip", ResourceType::PublicIp),
    ("azurerm_lb", ResourceType::LoadBalancer),
    ("azurerm_application_gateway", ResourceType::ApplicationGateway),
    ("azurerm_dns_zone", ResourceType::DnsZone),
    ("azurerm_private_dns_zone", ResourceType::DnsZone),
    ("azurerm_cdn_profile", ResourceType::CdnProfile),
    ("azurerm_cdn_frontdoor_profile", ResourceType::FrontDoor),
    ("azurerm_frontdoor", ResourceType::FrontDoor),
    ("azurerm_firewall", ResourceType::Firewall),
    ("azurerm_api_management", ResourceType::ApiGateway),
    ("azurerm_key_vault", ResourceType::KeyVault),
    ("azurerm_user_assigned_identity", ResourceType::ManagedIdentity),
    ("azurerm_active_directory_domain_service", ResourceType::DirectoryService),
    ("azurerm_servicebus_namespace", ResourceType::MessagingNamespace),
    ("azurerm_servicebus_queue", ResourceType::MessageQueue),
    ("azurerm_servicebus_topic", ResourceType::MessageTopic),
    ("azurerm_eventhub_namespace", ResourceType::EventStreamNamespace),
    ("azurerm_eventhub", ResourceType::EventStream),
    ("azurerm_eventgrid_topic", ResourceType::EventTopic),
    ("azurerm_logic_app_workflow", ResourceType::Workflow),
    ("azurerm_automation_account", ResourceType::AutomationAccount),
    ("azurerm_resource_group", ResourceType::ResourceGroup),
    // aws
    ("aws_instance", ResourceType::VirtualMachine),
    ("aws_autoscaling_group", ResourceType::VmScaleSet),
    ("aws_ebs_volume", ResourceType::ManagedDisk),
    ("aws_lambda_function", ResourceType::FunctionApp),
    ("aws_ecs_service", ResourceType::ContainerApp),
    ("aws_eks_cluster", ResourceType::KubernetesCluster),
    ("aws_ecr_repository", ResourceType::ContainerRegistry),
    ("aws_s3_bucket", ResourceType::StorageBucket),
    ("aws_efs_file_system", ResourceType::FileShare),
    ("aws_rds_cluster", ResourceType::SqlServer),
    ("aws_db_instance", ResourceType::SqlDatabase),
    ("aws_dynamodb_table", ResourceType::NoSqlDatabase),
    ("aws_elasticache_cluster", ResourceType::Cache),
    ("aws_elasticache_replication_group", ResourceType::Cache),
    ("aws_vpc", ResourceType::VirtualNetwork),
    ("aws_subnet", ResourceType::Subnet),
    ("aws_network_interface", ResourceType::NetworkInterface),
    ("aws_security_group", ResourceType::SecurityGroup),
    ("aws_eip", ResourceType::PublicIp),
    ("aws_lb", ResourceType::LoadBalancer),
    ("aws_alb", ResourceType::LoadBalancer),
    ("aws_route53_zone", ResourceType::DnsZone),
    ("aws_cloudfront_distribution", ResourceType::CdnProfile),
    ("aws_networkfirewall_firewall", ResourceType::Firewall),
    ("aws_api_gateway_rest_api", ResourceType::ApiGateway),
    ("aws_apigatewayv2_api", ResourceType::ApiGateway),
    ("aws_secretsmanager_secret", ResourceType::KeyVault),
    ("aws_kms_key", ResourceType::KeyVault),
    ("aws_iam_role", ResourceType::ManagedIdentity),
    ("aws_directory_service_directory", ResourceType::DirectoryService),
    ("aws_sqs_queue", ResourceType::MessageQueue),
    ("aws_sns_topic", ResourceType::MessageTopic),
    ("aws_kinesis_stream", ResourceType::EventStream),
    ("aws_cloudwatch_event_bus", ResourceType::EventTopic),
    ("aws_sfn_state_machine", ResourceType::Workflow),
    // google
    ("google_compute_instance", ResourceType::VirtualMachine),
    ("google_compute_instance_group_manager", ResourceType::VmScaleSet),
    ("google_compute_disk", ResourceType::ManagedDisk),
    ("google_cloudfunctions_function", ResourceType::FunctionApp),
    ("google_cloudfunctions2_function", ResourceType::FunctionApp),
    ("google_cloud_run_service", ResourceType::ContainerApp),
    ("google_cloud_run_v2_service", ResourceType::ContainerApp),
    ("google_container_cluster", ResourceType::KubernetesCluster),
    ("google_artifact_registry_repository", ResourceType::ContainerRegistry),
    ("google_storage_bucket", ResourceType::StorageBucket),
    ("google_filestore_instance", ResourceType::FileShare),
    ("google_sql_database_instance", ResourceType::SqlServer),
    ("google_sql_database", ResourceType::SqlDatabase),
    ("google_firestore_database", ResourceType::NoSqlDatabase),
    ("google_redis_instance", ResourceType::Cache),
    ("google_compute_network", ResourceType::VirtualNetwork),
    ("google_compute_subnetwork", ResourceType::Subnet),
    ("google_compute_firewall", ResourceType::Firewall),
    ("google_compute_address", ResourceType::PublicIp),
    ("google_compute_forwarding_rule", ResourceType::LoadBalancer),
    ("google_dns_managed_zone", ResourceType::DnsZone),
    ("google_secret_manager_secret", ResourceType::KeyVault),
    ("google_kms_key_ring", ResourceType::KeyVault),
    ("google_service_account", ResourceType::ManagedIdentity),
    ("google_pubsub_topic", ResourceType::MessageTopic),
    ("google_pubsub_subscription", ResourceType::MessageQueue),
    ("google_workflows_workflow", ResourceType::Workflow),
];

impl TypeMapper {
    /// Map an ARM/Bicep resource type (e.g. `Microsoft.Compute/virtualMachines`)
    ///
    /// # Examples
    /// ```
    /// use infra_discovery_parser::TypeMapper;
    /// use infra_discovery_common::ResourceType;
    ///
    /// assert_eq!(
    ///     TypeMapper::map_arm_type("Microsoft.KeyVault/vaults"),
    ///     ResourceType::KeyVault
    /// );
    /// ```
    pub fn map_arm_type(native: &str) -> ResourceType {
        lookup(ARM_TYPES, native)
    }

    /// Map a Terraform resource type (e.g. `azurerm_key_vault`)
    pub fn map_terraform_type(native: &str) -> ResourceType {
        lookup(TERRAFORM_TYPES, native)
    }

    /// Refine a mapped kind with the ARM `kind` discriminator
    /// (`Microsoft.Web/sites` hosts both web apps and function apps)
    pub fn refine_by_kind(resource_type: ResourceType, kind: Option<&str>) -> ResourceType {
        match (resource_type, kind) {
            (ResourceType::WebApp, Some(kind)) if kind.to_lowercase().contains("functionapp") => {
                ResourceType::FunctionApp
            },
            (resource_type, _) => resource_type,
        }
    }
}

fn lookup(table: &[(&str, ResourceType)], native: &str) -> ResourceType {
    let lower = native.trim().to_lowercase();

    if let Some((_, kind)) = table.iter().find(|(key, _)| *key == lower) {
        return kind.clone();
    }

    table
        .iter()
        .filter(|(key, _)| lower.contains(key))
        .fold(None::<&(&str, ResourceType)>, |best, entry| match best {
            Some(current) if current.0.len() >= entry.0.len() => Some(current),
            _ => Some(entry),
        })
        .map(|(_, kind)| kind.clone())
        .unwrap_or_else(|| ResourceType::Other(native.to_string()))
}

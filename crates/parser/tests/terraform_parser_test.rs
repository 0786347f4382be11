//! Integration tests for Terraform configuration and state extraction

use infra_discovery_common::{
    ConfigValue, DiscoveryContext, DiscoveryError, DiscoveryOptions, InfrastructureParser,
    Provider, ResourceType, WarningKind,
};
use infra_discovery_parser::TerraformParser;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/terraform")
        .join(name)
}

fn azure() -> TerraformParser {
    TerraformParser::new(Provider::Azure)
}

#[test]
fn test_state_round_trip_keeps_every_attribute() {
    let path = fixture("terraform.tfstate");
    let report = azure()
        .parse(&DiscoveryContext::new(), &path, &DiscoveryOptions::default())
        .unwrap();
    let infra = &report.infrastructure;

    let document: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let managed_instances: Vec<&Value> = document["resources"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["mode"] == "managed")
        .filter(|r| r["type"].as_str().unwrap().starts_with("azurerm_"))
        .flat_map(|r| r["instances"].as_array().unwrap())
        .collect();

    assert_eq!(infra.len(), managed_instances.len());
    for instance in managed_instances {
        let expected = ConfigValue::from(instance["attributes"].clone());
        let native_id = instance["attributes"]["id"].as_str().unwrap();
        let resource = infra
            .resources()
            .find(|r| r.native_id.as_deref() == Some(native_id))
            .unwrap();
        assert_eq!(Some(&resource.config), expected.as_map());
    }
}

#[test]
fn test_state_secrets_are_kept_verbatim() {
    let report = azure()
        .parse(
            &DiscoveryContext::new(),
            &fixture("terraform.tfstate"),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    let storage = report
        .infrastructure
        .get("azurerm_storage_account.logs[0]")
        .unwrap();

    assert_eq!(storage.config["primary_access_key"], ConfigValue::from("k3y0"));
    assert_eq!(
        storage.config["primary_connection_string"],
        ConfigValue::from("DefaultEndpointsProtocol=https;AccountName=stlogs0;AccountKey=k3y0")
    );
}

#[test]
fn test_state_modules_keep_distinct_ids() {
    let content = r#"{
        "version": 4,
        "terraform_version": "1.6.2",
        "resources": [
            {"module": "module.a", "mode": "managed", "type": "azurerm_storage_account", "name": "sa",
             "instances": [{"attributes": {"id": "sa-a", "name": "sta"}}]},
            {"module": "module.b", "mode": "managed", "type": "azurerm_storage_account", "name": "sa",
             "instances": [{"attributes": {"id": "sa-b", "name": "stb"}}]}
        ]
    }"#;
    let report = azure()
        .parse_state_str(content, &DiscoveryOptions::default())
        .unwrap();
    let infra = &report.infrastructure;

    assert_eq!(infra.len(), 2);
    assert_eq!(
        infra.get("module.a.azurerm_storage_account.sa").unwrap().name,
        "sta"
    );
    assert_eq!(
        infra.get("module.b.azurerm_storage_account.sa").unwrap().name,
        "stb"
    );
}

#[test]
fn test_state_ids_and_lifted_fields() {
    let report = azure()
        .parse(
            &DiscoveryContext::new(),
            &fixture("terraform.tfstate"),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    let infra = &report.infrastructure;

    let ids: Vec<&str> = infra.resource_ids().collect();
    assert_eq!(
        ids,
        vec![
            "azurerm_resource_group.main",
            "azurerm_storage_account.logs[0]",
            "azurerm_storage_account.logs[1]",
            "module.network.azurerm_subnet.apps[\"blue\"]",
        ]
    );

    let second = infra.get("azurerm_storage_account.logs[1]").unwrap();
    assert_eq!(second.name, "stlogs1");
    assert_eq!(second.region, "northeurope");
    assert_eq!(second.tags["tier"], "archive");
    assert_eq!(second.resource_type, ResourceType::StorageAccount);

    let subnet = infra
        .get("module.network.azurerm_subnet.apps[\"blue\"]")
        .unwrap();
    assert_eq!(
        subnet.dependencies,
        vec![
            "azurerm_resource_group.main",
            "module.network.azurerm_virtual_network.hub"
        ]
    );

    let metadata = infra.metadata();
    assert_eq!(metadata["version"], ConfigValue::Integer(4));
    assert_eq!(metadata["terraform_version"], ConfigValue::from("1.6.2"));
    assert_eq!(metadata["serial"], ConfigValue::Integer(12));
}

#[test]
fn test_state_version_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    for (name, version) in [("old.tfstate", 2), ("new.tfstate", 5)] {
        let path = dir.path().join(name);
        fs::write(
            &path,
            format!(r#"{{"version": {version}, "terraform_version": "1.0.0", "resources": []}}"#),
        )
        .unwrap();

        let result = azure().parse(&DiscoveryContext::new(), &path, &DiscoveryOptions::default());
        assert!(
            matches!(&result, Err(DiscoveryError::Parse(msg)) if msg.contains("unsupported state version")),
            "version {version}: {result:?}"
        );
    }
}

#[test]
fn test_other_provider_sees_nothing_in_azure_state() {
    let report = TerraformParser::new(Provider::Aws)
        .parse(
            &DiscoveryContext::new(),
            &fixture("terraform.tfstate"),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    assert!(report.infrastructure.is_empty());
}

#[test]
fn test_config_file() {
    let report = azure()
        .parse(
            &DiscoveryContext::new(),
            &fixture("main.tf"),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    let infra = &report.infrastructure;

    assert_eq!(infra.len(), 3);
    let vnet = infra.get("azurerm_virtual_network.hub").unwrap();
    assert_eq!(vnet.resource_type, ResourceType::VirtualNetwork);
    assert_eq!(vnet.region, "");
    assert_eq!(vnet.dependencies, vec!["azurerm_resource_group.main"]);
    assert_eq!(
        vnet.config["address_space"],
        ConfigValue::List(vec![ConfigValue::from("10.0.0.0/16")])
    );
    assert_eq!(
        vnet.config["subnet"].get("address_prefix"),
        Some(&ConfigValue::from("10.0.1.0/24"))
    );

    let vault = infra.get("azurerm_key_vault.secrets").unwrap();
    assert_eq!(vault.dependencies, vec!["azurerm_virtual_network.hub"]);
    assert!(vault.tags.is_empty());

    let unresolved: HashSet<&str> = report
        .warnings_of(WarningKind::UnresolvedAttribute)
        .map(|w| w.unit.as_str())
        .collect();
    assert_eq!(
        unresolved,
        HashSet::from([
            "azurerm_virtual_network.hub.location",
            "azurerm_virtual_network.hub.resource_group_name",
            "azurerm_key_vault.secrets.tags",
        ])
    );

    let metadata = infra.metadata();
    assert_eq!(metadata["var.location"], ConfigValue::from("westeurope"));
    assert_eq!(metadata["locals.count"], ConfigValue::Integer(1));
}

#[test]
fn test_directory_state_overrides_config() {
    let report = azure()
        .parse(
            &DiscoveryContext::new(),
            &fixture(""),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    let infra = &report.infrastructure;

    // Config-only resources survive, shared IDs come from state
    assert!(infra.contains("azurerm_key_vault.secrets"));
    let rg = infra.get("azurerm_resource_group.main").unwrap();
    assert_eq!(
        rg.native_id.as_deref(),
        Some("/subscriptions/0000/resourceGroups/rg-platform")
    );
    assert_eq!(infra.len(), 6);

    let unique: HashSet<&str> = infra.resources().map(|r| r.id.as_str()).collect();
    assert_eq!(unique.len(), infra.len());
}

#[test]
fn test_detection() {
    let parser = azure();
    assert_eq!(parser.auto_detect(&fixture("main.tf")), (true, 0.9));
    assert_eq!(parser.auto_detect(&fixture("terraform.tfstate")), (true, 0.9));
    assert_eq!(parser.auto_detect(&fixture("")), (true, 0.95));
    assert!(parser.validate(&fixture("")).is_ok());

    let aws = TerraformParser::new(Provider::Aws);
    assert_eq!(aws.auto_detect(&fixture("main.tf")), (true, 0.6));
    assert!(aws.validate(&fixture("")).is_err());
}

fn provider_fixture(dir: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(dir)
        .join("main.tf")
}

#[test]
fn test_aws_config_skips_data_blocks() {
    let report = TerraformParser::new(Provider::Aws)
        .parse(
            &DiscoveryContext::new(),
            &provider_fixture("terraform_aws"),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    let infra = &report.infrastructure;

    let ids: Vec<&str> = infra.resource_ids().collect();
    assert_eq!(ids, vec!["aws_instance.web", "aws_s3_bucket.logs", "aws_vpc.main"]);
    assert_eq!(infra.provider, Provider::Aws);

    let web = infra.get("aws_instance.web").unwrap();
    assert_eq!(web.resource_type, ResourceType::VirtualMachine);
    // The data source reference is neither a resource nor an edge
    assert_eq!(web.dependencies, vec!["aws_vpc.main"]);
    assert!(web.config.get("ami").is_none());
    assert_eq!(
        web.config["root_block_device"].get("volume_size"),
        Some(&ConfigValue::Integer(20))
    );

    let vpc = infra.get("aws_vpc.main").unwrap();
    assert_eq!(vpc.resource_type, ResourceType::VirtualNetwork);
    assert_eq!(vpc.tags["env"], "staging");
    assert_eq!(
        infra.get("aws_s3_bucket.logs").unwrap().resource_type,
        ResourceType::StorageBucket
    );

    let unresolved: Vec<&str> = report
        .warnings_of(WarningKind::UnresolvedAttribute)
        .map(|w| w.unit.as_str())
        .collect();
    assert_eq!(unresolved, vec!["aws_instance.web.ami"]);
}

#[test]
fn test_gcp_config_skips_data_blocks() {
    let report = TerraformParser::new(Provider::Gcp)
        .parse(
            &DiscoveryContext::new(),
            &provider_fixture("terraform_gcp"),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    let infra = &report.infrastructure;

    let ids: Vec<&str> = infra.resource_ids().collect();
    assert_eq!(
        ids,
        vec![
            "google_compute_instance.app",
            "google_compute_network.vpc",
            "google_storage_bucket.assets",
        ]
    );

    let app = infra.get("google_compute_instance.app").unwrap();
    assert_eq!(app.name, "app-1");
    assert_eq!(app.resource_type, ResourceType::VirtualMachine);
    assert_eq!(app.tags["team"], "platform");
    assert_eq!(app.dependencies, vec!["google_compute_network.vpc"]);

    let bucket = infra.get("google_storage_bucket.assets").unwrap();
    assert_eq!(bucket.region, "EU");
    assert_eq!(bucket.resource_type, ResourceType::StorageBucket);
    assert!(infra.dangling_dependencies().is_empty());
}

#[test]
fn test_provider_prefix_selects_resources() {
    let options = DiscoveryOptions::default();
    let ctx = DiscoveryContext::new();

    let azure_on_aws = azure().parse(&ctx, &provider_fixture("terraform_aws"), &options).unwrap();
    assert!(azure_on_aws.infrastructure.is_empty());

    let aws_on_gcp = TerraformParser::new(Provider::Aws)
        .parse(&ctx, &provider_fixture("terraform_gcp"), &options)
        .unwrap();
    assert!(aws_on_gcp.infrastructure.is_empty());
}

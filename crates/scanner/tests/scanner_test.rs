//! Live scanner behavior against mocked credentials and ARM responses

use infra_discovery_common::{
    Category, DiscoveryContext, DiscoveryError, DiscoveryOptions, InfrastructureParser,
    ResourceType, Result, WarningKind,
};
use infra_discovery_scanner::{
    ArmClient, AzureLiveScanner, Credential, CredentialProvider, CredentialSource, ListPage,
    ScanDefinition,
};
use mockall::mock;
use serde_json::{json, Value};
use std::path::Path;

mock! {
    pub Credentials {}
    impl CredentialProvider for Credentials {
        fn get_credential(&self, ctx: &DiscoveryContext) -> Result<Credential>;
        fn account_id(&self) -> Option<String>;
        fn source(&self) -> CredentialSource;
    }
}

mock! {
    pub Client {}
    impl ArmClient for Client {
        fn list(&self, ctx: &DiscoveryContext, credential: &Credential, url: &str) -> Result<ListPage>;
    }
}

const LIVE: &str = "azure://";

fn credentials() -> MockCredentials {
    let mut credentials = MockCredentials::new();
    credentials.expect_get_credential().times(1).returning(|_| {
        Ok(Credential {
            access_token: "token".into(),
            subscription_id: "sub-1".into(),
        })
    });
    credentials
        .expect_account_id()
        .times(1)
        .return_const(Some("sub-1".to_string()));
    credentials
        .expect_source()
        .return_const(CredentialSource::Explicit);
    credentials
}

fn arm_item(arm_type: &str, name: &str, location: &str) -> Value {
    json!({
        "id": format!("/subscriptions/sub-1/resourceGroups/rg/providers/{arm_type}/{name}"),
        "name": name,
        "location": location,
        "tags": {"env": "test"},
        "properties": {"provisioningState": "Succeeded"}
    })
}

fn definition(resource_type: ResourceType, arm_type: &'static str) -> ScanDefinition {
    ScanDefinition::new(resource_type, arm_type, "2023-01-01", &[])
}

fn scanner(client: MockClient) -> AzureLiveScanner {
    AzureLiveScanner::new(Box::new(credentials()), Box::new(client))
}

#[test]
fn test_filtered_kinds_issue_no_calls() {
    let mut client = MockClient::new();
    client
        .expect_list()
        .withf(|_, _, url: &str| {
            url == "https://management.azure.com/subscriptions/sub-1/providers/Microsoft.KeyVault/vaults?api-version=2023-07-01"
        })
        .times(1)
        .returning(|_, _, _| {
            Ok(ListPage::new(vec![arm_item(
                "Microsoft.KeyVault/vaults",
                "kv-1",
                "westeurope",
            )]))
        });

    let options = DiscoveryOptions {
        resource_types: vec![ResourceType::KeyVault],
        ..Default::default()
    };
    // Any call for another catalogued kind has no matching expectation
    let report = scanner(client)
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &options)
        .unwrap();

    let infra = &report.infrastructure;
    assert_eq!(infra.len(), 1);
    let vault = infra.resources().next().unwrap();
    assert_eq!(vault.resource_type, ResourceType::KeyVault);
    assert_eq!(vault.category, Category::Security);
    assert_eq!(vault.name, "kv-1");
    assert_eq!(vault.native_id.as_deref(), Some(vault.id.as_str()));
    assert_eq!(vault.tags["env"], "test");
}

#[test]
fn test_category_filter_skips_other_categories() {
    let mut client = MockClient::new();
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("Microsoft.Network/dnszones"))
        .times(1)
        .returning(|_, _, _| Ok(ListPage::default()));

    let scanner = scanner(client).with_catalog(vec![
        definition(ResourceType::VirtualMachine, "Microsoft.Compute/virtualMachines"),
        definition(ResourceType::DnsZone, "Microsoft.Network/dnszones"),
        definition(ResourceType::KeyVault, "Microsoft.KeyVault/vaults"),
    ]);
    let options = DiscoveryOptions {
        categories: vec![Category::Network],
        ..Default::default()
    };

    let report = scanner
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &options)
        .unwrap();
    assert!(report.infrastructure.is_empty());
    assert!(report.is_clean());
}

fn failing_second_kind(client: &mut MockClient, third_calls: usize) {
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("Microsoft.Compute/virtualMachines"))
        .times(1)
        .returning(|_, _, _| {
            Ok(ListPage::new(vec![arm_item(
                "Microsoft.Compute/virtualMachines",
                "vm-1",
                "eastus",
            )]))
        });
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("Microsoft.KeyVault/vaults"))
        .times(1)
        .returning(|_, _, _| Err(DiscoveryError::Api("500 Internal Server Error".into())));
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("Microsoft.Network/dnszones"))
        .times(third_calls)
        .returning(|_, _, _| {
            Ok(ListPage::new(vec![arm_item(
                "Microsoft.Network/dnszones",
                "contoso.com",
                "global",
            )]))
        });
}

fn three_kinds() -> Vec<ScanDefinition> {
    vec![
        definition(ResourceType::VirtualMachine, "Microsoft.Compute/virtualMachines"),
        definition(ResourceType::KeyVault, "Microsoft.KeyVault/vaults"),
        definition(ResourceType::DnsZone, "Microsoft.Network/dnszones"),
    ]
}

#[test]
fn test_failing_kind_aborts_without_ignore_errors() {
    let mut client = MockClient::new();
    failing_second_kind(&mut client, 0);

    let result = scanner(client).with_catalog(three_kinds()).parse(
        &DiscoveryContext::new(),
        Path::new(LIVE),
        &DiscoveryOptions::default(),
    );
    assert!(matches!(result, Err(DiscoveryError::Api(_))));
}

#[test]
fn test_failing_kind_is_a_warning_with_ignore_errors() {
    let mut client = MockClient::new();
    failing_second_kind(&mut client, 1);

    let options = DiscoveryOptions {
        ignore_errors: true,
        ..Default::default()
    };
    let report = scanner(client)
        .with_catalog(three_kinds())
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &options)
        .unwrap();

    let kinds: Vec<&ResourceType> = report
        .infrastructure
        .resources()
        .map(|r| &r.resource_type)
        .collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&&ResourceType::VirtualMachine));
    assert!(kinds.contains(&&ResourceType::DnsZone));

    let failed: Vec<_> = report.warnings_of(WarningKind::FailedScan).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].unit, "Microsoft.KeyVault/vaults");
    assert!(failed[0].message.contains("500"));
}

#[test]
fn test_pages_are_drained() {
    let mut client = MockClient::new();
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("Microsoft.KeyVault/vaults"))
        .times(1)
        .returning(|_, _, _| {
            Ok(
                ListPage::new(vec![arm_item("Microsoft.KeyVault/vaults", "kv-1", "eastus")])
                    .with_next_link("https://management.azure.com/skiptoken/page-2"),
            )
        });
    client
        .expect_list()
        .withf(|_, _, url: &str| url.ends_with("skiptoken/page-2"))
        .times(1)
        .returning(|_, _, _| {
            Ok(ListPage::new(vec![arm_item(
                "Microsoft.KeyVault/vaults",
                "kv-2",
                "eastus",
            )]))
        });

    let report = scanner(client)
        .with_catalog(vec![definition(ResourceType::KeyVault, "Microsoft.KeyVault/vaults")])
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &DiscoveryOptions::default())
        .unwrap();
    assert_eq!(report.infrastructure.len(), 2);
}

#[test]
fn test_region_filter_is_case_insensitive() {
    let mut client = MockClient::new();
    client.expect_list().times(1).returning(|_, _, _| {
        Ok(ListPage::new(vec![
            arm_item("Microsoft.KeyVault/vaults", "kv-east", "eastus"),
            arm_item("Microsoft.KeyVault/vaults", "kv-west", "westeurope"),
        ]))
    });

    let options = DiscoveryOptions {
        regions: vec!["EastUS".into()],
        ..Default::default()
    };
    let report = scanner(client)
        .with_catalog(vec![definition(ResourceType::KeyVault, "Microsoft.KeyVault/vaults")])
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &options)
        .unwrap();

    let names: Vec<&str> = report.infrastructure.resources().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["kv-east"]);
}

fn sql_client() -> MockClient {
    let mut client = MockClient::new();
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("/providers/Microsoft.Sql/servers?"))
        .times(1)
        .returning(|_, _, _| {
            Ok(ListPage::new(vec![
                arm_item("Microsoft.Sql/servers", "sql-a", "eastus"),
                arm_item("Microsoft.Sql/servers", "sql-b", "westus"),
            ]))
        });
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("/servers/sql-a/databases?"))
        .times(1)
        .returning(|_, _, _| {
            Ok(ListPage::new(vec![
                json!({"id": "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Sql/servers/sql-a/databases/orders", "name": "orders"}),
                json!({"id": "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Sql/servers/sql-a/databases/users", "name": "users"}),
            ]))
        });
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("/servers/sql-b/databases?"))
        .times(1)
        .returning(|_, _, _| Ok(ListPage::default()));
    client
}

fn sql_catalog() -> Vec<ScanDefinition> {
    infra_discovery_scanner::azure_catalog()
        .into_iter()
        .filter(|d| d.arm_type.starts_with("Microsoft.Sql/"))
        .collect()
}

#[test]
fn test_children_listed_under_each_parent() {
    let report = scanner(sql_client())
        .with_catalog(sql_catalog())
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &DiscoveryOptions::default())
        .unwrap();
    let infra = &report.infrastructure;

    assert_eq!(infra.len(), 4);
    let orders = infra
        .get("/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Sql/servers/sql-a/databases/orders")
        .unwrap();
    assert_eq!(orders.resource_type, ResourceType::SqlDatabase);
    assert_eq!(orders.region, "eastus");
    assert_eq!(
        orders.dependencies,
        vec!["/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Sql/servers/sql-a"]
    );
    assert!(infra.dangling_dependencies().is_empty());
}

#[test]
fn test_children_scanned_when_parent_kind_filtered_out() {
    let options = DiscoveryOptions {
        resource_types: vec![ResourceType::SqlDatabase],
        ..Default::default()
    };
    // The servers collection is still listed exactly once to find parents
    let report = scanner(sql_client())
        .with_catalog(sql_catalog())
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &options)
        .unwrap();

    let infra = &report.infrastructure;
    assert_eq!(infra.len(), 2);
    assert!(infra.resources().all(|r| r.resource_type == ResourceType::SqlDatabase));
    let server = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Sql/servers/sql-a";
    assert!(!infra.contains(server));
    let dangling = infra.dangling_dependencies();
    assert_eq!(dangling.len(), 2);
    assert!(dangling.iter().all(|(_, target)| *target == server));
}

#[test]
fn test_parents_of_filtered_children_are_not_listed() {
    // Storage is filtered out entirely: neither accounts nor containers are listed
    let mut client = sql_client();
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("Microsoft.Storage"))
        .never();
    let catalog: Vec<ScanDefinition> = infra_discovery_scanner::azure_catalog()
        .into_iter()
        .filter(|d| {
            d.arm_type.starts_with("Microsoft.Sql/") || d.arm_type.starts_with("Microsoft.Storage/")
        })
        .collect();
    let options = DiscoveryOptions {
        resource_types: vec![ResourceType::SqlDatabase],
        ..Default::default()
    };

    let report = scanner(client)
        .with_catalog(catalog)
        .parse(&DiscoveryContext::new(), Path::new(LIVE), &options)
        .unwrap();
    assert_eq!(report.infrastructure.len(), 2);
}

#[test]
fn test_subscription_from_path() {
    let mut client = MockClient::new();
    client
        .expect_list()
        .withf(|_, _, url: &str| url.contains("/subscriptions/other-sub/providers/"))
        .times(1)
        .returning(|_, _, _| Ok(ListPage::default()));

    let report = scanner(client)
        .with_catalog(vec![definition(ResourceType::KeyVault, "Microsoft.KeyVault/vaults")])
        .parse(
            &DiscoveryContext::new(),
            Path::new("azure://other-sub"),
            &DiscoveryOptions::default(),
        )
        .unwrap();
    assert_eq!(
        report.infrastructure.metadata()["subscription_id"].as_str(),
        Some("other-sub")
    );
}

#[test]
fn test_cancelled_before_any_call() {
    let mut credentials = MockCredentials::new();
    credentials.expect_get_credential().never();
    let mut client = MockClient::new();
    client.expect_list().never();

    let ctx = DiscoveryContext::new();
    ctx.cancel();
    let result = AzureLiveScanner::new(Box::new(credentials), Box::new(client)).parse(
        &ctx,
        Path::new(LIVE),
        &DiscoveryOptions::default(),
    );
    assert!(matches!(result, Err(DiscoveryError::Cancelled)));
}

#[test]
fn test_missing_credentials_fail_parse() {
    let mut credentials = MockCredentials::new();
    credentials
        .expect_get_credential()
        .times(1)
        .returning(|_| Err(DiscoveryError::NoCredentials("AZURE_ACCESS_TOKEN is not set".into())));
    let mut client = MockClient::new();
    client.expect_list().never();

    let result = AzureLiveScanner::new(Box::new(credentials), Box::new(client)).parse(
        &DiscoveryContext::new(),
        Path::new(LIVE),
        &DiscoveryOptions::default(),
    );
    assert!(matches!(result, Err(DiscoveryError::NoCredentials(_))));
}

fn probing(source: CredentialSource, succeeds: bool) -> AzureLiveScanner {
    let mut credentials = MockCredentials::new();
    credentials.expect_get_credential().returning(move |ctx| {
        assert!(ctx.remaining().is_some(), "probe runs with a deadline");
        if succeeds {
            Ok(Credential {
                access_token: "token".into(),
                subscription_id: "sub-1".into(),
            })
        } else {
            Err(DiscoveryError::NoCredentials("nothing configured".into()))
        }
    });
    credentials.expect_source().return_const(source);
    AzureLiveScanner::new(Box::new(credentials), Box::new(MockClient::new()))
}

#[test]
fn test_auto_detect_confidence() {
    let live = Path::new(LIVE);
    assert_eq!(
        probing(CredentialSource::Explicit, true).auto_detect(live),
        (true, 0.7)
    );
    assert_eq!(
        probing(CredentialSource::DefaultChain, true).auto_detect(live),
        (true, 0.6)
    );
    assert_eq!(
        probing(CredentialSource::DefaultChain, false).auto_detect(live),
        (false, 0.0)
    );
    assert!(probing(CredentialSource::Explicit, true).validate(live).is_ok());
    assert!(matches!(
        probing(CredentialSource::Explicit, false).validate(live),
        Err(DiscoveryError::NoCredentials(_))
    ));
}

#[test]
fn test_file_paths_are_not_live_targets() {
    let mut credentials = MockCredentials::new();
    credentials.expect_get_credential().never();
    let scanner = AzureLiveScanner::new(Box::new(credentials), Box::new(MockClient::new()));

    assert_eq!(scanner.auto_detect(Path::new("./templates/main.bicep")), (false, 0.0));
    assert!(matches!(
        scanner.validate(Path::new("./templates")),
        Err(DiscoveryError::UnsupportedFormat(_))
    ));
}

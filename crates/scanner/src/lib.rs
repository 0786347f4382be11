//! Live Azure Resource Manager scanning for infra-discovery
//!
//! [`AzureLiveScanner`] walks a data-driven catalog of resource kinds,
//! drains each paginated ARM list call sequentially and normalizes the items
//! into the shared resource model. Credentials and HTTP access sit behind
//! the [`CredentialProvider`] and [`ArmClient`] traits so tests can swap in
//! doubles.

pub mod catalog;
mod client;
mod credential;
mod scanner;

pub use catalog::{azure_catalog, KindMatch, ParentCollection, ScanDefinition};
pub use client::{ArmClient, HttpArmClient, ListPage, MANAGEMENT_ENDPOINT};
pub use credential::{
    Credential, CredentialProvider, CredentialSource, EnvironmentCredential, StaticCredential,
    ACCESS_TOKEN_ENV, ACCESS_TOKEN_KEY, SUBSCRIPTION_ENV, SUBSCRIPTION_KEY,
};
pub use scanner::{live_target, AzureLiveScanner, LIVE_SCHEME, PROBE_TIMEOUT};

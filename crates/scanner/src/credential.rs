//! Credential resolution for the live scanner

use infra_discovery_common::{DiscoveryContext, DiscoveryError, Result};
use std::collections::HashMap;
use std::env;
use std::fmt;

/// Options key holding a bearer token for the management API
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Options key holding the subscription to scan
pub const SUBSCRIPTION_KEY: &str = "subscription_id";

pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Resolved bearer token for one subscription
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub subscription_id: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

/// Where a credential came from; drives detection confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Passed in through discovery options
    Explicit,
    /// Picked up from the environment
    DefaultChain,
}

/// Produces credentials for the live scanner.
///
/// Called once per discovery pass; implementations may block (token
/// exchange) but must honor the context deadline.
pub trait CredentialProvider: Send + Sync {
    fn get_credential(&self, ctx: &DiscoveryContext) -> Result<Credential>;

    /// Subscription the credential is scoped to, when known up front
    fn account_id(&self) -> Option<String>;

    fn source(&self) -> CredentialSource;
}

/// Credentials passed explicitly in `DiscoveryOptions::credentials`
#[derive(Debug, Clone)]
pub struct StaticCredential {
    credential: Credential,
}

impl StaticCredential {
    pub fn new(access_token: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            credential: Credential {
                access_token: access_token.into(),
                subscription_id: subscription_id.into(),
            },
        }
    }

    pub fn from_options(credentials: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| {
            credentials
                .get(key)
                .filter(|value| !value.trim().is_empty())
                .cloned()
                .ok_or_else(|| {
                    DiscoveryError::NoCredentials(format!("credentials are missing '{key}'"))
                })
        };
        Ok(Self::new(
            required(ACCESS_TOKEN_KEY)?,
            required(SUBSCRIPTION_KEY)?,
        ))
    }
}

impl CredentialProvider for StaticCredential {
    fn get_credential(&self, ctx: &DiscoveryContext) -> Result<Credential> {
        ctx.check()?;
        Ok(self.credential.clone())
    }

    fn account_id(&self) -> Option<String> {
        Some(self.credential.subscription_id.clone())
    }

    fn source(&self) -> CredentialSource {
        CredentialSource::Explicit
    }
}

/// Credentials read from `AZURE_ACCESS_TOKEN` and `AZURE_SUBSCRIPTION_ID`
/// on every call
#[derive(Debug, Clone, Default)]
pub struct EnvironmentCredential;

impl EnvironmentCredential {
    pub fn new() -> Self {
        Self
    }

    fn read(name: &str) -> Result<String> {
        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(DiscoveryError::NoCredentials(format!("{name} is not set"))),
        }
    }
}

impl CredentialProvider for EnvironmentCredential {
    fn get_credential(&self, ctx: &DiscoveryContext) -> Result<Credential> {
        ctx.check()?;
        Ok(Credential {
            access_token: Self::read(ACCESS_TOKEN_ENV)?,
            subscription_id: Self::read(SUBSCRIPTION_ENV)?,
        })
    }

    fn account_id(&self) -> Option<String> {
        Self::read(SUBSCRIPTION_ENV).ok()
    }

    fn source(&self) -> CredentialSource {
        CredentialSource::DefaultChain
    }
}

/// Explicit credentials when the options carry a token, otherwise the
/// environment
pub fn from_options(credentials: &HashMap<String, String>) -> Result<Box<dyn CredentialProvider>> {
    if credentials.is_empty() {
        return Ok(Box::new(EnvironmentCredential::new()));
    }
    Ok(Box::new(StaticCredential::from_options(credentials)?))
}

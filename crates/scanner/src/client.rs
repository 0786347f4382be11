//! HTTP access to the Azure Resource Manager list endpoints

use crate::credential::Credential;
use infra_discovery_common::{DiscoveryContext, DiscoveryError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Public-cloud management endpoint
pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("infra-discovery/", env!("CARGO_PKG_VERSION"));

/// One page of an ARM list response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

impl ListPage {
    pub fn new(value: Vec<Value>) -> Self {
        Self {
            value,
            next_link: None,
        }
    }

    pub fn with_next_link(mut self, next_link: impl Into<String>) -> Self {
        self.next_link = Some(next_link.into());
        self
    }
}

/// Fetches single pages; the scanner follows `nextLink` itself
pub trait ArmClient: Send + Sync {
    fn list(&self, ctx: &DiscoveryContext, credential: &Credential, url: &str) -> Result<ListPage>;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Blocking reqwest client against the management endpoint
#[derive(Debug, Clone)]
pub struct HttpArmClient {
    client: reqwest::blocking::Client,
}

impl HttpArmClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DiscoveryError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ArmClient for HttpArmClient {
    fn list(&self, ctx: &DiscoveryContext, credential: &Credential, url: &str) -> Result<ListPage> {
        ctx.check()?;
        debug!("GET {}", url);

        let mut request = self.client.get(url).bearer_auth(&credential.access_token);
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining.min(REQUEST_TIMEOUT));
        }
        let response = request
            .send()
            .map_err(|e| DiscoveryError::Api(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<ListPage>()
                .map_err(|e| DiscoveryError::Api(format!("invalid list response from {url}: {e}")));
        }

        let detail = response
            .json::<ErrorEnvelope>()
            .map(|envelope| format!("{}: {}", envelope.error.code, envelope.error.message))
            .unwrap_or_else(|_| "no error details".to_string());

        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Err(
                DiscoveryError::InvalidCredentials(format!("{status} from {url} ({detail})")),
            ),
            _ => Err(DiscoveryError::Api(format!("{status} from {url} ({detail})"))),
        }
    }
}

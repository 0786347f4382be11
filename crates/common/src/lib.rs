//! Common types and utilities for infra-discovery
//!
//! This crate contains the normalized infrastructure model, the parser
//! contract every extractor implements, discovery options, filtering, and the
//! registry used by the composition root to wire extractors together.

pub mod confidence;
mod context;
mod filter;
mod model;
mod options;
mod parser;
mod registry;
mod report;
mod resource_type;
pub mod sensitive;

pub use context::DiscoveryContext;
pub use filter::ResourceFilter;
pub use model::{ConfigMap, ConfigValue, Infrastructure, Resource};
pub use options::DiscoveryOptions;
pub use parser::InfrastructureParser;
pub use registry::{DetectionCandidate, ParserRegistry};
pub use report::{DiscoveryReport, DiscoveryWarning, WarningKind};
pub use resource_type::{Category, ResourceType};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during discovery
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("No candidate files found in {}", .0.display())]
    NoFilesFound(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No credentials available: {0}")]
    NoCredentials(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Discovery cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Represents a cloud provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

impl Provider {
    /// Prefix Terraform uses for this provider's resource types
    pub fn terraform_prefix(&self) -> &'static str {
        match self {
            Provider::Aws => "aws_",
            Provider::Gcp => "google_",
            Provider::Azure => "azurerm_",
        }
    }

    /// Name used in a Terraform `provider "<name>"` block
    pub fn terraform_name(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "google",
            Provider::Azure => "azurerm",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "gcp" | "google" => Ok(Provider::Gcp),
            "azure" | "azurerm" => Ok(Provider::Azure),
            other => Err(DiscoveryError::Config(format!("unknown provider '{other}'"))),
        }
    }
}

/// Source format an extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// Azure Resource Manager JSON template
    ArmTemplate,
    /// Bicep source files
    Bicep,
    /// Terraform HCL configuration (`.tf`)
    Terraform,
    /// Terraform state snapshot (`.tfstate`)
    TerraformState,
    /// Live Azure Resource Manager API
    AzureLive,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::ArmTemplate => "arm-template",
            SourceFormat::Bicep => "bicep",
            SourceFormat::Terraform => "terraform",
            SourceFormat::TerraformState => "terraform-state",
            SourceFormat::AzureLive => "azure-live",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "arm" | "arm-template" => Ok(SourceFormat::ArmTemplate),
            "bicep" => Ok(SourceFormat::Bicep),
            "terraform" | "tf" | "hcl" => Ok(SourceFormat::Terraform),
            "terraform-state" | "tfstate" | "state" => Ok(SourceFormat::TerraformState),
            "azure-live" | "live" | "azure" => Ok(SourceFormat::AzureLive),
            other => Err(DiscoveryError::UnsupportedFormat(other.to_string())),
        }
    }
}

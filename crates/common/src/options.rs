//! Discovery options
//!
//! Options can be built in code or loaded from a YAML or JSON file:
//!
//! ```yaml
//! ignore_errors: true
//! categories: [database, storage]
//! regions: [eastus, westeurope]
//! exclude_patterns: ["**/.terraform/**"]
//! ```

use crate::{Category, DiscoveryError, ResourceType, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Options recognized by every extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Keep values of sensitive-looking attributes instead of redacting them
    pub include_sensitive_data: bool,

    /// Expand nested deployments and modules
    pub follow_nested_templates: bool,

    /// Nesting limit for templates and modules (0 = unlimited)
    pub max_recursion_depth: usize,

    /// Skip failing files or resource kinds instead of aborting
    pub ignore_errors: bool,

    /// Kind allow-list; takes precedence over `categories`
    pub resource_types: Vec<ResourceType>,

    /// Category allow-list
    pub categories: Vec<Category>,

    /// Credential material for live scanners
    pub credentials: HashMap<String, String>,

    /// Region allow-list for live scanners (case-insensitive)
    pub regions: Vec<String>,

    /// Glob patterns a file must match to be read (empty = all)
    pub include_patterns: Vec<String>,

    /// Glob patterns excluding files from directory walks
    pub exclude_patterns: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            include_sensitive_data: false,
            follow_nested_templates: true,
            max_recursion_depth: 10,
            ignore_errors: false,
            resource_types: Vec::new(),
            categories: Vec::new(),
            credentials: HashMap::new(),
            regions: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl DiscoveryOptions {
    /// Load options from a YAML or JSON file (chosen by extension)
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DiscoveryError::Config(format!("Failed to read options file {:?}: {}", path, e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                DiscoveryError::Config(format!("Failed to parse options JSON {:?}: {}", path, e))
            }),
            _ => serde_yaml::from_str(&content).map_err(|e| {
                DiscoveryError::Config(format!("Failed to parse options YAML {:?}: {}", path, e))
            }),
        }
    }

    /// Whether nesting may go one level deeper than `depth`
    pub fn allows_depth(&self, depth: usize) -> bool {
        self.follow_nested_templates
            && (self.max_recursion_depth == 0 || depth < self.max_recursion_depth)
    }

    /// Whether a region passes the region allow-list
    pub fn allows_region(&self, region: &str) -> bool {
        self.regions.is_empty()
            || self
                .regions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(region))
    }
}

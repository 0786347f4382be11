//! File-based infrastructure extractors
//!
//! This crate turns infrastructure-as-code sources into the normalized
//! model from `infra-discovery-common`.
//!
//! ## Formats
//! - **ARM templates**: JSON graph of resources with explicit `dependsOn` edges
//! - **Bicep**: brace-delimited text read without a grammar
//! - **Terraform configuration**: HCL blocks evaluated statically
//! - **Terraform state**: versioned JSON snapshots with full attribute bags
//!
//! Every extractor implements [`InfrastructureParser`] and returns a
//! [`DiscoveryReport`](infra_discovery_common::DiscoveryReport) carrying the
//! warnings of the pass alongside the infrastructure.

pub mod arm;
pub mod bicep;
mod source_files;
pub mod terraform;
mod type_mapper;

pub use arm::ArmTemplateParser;
pub use bicep::BicepParser;
pub use terraform::TerraformParser;
pub use type_mapper::TypeMapper;

use infra_discovery_common::{InfrastructureParser, Provider};

/// Every file-based extractor, in detection priority order
///
/// # Returns
/// * ARM and Bicep for Azure, then one Terraform parser per provider
pub fn file_parsers() -> Vec<Box<dyn InfrastructureParser>> {
    vec![
        Box::new(ArmTemplateParser::new()),
        Box::new(BicepParser::new()),
        Box::new(TerraformParser::new(Provider::Azure)),
        Box::new(TerraformParser::new(Provider::Aws)),
        Box::new(TerraformParser::new(Provider::Gcp)),
    ]
}

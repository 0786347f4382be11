//! Azure Resource Manager template extractor
//!
//! Reads ARM JSON deployment templates into the normalized model.
//!
//! ## What is extracted
//! - every entry of `resources`, with inline children flattened under their
//!   parent and inline nested deployments expanded (depth bounded)
//! - `dependsOn` entries, copied verbatim
//! - parameters, variables and outputs as `param.*`, `var.*`, `output.*`
//!   metadata
//!
//! ## Usage
//! ```rust,ignore
//! use infra_discovery_parser::ArmTemplateParser;
//!
//! let report = ArmTemplateParser::new().parse(&ctx, Path::new("infra/"), &options)?;
//! ```

mod converter;
mod parser;
mod types;

pub use parser::{is_arm_template, ArmTemplateParser};
pub use types::*;

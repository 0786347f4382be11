//! Terraform extractors
//!
//! `.tf` files are read with `hcl-rs` and evaluated statically; `.tfstate`
//! snapshots are read as JSON and keep every recorded attribute.
//!
//! ## Resource IDs
//! - configuration: `<type>.<name>`
//! - state: `<type>.<name>`, plus `[0]` or `["key"]` for `count` and
//!   `for_each` instances, behind the module address (`module.net.`) for
//!   resources outside the root module

mod config;
mod parser;
mod state;

pub use config::is_config_document;
pub use parser::TerraformParser;
pub use state::{is_state_document, SUPPORTED_VERSIONS};

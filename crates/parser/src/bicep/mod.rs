//! Bicep extractor
//!
//! Best-effort reading of `.bicep` files without a grammar. Resource IDs
//! are `<kind>.<symbol>`; resources pulled in through local modules get a
//! `module.<symbol>.` prefix per module level.

mod blocks;
mod parser;

pub use parser::{is_bicep_template, BicepParser};

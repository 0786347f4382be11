//! Contract implemented by every extractor

use crate::{DiscoveryContext, DiscoveryOptions, DiscoveryReport, Provider, Result, SourceFormat};
use std::path::Path;

/// One extractor for one provider.
///
/// `validate` and `auto_detect` are cheap: existence and marker checks only
/// (live scanners run a short credential probe). `parse` does the real work
/// and checks the context before every file, resource kind and page.
pub trait InfrastructureParser: Send + Sync {
    /// Cloud provider this instance targets
    fn provider(&self) -> Provider;

    /// Formats this instance understands
    fn supported_formats(&self) -> &[SourceFormat];

    /// `Ok(())` if `path` plausibly contains this format for this provider
    fn validate(&self, path: &Path) -> Result<()>;

    /// Whether this parser can handle `path`, with a confidence in `[0, 1]`.
    /// Never fails: unreadable or foreign paths yield `(false, 0.0)`.
    fn auto_detect(&self, path: &Path) -> (bool, f32);

    /// Extract every resource under `path`
    fn parse(
        &self,
        ctx: &DiscoveryContext,
        path: &Path,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport>;

    /// Short label used in logs and CLI output
    fn name(&self) -> String {
        let formats: Vec<&str> = self.supported_formats().iter().map(|f| f.as_str()).collect();
        format!("{}/{}", self.provider(), formats.join("+"))
    }
}

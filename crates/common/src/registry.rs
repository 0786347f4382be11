//! Explicit registry of available extractors
//!
//! Built once by the composition root, then passed by reference to whatever
//! runs discovery. There is no process-wide parser set.

use crate::{InfrastructureParser, Provider, SourceFormat};
use std::path::Path;
use tracing::debug;

/// A parser that claimed a path, with its confidence
pub struct DetectionCandidate<'a> {
    pub parser: &'a dyn InfrastructureParser,
    pub confidence: f32,
}

impl std::fmt::Debug for DetectionCandidate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionCandidate")
            .field("parser", &self.parser.name())
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Set of registered extractors
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn InfrastructureParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Box<dyn InfrastructureParser>) {
        debug!(parser = %parser.name(), "Registered parser");
        self.parsers.push(parser);
    }

    /// Builder-style registration
    pub fn with(mut self, parser: Box<dyn InfrastructureParser>) -> Self {
        self.register(parser);
        self
    }

    pub fn parsers(&self) -> impl Iterator<Item = &dyn InfrastructureParser> {
        self.parsers.iter().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn for_provider(
        &self,
        provider: Provider,
    ) -> impl Iterator<Item = &dyn InfrastructureParser> {
        self.parsers().filter(move |p| p.provider() == provider)
    }

    /// First parser registered for `provider` that declares `format`
    pub fn find(&self, provider: Provider, format: SourceFormat) -> Option<&dyn InfrastructureParser> {
        self.for_provider(provider)
            .find(|p| p.supported_formats().contains(&format))
    }

    /// Every parser that can handle `path`, best first. Ties keep
    /// registration order.
    pub fn detect(&self, path: &Path) -> Vec<DetectionCandidate<'_>> {
        let mut candidates: Vec<DetectionCandidate<'_>> = self
            .parsers()
            .filter_map(|parser| {
                let (can_handle, confidence) = parser.auto_detect(path);
                debug!(
                    parser = %parser.name(),
                    can_handle,
                    confidence,
                    "Auto-detect result"
                );
                (can_handle && confidence > 0.0).then_some(DetectionCandidate { parser, confidence })
            })
            .collect();

        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        candidates
    }

    pub fn best_match(&self, path: &Path) -> Option<DetectionCandidate<'_>> {
        self.detect(path).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscoveryContext, DiscoveryOptions, DiscoveryReport, Infrastructure, Result};

    struct FixedParser {
        provider: Provider,
        formats: Vec<SourceFormat>,
        confidence: f32,
    }

    impl InfrastructureParser for FixedParser {
        fn provider(&self) -> Provider {
            self.provider
        }

        fn supported_formats(&self) -> &[SourceFormat] {
            &self.formats
        }

        fn validate(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn auto_detect(&self, _path: &Path) -> (bool, f32) {
            (self.confidence > 0.0, self.confidence)
        }

        fn parse(
            &self,
            _ctx: &DiscoveryContext,
            _path: &Path,
            _options: &DiscoveryOptions,
        ) -> Result<DiscoveryReport> {
            Ok(DiscoveryReport::new(Infrastructure::new(self.provider)))
        }
    }

    fn fixed(provider: Provider, format: SourceFormat, confidence: f32) -> Box<dyn InfrastructureParser> {
        Box::new(FixedParser {
            provider,
            formats: vec![format],
            confidence,
        })
    }

    #[test]
    fn test_detect_ranks_by_confidence() {
        let registry = ParserRegistry::new()
            .with(fixed(Provider::Azure, SourceFormat::ArmTemplate, 0.6))
            .with(fixed(Provider::Azure, SourceFormat::Bicep, 0.0))
            .with(fixed(Provider::Azure, SourceFormat::TerraformState, 0.9));

        let candidates = registry.detect(Path::new("whatever"));
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].parser.supported_formats(),
            &[SourceFormat::TerraformState]
        );
        assert_eq!(candidates[1].confidence, 0.6);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let registry = ParserRegistry::new()
            .with(fixed(Provider::Azure, SourceFormat::Bicep, 0.9))
            .with(fixed(Provider::Azure, SourceFormat::Terraform, 0.9));

        let best = registry.best_match(Path::new("x")).unwrap();
        assert_eq!(best.parser.supported_formats(), &[SourceFormat::Bicep]);
    }

    #[test]
    fn test_find_by_provider_and_format() {
        let registry = ParserRegistry::new()
            .with(fixed(Provider::Aws, SourceFormat::Terraform, 0.5))
            .with(fixed(Provider::Azure, SourceFormat::Terraform, 0.5));

        let parser = registry.find(Provider::Azure, SourceFormat::Terraform).unwrap();
        assert_eq!(parser.provider(), Provider::Azure);
        assert!(registry.find(Provider::Gcp, SourceFormat::Terraform).is_none());
        assert_eq!(registry.for_provider(Provider::Aws).count(), 1);
    }
}

//! Terraform parser covering configuration and state files

use super::config::{self, is_config_document};
use super::state::{self, is_state_document};
use crate::source_files::{self, FileKind};
use infra_discovery_common::{
    DiscoveryContext, DiscoveryOptions, DiscoveryReport, Infrastructure, InfrastructureParser,
    Provider, ResourceFilter, Result, SourceFormat,
};
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_FILES: FileKind = FileKind::new(&["tf"]);
const STATE_FILES: FileKind = FileKind::new(&["tfstate"]);
const FILE_KINDS: &[FileKind] = &[CONFIG_FILES, STATE_FILES];

/// Extractor for Terraform `.tf` configuration and `.tfstate` snapshots
///
/// One instance targets one provider: only resource types carrying that
/// provider's prefix (`azurerm_`, `aws_`, `google_`) are extracted. When a
/// directory holds both, configuration files are read first so resources
/// recorded in state win on ID collision.
#[derive(Debug, Clone, Copy)]
pub struct TerraformParser {
    provider: Provider,
}

impl TerraformParser {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    fn has_marker(&self, content: &str) -> bool {
        is_config_document(content, self.provider) || is_state_document(content, self.provider)
    }

    /// Parse a state snapshot held in memory
    pub fn parse_state_str(&self, content: &str, options: &DiscoveryOptions) -> Result<DiscoveryReport> {
        let mut report = state::parse_state(content, "<inline>", self.provider)?;
        report.infrastructure = ResourceFilter::from_options(options).apply(report.infrastructure);
        Ok(report)
    }

    /// Parse configuration text held in memory
    pub fn parse_config_str(&self, content: &str, options: &DiscoveryOptions) -> Result<DiscoveryReport> {
        config::parse_config(content, "<inline>", self.provider, options).map(|file| file.report)
    }
}

/// Config files first, then state files, each group in path order
fn processing_order(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let (mut ordered, state): (Vec<PathBuf>, Vec<PathBuf>) =
        files.into_iter().partition(|f| CONFIG_FILES.matches(f));
    ordered.extend(state);
    ordered
}

impl InfrastructureParser for TerraformParser {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Terraform, SourceFormat::TerraformState]
    }

    fn validate(&self, path: &Path) -> Result<()> {
        source_files::validate(path, FILE_KINDS, |content| self.has_marker(content))
    }

    fn auto_detect(&self, path: &Path) -> (bool, f32) {
        source_files::detect(path, FILE_KINDS, |content| self.has_marker(content))
    }

    fn parse(
        &self,
        ctx: &DiscoveryContext,
        path: &Path,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport> {
        let files = processing_order(source_files::collect(path, FILE_KINDS, options)?);

        let mut report = DiscoveryReport::new(Infrastructure::new(self.provider));
        let mut locals = 0;
        source_files::parse_each(ctx, &files, options, &mut report, |file| {
            let content = source_files::read(file)?;
            let unit = file.display().to_string();
            if STATE_FILES.matches(file) {
                return state::parse_state(&content, &unit, self.provider);
            }
            let parsed = config::parse_config(&content, &unit, self.provider, options)?;
            locals += parsed.locals;
            Ok(parsed.report)
        })?;

        if locals > 0 {
            report.infrastructure.set_metadata("locals.count", locals as i64);
        }
        report.infrastructure = ResourceFilter::from_options(options).apply(report.infrastructure);
        info!(
            "Parsed {} Terraform file(s) from {} for {}: {} resources, {} warnings",
            files.len(),
            path.display(),
            self.provider,
            report.infrastructure.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

//! ARM template file parser

use super::converter::ArmConverter;
use super::types::ArmTemplate;
use crate::source_files::{self, FileKind};
use infra_discovery_common::{
    DiscoveryContext, DiscoveryError, DiscoveryOptions, DiscoveryReport, DiscoveryWarning,
    Infrastructure, InfrastructureParser, Provider, ResourceFilter, Result, SourceFormat,
    WarningKind,
};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

const FILE_KINDS: &[FileKind] = &[FileKind::new(&["json"])];

fn schema_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""\$schema"\s*:\s*"[^"]*deploymentTemplate\.json"#)
            .expect("schema pattern is valid")
    })
}

/// Whether JSON text declares the deployment template schema
pub fn is_arm_template(content: &str) -> bool {
    schema_regex().is_match(content)
}

/// Extractor for Azure Resource Manager JSON templates
///
/// Accepts a single template or a directory of them. In directory mode,
/// JSON files that are not deployment templates (parameter files,
/// `package.json`, ...) are skipped with a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArmTemplateParser;

impl ArmTemplateParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse template JSON text
    pub fn parse_str(
        &self,
        content: &str,
        unit: &str,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport> {
        let template: ArmTemplate = serde_json::from_str(content)
            .map_err(|e| DiscoveryError::Parse(format!("Invalid ARM template {}: {}", unit, e)))?;
        Ok(ArmConverter::new(options, unit).convert(&template))
    }

    fn parse_file(
        &self,
        path: &Path,
        directory_mode: bool,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport> {
        let content = source_files::read(path)?;
        let unit = path.display().to_string();

        if directory_mode && !is_arm_template(&content) {
            let mut report = DiscoveryReport::new(Infrastructure::new(Provider::Azure));
            report.warn(DiscoveryWarning::new(
                unit,
                WarningKind::SkippedFile,
                "not an ARM deployment template",
            ));
            return Ok(report);
        }

        self.parse_str(&content, &unit, options)
    }
}

impl InfrastructureParser for ArmTemplateParser {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::ArmTemplate]
    }

    fn validate(&self, path: &Path) -> Result<()> {
        source_files::validate(path, FILE_KINDS, is_arm_template)
    }

    fn auto_detect(&self, path: &Path) -> (bool, f32) {
        source_files::detect(path, FILE_KINDS, is_arm_template)
    }

    fn parse(
        &self,
        ctx: &DiscoveryContext,
        path: &Path,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryReport> {
        let files = source_files::collect(path, FILE_KINDS, options)?;
        let directory_mode = path.is_dir();

        let mut report = DiscoveryReport::new(Infrastructure::new(Provider::Azure));
        source_files::parse_each(ctx, &files, options, &mut report, |file| {
            self.parse_file(file, directory_mode, options)
        })?;

        report.infrastructure = ResourceFilter::from_options(options).apply(report.infrastructure);
        info!(
            "Parsed {} ARM template file(s) from {}: {} resources, {} warnings",
            files.len(),
            path.display(),
            report.infrastructure.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

//! Infra Discovery CLI
//!
//! Command-line interface for discovering cloud infrastructure from
//! templates, Terraform files and live Azure subscriptions.

mod logging;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use infra_discovery_common::{
    confidence, Category, DiscoveryContext, DiscoveryOptions, DiscoveryReport,
    InfrastructureParser, ParserRegistry, Provider, ResourceType, SourceFormat,
};
use infra_discovery_parser::file_parsers;
use infra_discovery_scanner::{AzureLiveScanner, LIVE_SCHEME};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "infra-discovery")]
#[command(version, about = "Discover cloud infrastructure from templates, state files and live APIs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the extractors that can handle a path
    #[command(after_help = "EXAMPLES:\n  \
        infra-discovery detect --path ./infra\n  \
        infra-discovery detect --path azuredeploy.json")]
    Detect {
        /// File or directory to inspect (azure://<subscription> for live)
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Check that a path holds a format without extracting it
    Validate {
        /// File or directory to validate
        #[arg(short, long)]
        path: PathBuf,

        /// Source format (auto-detected if not specified)
        #[arg(short, long)]
        format: Option<SourceFormat>,

        /// Cloud provider
        #[arg(long, default_value = "azure")]
        provider: Provider,
    },

    /// Extract resources from templates, Terraform files or state
    #[command(after_help = "EXAMPLES:\n  \
        # Auto-detect the format\n  \
        infra-discovery parse --path ./bicep\n\n  \
        # Only databases, as JSON\n  \
        infra-discovery parse --path terraform.tfstate --categories database --json\n\n  \
        # AWS resources from Terraform configuration\n  \
        infra-discovery parse --path ./tf --format terraform --provider aws")]
    Parse {
        /// File or directory to parse
        #[arg(short, long)]
        path: PathBuf,

        /// Source format (auto-detected if not specified)
        #[arg(short, long)]
        format: Option<SourceFormat>,

        /// Cloud provider, used with --format
        #[arg(long, default_value = "azure")]
        provider: Provider,

        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan a live Azure subscription
    #[command(after_help = "EXAMPLES:\n  \
        # Credentials from AZURE_ACCESS_TOKEN / AZURE_SUBSCRIPTION_ID\n  \
        infra-discovery scan --regions eastus,westeurope\n\n  \
        # Only key vaults and storage accounts\n  \
        infra-discovery scan --types key_vault,storage_account --json")]
    Scan {
        /// Subscription to scan (defaults to the credential's subscription)
        #[arg(long)]
        subscription: Option<String>,

        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Discovery options shared by `parse` and `scan`; flags override the file
#[derive(Args, Debug, Default)]
struct DiscoveryArgs {
    /// Options file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated resource kinds to keep (takes precedence over --categories)
    #[arg(long, value_delimiter = ',', value_parser = parse_resource_type)]
    types: Vec<ResourceType>,

    /// Comma-separated categories to keep
    #[arg(long, value_delimiter = ',')]
    categories: Vec<Category>,

    /// Comma-separated regions to keep (live scans)
    #[arg(long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Glob a file must match to be read (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Glob excluding files from directory walks (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Record failures as warnings and keep going
    #[arg(long)]
    ignore_errors: bool,

    /// Keep values of sensitive attributes
    #[arg(long)]
    include_sensitive: bool,

    /// Do not expand nested templates and modules
    #[arg(long)]
    no_follow: bool,

    /// Nesting limit for templates and modules (0 = unlimited)
    #[arg(long)]
    max_depth: Option<usize>,
}

impl DiscoveryArgs {
    fn to_options(&self) -> Result<DiscoveryOptions> {
        let mut options = match &self.config {
            Some(path) => DiscoveryOptions::load(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            None => DiscoveryOptions::default(),
        };

        if !self.types.is_empty() {
            options.resource_types = self.types.clone();
        }
        if !self.categories.is_empty() {
            options.categories = self.categories.clone();
        }
        if !self.regions.is_empty() {
            options.regions = self.regions.clone();
        }
        options.include_patterns.extend(self.include.iter().cloned());
        options.exclude_patterns.extend(self.exclude.iter().cloned());
        options.ignore_errors |= self.ignore_errors;
        options.include_sensitive_data |= self.include_sensitive;
        if self.no_follow {
            options.follow_nested_templates = false;
        }
        if let Some(depth) = self.max_depth {
            options.max_recursion_depth = depth;
        }
        Ok(options)
    }
}

fn parse_resource_type(value: &str) -> std::result::Result<ResourceType, String> {
    ResourceType::from_canonical(value.trim()).ok_or_else(|| {
        let known: Vec<&str> = ResourceType::all().map(|t| t.as_str()).collect();
        format!("unknown resource type '{value}' (known: {})", known.join(", "))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Detect { path } => {
            detect_command(&path, &DiscoveryOptions::default())?;
        },
        Commands::Validate {
            path,
            format,
            provider,
        } => {
            validate_command(&path, format, provider)?;
        },
        Commands::Parse {
            path,
            format,
            provider,
            discovery,
            json,
        } => {
            let options = discovery.to_options()?;
            parse_command(&path, format, provider, &options, json, cli.verbose)?;
        },
        Commands::Scan {
            subscription,
            discovery,
            json,
        } => {
            let options = discovery.to_options()?;
            scan_command(subscription.as_deref(), &options, json, cli.verbose)?;
        },
    }

    Ok(())
}

/// Every extractor the CLI knows about, in registration order
fn build_registry(options: &DiscoveryOptions) -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    for parser in file_parsers() {
        registry.register(parser);
    }
    match AzureLiveScanner::from_options(options) {
        Ok(scanner) => registry.register(Box::new(scanner)),
        Err(e) => warn!("Live scanner unavailable: {}", e),
    }
    debug!("Registered {} extractors", registry.len());
    registry
}

/// Human status lines go to stdout, unless stdout carries a JSON report
fn status_stream(json: bool) -> Box<dyn Write> {
    if json {
        Box::new(io::sink())
    } else {
        Box::new(io::stdout())
    }
}

fn select_parser<'r>(
    registry: &'r ParserRegistry,
    path: &Path,
    format: Option<SourceFormat>,
    provider: Provider,
    status: &mut dyn Write,
) -> Result<&'r dyn InfrastructureParser> {
    if let Some(format) = format {
        return registry
            .find(provider, format)
            .ok_or_else(|| anyhow!("No {provider} extractor for format {format}"));
    }

    let best = registry
        .best_match(path)
        .ok_or_else(|| anyhow!("No extractor recognizes {}", path.display()))?;
    info!(parser = %best.parser.name(), confidence = best.confidence, "Auto-detected format");
    writeln!(
        status,
        "{} Auto-detected format: {} ({} confidence)",
        "→".cyan(),
        best.parser.name().yellow(),
        confidence::level(best.confidence)
    )?;
    Ok(best.parser)
}

fn detect_command(path: &Path, options: &DiscoveryOptions) -> Result<()> {
    println!("{} Detecting formats for: {}", "→".cyan(), path.display());

    let registry = build_registry(options);
    let candidates = registry.detect(path);
    if candidates.is_empty() {
        bail!("No extractor recognizes {}", path.display());
    }

    println!("\n{}", "Candidates:".bold());
    for (rank, candidate) in candidates.iter().enumerate() {
        let label = format!("{:.2} {}", candidate.confidence, confidence::level(candidate.confidence));
        let label = if rank == 0 { label.green() } else { label.normal() };
        println!("  {}. {} {}", rank + 1, candidate.parser.name().cyan(), label);
    }

    Ok(())
}

fn validate_command(path: &Path, format: Option<SourceFormat>, provider: Provider) -> Result<()> {
    println!("{} Validating: {}", "→".cyan(), path.display());

    let registry = build_registry(&DiscoveryOptions::default());
    let parser = select_parser(&registry, path, format, provider, &mut io::stdout())?;
    parser
        .validate(path)
        .with_context(|| format!("{} rejected {}", parser.name(), path.display()))?;

    println!("{}", format!("✓ Valid {} input", parser.name()).green().bold());
    Ok(())
}

fn parse_command(
    path: &Path,
    format: Option<SourceFormat>,
    provider: Provider,
    options: &DiscoveryOptions,
    json: bool,
    verbose: bool,
) -> Result<()> {
    if !json {
        println!("{} Parsing: {}", "→".cyan(), path.display());
    }

    let registry = build_registry(options);
    let parser = select_parser(&registry, path, format, provider, &mut status_stream(json))?;
    let report = parser
        .parse(&DiscoveryContext::new(), path, options)
        .with_context(|| format!("Failed to parse {} with {}", path.display(), parser.name()))?;

    print_report(&report, json, verbose)
}

fn scan_command(
    subscription: Option<&str>,
    options: &DiscoveryOptions,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let target = PathBuf::from(format!("{LIVE_SCHEME}{}", subscription.unwrap_or_default()));
    if !json {
        println!("{} Scanning: {}", "→".cyan(), target.display());
    }

    let scanner =
        AzureLiveScanner::from_options(options).context("Failed to set up the live scanner")?;
    let report = scanner
        .parse(&DiscoveryContext::new(), &target, options)
        .context("Live scan failed")?;

    print_report(&report, json, verbose)
}

fn print_report(report: &DiscoveryReport, json: bool, verbose: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{rendered}");
        return Ok(());
    }

    let infra = &report.infrastructure;
    println!(
        "\n{} Discovered {} {} resources",
        "✓".green(),
        infra.len().to_string().bold(),
        infra.provider
    );

    if !infra.is_empty() {
        println!("\n{}", "By category:".bold());
        for (category, count) in infra.category_counts() {
            println!("  {:<12} {}", category.to_string(), count);
        }
    }

    if verbose {
        println!("\n{}", "Resources:".bold());
        for resource in infra.resources() {
            let region = if resource.region.is_empty() {
                String::new()
            } else {
                format!(" @ {}", resource.region)
            };
            println!(
                "  • {} ({}){}",
                resource.id.cyan(),
                resource.resource_type,
                region
            );
            for dependency in &resource.dependencies {
                println!("      ↳ {}", dependency);
            }
        }
    }

    let dangling = infra.dangling_dependencies();
    if !dangling.is_empty() {
        println!(
            "\n{} {} dependencies point outside the discovered set",
            "!".yellow(),
            dangling.len()
        );
    }

    if !report.is_clean() {
        println!("\n{}", format!("Warnings ({}):", report.warnings.len()).yellow().bold());
        for warning in &report.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    Ok(())
}

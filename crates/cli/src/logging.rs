//! Tracing subscriber setup for the CLI

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const CRATES: [&str; 4] = [
    "infra_discovery",
    "infra_discovery_common",
    "infra_discovery_parser",
    "infra_discovery_scanner",
];

/// Default filter directives when `RUST_LOG` is unset
fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.extend(
        ["h2", "hyper", "reqwest", "rustls"]
            .iter()
            .map(|noisy| format!("{noisy}=warn")),
    );
    directives.join(",")
}

/// Install the global subscriber once; logs go to stderr so `--json`
/// output on stdout stays machine-readable
pub fn init(verbose: bool, json: bool) {
    INIT.call_once(|| {
        let level = if verbose { Level::DEBUG } else { Level::WARN };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

        if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(verbose).with_writer(std::io::stderr))
                .init();
        }
    });
}

//! Tracing subscriber setup

use crate::cli::LogLevel;
use propgraph_config::LoggingConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Crates whose events follow the chosen level; dependencies stay at `warn`
const PROPGRAPH_TARGETS: [&str; 8] = [
    "propgraph",
    "propgraph_cli",
    "propgraph_pipeline",
    "propgraph_config",
    "propgraph_core",
    "propgraph_catalog",
    "propgraph_surrealdb",
    "propgraph_neo4j",
];

/// Filter directives in priority order: explicit flag, `RUST_LOG`, config
pub fn filter_directives(
    log_level: Option<LogLevel>,
    verbose: bool,
    rust_log: Option<String>,
    config: &LoggingConfig,
) -> String {
    let level = match (log_level, verbose) {
        (Some(level), _) => Some(LevelFilter::from(level)),
        (None, true) => Some(LevelFilter::DEBUG),
        (None, false) => None,
    };

    if level.is_none() {
        if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
            return directives;
        }
    }

    let level = level
        .map(|l| l.to_string().to_ascii_lowercase())
        .unwrap_or_else(|| config.level.to_ascii_lowercase());

    let mut directives = vec!["warn".to_string()];
    directives.extend(
        PROPGRAPH_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level)),
    );
    directives.join(",")
}

/// Install the global fmt subscriber
pub fn init(log_level: Option<LogLevel>, verbose: bool, config: &LoggingConfig) {
    let directives = filter_directives(
        log_level,
        verbose,
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        config,
    );
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .with_writer(std::io::stderr)
        .try_init();
}

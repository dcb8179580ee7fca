use anyhow::{Context, Result};
use colored::Colorize;
use propgraph_config::PropgraphConfig;
use propgraph_pipeline::{RetryPolicy, RunSession, RunSettings, RunState, RunSummary};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::factories;

/// Run an ingest and return the process exit code
pub async fn execute(config: PropgraphConfig, format: OutputFormat) -> Result<i32> {
    config.validate().context("Invalid configuration")?;

    let catalog = factories::catalog(&config.source)?;
    let backends = factories::backends(&config).await?;
    info!(
        "Writing to {}; checkpoints in {}",
        backends.graph.name(),
        backends.checkpoints.describe()
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current page");
            signal_token.cancel();
        }
    });

    let session = RunSession::new(
        RunSettings::from_config(&config.ingest),
        catalog,
        backends.graph,
        backends.checkpoints,
        RetryPolicy::from_config(&config.retry),
        cancel,
    );
    let summary = session.run().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary),
    }

    Ok(summary.exit_code())
}

fn print_summary(summary: &RunSummary) {
    let state = match summary.state {
        RunState::Completed => "Completed".green().bold(),
        RunState::Interrupted => "Interrupted".yellow().bold(),
        _ => "Aborted".red().bold(),
    };

    println!("{} ingest of namespace '{}'", state, summary.namespace);
    println!("  Pages:      {}", summary.pages);
    println!("  Written:    {}", summary.written);
    println!("  Processed:  {} (cumulative)", summary.processed);
    println!("  Skipped:    {}", summary.skipped_total());
    for (reason, count) in &summary.skipped {
        println!("    {:<18} {}", reason, count);
    }
    if summary.malformed > 0 {
        println!("  Malformed addresses: {}", summary.malformed);
    }
    if summary.retries > 0 {
        println!(
            "  Retries:    {} ({} reconnects)",
            summary.retries, summary.reconnects
        );
    }
    if summary.fallback_used {
        println!(
            "  {}",
            "Cursor was rejected; resumed by re-listing (some records may repeat)".yellow()
        );
    }
    if summary.checkpoint_failures > 0 {
        println!(
            "  {} {} checkpoint save(s) failed; a resume may redo those pages",
            "Warning:".yellow().bold(),
            summary.checkpoint_failures
        );
    }
    if let Some(error) = &summary.error {
        println!("  {} {}", "Error:".red().bold(), error);
    }
    println!("  Duration:   {}ms", summary.duration_ms);
}

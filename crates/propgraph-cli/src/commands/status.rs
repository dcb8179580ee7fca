use anyhow::{Context, Result};
use colored::Colorize;
use propgraph_config::PropgraphConfig;

use crate::cli::OutputFormat;
use crate::factories;

/// Print the stored checkpoint for the configured namespace
pub async fn execute(config: PropgraphConfig, format: OutputFormat) -> Result<()> {
    let namespace = &config.ingest.namespace;
    let store = factories::checkpoint_store(&config, None).await?;
    let checkpoint = store
        .load(namespace)
        .await
        .with_context(|| format!("Failed to read checkpoint from {}", store.describe()))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        return Ok(());
    }

    let Some(checkpoint) = checkpoint else {
        println!(
            "No checkpoint for namespace '{}' in {}",
            namespace,
            store.describe()
        );
        return Ok(());
    };

    let progress = if checkpoint.is_complete() {
        "complete".green().bold()
    } else {
        "in progress".yellow().bold()
    };
    println!("Namespace '{}': {}", checkpoint.namespace, progress);
    println!("  Processed:  {}", checkpoint.processed);
    println!("  Page size:  {}", checkpoint.page_size);
    println!(
        "  Next token: {}",
        checkpoint.next_token.as_deref().unwrap_or("(none)")
    );
    println!("  Saved at:   {}", checkpoint.timestamp.to_rfc3339());
    println!("  Store:      {}", store.describe());
    Ok(())
}

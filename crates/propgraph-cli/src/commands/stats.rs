use anyhow::{Context, Result};
use propgraph_config::PropgraphConfig;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::factories;

/// Print node and relationship counts from the configured graph
pub async fn execute(config: PropgraphConfig, format: OutputFormat) -> Result<()> {
    let backends = factories::backends(&config).await?;
    let session = backends
        .graph
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", backends.graph.name()))?;

    let counts = session.counts().await;
    if let Err(e) = session.close().await {
        warn!("Failed to close graph session: {}", e);
    }
    let counts = counts.context("Failed to count graph contents")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&counts)?),
        OutputFormat::Text => {
            println!("Graph statistics ({})\n", backends.graph.name());
            println!("  Property nodes:         {}", counts.properties);
            println!("  Zip nodes:              {}", counts.zips);
            println!("  Neighborhood nodes:     {}", counts.neighborhoods);
            println!("  IN_ZIP edges:           {}", counts.in_zip);
            println!("  IN_NEIGHBORHOOD edges:  {}", counts.in_neighborhood);
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use propgraph_config::{ConfigOverrides, LoggingConfig, PropgraphConfig};
use tracing::debug;

use propgraph_cli::{
    cli::{Cli, Commands, ConfigCommands},
    commands, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config init` must work even when the existing config is broken
    if let Commands::Config(ConfigCommands::Init { path, force }) = cli.command {
        logging::init(cli.log_level, cli.verbose, &LoggingConfig::default());
        return commands::config::init(path, force);
    }

    let overrides = match &cli.command {
        Commands::Ingest(args) => args.overrides(),
        Commands::Status { namespace } => ConfigOverrides {
            namespace: namespace.clone(),
            ..Default::default()
        },
        Commands::Stats { backend } => ConfigOverrides {
            graph_backend: backend.map(Into::into),
            ..Default::default()
        },
        Commands::Config(_) => ConfigOverrides::default(),
    };

    let config = PropgraphConfig::load(cli.config.clone(), overrides)
        .context("Failed to load configuration")?;
    logging::init(cli.log_level, cli.verbose, &config.logging);
    debug!("Effective namespace: {}", config.ingest.namespace);

    match cli.command {
        Commands::Ingest(_) => {
            let code = commands::ingest::execute(config, cli.format).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Status { .. } => commands::status::execute(config, cli.format).await?,
        Commands::Stats { .. } => commands::stats::execute(config, cli.format).await?,
        Commands::Config(ConfigCommands::Show) => commands::config::show(&config)?,
        Commands::Config(ConfigCommands::Init { .. }) => {}
    }

    Ok(())
}

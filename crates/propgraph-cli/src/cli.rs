use clap::{Args, Parser, Subcommand, ValueEnum};
use propgraph_config::{ConfigOverrides, GraphBackend, RecordLimit, ResetMode};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Progress per page (default)
    Info,
    /// Per-record detail
    Debug,
    /// Everything, including backend drivers
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Graph backend choices on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Surrealdb,
    Neo4j,
}

impl From<BackendArg> for GraphBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Surrealdb => GraphBackend::Surrealdb,
            BackendArg::Neo4j => GraphBackend::Neo4j,
        }
    }
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "propgraph")]
#[command(about = "propgraph - resumable ingestion of property listings into a graph")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses RUST_LOG, then the config file value
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/propgraph/config.toml)
    #[arg(short = 'C', long, global = true, env = "PROPGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for summaries and reports
    #[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy catalog records into the graph, resuming from the last checkpoint
    Ingest(IngestArgs),

    /// Show the stored checkpoint for a namespace
    Status {
        /// Namespace to inspect (defaults to the configured one)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Show node and relationship counts in the graph
    Stats {
        /// Graph backend to query
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Debug, Clone, Default, Args)]
pub struct IngestArgs {
    /// Catalog namespace to ingest
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Ids requested per page (1-1000)
    #[arg(short, long)]
    pub page_size: Option<usize>,

    /// Stop after this many records have been written ("unbounded" for no limit)
    #[arg(long)]
    pub limit: Option<RecordLimit>,

    /// Resume from the stored checkpoint (default)
    #[arg(long, overrides_with = "no_resume")]
    pub resume: bool,

    /// Ignore any stored checkpoint and start from the beginning
    #[arg(long)]
    pub no_resume: bool,

    /// Destructive reset before paging (none, scoped, all)
    #[arg(long)]
    pub reset: Option<ResetMode>,

    /// Start listing at this cursor; takes precedence over the checkpoint
    #[arg(long)]
    pub start_cursor: Option<String>,

    /// Maximum attempts per graph write
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Base backoff delay in milliseconds
    #[arg(long)]
    pub base_delay_ms: Option<u64>,

    /// Maximum backoff delay in milliseconds
    #[arg(long)]
    pub max_delay_ms: Option<u64>,

    /// Graph backend to write to
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Checkpoint file path
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

impl IngestArgs {
    /// Command-line values as config overrides
    pub fn overrides(&self) -> ConfigOverrides {
        let resume = if self.no_resume {
            Some(false)
        } else if self.resume {
            Some(true)
        } else {
            None
        };

        ConfigOverrides {
            namespace: self.namespace.clone(),
            page_size: self.page_size,
            limit: self.limit,
            resume,
            reset: self.reset,
            start_cursor: self.start_cursor.clone(),
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            graph_backend: self.backend.map(GraphBackend::from),
            checkpoint_path: self.checkpoint.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write an example config file
    Init {
        /// Where to write it (defaults to ~/.config/propgraph/config.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_flags_become_overrides() {
        let cli = Cli::parse_from([
            "propgraph",
            "ingest",
            "--namespace",
            "homes",
            "--page-size",
            "50",
            "--limit",
            "unbounded",
            "--reset",
            "scoped",
            "--no-resume",
            "--backend",
            "neo4j",
        ]);

        let Commands::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.namespace.as_deref(), Some("homes"));
        assert_eq!(overrides.page_size, Some(50));
        assert_eq!(overrides.limit, Some(RecordLimit::Unbounded));
        assert_eq!(overrides.reset, Some(ResetMode::Scoped));
        assert_eq!(overrides.resume, Some(false));
        assert_eq!(overrides.graph_backend, Some(GraphBackend::Neo4j));
    }

    #[test]
    fn test_unset_flags_leave_config_alone() {
        let cli = Cli::parse_from(["propgraph", "ingest", "--limit", "25"]);
        let Commands::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.limit, Some(RecordLimit::Max(25)));
        assert_eq!(overrides.resume, None);
        assert_eq!(overrides.reset, None);
        assert!(overrides.namespace.is_none());
    }

    #[test]
    fn test_bad_reset_mode_is_rejected() {
        let result = Cli::try_parse_from(["propgraph", "ingest", "--reset", "everything"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["propgraph", "status", "-v", "--format", "json"]);
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }
}

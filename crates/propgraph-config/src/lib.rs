//! # propgraph Configuration Library
//!
//! Type-safe configuration for ingestion runs: what to read from the source
//! catalog, where to write the graph, how to checkpoint and how hard to retry.
//!
//! ## Precedence
//!
//! Values are resolved in four tiers, each overriding the previous one:
//!
//! 1. Hardcoded defaults (`PropgraphConfig::default()`)
//! 2. TOML file (`--config` or `~/.config/propgraph/config.toml`)
//! 3. Environment variables (`PROPGRAPH_*`, `PINECONE_*`, `NEO4J_*`)
//! 4. Command-line overrides ([`ConfigOverrides`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use propgraph_config::{ConfigOverrides, PropgraphConfig};
//!
//! let config = PropgraphConfig::load(None, ConfigOverrides::default())?;
//! config.validate()?;
//! println!("namespace = {}", config.ingest.namespace);
//! # Ok::<(), propgraph_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod error;
mod loader;

pub use components::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigOverrides, PropgraphConfig};

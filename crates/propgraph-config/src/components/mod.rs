//! Configuration components
//!
//! One module per concern of an ingestion run.

pub mod checkpoint;
pub mod graph;
pub mod ingest;
pub mod logging;
pub mod retry;
pub mod source;

pub use checkpoint::*;
pub use graph::*;
pub use ingest::*;
pub use logging::*;
pub use retry::*;
pub use source::*;

pub mod config;
pub mod ingest;
pub mod stats;
pub mod status;

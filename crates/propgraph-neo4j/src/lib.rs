//! Neo4j backend for propgraph
//!
//! Writes `(:Property)-[:IN_ZIP]->(:Zip)` and
//! `(:Property)-[:IN_NEIGHBORHOOD]->(:Neighborhood)` over Bolt, one explicit
//! transaction per record.

mod connector;
mod cypher;
mod error;

pub use connector::{Neo4jGraphConnector, Neo4jGraphSession};
pub use error::classify_message;

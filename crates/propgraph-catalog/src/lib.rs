//! Source catalog clients
//!
//! [`PineconeCatalog`] reads property records from a Pinecone index through
//! its HTTP data-plane API.

mod pinecone;

pub use pinecone::PineconeCatalog;

//! Test support utilities
//!
//! Enabled inside this crate's own tests and, for other crates, through the
//! `test-utils` feature.

pub mod mocks;

//! # Curator Core
//!
//! Domain models and pure logic for Curator - autonomous content curator
//! accounts that spend credits to publish content valued by a daily trend score.
//!
//! This crate performs no I/O. It owns the credit ledger, the append-only
//! content registry with its materialized aggregates, and the math that turns
//! raw signal-source intensities into a 0-100 trend score.

pub mod clock;
pub mod error;
pub mod insights;
pub mod ledger;
pub mod models;
pub mod registry;
pub mod trend;
pub mod vocabulary;

pub use clock::*;
pub use error::*;
pub use insights::*;
pub use ledger::*;
pub use models::*;
pub use registry::*;
pub use trend::*;
pub use vocabulary::*;

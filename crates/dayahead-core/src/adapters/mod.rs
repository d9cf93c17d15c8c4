//! Upstream price source adapters.

mod entsoe;

pub use entsoe::EntsoeSource;

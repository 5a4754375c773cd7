//! Source readers and snapshot storage for zipplan.
//!
//! Everything that touches the filesystem lives here: the landscape CSV,
//! detail documents, raw postal-code mappings, codec table files, and the
//! manifest-driven snapshot the lookup service loads.

pub mod config;
pub mod details;
pub mod error;
pub mod landscape;
pub mod models;
pub mod snapshot;
pub mod tables;
pub mod zip_mapping;

pub use error::{Result, StoreError};

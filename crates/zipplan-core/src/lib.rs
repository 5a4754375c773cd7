//! Plan resolution for postal codes.
//!
//! Data flows one way: [`catalog`] turns landscape rows into canonical plan
//! records, [`aggregate`] groups them per county, [`resolve`] maps postal
//! codes onto county plan sets, and [`codec`] and [`lookup`] consume the
//! result. [`build`] ties the first three together into a snapshot.

pub mod aggregate;
pub mod analysis;
pub mod build;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod lookup;
pub mod resolve;

pub use error::LookupError;

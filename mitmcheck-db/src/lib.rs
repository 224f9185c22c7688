//! The record database of the mitmcheck interception detector: collections
//! of `(UA signature, request signature, MITM info)` triples loaded from a
//! line-oriented corpus format, queryable by UA or request fingerprint.

mod database;
mod error;
mod loader;
mod record;

pub use database::Database;
pub use error::DbError;
pub use loader::{FileLoader, Loader};
pub use record::Record;

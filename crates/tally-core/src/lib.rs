//! tally-core - Core library for Tally
//!
//! This crate contains the shared models, database layer, and the offline
//! batch sync engine used by the Tally backend.

pub mod db;
pub mod error;
pub mod models;
pub mod sync;

pub use db::Database;
pub use error::{Error, Result};
pub use sync::{SyncBatch, SyncEngine, SyncReceipt, SyncStatus, SyncTunables};

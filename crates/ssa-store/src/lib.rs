//! Sample store for the analysis engine.
//!
//! Holds raw and derived samples, their lineage, sample groups and the
//! append-only audit trail. A store is safe to share between threads:
//! reads never block on unrelated writes, and mutations of one lineage are
//! serialized.

#![deny(unsafe_code)]

mod audit;
mod error;
pub mod io;
mod locks;
mod memory;
mod snapshot;
mod store;

pub use audit::AuditTrail;
pub use error::{PersistenceError, Result};
pub use io::{load_snapshot, load_store, save_snapshot, save_store};
pub use memory::{InMemoryStore, Retirement};
pub use snapshot::{StoreSnapshot, StoredSample};
pub use store::SampleStore;

//! Lazy, dirty-tracked artifact stores for Strata.
//!
//! A store is a mutable mapping from [`AnyKey`](strata_types::AnyKey) to
//! content of any type, reconciled with its backing medium only when asked. Opening a store lists
//! what the medium holds without reading it; content is decoded on first
//! access and cached. Writes stay in memory until [`Store::synchronise`].
//!
//! # Storage Backends
//!
//! All backends implement the [`Store`] trait:
//!
//! - [`InMemoryStore`] -- no medium, for tests and staging
//! - [`DirectoryStore`] -- one file per key under a root directory
//!
//! The zip-backed store lives in `strata-archive`.
//!
//! # Design Rules
//!
//! 1. At most one entry per key.
//! 2. `put` and `remove` never touch the medium.
//! 3. The in-memory index is authoritative: `synchronise` deletes
//!    recognized medium items the index no longer holds, then flushes
//!    dirty entries.
//! 4. A value is rewritten only when its `Arc` changes identity.
//! 5. A failed `synchronise` leaves completed work in place and unflushed
//!    entries dirty.
//! 6. No locking: a store belongs to one thread of control at a time.

pub mod config;
pub mod directory;
pub mod entry;
pub mod error;
pub mod mapping;
pub mod memory;
pub mod traits;

pub use config::StoreConfig;
pub use directory::DirectoryStore;
pub use entry::{Entry, EntrySet, EntryState};
pub use error::{StoreError, StoreResult};
pub use mapping::{KeyMapping, SuffixMapping};
pub use memory::InMemoryStore;
pub use traits::{Store, SyncReport};

//! Zip archives of Strata artifacts.
//!
//! Two views of the same format:
//!
//! - [`Archive`] -- a whole-container value. Reading pulls in every entry's
//!   bytes once and decodes values lazily; writing emits a fresh zip in entry
//!   order. [`ArchiveCodec`] makes an archive usable as an artifact itself
//!   ([`ArchiveFile`]), e.g. a packaged library kept in a directory store.
//! - [`ArchiveStore`] -- a [`Store`](strata_store::Store) over a zip file on
//!   disk, synchronised by rewriting the file through a temporary sibling
//!   and an atomic rename.
//!
//! Entry names are produced by a [`KeyMapping`](strata_store::KeyMapping);
//! names outside its namespace are skipped when reading.

pub mod archive;
pub mod codec;
pub mod error;
pub mod store;

pub use archive::{Archive, ArchiveEntry};
pub use codec::{ArchiveCodec, ArchiveFile};
pub use error::{ArchiveError, ArchiveResult};
pub use store::ArchiveStore;

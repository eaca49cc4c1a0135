//! Versioned artifact repository for Strata.
//!
//! A [`Repository`] is an append-only history of immutable [`SnapShot`]s.
//! It evolves only by applying [`Transaction`]s: ordered sequences of
//! [`Task`]s, each turning one snapshot into the next.
//!
//! # Key Types
//!
//! - [`Artifact`] -- A keyed value plus the keys it was derived from
//! - [`SnapShot`] -- Persistent, copy-on-write artifact collection
//! - [`Task`] / [`FnTask`] -- One step of a build
//! - [`Transaction`] -- Tasks applied in order against the latest snapshot
//! - [`Repository`] -- The snapshot history, loadable from and persistable to
//!   any [`Store`](strata_store::Store)
//!
//! # Failure Semantics
//!
//! There is no rollback. A transaction whose task reports failure still
//! records that task's snapshot. A task that errors or panics records the
//! snapshot it started from before the error is returned or the panic
//! resumes.

pub mod artifact;
pub mod error;
pub mod repository;
pub mod snapshot;
pub mod transaction;

pub use artifact::Artifact;
pub use error::{RepoError, RepoResult};
pub use repository::Repository;
pub use snapshot::SnapShot;
pub use transaction::{FnTask, Task, TaskFault, TaskOutcome, Transaction};

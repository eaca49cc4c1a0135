use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use strata_store::{Store, SyncReport};
use strata_types::{AnyContent, AnyKey, AnyValue, Content, Filter, Key};
use tracing::{debug, info, warn};

use crate::artifact::Artifact;
use crate::error::{RepoError, RepoResult};
use crate::snapshot::SnapShot;
use crate::transaction::Transaction;

/// An append-only history of snapshots.
///
/// `states[i]` never changes once appended and the history only grows.
/// There is no rollback: every `apply` that starts at least one task
/// records exactly one new snapshot, whether the transaction succeeds,
/// reports a failure, or faults.
///
/// A repository is not synchronised internally. Callers serialise `apply`.
pub struct Repository {
    // Never empty.
    states: Vec<SnapShot>,
}

impl Repository {
    /// A repository whose first snapshot holds `artifacts`.
    pub fn new(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        Self::from_snapshot(SnapShot::from_artifacts(artifacts))
    }

    pub fn from_snapshot(initial: SnapShot) -> Self {
        Self {
            states: vec![initial],
        }
    }

    /// A repository whose first snapshot holds every entry of `store` as a
    /// source artifact. Decodes every entry.
    pub fn from_store<S: Store + ?Sized>(store: &mut S) -> RepoResult<Self> {
        let mut artifacts = Vec::with_capacity(store.len());
        for key in store.keys() {
            if let Some(value) = store.get_any(&key)? {
                artifacts.push(Artifact::from_any(key.path().clone(), value));
            }
        }
        info!(artifacts = artifacts.len(), "repository loaded from store");
        Ok(Self::new(artifacts))
    }

    /// Run `transaction` against the latest snapshot.
    ///
    /// Returns `Ok(true)` if every task succeeded and `Ok(false)` as soon as
    /// one reports failure; remaining tasks are skipped. Either way the
    /// snapshot the last task produced is appended. An empty transaction
    /// appends a copy of the latest snapshot.
    ///
    /// If a task returns an error, the snapshot it was given is appended and
    /// the error is returned as [`RepoError::TaskFault`]. A panicking task
    /// is handled the same way, except that the panic resumes once the
    /// snapshot is recorded.
    pub fn apply(&mut self, transaction: &Transaction) -> RepoResult<bool> {
        let mut current = self.last().clone();
        for (index, task) in transaction.iter().enumerate() {
            debug!(task = %task.key(), index, "running task");
            let result = panic::catch_unwind(AssertUnwindSafe(|| task.apply(&current)));
            match result {
                Ok(Ok(outcome)) if outcome.success => current = outcome.snapshot,
                Ok(Ok(outcome)) => {
                    warn!(task = %task.key(), index, "task failed");
                    self.append(outcome.snapshot);
                    return Ok(false);
                }
                Ok(Err(source)) => {
                    warn!(task = %task.key(), index, error = %source, "task faulted");
                    self.append(current);
                    return Err(RepoError::TaskFault {
                        task: task.key().to_string(),
                        source,
                    });
                }
                Err(payload) => {
                    warn!(task = %task.key(), index, "task panicked");
                    self.append(current);
                    panic::resume_unwind(payload);
                }
            }
        }
        self.append(current);
        Ok(true)
    }

    /// The snapshot at position `index` in the history.
    pub fn get(&self, index: usize) -> RepoResult<&SnapShot> {
        self.states.get(index).ok_or(RepoError::OutOfRange {
            index,
            len: self.states.len(),
        })
    }

    pub fn last(&self) -> &SnapShot {
        &self.states[self.states.len() - 1]
    }

    /// Number of snapshots in the history. Always at least one.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn history(&self) -> &[SnapShot] {
        &self.states
    }

    // ---- read-through queries on the latest snapshot ----

    pub fn lookup<T: Content>(&self, key: &Key<T>) -> Option<Arc<T>> {
        self.last().get(key)
    }

    pub fn lookup_any(&self, key: &AnyKey) -> Option<&AnyValue> {
        self.last().get_any(key)
    }

    pub fn get_all(&self, filter: &dyn Filter) -> Vec<AnyValue> {
        self.last().get_all(filter)
    }

    pub fn matching(&self, filter: &dyn Filter) -> Vec<AnyKey> {
        self.last().matching(filter)
    }

    pub fn matching_where(
        &self,
        filter: &dyn Filter,
        predicate: &dyn Fn(&dyn AnyContent) -> bool,
    ) -> Vec<AnyKey> {
        self.last().matching_where(filter, predicate)
    }

    /// Make `store` hold exactly the artifacts of snapshot `index`, then
    /// synchronise it.
    ///
    /// Values already in the store under the same `Arc` are not rewritten.
    pub fn persist<S: Store + ?Sized>(&self, index: usize, store: &mut S) -> RepoResult<SyncReport> {
        let snapshot = self.get(index)?;
        for artifact in snapshot.iter() {
            store.put_any(artifact.key().clone(), Arc::clone(artifact.value()))?;
        }
        for key in store.keys() {
            if !snapshot.contains(&key) {
                store.remove(&key);
            }
        }
        let report = store.synchronise()?;
        info!(
            index,
            deleted = report.deleted,
            written = report.written,
            "snapshot persisted"
        );
        Ok(report)
    }

    fn append(&mut self, snapshot: SnapShot) {
        info!(
            index = self.states.len(),
            artifacts = snapshot.len(),
            "snapshot appended"
        );
        self.states.push(snapshot);
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("len", &self.states.len())
            .field("last", self.last())
            .finish()
    }
}

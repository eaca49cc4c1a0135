use std::sync::Arc;

use strata_types::{downcast, AnyContent, AnyKey, AnyValue, Content, Filter, Key};

use crate::error::StoreResult;

/// Medium operations performed by one [`Store::synchronise`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Medium-resident items removed because the index no longer has them.
    pub deleted: usize,
    /// Dirty entries written to the medium.
    pub written: usize,
}

impl SyncReport {
    /// Returns `true` if the medium was not touched.
    pub fn is_noop(&self) -> bool {
        self.deleted == 0 && self.written == 0
    }
}

/// A mutable, synchronisable mapping from [`AnyKey`] to content.
///
/// One store holds values of any content type; the typed [`get`](Self::get)
/// and [`put`](Self::put) wrap the erased operations for callers that know
/// what they are asking for.
///
/// All implementations share these rules:
/// - At most one entry per key.
/// - Queries see live, possibly unflushed entries. Content is decoded on
///   first access and cached.
/// - `put` and `remove` never touch the medium. Only `synchronise` does.
/// - The in-memory index is authoritative for existence: `synchronise`
///   deletes recognized medium items the index no longer holds.
/// - Concurrent modification of the medium by another process during
///   `synchronise` is not detected.
pub trait Store {
    /// Read the content for `key`, decoding it on first access.
    ///
    /// Returns `Ok(None)` if the store has no entry for `key`.
    fn get_any(&mut self, key: &AnyKey) -> StoreResult<Option<AnyValue>>;

    /// All content whose key satisfies `filter`, in index order.
    fn get_all(&mut self, filter: &dyn Filter) -> StoreResult<Vec<AnyValue>>;

    /// Keys satisfying `filter`. Does not decode content.
    fn matching(&self, filter: &dyn Filter) -> Vec<AnyKey>;

    /// Keys satisfying `filter` whose content also satisfies `predicate`.
    fn matching_where(
        &mut self,
        filter: &dyn Filter,
        predicate: &dyn Fn(&dyn AnyContent) -> bool,
    ) -> StoreResult<Vec<AnyKey>>;

    /// Insert or overwrite the content for `key`, marking it dirty.
    ///
    /// Fails without mutating anything if the value's content type is not
    /// the key's.
    fn put_any(&mut self, key: AnyKey, value: AnyValue) -> StoreResult<()>;

    /// Drop `key` from the index. Returns `true` if it was present.
    fn remove(&mut self, key: &AnyKey) -> bool;

    /// Every key in the index, in index order.
    fn keys(&self) -> Vec<AnyKey>;

    fn contains(&self, key: &AnyKey) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reconcile the medium with the index: delete orphans, then flush
    /// dirty entries.
    ///
    /// A failure part way through leaves the medium partially synchronised:
    /// work already done is kept and unflushed entries stay dirty.
    fn synchronise(&mut self) -> StoreResult<SyncReport>;

    /// Typed [`get_any`](Self::get_any).
    fn get<T: Content>(&mut self, key: &Key<T>) -> StoreResult<Option<Arc<T>>>
    where
        Self: Sized,
    {
        Ok(self.get_any(&key.erase())?.and_then(downcast))
    }

    /// Typed [`put_any`](Self::put_any).
    fn put<T: Content>(&mut self, key: Key<T>, value: Arc<T>) -> StoreResult<()>
    where
        Self: Sized,
    {
        self.put_any(key.into(), value)
    }
}

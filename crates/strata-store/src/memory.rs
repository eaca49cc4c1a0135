use std::fmt;

use strata_types::{AnyContent, AnyKey, AnyValue, Filter};

use crate::entry::EntrySet;
use crate::error::{StoreError, StoreResult};
use crate::traits::{Store, SyncReport};

/// Store with no backing medium.
///
/// Intended for tests and for staging artifacts that are never persisted.
/// Every entry is loaded from the moment it is `put`; `synchronise` just
/// marks dirty entries clean.
#[derive(Default)]
pub struct InMemoryStore {
    entries: EntrySet,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries changed since the last `synchronise`.
    pub fn dirty_count(&self) -> usize {
        self.entries.dirty_count()
    }
}

/// Entries are never placeholders, so a read is never needed.
fn unreachable_read(key: &AnyKey) -> StoreResult<AnyValue> {
    Err(StoreError::Medium(format!(
        "in-memory entry {key} has no value"
    )))
}

impl Store for InMemoryStore {
    fn get_any(&mut self, key: &AnyKey) -> StoreResult<Option<AnyValue>> {
        self.entries.get_with(key, unreachable_read)
    }

    fn get_all(&mut self, filter: &dyn Filter) -> StoreResult<Vec<AnyValue>> {
        self.entries.get_all_with(filter, unreachable_read)
    }

    fn matching(&self, filter: &dyn Filter) -> Vec<AnyKey> {
        self.entries.matching(filter)
    }

    fn matching_where(
        &mut self,
        filter: &dyn Filter,
        predicate: &dyn Fn(&dyn AnyContent) -> bool,
    ) -> StoreResult<Vec<AnyKey>> {
        self.entries
            .matching_where_with(filter, predicate, unreachable_read)
    }

    fn put_any(&mut self, key: AnyKey, value: AnyValue) -> StoreResult<()> {
        self.entries.put(key, value)
    }

    fn remove(&mut self, key: &AnyKey) -> bool {
        self.entries.remove(key)
    }

    fn keys(&self) -> Vec<AnyKey> {
        self.entries.keys()
    }

    fn contains(&self, key: &AnyKey) -> bool {
        self.entries.contains(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn synchronise(&mut self) -> StoreResult<SyncReport> {
        let mut report = SyncReport::default();
        for entry in self.entries.iter_mut() {
            if entry.flush_with(|_, _| Ok(()))? {
                report.written += 1;
            }
        }
        Ok(report)
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entry_count", &self.entries.len())
            .field("dirty_count", &self.entries.dirty_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_types::{
        ArtifactPath, BinaryCodec, BinaryFile, ContentFilter, ContentType, Key, TextCodec, TextFile,
    };

    fn key(ct: &ContentType<TextFile>, p: &str) -> Key<TextFile> {
        Key::new(ct, ArtifactPath::parse(p).unwrap())
    }

    fn text(ct: &ContentType<TextFile>, s: &str) -> Arc<TextFile> {
        Arc::new(TextFile::new(ct, s))
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let ct = ContentType::new(TextCodec::default());
        let mut store = InMemoryStore::new();
        store.put(key(&ct, "a"), text(&ct, "alpha")).unwrap();

        let got = store.get(&key(&ct, "a")).unwrap().expect("should exist");
        assert_eq!(got.text(), "alpha");
        assert!(store.get(&key(&ct, "b")).unwrap().is_none());
    }

    #[test]
    fn put_overwrites_in_place() {
        let ct = ContentType::new(TextCodec::default());
        let mut store = InMemoryStore::new();
        store.put(key(&ct, "a"), text(&ct, "one")).unwrap();
        store.put(key(&ct, "b"), text(&ct, "two")).unwrap();
        store.put(key(&ct, "a"), text(&ct, "three")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.keys(), vec![key(&ct, "a"), key(&ct, "b")]);
        assert_eq!(store.get(&key(&ct, "a")).unwrap().unwrap().text(), "three");
    }

    #[test]
    fn remove_drops_entry() {
        let ct = ContentType::new(TextCodec::default());
        let mut store = InMemoryStore::new();
        store.put(key(&ct, "a"), text(&ct, "x")).unwrap();
        assert!(store.remove(&key(&ct, "a").erase()));
        assert!(!store.remove(&key(&ct, "a").erase()));
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[test]
    fn queries_respect_filters() {
        let src = ContentType::new(TextCodec::new("src"));
        let doc = ContentType::new(TextCodec::new("doc"));
        let mut store = InMemoryStore::new();
        store.put(key(&src, "lib/a"), text(&src, "fn a")).unwrap();
        store.put(key(&src, "lib/b"), text(&src, "fn b")).unwrap();
        store.put(key(&doc, "lib/a"), text(&doc, "docs")).unwrap();
        store.put(key(&src, "bin/main"), text(&src, "main")).unwrap();

        let lib_src = ContentFilter::new(&src, "lib/*");
        assert_eq!(store.matching(&lib_src), vec![key(&src, "lib/a"), key(&src, "lib/b")]);
        assert_eq!(store.get_all(&ContentFilter::of_type(&doc)).unwrap().len(), 1);

        let with_b = store
            .matching_where(&lib_src, &|v: &dyn AnyContent| {
                v.downcast_ref::<TextFile>().is_some_and(|f| f.text().ends_with('b'))
            })
            .unwrap();
        assert_eq!(with_b, vec![key(&src, "lib/b")]);
    }

    #[test]
    fn one_store_holds_text_and_binaries() {
        let txt = ContentType::new(TextCodec::default());
        let obj = ContentType::new(BinaryCodec::new("o"));
        let mut store = InMemoryStore::new();
        store.put(key(&txt, "main"), text(&txt, "int main;")).unwrap();
        let compiled = Key::new(&obj, ArtifactPath::parse("main").unwrap());
        store
            .put(compiled.clone(), Arc::new(BinaryFile::new(&obj, vec![0x7f])))
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&key(&txt, "main")).unwrap().unwrap().text(), "int main;");
        assert_eq!(store.get(&compiled).unwrap().unwrap().bytes(), &[0x7f]);
        assert_eq!(store.matching(&ContentFilter::matching("main")).len(), 2);
        assert_eq!(store.matching(&ContentFilter::of_type(&obj)), vec![compiled]);
    }

    #[test]
    fn put_any_rejects_foreign_value() {
        let txt = ContentType::new(TextCodec::default());
        let obj = ContentType::new(BinaryCodec::new("o"));
        let mut store = InMemoryStore::new();
        let value: AnyValue = Arc::new(BinaryFile::new(&obj, vec![1]));
        let err = store.put_any(key(&txt, "a").erase(), value).unwrap_err();
        assert!(matches!(err, StoreError::ContentTypeMismatch { .. }));
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Synchronisation
    // -----------------------------------------------------------------------

    #[test]
    fn synchronise_clears_dirty_bits() {
        let ct = ContentType::new(TextCodec::default());
        let mut store = InMemoryStore::new();
        store.put(key(&ct, "a"), text(&ct, "x")).unwrap();
        store.put(key(&ct, "b"), text(&ct, "y")).unwrap();
        assert_eq!(store.dirty_count(), 2);

        let report = store.synchronise().unwrap();
        assert_eq!(report, SyncReport { deleted: 0, written: 2 });
        assert_eq!(store.dirty_count(), 0);
        assert!(store.synchronise().unwrap().is_noop());
    }

    #[test]
    fn reputting_same_value_stays_clean() {
        let ct = ContentType::new(TextCodec::default());
        let mut store = InMemoryStore::new();
        let value = text(&ct, "x");
        store.put(key(&ct, "a"), Arc::clone(&value)).unwrap();
        store.synchronise().unwrap();

        store.put(key(&ct, "a"), value).unwrap();
        assert_eq!(store.dirty_count(), 0);
    }
}

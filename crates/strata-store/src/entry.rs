//! Lazy, dirty-tracked store entries.
//!
//! An entry starts life either as a placeholder discovered while
//! enumerating a medium (nothing read yet) or as a freshly `put` value
//! (dirty). Its state moves through:
//!
//! ```text
//! Unloaded --get--> Clean --set--> Dirty --flush--> Clean
//!     \______________set_____________^
//! ```

use std::sync::Arc;

use strata_types::{AnyContent, AnyKey, AnyValue, Filter};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Load state of an [`Entry`].
#[derive(Clone, Debug)]
pub enum EntryState {
    /// Known to exist on the medium but not yet decoded.
    Unloaded,
    /// Decoded, and identical to what the medium holds.
    Clean(AnyValue),
    /// Holds a value the medium does not have yet.
    Dirty(AnyValue),
}

/// A single keyed item within a store.
#[derive(Debug)]
pub struct Entry {
    key: AnyKey,
    state: EntryState,
}

impl Entry {
    /// A placeholder for content that lives on the medium.
    pub fn placeholder(key: AnyKey) -> Self {
        Self {
            key,
            state: EntryState::Unloaded,
        }
    }

    /// An entry holding a value the medium has never seen.
    pub fn dirty(key: AnyKey, value: AnyValue) -> Self {
        Self {
            key,
            state: EntryState::Dirty(value),
        }
    }

    pub fn key(&self) -> &AnyKey {
        &self.key
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self.state, EntryState::Unloaded)
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self.state, EntryState::Dirty(_))
    }

    /// The cached value, if loaded.
    pub fn cached(&self) -> Option<&AnyValue> {
        match &self.state {
            EntryState::Unloaded => None,
            EntryState::Clean(v) | EntryState::Dirty(v) => Some(v),
        }
    }

    /// Return the value, decoding it with `read` on first access.
    ///
    /// A failed read leaves the entry unloaded.
    pub fn load_with<F>(&mut self, read: F) -> StoreResult<AnyValue>
    where
        F: FnOnce(&AnyKey) -> StoreResult<AnyValue>,
    {
        if let Some(value) = self.cached() {
            return Ok(Arc::clone(value));
        }
        let value = read(&self.key)?;
        debug!(key = %self.key, "entry loaded");
        self.state = EntryState::Clean(Arc::clone(&value));
        Ok(value)
    }

    /// Replace the value. Marks the entry dirty unless `value` is the very
    /// same allocation already held. Returns `true` if the entry changed.
    pub fn set(&mut self, value: AnyValue) -> bool {
        if let Some(current) = self.cached() {
            if Arc::ptr_eq(current, &value) {
                return false;
            }
        }
        self.state = EntryState::Dirty(value);
        true
    }

    /// Write the value with `write` iff dirty. Returns `true` if a write
    /// happened. On failure the entry stays dirty.
    pub fn flush_with<F>(&mut self, write: F) -> StoreResult<bool>
    where
        F: FnOnce(&AnyKey, &dyn AnyContent) -> StoreResult<()>,
    {
        let value = match &self.state {
            EntryState::Dirty(v) => Arc::clone(v),
            _ => return Ok(false),
        };
        write(&self.key, value.as_ref())?;
        self.state = EntryState::Clean(value);
        Ok(true)
    }
}

/// The in-memory index shared by every store: an insertion-ordered list of
/// entries with at most one entry per key.
#[derive(Debug, Default)]
pub struct EntrySet {
    entries: Vec<Entry>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_placeholders(keys: impl IntoIterator<Item = AnyKey>) -> Self {
        let mut set = Self::new();
        for key in keys {
            if !set.contains(&key) {
                set.entries.push(Entry::placeholder(key));
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &AnyKey) -> bool {
        self.position(key).is_some()
    }

    pub fn entry(&self, key: &AnyKey) -> Option<&Entry> {
        self.position(key).map(|i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> Vec<AnyKey> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn dirty_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_dirty()).count()
    }

    /// Look up and lazily load the value for `key`.
    pub fn get_with<F>(&mut self, key: &AnyKey, read: F) -> StoreResult<Option<AnyValue>>
    where
        F: FnOnce(&AnyKey) -> StoreResult<AnyValue>,
    {
        match self.position(key) {
            Some(i) => self.entries[i].load_with(read).map(Some),
            None => Ok(None),
        }
    }

    /// Load every value whose key satisfies `filter`, in index order.
    pub fn get_all_with<F>(
        &mut self,
        filter: &dyn Filter,
        mut read: F,
    ) -> StoreResult<Vec<AnyValue>>
    where
        F: FnMut(&AnyKey) -> StoreResult<AnyValue>,
    {
        let mut values = Vec::new();
        for entry in self.entries.iter_mut() {
            if filter.includes_key(entry.key()) {
                values.push(entry.load_with(&mut read)?);
            }
        }
        Ok(values)
    }

    /// Keys satisfying `filter`. Never loads content.
    pub fn matching(&self, filter: &dyn Filter) -> Vec<AnyKey> {
        self.entries
            .iter()
            .filter(|e| filter.includes_key(e.key()))
            .map(|e| e.key().clone())
            .collect()
    }

    /// Keys satisfying `filter` whose loaded value satisfies `predicate`.
    pub fn matching_where_with<F>(
        &mut self,
        filter: &dyn Filter,
        predicate: &dyn Fn(&dyn AnyContent) -> bool,
        mut read: F,
    ) -> StoreResult<Vec<AnyKey>>
    where
        F: FnMut(&AnyKey) -> StoreResult<AnyValue>,
    {
        let mut keys = Vec::new();
        for entry in self.entries.iter_mut() {
            if filter.includes_key(entry.key()) && predicate(entry.load_with(&mut read)?.as_ref()) {
                keys.push(entry.key().clone());
            }
        }
        Ok(keys)
    }

    /// Insert or overwrite. Rejects keys that cannot name a medium resource
    /// and values whose content type differs from the key's.
    pub fn put(&mut self, key: AnyKey, value: AnyValue) -> StoreResult<()> {
        if key.path().is_root() {
            return Err(StoreError::InvalidArgument(format!(
                "key {key} has an empty path"
            )));
        }
        let actual = value.any_content_type();
        if actual != *key.content_type() {
            return Err(StoreError::ContentTypeMismatch {
                key: key.to_string(),
                actual: actual.to_string(),
            });
        }
        match self.position(&key) {
            Some(i) => {
                self.entries[i].set(value);
            }
            None => self.entries.push(Entry::dirty(key, value)),
        }
        Ok(())
    }

    /// Drop the entry for `key`. Returns `true` if it existed.
    pub fn remove(&mut self, key: &AnyKey) -> bool {
        match self.position(key) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    fn position(&self, key: &AnyKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::{
        ArtifactPath, BinaryCodec, BinaryFile, ContentFilter, ContentType, TextCodec, TextFile,
    };

    fn setup() -> (ContentType<BinaryFile>, AnyKey) {
        let ct = ContentType::new(BinaryCodec::new("bin"));
        let key = AnyKey::new(&ct, ArtifactPath::parse("a/b").unwrap());
        (ct, key)
    }

    fn bin(ct: &ContentType<BinaryFile>, bytes: &[u8]) -> AnyValue {
        Arc::new(BinaryFile::new(ct, bytes.to_vec()))
    }

    #[test]
    fn placeholder_loads_once() {
        let (ct, key) = setup();
        let mut entry = Entry::placeholder(key);
        assert!(!entry.is_loaded());

        let mut reads = 0;
        let first = entry
            .load_with(|_| {
                reads += 1;
                Ok(bin(&ct, &[1]))
            })
            .unwrap();
        let second = entry
            .load_with(|_| {
                reads += 1;
                Ok(bin(&ct, &[2]))
            })
            .unwrap();
        assert_eq!(reads, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(entry.is_loaded());
        assert!(!entry.is_dirty());
    }

    #[test]
    fn failed_load_stays_unloaded() {
        let (_, key) = setup();
        let mut entry = Entry::placeholder(key);
        let err = entry.load_with(|_| Err(StoreError::Medium("gone".into())));
        assert!(err.is_err());
        assert!(!entry.is_loaded());
    }

    #[test]
    fn set_same_allocation_is_not_dirty() {
        let (ct, key) = setup();
        let mut entry = Entry::placeholder(key);
        let value = entry.load_with(|_| Ok(bin(&ct, &[7]))).unwrap();
        assert!(!entry.set(Arc::clone(&value)));
        assert!(!entry.is_dirty());

        // Equal content, different allocation: still a change.
        assert!(entry.set(bin(&ct, &[7])));
        assert!(entry.is_dirty());
    }

    #[test]
    fn flush_only_when_dirty() {
        let (ct, key) = setup();
        let mut entry = Entry::dirty(key, bin(&ct, &[1]));
        let mut writes = 0;
        assert!(entry
            .flush_with(|_, _| {
                writes += 1;
                Ok(())
            })
            .unwrap());
        assert!(!entry
            .flush_with(|_, _| {
                writes += 1;
                Ok(())
            })
            .unwrap());
        assert_eq!(writes, 1);
        assert!(matches!(entry.state(), EntryState::Clean(_)));
    }

    #[test]
    fn failed_flush_stays_dirty() {
        let (ct, key) = setup();
        let mut entry = Entry::dirty(key, bin(&ct, &[1]));
        assert!(entry
            .flush_with(|_, _| Err(StoreError::Medium("disk full".into())))
            .is_err());
        assert!(entry.is_dirty());
    }

    #[test]
    fn set_put_rejects_mismatched_content_type() {
        let (ct, key) = setup();
        let other = ContentType::new(BinaryCodec::new("bin"));
        let text = ContentType::new(TextCodec::new("bin"));
        let mut set = EntrySet::new();
        let err = set.put(key.clone(), bin(&other, &[])).unwrap_err();
        assert!(matches!(err, StoreError::ContentTypeMismatch { .. }));
        let err = set
            .put(key.clone(), Arc::new(TextFile::new(&text, "")))
            .unwrap_err();
        assert!(matches!(err, StoreError::ContentTypeMismatch { .. }));
        assert!(set.is_empty());

        set.put(key, bin(&ct, &[])).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn set_put_rejects_root_path() {
        let (ct, _) = setup();
        let mut set = EntrySet::new();
        let key = AnyKey::new(&ct, ArtifactPath::root());
        let err = set.put(key, bin(&ct, &[])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn set_holds_mixed_content_types() {
        let (obj, key) = setup();
        let txt = ContentType::new(TextCodec::default());
        let doc = AnyKey::new(&txt, ArtifactPath::parse("a/b").unwrap());
        let mut set = EntrySet::new();
        set.put(key.clone(), bin(&obj, &[1])).unwrap();
        set.put(doc.clone(), Arc::new(TextFile::new(&txt, "notes"))).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.matching(&ContentFilter::matching("a/b")), vec![key, doc.clone()]);
        let value = set.get_with(&doc, |_| unreachable!()).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<TextFile>().unwrap().text(), "notes");
    }

    #[test]
    fn set_matching_never_loads() {
        let (ct, key) = setup();
        let mut set = EntrySet::from_placeholders(vec![key.clone(), key.clone()]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.matching(&ContentFilter::of_type(&ct)), vec![key.clone()]);
        assert!(!set.entry(&key).unwrap().is_loaded());

        let values = set
            .get_all_with(&ContentFilter::any(), |_| Ok(bin(&ct, &[3])))
            .unwrap();
        assert_eq!(values.len(), 1);
        assert!(set.entry(&key).unwrap().is_loaded());
    }
}

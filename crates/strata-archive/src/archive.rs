//! In-memory zip archive container.
//!
//! Reading an archive pulls every entry's raw bytes in once; values are
//! decoded per entry on first access and cached. Writing emits a fresh zip
//! with one entry per key, in entry order.

use std::fmt;
use std::io::{Cursor, Read, Seek, Write};
use std::sync::{Arc, OnceLock};

use strata_store::KeyMapping;
use strata_types::{downcast, AnyContent, AnyKey, AnyValue, Content, ContentDigest, Filter, Key};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{ArchiveError, ArchiveResult};

/// One keyed entry: raw bytes plus a lazily decoded value.
pub struct ArchiveEntry {
    key: AnyKey,
    bytes: Vec<u8>,
    value: OnceLock<AnyValue>,
}

impl ArchiveEntry {
    fn new(key: AnyKey, bytes: Vec<u8>) -> Self {
        Self {
            key,
            bytes,
            value: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &AnyKey {
        &self.key
    }

    /// The undecoded bytes as stored in the archive.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn digest(&self) -> ContentDigest {
        ContentDigest::of(&self.bytes)
    }

    pub fn is_decoded(&self) -> bool {
        self.value.get().is_some()
    }

    /// Decode the entry, or return the cached value. A failed decode is
    /// not cached and is reported again on the next call.
    pub fn value(&self) -> ArchiveResult<AnyValue> {
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }
        let decoded = self
            .key
            .content_type()
            .decode(&self.bytes)
            .map_err(|source| ArchiveError::Decode {
                key: self.key.to_string(),
                source,
            })?;
        debug!(key = %self.key, digest = %self.digest().short_hex(), "archive entry decoded");
        Ok(Arc::clone(self.value.get_or_init(|| decoded)))
    }
}

impl fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("key", &self.key)
            .field("size", &self.bytes.len())
            .field("decoded", &self.value.get().is_some())
            .finish()
    }
}

/// An ordered collection of keyed entries with at most one entry per key.
///
/// Entries may be of any content type the mapping knows.
#[derive(Default)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every entry of a zip stream. Names `mapping` does not
    /// recognize and directory entries are skipped; a repeated key keeps
    /// its first occurrence.
    pub fn from_reader<R, M>(mapping: &M, reader: R) -> ArchiveResult<Self>
    where
        R: Read + Seek,
        M: KeyMapping + ?Sized,
    {
        let mut zip = ZipArchive::new(reader)?;
        let mut archive = Self::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let Some(key) = mapping.decode(&name) else {
                debug!(name = %name, "skipping unrecognized archive entry");
                continue;
            };
            if archive.contains(&key) {
                warn!(name = %name, "skipping duplicate archive entry");
                continue;
            }
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            archive.entries.push(ArchiveEntry::new(key, bytes));
        }
        Ok(archive)
    }

    pub fn from_bytes<M>(mapping: &M, bytes: &[u8]) -> ArchiveResult<Self>
    where
        M: KeyMapping + ?Sized,
    {
        Self::from_reader(mapping, Cursor::new(bytes))
    }

    /// Write every entry, in order, to a fresh zip stream.
    pub fn write_to<W, M>(&self, mapping: &M, writer: W) -> ArchiveResult<W>
    where
        W: Write + Seek,
        M: KeyMapping + ?Sized,
    {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default();
        for entry in &self.entries {
            zip.start_file(mapping.encode(&entry.key), options)?;
            zip.write_all(&entry.bytes)?;
        }
        Ok(zip.finish()?)
    }

    pub fn to_bytes<M>(&self, mapping: &M) -> ArchiveResult<Vec<u8>>
    where
        M: KeyMapping + ?Sized,
    {
        Ok(self.write_to(mapping, Cursor::new(Vec::new()))?.into_inner())
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

    pub fn entry(&self, index: usize) -> Option<&ArchiveEntry> {
        self.entries.get(index)
    }

    pub fn entry_for(&self, key: &AnyKey) -> Option<&ArchiveEntry> {
        self.position(key).map(|i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> Vec<AnyKey> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// The decoded value for `key`, or `None` if the archive has no such
    /// entry.
    pub fn get<T: Content>(&self, key: &Key<T>) -> ArchiveResult<Option<Arc<T>>> {
        Ok(self.get_any(&key.erase())?.and_then(downcast))
    }

    pub fn get_any(&self, key: &AnyKey) -> ArchiveResult<Option<AnyValue>> {
        self.entry_for(key).map(ArchiveEntry::value).transpose()
    }

    pub fn get_all(&self, filter: &dyn Filter) -> ArchiveResult<Vec<AnyValue>> {
        self.entries
            .iter()
            .filter(|e| filter.includes_key(&e.key))
            .map(ArchiveEntry::value)
            .collect()
    }

    /// Keys satisfying `filter`. Decodes nothing.
    pub fn matching(&self, filter: &dyn Filter) -> Vec<AnyKey> {
        self.entries
            .iter()
            .filter(|e| filter.includes_key(&e.key))
            .map(|e| e.key.clone())
            .collect()
    }

    pub fn matching_where(
        &self,
        filter: &dyn Filter,
        predicate: &dyn Fn(&dyn AnyContent) -> bool,
    ) -> ArchiveResult<Vec<AnyKey>> {
        let mut keys = Vec::new();
        for entry in self.entries.iter().filter(|e| filter.includes_key(&e.key)) {
            if predicate(entry.value()?.as_ref()) {
                keys.push(entry.key.clone());
            }
        }
        Ok(keys)
    }

    /// Add raw bytes under `key`, replacing any existing entry in place.
    pub fn add(&mut self, key: impl Into<AnyKey>, bytes: Vec<u8>) {
        self.place(ArchiveEntry::new(key.into(), bytes));
    }

    /// Encode `value` and add it under `key`. The decoded value is cached.
    pub fn insert<T: Content>(&mut self, key: Key<T>, value: Arc<T>) -> ArchiveResult<()> {
        self.insert_any(key.into(), value)
    }

    pub fn insert_any(&mut self, key: AnyKey, value: AnyValue) -> ArchiveResult<()> {
        let actual = value.any_content_type();
        if actual != *key.content_type() {
            return Err(ArchiveError::ContentTypeMismatch {
                key: key.to_string(),
                actual: actual.to_string(),
            });
        }
        let bytes = key
            .content_type()
            .encode(value.as_ref())
            .map_err(|source| ArchiveError::Encode {
                key: key.to_string(),
                source,
            })?;
        let entry = ArchiveEntry::new(key, bytes);
        let _ = entry.value.set(value);
        self.place(entry);
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

    fn place(&mut self, entry: ArchiveEntry) {
        match self.position(&entry.key) {
            Some(i) => self.entries[i] = entry,
            None => self.entries.push(entry),
        }
    }

    fn position(&self, key: &AnyKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == *key)
    }
}

/// Entries compare by key and raw bytes.
impl PartialEq for Archive {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.key == b.key && a.bytes == b.bytes)
    }
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use strata_store::SuffixMapping;
    use strata_types::{
        ArtifactPath, BinaryCodec, BinaryFile, ContentFilter, ContentRegistry, ContentType,
        TextCodec, TextFile,
    };

    struct Fixture {
        obj: ContentType<BinaryFile>,
        hdr: ContentType<BinaryFile>,
        mapping: SuffixMapping,
    }

    fn fixture() -> Fixture {
        let obj = ContentType::new(BinaryCodec::new("o"));
        let hdr = ContentType::new(BinaryCodec::new("h"));
        let registry = ContentRegistry::new().with(&obj).unwrap().with(&hdr).unwrap();
        Fixture {
            obj,
            hdr,
            mapping: SuffixMapping::new(registry),
        }
    }

    fn key(ct: &ContentType<BinaryFile>, p: &str) -> Key<BinaryFile> {
        Key::new(ct, ArtifactPath::parse(p).unwrap())
    }

    #[test]
    fn round_trip_preserves_keys_and_bytes() {
        let fx = fixture();
        let mut archive = Archive::new();
        archive.add(key(&fx.obj, "lib/a"), vec![1, 2, 3]);
        archive.add(key(&fx.hdr, "lib/a"), b"#pragma once".to_vec());
        archive.add(key(&fx.obj, "main"), Vec::new());

        let bytes = archive.to_bytes(&fx.mapping).unwrap();
        let restored = Archive::from_bytes(&fx.mapping, &bytes).unwrap();

        let contents = |a: &Archive| -> HashMap<AnyKey, Vec<u8>> {
            a.iter().map(|e| (e.key().clone(), e.bytes().to_vec())).collect()
        };
        assert_eq!(contents(&restored), contents(&archive));
        assert_eq!(restored, archive);
    }

    #[test]
    fn values_decode_lazily_and_once() {
        let fx = fixture();
        let mut archive = Archive::new();
        archive.add(key(&fx.obj, "a"), vec![9]);
        let restored = Archive::from_bytes(&fx.mapping, &archive.to_bytes(&fx.mapping).unwrap()).unwrap();

        let entry = restored.entry(0).unwrap();
        assert!(!entry.is_decoded());
        let first = restored.get(&key(&fx.obj, "a")).unwrap().unwrap();
        assert_eq!(first.bytes(), &[9]);
        assert!(entry.is_decoded());
        let second = restored.get(&key(&fx.obj, "a")).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(restored.get(&key(&fx.obj, "b")).unwrap().is_none());
    }

    #[test]
    fn unrecognized_entries_are_skipped() {
        let fx = fixture();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("README.md", options).unwrap();
        zip.write_all(b"hello").unwrap();
        zip.add_directory("lib/", options).unwrap();
        zip.start_file("lib/x.o", options).unwrap();
        zip.write_all(&[7]).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let archive = Archive::from_bytes(&fx.mapping, &bytes).unwrap();
        assert_eq!(archive.keys(), vec![key(&fx.obj, "lib/x")]);
    }

    #[test]
    fn queries_filter_by_type_and_path() {
        let fx = fixture();
        let mut archive = Archive::new();
        archive.add(key(&fx.obj, "src/a"), vec![1]);
        archive.add(key(&fx.obj, "src/b"), vec![2, 2]);
        archive.add(key(&fx.hdr, "src/a"), vec![3]);

        let objs = ContentFilter::of_type(&fx.obj);
        assert_eq!(archive.matching(&objs).len(), 2);
        assert!(archive.iter().all(|e| !e.is_decoded()));
        assert_eq!(archive.get_all(&ContentFilter::matching("src/a")).unwrap().len(), 2);

        let long = archive
            .matching_where(&objs, &|v: &dyn AnyContent| {
                v.downcast_ref::<BinaryFile>().is_some_and(|f| f.bytes().len() > 1)
            })
            .unwrap();
        assert_eq!(long, vec![key(&fx.obj, "src/b")]);
    }

    #[test]
    fn add_and_insert_replace_in_place() {
        let fx = fixture();
        let mut archive = Archive::new();
        archive.add(key(&fx.obj, "a"), vec![1]);
        archive.add(key(&fx.obj, "b"), vec![2]);
        archive
            .insert(key(&fx.obj, "a"), Arc::new(BinaryFile::new(&fx.obj, vec![5])))
            .unwrap();

        assert_eq!(archive.len(), 2);
        assert_eq!(archive.entry(0).unwrap().bytes(), &[5]);
        assert!(archive.entry(0).unwrap().is_decoded());
        assert!(archive.remove(&key(&fx.obj, "b").erase()));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn insert_rejects_mismatched_type() {
        let fx = fixture();
        let mut archive = Archive::new();
        let err = archive
            .insert(key(&fx.obj, "a"), Arc::new(BinaryFile::new(&fx.hdr, vec![])))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::ContentTypeMismatch { .. }));
        assert!(archive.is_empty());
    }

    #[test]
    fn one_archive_mixes_text_and_binaries() {
        let fx = fixture();
        let txt = ContentType::new(TextCodec::new("c"));
        let mapping = SuffixMapping::new(
            ContentRegistry::new().with(&txt).unwrap().with(&fx.obj).unwrap(),
        );
        let source = Key::new(&txt, ArtifactPath::parse("util").unwrap());
        let mut archive = Archive::new();
        archive
            .insert(source.clone(), Arc::new(TextFile::new(&txt, "int f();")))
            .unwrap();
        archive.add(key(&fx.obj, "util"), vec![0x7f]);

        let restored = Archive::from_bytes(&mapping, &archive.to_bytes(&mapping).unwrap()).unwrap();
        assert_eq!(restored, archive);
        assert_eq!(restored.get(&source).unwrap().unwrap().text(), "int f();");
        assert_eq!(restored.get(&key(&fx.obj, "util")).unwrap().unwrap().bytes(), &[0x7f]);
        assert_eq!(restored.get_all(&ContentFilter::matching("util")).unwrap().len(), 2);
    }

    #[test]
    fn garbage_is_a_zip_error() {
        let fx = fixture();
        let err = Archive::from_bytes(&fx.mapping, b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ArchiveError::Zip(_)));
    }
}

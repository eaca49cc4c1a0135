use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use strata_store::{EntrySet, EntryState, KeyMapping, Store, StoreError, StoreResult, SyncReport};
use strata_types::{AnyContent, AnyKey, AnyValue, Filter};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// A store backed by a single zip file.
///
/// Opening lists entry names only. Each `get` reads the named entry and
/// decodes it once. `synchronise` rewrites the whole file when anything
/// changed: clean entries are copied as raw bytes, dirty ones re-encoded,
/// and entries the mapping does not recognize are carried over.
pub struct ArchiveStore<M: KeyMapping> {
    path: PathBuf,
    mapping: M,
    entries: EntrySet,
}

impl<M: KeyMapping> ArchiveStore<M> {
    /// Open the archive at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>, mapping: M) -> StoreResult<Self> {
        let path = path.into();
        let keys: Vec<AnyKey> = list_names(&path)?
            .iter()
            .filter_map(|name| mapping.decode(name))
            .collect();
        let entries = EntrySet::from_placeholders(keys);
        info!(path = %path.display(), entries = entries.len(), "archive store opened");
        Ok(Self {
            path,
            mapping,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    pub fn dirty_count(&self) -> usize {
        self.entries.dirty_count()
    }
}

impl<M: KeyMapping> Store for ArchiveStore<M> {
    fn get_any(&mut self, key: &AnyKey) -> StoreResult<Option<AnyValue>> {
        let Self {
            path,
            mapping,
            entries,
        } = self;
        entries.get_with(key, |k| read_entry(path, mapping, k))
    }

    fn get_all(&mut self, filter: &dyn Filter) -> StoreResult<Vec<AnyValue>> {
        let Self {
            path,
            mapping,
            entries,
        } = self;
        entries.get_all_with(filter, |k| read_entry(path, mapping, k))
    }

    fn matching(&self, filter: &dyn Filter) -> Vec<AnyKey> {
        self.entries.matching(filter)
    }

    fn matching_where(
        &mut self,
        filter: &dyn Filter,
        predicate: &dyn Fn(&dyn AnyContent) -> bool,
    ) -> StoreResult<Vec<AnyKey>> {
        let Self {
            path,
            mapping,
            entries,
        } = self;
        entries.matching_where_with(filter, predicate, |k| read_entry(path, mapping, k))
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
        // Enumerate before flushing so unflushed entries are never orphans.
        let names = list_names(&self.path)?;
        let deleted = names
            .iter()
            .filter_map(|name| self.mapping.decode(name))
            .filter(|key| !self.entries.contains(key))
            .count();
        let dirty = self.entries.dirty_count();
        if deleted == 0 && dirty == 0 {
            return Ok(SyncReport::default());
        }

        self.rewrite(&names)?;

        let mut report = SyncReport {
            deleted,
            written: 0,
        };
        for entry in self.entries.iter_mut() {
            if entry.flush_with(|_, _| Ok(()))? {
                report.written += 1;
            }
        }
        info!(
            path = %self.path.display(),
            deleted = report.deleted,
            written = report.written,
            "archive store synchronised"
        );
        Ok(report)
    }
}

impl<M: KeyMapping> ArchiveStore<M> {
    /// Write the index to a temporary file beside the archive, then rename
    /// it over the archive. The old archive is intact until the rename.
    fn rewrite(&self, existing: &[String]) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let mut old = open_zip(&self.path)?;
        let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(tmp.as_file()));
        let options = SimpleFileOptions::default();

        for entry in self.entries.iter() {
            let name = self.mapping.encode(entry.key());
            let bytes = match entry.state() {
                EntryState::Dirty(value) => {
                    let bytes = entry
                        .key()
                        .content_type()
                        .encode(value.as_ref())
                        .map_err(|source| StoreError::Encode {
                            key: entry.key().to_string(),
                            source,
                        })?;
                    debug!(key = %entry.key(), size = bytes.len(), "archive entry encoded");
                    bytes
                }
                EntryState::Clean(_) | EntryState::Unloaded => {
                    read_raw(&self.path, old.as_mut(), &name)?
                }
            };
            zip.start_file(name, options)
                .map_err(|e| zip_error(tmp.path(), e))?;
            zip.write_all(&bytes)
                .map_err(|e| StoreError::io(tmp.path(), e))?;
        }

        // Names outside the mapping's namespace belong to someone else.
        if let Some(old) = old.as_mut() {
            for name in existing {
                if self.mapping.decode(name).is_some() {
                    continue;
                }
                let bytes = read_raw(&self.path, Some(&mut *old), name)?;
                zip.start_file(name.as_str(), options)
                    .map_err(|e| zip_error(tmp.path(), e))?;
                zip.write_all(&bytes)
                    .map_err(|e| StoreError::io(tmp.path(), e))?;
            }
        }

        let mut writer = zip.finish().map_err(|e| zip_error(tmp.path(), e))?;
        writer.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
        drop(writer);
        drop(old);

        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl<M: KeyMapping> fmt::Debug for ArchiveStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveStore")
            .field("path", &self.path)
            .field("entry_count", &self.entries.len())
            .field("dirty_count", &self.entries.dirty_count())
            .finish()
    }
}

type ZipFileReader = ZipArchive<BufReader<File>>;

fn zip_error(path: &Path, err: ZipError) -> StoreError {
    match err {
        ZipError::Io(source) => StoreError::io(path, source),
        other => StoreError::Medium(format!("{}: {other}", path.display())),
    }
}

/// Open the archive if it exists.
fn open_zip(path: &Path) -> StoreResult<Option<ZipFileReader>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    ZipArchive::new(BufReader::new(file))
        .map(Some)
        .map_err(|e| zip_error(path, e))
}

/// Names of the file entries in the archive, in archive order.
fn list_names(path: &Path) -> StoreResult<Vec<String>> {
    let Some(mut zip) = open_zip(path)? else {
        return Ok(Vec::new());
    };
    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let file = zip.by_index(i).map_err(|e| zip_error(path, e))?;
        if !file.is_dir() {
            names.push(file.name().to_string());
        }
    }
    Ok(names)
}

fn read_raw(path: &Path, zip: Option<&mut ZipFileReader>, name: &str) -> StoreResult<Vec<u8>> {
    let zip = zip.ok_or_else(|| {
        StoreError::Medium(format!("{} has no entry {name}", path.display()))
    })?;
    let mut file = zip.by_name(name).map_err(|e| zip_error(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| StoreError::io(path, e))?;
    Ok(bytes)
}

fn read_entry<M: KeyMapping>(path: &Path, mapping: &M, key: &AnyKey) -> StoreResult<AnyValue> {
    let mut zip = open_zip(path)?;
    let bytes = read_raw(path, zip.as_mut(), &mapping.encode(key))?;
    key.content_type()
        .decode(&bytes)
        .map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })
}

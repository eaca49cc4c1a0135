use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use strata_types::{AnyContent, AnyKey, AnyValue, ContentDigest, Filter};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::entry::{Entry, EntrySet};
use crate::error::{StoreError, StoreResult};
use crate::mapping::KeyMapping;
use crate::traits::{Store, SyncReport};

type PathFilter = Box<dyn Fn(&Path) -> bool>;

/// A store backed by a rooted file tree.
///
/// Each key maps to one file whose path (relative to the root) is the
/// mapping's name for that key. Opening the store only lists files; their
/// content is decoded on first access.
pub struct DirectoryStore<M: KeyMapping> {
    root: PathBuf,
    mapping: M,
    config: StoreConfig,
    filter: PathFilter,
    entries: EntrySet,
}

impl<M: KeyMapping> DirectoryStore<M> {
    /// Open a store rooted at `root` with the default configuration,
    /// including every file the mapping recognizes.
    pub fn open(root: impl Into<PathBuf>, mapping: M) -> StoreResult<Self> {
        Self::open_with(root, mapping, StoreConfig::default(), |_: &Path| true)
    }

    /// Open a store rooted at `root`.
    ///
    /// `filter` is called with paths relative to the root. A rejected
    /// directory is not descended into; a rejected file is invisible to the
    /// store and never deleted by `synchronise`.
    pub fn open_with<F>(
        root: impl Into<PathBuf>,
        mapping: M,
        config: StoreConfig,
        filter: F,
    ) -> StoreResult<Self>
    where
        F: Fn(&Path) -> bool + 'static,
    {
        config.validate()?;
        let root = root.into();
        let filter: PathFilter = Box::new(filter);
        let keys: Vec<AnyKey> = scan(&root, &config, &filter)?
            .into_iter()
            .filter_map(|(name, _)| mapping.decode(&name))
            .collect();
        let entries = EntrySet::from_placeholders(keys);
        info!(root = %root.display(), entries = entries.len(), "directory store opened");
        Ok(Self {
            root,
            mapping,
            config,
            filter,
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The index entry for `key`, if any.
    pub fn entry(&self, key: &AnyKey) -> Option<&Entry> {
        self.entries.entry(key)
    }

    /// Absolute location of the file backing `key`.
    pub fn file_path(&self, key: &AnyKey) -> PathBuf {
        resolve(&self.root, &self.mapping.encode(key))
    }

    pub fn dirty_count(&self) -> usize {
        self.entries.dirty_count()
    }
}

impl<M: KeyMapping> Store for DirectoryStore<M> {
    fn get_any(&mut self, key: &AnyKey) -> StoreResult<Option<AnyValue>> {
        let Self {
            root,
            mapping,
            entries,
            ..
        } = self;
        entries.get_with(key, |k| read_file(root, mapping, k))
    }

    fn get_all(&mut self, filter: &dyn Filter) -> StoreResult<Vec<AnyValue>> {
        let Self {
            root,
            mapping,
            entries,
            ..
        } = self;
        entries.get_all_with(filter, |k| read_file(root, mapping, k))
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
            root,
            mapping,
            entries,
            ..
        } = self;
        entries.matching_where_with(filter, predicate, |k| read_file(root, mapping, k))
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
        let Self {
            root,
            mapping,
            config,
            filter,
            entries,
        } = self;
        let mut report = SyncReport::default();

        // Enumerate before flushing so unflushed entries are never orphans.
        for (name, path) in scan(root, config, filter)? {
            let Some(key) = mapping.decode(&name) else {
                continue;
            };
            if entries.contains(&key) {
                continue;
            }
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
            debug!(%key, path = %path.display(), "orphan deleted");
            report.deleted += 1;
        }

        for entry in entries.iter_mut() {
            if entry.flush_with(|key, value| write_file(root, mapping, key, value))? {
                report.written += 1;
            }
        }

        info!(
            root = %root.display(),
            deleted = report.deleted,
            written = report.written,
            "directory store synchronised"
        );
        Ok(report)
    }
}

impl<M: KeyMapping> fmt::Debug for DirectoryStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryStore")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("entry_count", &self.entries.len())
            .field("dirty_count", &self.entries.dirty_count())
            .finish()
    }
}

/// List `(name, absolute path)` for every regular file under `root` that
/// passes `filter`. A missing root has no files. Symlink cycles are
/// skipped.
fn scan(root: &Path, config: &StoreConfig, filter: &PathFilter) -> StoreResult<Vec<(String, PathBuf)>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(config.max_depth)
        .follow_links(config.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| match e.path().strip_prefix(root) {
            Ok(rel) if rel.as_os_str().is_empty() => true,
            Ok(rel) => filter(rel),
            Err(_) => true,
        });

    let mut files = Vec::new();
    for item in walker {
        let item = match item {
            Ok(item) => item,
            Err(e) if e.loop_ancestor().is_some() => {
                debug!(path = ?e.path(), "symlink loop skipped");
                continue;
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"));
                return Err(StoreError::io(path, source));
            }
        };
        if !item.file_type().is_file() {
            continue;
        }
        // Names that are not valid UTF-8 cannot belong to any mapping.
        if let Some(name) = relative_name(root, item.path()) {
            files.push((name, item.into_path()));
        }
    }
    Ok(files)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

fn resolve(root: &Path, name: &str) -> PathBuf {
    name.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}

fn read_file<M: KeyMapping>(root: &Path, mapping: &M, key: &AnyKey) -> StoreResult<AnyValue> {
    let path = resolve(root, &mapping.encode(key));
    let file = File::open(&path).map_err(|e| StoreError::io(&path, e))?;
    let mut reader = BufReader::new(file);
    key.content_type()
        .read(&mut reader)
        .map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })
}

fn write_file<M: KeyMapping>(
    root: &Path,
    mapping: &M,
    key: &AnyKey,
    value: &dyn AnyContent,
) -> StoreResult<()> {
    let bytes = key
        .content_type()
        .encode(value)
        .map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
    let path = resolve(root, &mapping.encode(key));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let file = File::create(&path).map_err(|e| StoreError::io(&path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| StoreError::io(&path, e))?;
    debug!(
        %key,
        digest = %ContentDigest::of(&bytes).short_hex(),
        size = bytes.len(),
        "entry flushed"
    );
    Ok(())
}

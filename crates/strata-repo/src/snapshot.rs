//! Immutable artifact collections.
//!
//! A [`SnapShot`] is a persistent vector: artifacts live in fixed-size
//! chunks shared between snapshots through `Arc`. `put` copies the chunk
//! spine and the one chunk it touches; every other chunk is shared with
//! the receiver.

use std::fmt;
use std::sync::Arc;

use strata_types::{downcast, AnyContent, AnyKey, AnyValue, Content, Filter, Key};

use crate::artifact::Artifact;

const CHUNK_SIZE: usize = 32;

type Chunk = Arc<Vec<Arc<Artifact>>>;

/// An immutable collection of artifacts with at most one artifact per key.
///
/// Artifacts of any content type share one snapshot. Iteration order is
/// the order in which each key was first added.
#[derive(Clone, Default)]
pub struct SnapShot {
    chunks: Vec<Chunk>,
    len: usize,
}

impl SnapShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from `artifacts`. A later artifact replaces an
    /// earlier one with the same key.
    pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        let mut snapshot = Self::new();
        for artifact in artifacts {
            snapshot.insert(Arc::new(artifact));
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, key: &AnyKey) -> bool {
        self.position(key).is_some()
    }

    /// The value stored under `key`.
    pub fn get<T: Content>(&self, key: &Key<T>) -> Option<Arc<T>> {
        self.get_any(&key.erase()).cloned().and_then(downcast)
    }

    pub fn get_any(&self, key: &AnyKey) -> Option<&AnyValue> {
        self.artifact(key).map(|a| a.value())
    }

    pub fn artifact(&self, key: &AnyKey) -> Option<&Arc<Artifact>> {
        self.position(key).map(|i| self.at(i))
    }

    /// Values of every artifact whose key satisfies `filter`.
    pub fn get_all(&self, filter: &dyn Filter) -> Vec<AnyValue> {
        self.iter()
            .filter(|a| filter.includes_key(a.key()))
            .map(|a| Arc::clone(a.value()))
            .collect()
    }

    pub fn matching(&self, filter: &dyn Filter) -> Vec<AnyKey> {
        self.iter()
            .filter(|a| filter.includes_key(a.key()))
            .map(|a| a.key().clone())
            .collect()
    }

    /// Keys satisfying `filter` whose value also satisfies `predicate`.
    pub fn matching_where(
        &self,
        filter: &dyn Filter,
        predicate: &dyn Fn(&dyn AnyContent) -> bool,
    ) -> Vec<AnyKey> {
        self.iter()
            .filter(|a| filter.includes_key(a.key()) && predicate(a.value().as_ref()))
            .map(|a| a.key().clone())
            .collect()
    }

    /// A new snapshot with `artifact` added, replacing in place any
    /// artifact with the same key. `self` is unchanged.
    pub fn put(&self, artifact: Artifact) -> Self {
        let mut next = self.clone();
        next.insert(Arc::new(artifact));
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Artifact>> {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    fn insert(&mut self, artifact: Arc<Artifact>) {
        if let Some(i) = self.position(artifact.key()) {
            Arc::make_mut(&mut self.chunks[i / CHUNK_SIZE])[i % CHUNK_SIZE] = artifact;
            return;
        }
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < CHUNK_SIZE => Arc::make_mut(chunk).push(artifact),
            _ => {
                let mut chunk = Vec::with_capacity(CHUNK_SIZE);
                chunk.push(artifact);
                self.chunks.push(Arc::new(chunk));
            }
        }
        self.len += 1;
    }

    fn at(&self, i: usize) -> &Arc<Artifact> {
        &self.chunks[i / CHUNK_SIZE][i % CHUNK_SIZE]
    }

    fn position(&self, key: &AnyKey) -> Option<usize> {
        self.iter().position(|a| a.key() == key)
    }
}

/// Structural equality: same artifacts in the same order.
impl PartialEq for SnapShot {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b) || **a == **b)
    }
}

impl fmt::Display for SnapShot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, artifact) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", artifact.key())?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for SnapShot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|a| a.key()))
            .finish()
    }
}

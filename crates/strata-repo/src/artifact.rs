use std::fmt;
use std::sync::Arc;

use strata_types::{AnyContentType, AnyKey, AnyValue, ArtifactPath, Content};

/// An immutable, keyed value held in a [`SnapShot`](crate::SnapShot).
///
/// The key's content type is always the value's own, so an artifact can
/// never be filed under the wrong type. Generated artifacts record the keys
/// of the artifacts they were produced from, whatever their types.
#[derive(Clone)]
pub struct Artifact {
    key: AnyKey,
    value: AnyValue,
    sources: Vec<AnyKey>,
}

impl Artifact {
    /// An input artifact, such as a source file.
    pub fn source<T: Content>(path: ArtifactPath, value: T) -> Self {
        Self::derived(path, value, Vec::new())
    }

    /// An artifact generated from `sources`.
    pub fn derived<T: Content>(path: ArtifactPath, value: T, sources: Vec<AnyKey>) -> Self {
        Self::from_any(path, Arc::new(value)).with_sources(sources)
    }

    /// A source artifact for a value that is already shared, e.g. one read
    /// from a store.
    pub fn from_any(path: ArtifactPath, value: AnyValue) -> Self {
        Self {
            key: AnyKey::new(value.any_content_type(), path),
            value,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<AnyKey>) -> Self {
        self.sources = sources;
        self
    }

    pub fn key(&self) -> &AnyKey {
        &self.key
    }

    pub fn path(&self) -> &ArtifactPath {
        self.key.path()
    }

    pub fn content_type(&self) -> &AnyContentType {
        self.key.content_type()
    }

    pub fn value(&self) -> &AnyValue {
        &self.value
    }

    /// The value as `T`, if that is its type.
    pub fn downcast_ref<T: Content>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn sources(&self) -> &[AnyKey] {
        &self.sources
    }

    pub fn is_derived(&self) -> bool {
        !self.sources.is_empty()
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.value.same_content(other.value.as_ref())
            && self.sources == other.sources
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("key", &self.key)
            .field("sources", &self.sources)
            .finish()
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::content::{AnyContentType, Content, ContentType};
use crate::path::ArtifactPath;

/// The unique addressing unit: a content type paired with a path.
///
/// Two keys are equal iff they name the same content type (by identity)
/// and structurally equal paths. A `Key<V>` knows its value type; its
/// erased form [`AnyKey`] is what heterogeneous containers index by.
pub struct Key<V: 'static> {
    content_type: ContentType<V>,
    path: ArtifactPath,
}

impl<V: Content> Key<V> {
    pub fn new(content_type: &ContentType<V>, path: ArtifactPath) -> Self {
        Self {
            content_type: content_type.clone(),
            path,
        }
    }

    pub fn content_type(&self) -> &ContentType<V> {
        &self.content_type
    }

    pub fn path(&self) -> &ArtifactPath {
        &self.path
    }

    /// Returns `true` if this key addresses `(content_type, path)`.
    pub fn is(&self, content_type: &ContentType<V>, path: &ArtifactPath) -> bool {
        self.content_type == *content_type && self.path == *path
    }

    pub fn erase(&self) -> AnyKey {
        AnyKey {
            content_type: self.content_type.erase(),
            path: self.path.clone(),
        }
    }
}

impl<V: 'static> Clone for Key<V> {
    fn clone(&self) -> Self {
        Self {
            content_type: self.content_type.clone(),
            path: self.path.clone(),
        }
    }
}

impl<V: 'static> PartialEq for Key<V> {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type && self.path == other.path
    }
}

impl<V: 'static> Eq for Key<V> {}

impl<V: 'static> Hash for Key<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_type.hash(state);
        self.path.hash(state);
    }
}

impl<V: Content> fmt::Display for Key<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.content_type)
    }
}

impl<V: Content> fmt::Debug for Key<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

/// A [`Key`] whose value type is only known at run time.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AnyKey {
    content_type: AnyContentType,
    path: ArtifactPath,
}

impl AnyKey {
    pub fn new(content_type: impl Into<AnyContentType>, path: ArtifactPath) -> Self {
        Self {
            content_type: content_type.into(),
            path,
        }
    }

    pub fn content_type(&self) -> &AnyContentType {
        &self.content_type
    }

    pub fn path(&self) -> &ArtifactPath {
        &self.path
    }

    /// The typed key, if this key's content type decodes to `V`.
    pub fn downcast<V: Content>(&self) -> Option<Key<V>> {
        Some(Key {
            content_type: self.content_type.downcast()?,
            path: self.path.clone(),
        })
    }
}

impl<V: Content> From<Key<V>> for AnyKey {
    fn from(key: Key<V>) -> Self {
        Self {
            content_type: key.content_type.erase(),
            path: key.path,
        }
    }
}

impl<V: Content> From<&Key<V>> for AnyKey {
    fn from(key: &Key<V>) -> Self {
        key.erase()
    }
}

impl<V: 'static> PartialEq<Key<V>> for AnyKey {
    fn eq(&self, other: &Key<V>) -> bool {
        self.content_type == other.content_type && self.path == other.path
    }
}

impl fmt::Display for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.content_type)
    }
}

impl fmt::Debug for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

/// A structural predicate over content type and path.
pub trait Filter {
    fn includes(&self, content_type: &AnyContentType, path: &ArtifactPath) -> bool;

    fn includes_key(&self, key: &AnyKey) -> bool {
        self.includes(key.content_type(), key.path())
    }
}

impl<F> Filter for F
where
    F: Fn(&AnyContentType, &ArtifactPath) -> bool,
{
    fn includes(&self, content_type: &AnyContentType, path: &ArtifactPath) -> bool {
        self(content_type, path)
    }
}

/// The common filter: "content type is X and path matches glob P".
///
/// Either half may be left open.
#[derive(Clone, Debug)]
pub struct ContentFilter {
    content_type: Option<AnyContentType>,
    pattern: Option<String>,
}

impl ContentFilter {
    /// Matches artifacts of `content_type` whose path matches `pattern`.
    pub fn new(content_type: impl Into<AnyContentType>, pattern: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            pattern: Some(pattern.into()),
        }
    }

    /// Matches everything.
    pub fn any() -> Self {
        Self {
            content_type: None,
            pattern: None,
        }
    }

    /// Matches every artifact of `content_type`.
    pub fn of_type(content_type: impl Into<AnyContentType>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            pattern: None,
        }
    }

    /// Matches every artifact whose path matches `pattern`.
    pub fn matching(pattern: impl Into<String>) -> Self {
        Self {
            content_type: None,
            pattern: Some(pattern.into()),
        }
    }
}

impl Filter for ContentFilter {
    fn includes(&self, content_type: &AnyContentType, path: &ArtifactPath) -> bool {
        if let Some(ref ct) = self.content_type {
            if ct != content_type {
                return false;
            }
        }
        if let Some(ref pattern) = self.pattern {
            if !path.matches(pattern) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{BinaryCodec, BinaryFile, TextCodec, TextFile};

    fn path(s: &str) -> ArtifactPath {
        ArtifactPath::parse(s).unwrap()
    }

    #[test]
    fn keys_compare_type_identity_and_path() {
        let a = ContentType::new(BinaryCodec::new("o"));
        let b = ContentType::new(BinaryCodec::new("o"));
        let k = Key::new(&a, path("x/y"));
        assert_eq!(k, Key::new(&a, path("x/y")));
        assert_ne!(k, Key::new(&b, path("x/y")));
        assert_ne!(k, Key::new(&a, path("x/z")));
        assert!(k.is(&a, &path("x/y")));
    }

    #[test]
    fn key_display() {
        let ct = ContentType::new(BinaryCodec::new("class"));
        let k = Key::new(&ct, path("pkg/Main"));
        assert_eq!(k.to_string(), "pkg/Main:class");
        assert_eq!(k.erase().to_string(), "pkg/Main:class");
    }

    #[test]
    fn erased_keys_keep_identity() {
        let txt = ContentType::new(TextCodec::default());
        let obj = ContentType::new(BinaryCodec::new("o"));
        let k = Key::new(&txt, path("main"));
        let any = AnyKey::from(k.clone());

        assert_eq!(any, k.erase());
        assert_eq!(any, k);
        assert_ne!(any, AnyKey::new(&obj, path("main")));
        assert_eq!(any.downcast::<TextFile>(), Some(k));
        assert!(any.downcast::<BinaryFile>().is_none());
    }

    #[test]
    fn content_filter_combines_type_and_glob() {
        let obj = ContentType::new(BinaryCodec::new("o")).erase();
        let lib = ContentType::new(BinaryCodec::new("a")).erase();
        let f = ContentFilter::new(obj.clone(), "src/**");
        assert!(f.includes(&obj, &path("src/a/b")));
        assert!(!f.includes(&lib, &path("src/a/b")));
        assert!(!f.includes(&obj, &path("test/a")));

        assert!(ContentFilter::any().includes(&lib, &path("q")));
        assert!(ContentFilter::of_type(lib.clone()).includes(&lib, &path("anything/at/all")));
        assert!(ContentFilter::matching("*").includes(&obj, &path("top")));
    }

    #[test]
    fn one_filter_spans_content_types() {
        let txt = ContentType::new(TextCodec::default());
        let obj = ContentType::new(BinaryCodec::new("o"));
        let f = ContentFilter::matching("src/*");
        assert!(f.includes_key(&Key::new(&txt, path("src/a")).erase()));
        assert!(f.includes_key(&Key::new(&obj, path("src/a")).erase()));
        assert!(!ContentFilter::of_type(&txt).includes_key(&Key::new(&obj, path("src/a")).erase()));
    }

    #[test]
    fn closures_are_filters() {
        let obj = ContentType::new(BinaryCodec::new("o"));
        let f = |_: &AnyContentType, p: &ArtifactPath| p.len() == 1;
        assert!(f.includes_key(&Key::new(&obj, path("a")).erase()));
        assert!(!f.includes_key(&Key::new(&obj, path("a/b")).erase()));
    }
}

use strata_types::{AnyContentType, AnyKey, ArtifactPath, ContentRegistry};

/// Translates between structured keys and flat medium-level names (file
/// paths relative to a store root, or archive entry names).
///
/// Implementations must be a stable bijection on the names they recognize.
/// Names outside that namespace decode to `None` rather than failing.
pub trait KeyMapping {
    fn encode(&self, key: &AnyKey) -> String;

    fn decode(&self, name: &str) -> Option<AnyKey>;

    fn decode_type(&self, name: &str) -> Option<AnyContentType> {
        self.decode(name).map(|key| key.content_type().clone())
    }
}

/// The standard mapping: `path` + content type with suffix `s` is stored
/// as `path.s`, with `/` separating path segments.
#[derive(Clone, Debug)]
pub struct SuffixMapping {
    registry: ContentRegistry,
}

impl SuffixMapping {
    pub fn new(registry: ContentRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    fn split(name: &str) -> Option<(&str, &str)> {
        let (stem, suffix) = name.rsplit_once('.')?;
        if stem.is_empty() || stem.ends_with('/') || suffix.contains('/') {
            return None;
        }
        Some((stem, suffix))
    }
}

impl KeyMapping for SuffixMapping {
    fn encode(&self, key: &AnyKey) -> String {
        format!("{}.{}", key.path(), key.content_type().suffix())
    }

    fn decode(&self, name: &str) -> Option<AnyKey> {
        let (stem, suffix) = Self::split(name)?;
        let content_type = self.registry.lookup(suffix)?;
        let path = ArtifactPath::parse(stem).ok()?;
        Some(AnyKey::new(content_type.clone(), path))
    }

    fn decode_type(&self, name: &str) -> Option<AnyContentType> {
        let (_, suffix) = Self::split(name)?;
        self.registry.lookup(suffix).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::{BinaryCodec, ContentType, Key, TextCodec};

    fn path(s: &str) -> ArtifactPath {
        ArtifactPath::parse(s).unwrap()
    }

    #[test]
    fn encode_appends_suffix() {
        let ct = ContentType::new(TextCodec::new("whiley"));
        let mapping = SuffixMapping::new(ContentRegistry::new().with(&ct).unwrap());
        let key = Key::new(&ct, path("std/io/File")).erase();
        assert_eq!(mapping.encode(&key), "std/io/File.whiley");
    }

    #[test]
    fn decode_inverts_encode() {
        let obj = ContentType::new(BinaryCodec::new("o"));
        let lib = ContentType::new(BinaryCodec::new("a"));
        let registry = ContentRegistry::new().with(&obj).unwrap().with(&lib).unwrap();
        let mapping = SuffixMapping::new(registry);

        for key in [
            AnyKey::new(&obj, path("main")),
            AnyKey::new(&lib, path("deps/libz")),
            AnyKey::new(&obj, path("dotted/name.v2")),
        ] {
            let name = mapping.encode(&key);
            assert_eq!(mapping.decode(&name), Some(key.clone()));
            assert_eq!(mapping.decode_type(&name), Some(key.content_type().clone()));
        }
    }

    #[test]
    fn decodes_mixed_value_types() {
        let src = ContentType::new(TextCodec::new("c"));
        let obj = ContentType::new(BinaryCodec::new("o"));
        let registry = ContentRegistry::new().with(&src).unwrap().with(&obj).unwrap();
        let mapping = SuffixMapping::new(registry);

        let source = mapping.decode("util/str.c").unwrap();
        let object = mapping.decode("util/str.o").unwrap();
        assert_eq!(source, Key::new(&src, path("util/str")));
        assert_eq!(object, Key::new(&obj, path("util/str")));
        assert!(object.downcast::<strata_types::TextFile>().is_none());
    }

    #[test]
    fn unrecognized_names_decode_to_none() {
        let ct = ContentType::new(TextCodec::default());
        let mapping = SuffixMapping::new(ContentRegistry::new().with(&ct).unwrap());
        for name in ["README", "notes.md", ".txt", "dir/.txt", "a//b.txt", "x.txt/y", ""] {
            assert!(mapping.decode(name).is_none(), "{name} should not decode");
        }
        assert!(mapping.decode_type("image.png").is_none());
    }

    #[test]
    fn empty_registry_recognizes_nothing() {
        let mapping = SuffixMapping::new(ContentRegistry::new());
        assert!(mapping.decode("a.o").is_none());
    }
}

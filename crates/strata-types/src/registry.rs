use std::collections::BTreeMap;
use std::fmt;

use crate::content::AnyContentType;
use crate::error::TypeError;

/// Resolves file suffixes to content types.
///
/// Used when enumerating raw files without a priori type knowledge. Each
/// suffix maps to at most one content type; content types of different
/// value types share one registry.
#[derive(Clone, Default)]
pub struct ContentRegistry {
    types: BTreeMap<String, AnyContentType>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a content type under its suffix.
    pub fn register(&mut self, content_type: impl Into<AnyContentType>) -> Result<(), TypeError> {
        let content_type = content_type.into();
        let suffix = content_type.suffix().to_string();
        if self.types.contains_key(&suffix) {
            return Err(TypeError::DuplicateSuffix(suffix));
        }
        self.types.insert(suffix, content_type);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, content_type: impl Into<AnyContentType>) -> Result<Self, TypeError> {
        self.register(content_type)?;
        Ok(self)
    }

    pub fn lookup(&self, suffix: &str) -> Option<&AnyContentType> {
        self.types.get(suffix)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered content types, ordered by suffix.
    pub fn iter(&self) -> impl Iterator<Item = &AnyContentType> {
        self.types.values()
    }
}

impl fmt::Debug for ContentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.types.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{BinaryCodec, TextCodec};
    use crate::content::ContentType;

    #[test]
    fn lookup_by_suffix() {
        let obj = ContentType::new(BinaryCodec::new("o"));
        let lib = ContentType::new(BinaryCodec::new("a"));
        let registry = ContentRegistry::new().with(&obj).unwrap().with(&lib).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("o"), Some(&obj.erase()));
        assert_eq!(registry.lookup("a"), Some(&lib.erase()));
        assert!(registry.lookup("so").is_none());
    }

    #[test]
    fn mixed_value_types_share_a_registry() {
        let src = ContentType::new(TextCodec::new("c"));
        let obj = ContentType::new(BinaryCodec::new("o"));
        let registry = ContentRegistry::new().with(&src).unwrap().with(&obj).unwrap();
        let suffixes: Vec<&str> = registry.iter().map(|ct| ct.suffix()).collect();
        assert_eq!(suffixes, vec!["c", "o"]);
        assert!(registry.lookup("c").unwrap().downcast::<crate::TextFile>().is_some());
    }

    #[test]
    fn duplicate_suffix_rejected() {
        let mut registry = ContentRegistry::new();
        registry.register(&ContentType::new(BinaryCodec::new("o"))).unwrap();
        let err = registry
            .register(&ContentType::new(TextCodec::new("o")))
            .unwrap_err();
        assert_eq!(err, TypeError::DuplicateSuffix("o".into()));
        assert_eq!(registry.len(), 1);
    }
}

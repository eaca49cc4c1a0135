use std::fmt;
use std::io::{Read, Write};

use strata_store::KeyMapping;
use strata_types::{Codec, Content, ContentResult, ContentType};

use crate::archive::Archive;

/// Reads and writes whole archives, so that a packaged collection of
/// artifacts can itself be stored as an artifact.
pub struct ArchiveCodec<M> {
    suffix: String,
    mapping: M,
}

impl<M: KeyMapping> ArchiveCodec<M> {
    /// An archive codec with suffix `zip`.
    pub fn new(mapping: M) -> Self {
        Self::with_suffix("zip", mapping)
    }

    pub fn with_suffix(suffix: impl Into<String>, mapping: M) -> Self {
        Self {
            suffix: suffix.into(),
            mapping,
        }
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }
}

impl<M> Codec for ArchiveCodec<M>
where
    M: KeyMapping + Send + Sync + 'static,
{
    type Value = ArchiveFile;

    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn read(
        &self,
        content_type: &ContentType<ArchiveFile>,
        input: &mut dyn Read,
    ) -> ContentResult<ArchiveFile> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        let archive = Archive::from_bytes(&self.mapping, &bytes)?;
        Ok(ArchiveFile::new(content_type, archive))
    }

    fn write(&self, value: &ArchiveFile, output: &mut dyn Write) -> ContentResult<()> {
        let bytes = value.archive.to_bytes(&self.mapping)?;
        output.write_all(&bytes)?;
        Ok(())
    }
}

impl<M> fmt::Debug for ArchiveCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveCodec")
            .field("suffix", &self.suffix)
            .finish()
    }
}

/// An archive artifact, e.g. a packaged library.
pub struct ArchiveFile {
    content_type: ContentType<ArchiveFile>,
    archive: Archive,
}

impl ArchiveFile {
    pub fn new(content_type: &ContentType<ArchiveFile>, archive: Archive) -> Self {
        Self {
            content_type: content_type.clone(),
            archive,
        }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn into_archive(self) -> Archive {
        self.archive
    }
}

impl Content for ArchiveFile {
    fn content_type(&self) -> &ContentType<Self> {
        &self.content_type
    }
}

impl PartialEq for ArchiveFile {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type && self.archive == other.archive
    }
}

impl fmt::Debug for ArchiveFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveFile")
            .field("content_type", &self.content_type)
            .field("archive", &self.archive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use strata_store::{DirectoryStore, Store, SuffixMapping};
    use strata_types::{ArtifactPath, ContentFilter, ContentRegistry, Key, TextCodec, TextFile};

    fn sources() -> (ContentType<TextFile>, SuffixMapping) {
        let txt = ContentType::new(TextCodec::new("java"));
        let mapping = SuffixMapping::new(ContentRegistry::new().with(&txt).unwrap());
        (txt, mapping)
    }

    fn path(s: &str) -> ArtifactPath {
        ArtifactPath::parse(s).unwrap()
    }

    #[test]
    fn codec_round_trips_archive() {
        let (txt, mapping) = sources();
        let jar = ContentType::new(ArchiveCodec::with_suffix("jar", mapping));
        assert_eq!(jar.suffix(), "jar");

        let mut archive = Archive::new();
        archive
            .insert(Key::new(&txt, path("pkg/Main")), Arc::new(TextFile::new(&txt, "class Main {}")))
            .unwrap();
        let file = ArchiveFile::new(&jar, archive);

        let decoded = jar.decode(&jar.encode(&file).unwrap()).unwrap();
        assert_eq!(decoded, file);
        assert_eq!(decoded.content_type(), &jar);
        let main = decoded.archive().get(&Key::new(&txt, path("pkg/Main"))).unwrap().unwrap();
        assert_eq!(main.text(), "class Main {}");
    }

    #[test]
    fn corrupt_archive_is_a_decode_fault() {
        let (_, mapping) = sources();
        let jar = ContentType::new(ArchiveCodec::new(mapping));
        assert!(jar.decode(b"PK but not really").is_err());
    }

    #[test]
    fn archives_share_a_directory_store_with_sources() {
        let dir = tempfile::tempdir().unwrap();
        let (txt, mapping) = sources();
        let jar = ContentType::new(ArchiveCodec::with_suffix("jar", mapping));
        let files = SuffixMapping::new(ContentRegistry::new().with(&txt).unwrap().with(&jar).unwrap());

        let mut archive = Archive::new();
        archive
            .insert(Key::new(&txt, path("A")), Arc::new(TextFile::new(&txt, "class A {}")))
            .unwrap();
        let lib = Key::new(&jar, path("lib/core"));
        let src = Key::new(&txt, path("lib/core"));

        let mut store = DirectoryStore::open(dir.path(), files.clone()).unwrap();
        store.put(lib.clone(), Arc::new(ArchiveFile::new(&jar, archive))).unwrap();
        store.put(src.clone(), Arc::new(TextFile::new(&txt, "class Core {}"))).unwrap();
        assert_eq!(store.synchronise().unwrap().written, 2);
        assert!(dir.path().join("lib").join("core.jar").exists());
        assert!(dir.path().join("lib").join("core.java").exists());

        let mut reopened = DirectoryStore::open(dir.path(), files).unwrap();
        assert_eq!(reopened.matching(&ContentFilter::matching("lib/core")).len(), 2);
        let packaged = reopened.get(&lib).unwrap().unwrap();
        assert_eq!(packaged.archive().len(), 1);
        assert_eq!(reopened.get(&src).unwrap().unwrap().text(), "class Core {}");
    }
}

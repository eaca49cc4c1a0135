//! Built-in codecs for plain text and opaque binary artifacts.

use std::fmt;
use std::io::{Read, Write};

use crate::content::{Codec, Content, ContentType};
use crate::error::{ContentError, ContentResult};

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// UTF-8 text codec.
#[derive(Clone, Debug)]
pub struct TextCodec {
    suffix: String,
}

impl TextCodec {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new("txt")
    }
}

impl Codec for TextCodec {
    type Value = TextFile;

    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn read(
        &self,
        content_type: &ContentType<TextFile>,
        input: &mut dyn Read,
    ) -> ContentResult<TextFile> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ContentError::malformed(&self.suffix, e.to_string()))?;
        Ok(TextFile::new(content_type, text))
    }

    fn write(&self, value: &TextFile, output: &mut dyn Write) -> ContentResult<()> {
        output.write_all(value.text.as_bytes())?;
        Ok(())
    }
}

/// A text artifact, e.g. a source file.
#[derive(Clone)]
pub struct TextFile {
    content_type: ContentType<TextFile>,
    text: String,
}

impl TextFile {
    pub fn new(content_type: &ContentType<TextFile>, text: impl Into<String>) -> Self {
        Self {
            content_type: content_type.clone(),
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The line enclosing byte `offset`, or `None` if `offset` is past the end.
    ///
    /// An offset inside a multi-byte character belongs to that character.
    pub fn line_at(&self, offset: usize) -> Option<Line> {
        if offset >= self.text.len() {
            return None;
        }
        let mut offset = offset;
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let start = self.text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = self.text[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or(self.text.len());
        let number = self.text[..start].matches('\n').count() + 1;
        Some(Line {
            offset: start,
            length: end - start,
            number,
            text: self.text[start..end].to_string(),
        })
    }
}

impl Content for TextFile {
    fn content_type(&self) -> &ContentType<Self> {
        &self.content_type
    }
}

impl PartialEq for TextFile {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type && self.text == other.text
    }
}

impl Eq for TextFile {}

impl fmt::Debug for TextFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFile")
            .field("content_type", &self.content_type)
            .field("len", &self.text.len())
            .finish()
    }
}

/// A single line within a [`TextFile`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Byte offset of the first character of the line.
    pub offset: usize,
    /// Length in bytes, excluding the terminating newline.
    pub length: usize,
    /// 1-based line number.
    pub number: usize,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

/// Codec for opaque byte content. The suffix is chosen by the caller.
#[derive(Clone, Debug)]
pub struct BinaryCodec {
    suffix: String,
}

impl BinaryCodec {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Codec for BinaryCodec {
    type Value = BinaryFile;

    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn read(
        &self,
        content_type: &ContentType<BinaryFile>,
        input: &mut dyn Read,
    ) -> ContentResult<BinaryFile> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        Ok(BinaryFile::new(content_type, bytes))
    }

    fn write(&self, value: &BinaryFile, output: &mut dyn Write) -> ContentResult<()> {
        output.write_all(&value.bytes)?;
        Ok(())
    }
}

/// An opaque binary artifact, e.g. an object file.
#[derive(Clone)]
pub struct BinaryFile {
    content_type: ContentType<BinaryFile>,
    bytes: Vec<u8>,
}

impl BinaryFile {
    pub fn new(content_type: &ContentType<BinaryFile>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.clone(),
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Content for BinaryFile {
    fn content_type(&self) -> &ContentType<Self> {
        &self.content_type
    }
}

impl PartialEq for BinaryFile {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type && self.bytes == other.bytes
    }
}

impl Eq for BinaryFile {}

impl fmt::Debug for BinaryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryFile")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

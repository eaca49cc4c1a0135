use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{ContentError, ContentResult};

/// Converts between raw bytes and a structured value.
///
/// Codecs are pure and stateless. Source files (`*.txt`) are one example,
/// compiled binaries (`*.class`, `*.o`) are another.
pub trait Codec: Send + Sync + 'static {
    /// The in-memory representation produced by this codec.
    type Value: Content;

    /// Suffix identifying instances of this content on disk or in an archive.
    fn suffix(&self) -> &str;

    /// Read a value from `input`.
    ///
    /// `content_type` is the handle this codec was registered under, so
    /// values that remember their own type can be constructed.
    fn read(
        &self,
        content_type: &ContentType<Self::Value>,
        input: &mut dyn Read,
    ) -> ContentResult<Self::Value>;

    /// Write `value` to `output`.
    fn write(&self, value: &Self::Value, output: &mut dyn Write) -> ContentResult<()>;
}

struct Handle<V: 'static> {
    codec: Box<dyn Codec<Value = V>>,
}

/// The type-erased face of a codec handle, shared by [`ContentType`] and
/// [`AnyContentType`].
trait ErasedCodec: Send + Sync {
    fn suffix(&self) -> &str;

    fn read_any(self: Arc<Self>, input: &mut dyn Read) -> ContentResult<AnyValue>;

    fn write_any(&self, value: &dyn AnyContent, output: &mut dyn Write) -> ContentResult<()>;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<V: Content> ErasedCodec for Handle<V> {
    fn suffix(&self) -> &str {
        self.codec.suffix()
    }

    fn read_any(self: Arc<Self>, input: &mut dyn Read) -> ContentResult<AnyValue> {
        let content_type = ContentType { handle: self };
        let value = content_type.read(input)?;
        Ok(Arc::new(value))
    }

    fn write_any(&self, value: &dyn AnyContent, output: &mut dyn Write) -> ContentResult<()> {
        match value.downcast_ref::<V>() {
            Some(value) => self.codec.write(value, output),
            None => Err(ContentError::Mismatch {
                suffix: self.codec.suffix().to_string(),
            }),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A shareable handle to a [`Codec`].
///
/// Two handles are equal only if they were produced by the same call to
/// [`ContentType::new`] (or are clones of it). Two codecs with the same
/// suffix are still distinct content types.
pub struct ContentType<V: 'static> {
    handle: Arc<Handle<V>>,
}

impl<V: Content> ContentType<V> {
    pub fn new<C: Codec<Value = V>>(codec: C) -> Self {
        Self {
            handle: Arc::new(Handle {
                codec: Box::new(codec),
            }),
        }
    }

    pub fn suffix(&self) -> &str {
        self.handle.codec.suffix()
    }

    /// Read a value from a stream.
    pub fn read(&self, input: &mut dyn Read) -> ContentResult<V> {
        self.handle.codec.read(self, input)
    }

    /// Write a value to a stream.
    pub fn write(&self, value: &V, output: &mut dyn Write) -> ContentResult<()> {
        self.handle.codec.write(value, output)
    }

    /// Decode a value from an in-memory buffer.
    pub fn decode(&self, mut bytes: &[u8]) -> ContentResult<V> {
        self.read(&mut bytes)
    }

    /// Encode a value into a fresh buffer.
    pub fn encode(&self, value: &V) -> ContentResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(value, &mut buf)?;
        Ok(buf)
    }

    /// The same handle with its value type erased.
    pub fn erase(&self) -> AnyContentType {
        AnyContentType {
            handle: Arc::clone(&self.handle) as Arc<dyn ErasedCodec>,
        }
    }
}

impl<V: 'static> ContentType<V> {
    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.handle) as *const ()
    }
}

impl<V: 'static> Clone for ContentType<V> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<V: 'static> PartialEq for ContentType<V> {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<V: 'static> Eq for ContentType<V> {}

impl<V: 'static> Hash for ContentType<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<V: Content> fmt::Display for ContentType<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle.codec.suffix())
    }
}

impl<V: Content> fmt::Debug for ContentType<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentType({})", self.handle.codec.suffix())
    }
}

impl<V: Content> From<&ContentType<V>> for AnyContentType {
    fn from(content_type: &ContentType<V>) -> Self {
        content_type.erase()
    }
}

/// A [`ContentType`] whose value type is only known at run time.
///
/// Registries, key mappings and every heterogeneous container hold content
/// types in this form. Identity is shared with the typed handle it was
/// erased from: `ct.erase() == ct.erase()` and `ct.erase() == ct`.
#[derive(Clone)]
pub struct AnyContentType {
    handle: Arc<dyn ErasedCodec>,
}

impl AnyContentType {
    pub fn suffix(&self) -> &str {
        self.handle.suffix()
    }

    /// Read a value from a stream.
    pub fn read(&self, input: &mut dyn Read) -> ContentResult<AnyValue> {
        Arc::clone(&self.handle).read_any(input)
    }

    /// Write a value to a stream. A value of another Rust type is a
    /// [`ContentError::Mismatch`].
    pub fn write(&self, value: &dyn AnyContent, output: &mut dyn Write) -> ContentResult<()> {
        self.handle.write_any(value, output)
    }

    pub fn decode(&self, mut bytes: &[u8]) -> ContentResult<AnyValue> {
        self.read(&mut bytes)
    }

    pub fn encode(&self, value: &dyn AnyContent) -> ContentResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(value, &mut buf)?;
        Ok(buf)
    }

    /// Recover the typed handle, if this content type decodes to `V`.
    pub fn downcast<V: Content>(&self) -> Option<ContentType<V>> {
        Arc::clone(&self.handle)
            .into_any()
            .downcast::<Handle<V>>()
            .ok()
            .map(|handle| ContentType { handle })
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.handle) as *const ()
    }
}

impl PartialEq for AnyContentType {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for AnyContentType {}

impl<V: 'static> PartialEq<ContentType<V>> for AnyContentType {
    fn eq(&self, other: &ContentType<V>) -> bool {
        self.addr() == other.addr()
    }
}

impl Hash for AnyContentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Display for AnyContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl fmt::Debug for AnyContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentType({})", self.suffix())
    }
}

/// A value that knows which content type it belongs to.
///
/// Stores use this to reject a `put` whose key names a different content
/// type than the value.
pub trait Content: Send + Sync + Sized + 'static {
    fn content_type(&self) -> &ContentType<Self>;
}

/// Object-safe view of any [`Content`] value.
///
/// Implemented for every `Content` type. Snapshots, stores and archives
/// hold values as [`AnyValue`] and downcast at their typed accessors.
pub trait AnyContent: Send + Sync + 'static {
    /// The value's own content type.
    fn any_content_type(&self) -> AnyContentType;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Content> AnyContent for T {
    fn any_content_type(&self) -> AnyContentType {
        self.content_type().erase()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A shared, type-erased content value.
pub type AnyValue = Arc<dyn AnyContent>;

impl dyn AnyContent {
    pub fn is<T: Content>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Content>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns `true` if both values are the same allocation, or have the
    /// same content type and encode to the same bytes.
    pub fn same_content(&self, other: &dyn AnyContent) -> bool {
        if std::ptr::addr_eq(self as *const dyn AnyContent, other as *const dyn AnyContent) {
            return true;
        }
        let content_type = self.any_content_type();
        if content_type != other.any_content_type() {
            return false;
        }
        matches!(
            (content_type.encode(self), content_type.encode(other)),
            (Ok(a), Ok(b)) if a == b
        )
    }
}

impl fmt::Debug for dyn AnyContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyContent({})", self.any_content_type())
    }
}

/// Take a shared value back to its concrete type.
pub fn downcast<T: Content>(value: AnyValue) -> Option<Arc<T>> {
    value.into_any().downcast::<T>().ok()
}

//! Content model for the Strata artifact store.
//!
//! Every other Strata crate depends on `strata-types`. It defines how
//! artifacts are addressed and how their bytes are interpreted, but holds
//! no storage of its own.
//!
//! # Key Types
//!
//! - [`ArtifactPath`] -- Structured hierarchical identifier (`src/util/io`)
//! - [`Codec`] / [`ContentType`] -- Byte codec and its identity-compared handle
//! - [`Content`] -- Values that know their own content type
//! - [`AnyContentType`] / [`AnyContent`] / [`AnyKey`] -- The same, with the
//!   value type erased, so one container can hold text, binaries and archives
//! - [`Key`] -- `(content type, path)`, the unique addressing unit
//! - [`Filter`] / [`ContentFilter`] -- Structural predicates used by queries
//! - [`ContentRegistry`] -- Suffix to content type resolution
//! - [`ContentDigest`] -- BLAKE3 fingerprint of encoded bytes
//! - [`TextFile`] / [`BinaryFile`] -- Built-in artifact kinds

pub mod codecs;
pub mod content;
pub mod digest;
pub mod error;
pub mod key;
pub mod path;
pub mod registry;

pub use codecs::{BinaryCodec, BinaryFile, Line, TextCodec, TextFile};
pub use content::{downcast, AnyContent, AnyContentType, AnyValue, Codec, Content, ContentType};
pub use digest::ContentDigest;
pub use error::{ContentError, ContentResult, TypeError};
pub use key::{AnyKey, ContentFilter, Filter, Key};
pub use path::ArtifactPath;
pub use registry::ContentRegistry;

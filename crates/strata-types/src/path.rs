//! Structured, hierarchical artifact identifiers.
//!
//! An [`ArtifactPath`] is a sequence of segments such as `src/main/lib`.
//! Paths never carry a content suffix; the suffix belongs to the content
//! type and is attached only when a key is mapped onto a medium.
//!
//! Valid segments:
//! - Must be non-empty
//! - Must not be `.` or `..`
//! - Must not contain `/`, `\`, `:`, `*`, `?` or NUL

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a segment.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '\0'];

/// Path separator used by [`ArtifactPath::parse`] and `Display`.
pub const SEPARATOR: char = '/';

/// A structured path identifying an artifact.
///
/// Equality, hashing and ordering are segment-wise.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ArtifactPath {
    segments: Vec<String>,
}

impl ArtifactPath {
    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path. The empty string is the root path.
    ///
    /// ```
    /// use strata_types::ArtifactPath;
    ///
    /// let p = ArtifactPath::parse("src/util/io").unwrap();
    /// assert_eq!(p.len(), 3);
    /// assert!(ArtifactPath::parse("src//io").is_err());
    /// assert!(ArtifactPath::parse("../etc").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in s.split(SEPARATOR) {
            validate_segment(s, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Build a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_segment(&segments.join("/"), segment)?;
        }
        Ok(Self { segments })
    }

    /// Append one segment, returning the extended path.
    pub fn join(&self, segment: &str) -> Result<Self, TypeError> {
        validate_segment(segment, segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// The enclosing path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if `prefix` is a segment-wise prefix of this path.
    pub fn starts_with(&self, prefix: &ArtifactPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Glob match against a `/`-separated pattern.
    ///
    /// `*` matches exactly one segment, `**` matches zero or more segments,
    /// anything else matches literally.
    ///
    /// ```
    /// use strata_types::ArtifactPath;
    ///
    /// let p = ArtifactPath::parse("src/util/io").unwrap();
    /// assert!(p.matches("src/**"));
    /// assert!(p.matches("src/*/io"));
    /// assert!(!p.matches("src/*"));
    /// ```
    pub fn matches(&self, pattern: &str) -> bool {
        let pattern: Vec<&str> = if pattern.is_empty() {
            Vec::new()
        } else {
            pattern.split(SEPARATOR).collect()
        };
        glob_match(&pattern, &self.segments)
    }
}

fn validate_segment(path: &str, segment: &str) -> Result<(), TypeError> {
    let invalid = |reason: String| TypeError::InvalidPath {
        path: path.to_string(),
        reason,
    };
    if segment.is_empty() {
        return Err(invalid("segments must not be empty".into()));
    }
    if segment == "." || segment == ".." {
        return Err(invalid(format!("segment must not be {segment:?}")));
    }
    if let Some(ch) = segment.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

fn glob_match(pattern: &[&str], segments: &[String]) -> bool {
    match pattern.split_first() {
        None => segments.is_empty(),
        Some((&"**", rest)) => {
            (0..=segments.len()).any(|skip| glob_match(rest, &segments[skip..]))
        }
        Some((head, rest)) => match segments.split_first() {
            Some((segment, tail)) => {
                (*head == "*" || *head == segment.as_str()) && glob_match(rest, tail)
            }
            None => false,
        },
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Debug for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactPath({self})")
    }
}

impl FromStr for ArtifactPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ArtifactPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

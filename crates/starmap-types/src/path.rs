use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Dot-separated address of a field, e.g. `pricing.tokens.input`.
///
/// Paths are identifiers, not reflection handles: the same path resolves to
/// the same field on every source being compared, independent of how the
/// record struct is laid out.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(String);

impl FieldPath {
    /// Parse and validate a path. Segments must be non-empty.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.is_empty() || s.split('.').any(str::is_empty) {
            return Err(TypeError::InvalidFieldPath(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the dot-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The first segment (`pricing` for `pricing.tokens.input`).
    pub fn root(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// The path without its last segment, or `None` for a single segment.
    pub fn parent(&self) -> Option<FieldPath> {
        self.0
            .rfind('.')
            .map(|idx| FieldPath(self.0[..idx].to_string()))
    }

    /// This path followed by each shorter prefix, longest first.
    ///
    /// `pricing.tokens.input` yields `pricing.tokens.input`, `pricing.tokens`,
    /// `pricing`.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        let s = self.0.as_str();
        std::iter::once(s).chain(
            s.char_indices()
                .rev()
                .filter(|(_, c)| *c == '.')
                .map(move |(idx, _)| &s[..idx]),
        )
    }

    /// Returns `true` if `prefix` equals this path or is a whole-segment
    /// prefix of it.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0 == prefix
            || (self.0.starts_with(prefix) && self.0.as_bytes().get(prefix.len()) == Some(&b'.'))
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({})", self.0)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FieldPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

impl From<&str> for FieldPath {
    /// Unvalidated conversion for literals and for prefixes of paths that
    /// are already valid. Use [`FieldPath::parse`] for untrusted input.
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for FieldPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FieldPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

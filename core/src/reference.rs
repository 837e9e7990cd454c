//! Reference strings and paths.
//!
//! A reference string is `"::"+seg1+"::"+seg2+...`; the empty string denotes
//! the root. Ported from `core/reference.py`.

use std::fmt;

pub const REFERENCE_SEPARATOR: &str = "::";

/// One step in a [`Path`]: either a record field name or a container index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Key(s.to_string())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::Key(s)
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

/// Ordered sequence of [`Segment`]s locating a node relative to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(pub Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, segment: impl Into<Segment>) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    pub fn to_reference(&self) -> String {
        path_to_reference(&self.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_reference())
    }
}

/// Render a sequence of segments as a reference string. Empty path renders
/// to the empty string (root).
pub fn path_to_reference(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return String::new();
    }
    let mut s = String::new();
    for seg in segments {
        s.push_str(REFERENCE_SEPARATOR);
        s.push_str(&seg.to_string());
    }
    s
}

/// Whether a string has the syntactic shape of a reference (starts with
/// `"::"`, or is the empty root reference).
pub fn is_reference_format(value: &str) -> bool {
    value.starts_with(REFERENCE_SEPARATOR)
}

/// Parse a reference string into segments. Integer-looking segments become
/// [`Segment::Index`]; everything else is a [`Segment::Key`].
pub fn reference_to_path(reference: &str) -> Path {
    if reference.is_empty() {
        return Path::root();
    }
    let trimmed = reference.strip_prefix(REFERENCE_SEPARATOR).unwrap_or(reference);
    let segments = trimmed
        .split(REFERENCE_SEPARATOR)
        .map(|part| match part.parse::<usize>() {
            Ok(i) => Segment::Index(i),
            Err(_) => Segment::Key(part.to_string()),
        })
        .collect();
    Path(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn root_path_is_empty_reference() {
        assert_eq!(Path::root().to_reference(), "");
    }

    #[test]
    fn nested_path_joins_with_separator() {
        let path = Path::root().child("a").child(3usize).child("b");
        assert_eq!(path.to_reference(), "::a::3::b");
    }

    #[test]
    fn roundtrips_through_parse() {
        let path = Path::root().child("scope1").child("field").child(2usize);
        let reference = path.to_reference();
        assert_eq!(reference_to_path(&reference), path);
    }

    #[test]
    fn is_reference_format_requires_prefix() {
        assert!(is_reference_format("::foo"));
        assert!(!is_reference_format("foo"));
    }
}

//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse path patterns such as `/docs/{page}` or `/files/{*rest}`
//! - Match request paths segment by segment and extract named captures
//! - Rank patterns so the most specific one wins
//!
//! # Design Decisions
//! - Captures span a whole segment; `{*name}` takes the remainder and must
//!   be the last segment
//! - Static segments compare against the raw path; captured values are
//!   percent-decoded
//! - No regex, matching is O(segments)

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// A pattern that cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("{0:?} must be an absolute path (start with slash)")]
    Relative(String),

    #[error("{pattern:?} has a malformed capture in segment {segment:?}")]
    MalformedCapture { pattern: String, segment: String },

    #[error("{0:?} has a catch-all capture that is not the last segment")]
    WildcardNotLast(String),

    #[error("{pattern:?} captures {name:?} more than once")]
    DuplicateCapture { pattern: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Capture(String),
    Wildcard(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Static(_) => 2,
            Segment::Capture(_) => 1,
            Segment::Wildcard(_) => 0,
        }
    }
}

/// A parsed path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(PatternError::Relative(pattern.to_string()));
        };

        let parts: Vec<&str> = rest.split('/').collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names = HashSet::new();

        for (i, part) in parts.iter().enumerate() {
            let segment = parse_segment(pattern, part)?;
            if let Segment::Capture(name) | Segment::Wildcard(name) = &segment {
                if !names.insert(name.clone()) {
                    return Err(PatternError::DuplicateCapture {
                        pattern: pattern.to_string(),
                        name: name.clone(),
                    });
                }
            }
            if matches!(segment, Segment::Wildcard(_)) && i + 1 != parts.len() {
                return Err(PatternError::WildcardNotLast(pattern.to_string()));
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The pattern with capture names erased. Patterns with the same shape
    /// match exactly the same paths.
    pub fn shape(&self) -> String {
        let mut shape = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            shape.push('/');
            match segment {
                Segment::Static(s) => shape.push_str(s),
                Segment::Capture(_) => shape.push_str("{}"),
                Segment::Wildcard(_) => shape.push_str("{*}"),
            }
        }
        shape
    }

    /// Match a request path, returning the decoded captures on success.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let rest = path.strip_prefix('/')?;
        let mut captures = HashMap::new();
        let mut remaining = rest;

        for (i, segment) in self.segments.iter().enumerate() {
            if let Segment::Wildcard(name) = segment {
                captures.insert(name.clone(), decode(remaining));
                return Some(captures);
            }

            let last = i + 1 == self.segments.len();
            let (part, tail) = match remaining.split_once('/') {
                Some((part, tail)) if !last => (part, tail),
                Some(_) => return None,
                None if last => (remaining, ""),
                None => return None,
            };

            match segment {
                Segment::Static(expected) => {
                    if part != expected {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    captures.insert(name.clone(), decode(part));
                }
                Segment::Wildcard(_) => return None,
            }
            remaining = tail;
        }

        Some(captures)
    }

    /// Orders patterns from most to least specific.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        let ranks = |p: &Self| p.segments.iter().map(Segment::rank).collect::<Vec<_>>();
        ranks(other).cmp(&ranks(self))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(pattern: &str, part: &str) -> Result<Segment, PatternError> {
    let malformed = || PatternError::MalformedCapture {
        pattern: pattern.to_string(),
        segment: part.to_string(),
    };

    if !part.contains(['{', '}']) {
        return Ok(Segment::Static(part.to_string()));
    }

    let inner = part
        .strip_prefix('{')
        .and_then(|p| p.strip_suffix('}'))
        .ok_or_else(malformed)?;
    let (wildcard, name) = match inner.strip_prefix('*') {
        Some(name) => (true, name),
        None => (false, inner),
    };
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(malformed());
    }

    Ok(if wildcard {
        Segment::Wildcard(name.to_string())
    } else {
        Segment::Capture(name.to_string())
    })
}

/// Percent-decode a capture; invalid UTF-8 becomes U+FFFD.
fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captures(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
        let mut found: Vec<_> = PathPattern::parse(pattern)
            .unwrap()
            .match_path(path)?
            .into_iter()
            .collect();
        found.sort();
        Some(found)
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_static_match() {
        assert_eq!(captures("/example", "/example"), Some(vec![]));
        assert_eq!(captures("/example", "/example/"), None);
        assert_eq!(captures("/example", "/other"), None);
        assert_eq!(captures("/", "/"), Some(vec![]));
        assert_eq!(captures("/", "/example"), None);
        assert_eq!(captures("/a/", "/a/"), Some(vec![]));
    }

    #[test]
    fn test_capture_match() {
        assert_eq!(captures("/example/{id}", "/example/wasd"), Some(vec![pair("id", "wasd")]));
        assert_eq!(captures("/example/{id}", "/example/"), None);
        assert_eq!(captures("/example/{id}", "/example/a/b"), None);
        assert_eq!(
            captures("/u/{user}/r/{repo}", "/u/alice/r/reroute"),
            Some(vec![pair("repo", "reroute"), pair("user", "alice")])
        );
        assert_eq!(captures("/s/{q}", "/s/hello%20world"), Some(vec![pair("q", "hello world")]));
        assert_eq!(captures("/s/{q}", "/s/%C3%28"), Some(vec![pair("q", "\u{FFFD}(")]));
    }

    #[test]
    fn test_wildcard_match() {
        assert_eq!(
            captures("/files/{*rest}", "/files/a/b/c.txt"),
            Some(vec![pair("rest", "a/b/c.txt")])
        );
        assert_eq!(captures("/files/{*rest}", "/files/"), Some(vec![pair("rest", "")]));
        assert_eq!(captures("/files/{*rest}", "/files"), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            PathPattern::parse("example").unwrap_err(),
            PatternError::Relative("example".into())
        );
        assert!(matches!(
            PathPattern::parse("/a/{id").unwrap_err(),
            PatternError::MalformedCapture { .. }
        ));
        assert!(matches!(
            PathPattern::parse("/a/x{id}").unwrap_err(),
            PatternError::MalformedCapture { .. }
        ));
        assert!(matches!(
            PathPattern::parse("/a/{}").unwrap_err(),
            PatternError::MalformedCapture { .. }
        ));
        assert_eq!(
            PathPattern::parse("/a/{*rest}/b").unwrap_err(),
            PatternError::WildcardNotLast("/a/{*rest}/b".into())
        );
        assert!(matches!(
            PathPattern::parse("/a/{id}/{id}").unwrap_err(),
            PatternError::DuplicateCapture { .. }
        ));
    }

    #[test]
    fn test_shape_erases_names() {
        let a = PathPattern::parse("/a/{x}/{*rest}").unwrap();
        let b = PathPattern::parse("/a/{y}/{*tail}").unwrap();
        assert_eq!(a.shape(), "/a/{}/{*}");
        assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn test_specificity() {
        let fixed = PathPattern::parse("/a/b").unwrap();
        let capture = PathPattern::parse("/a/{x}").unwrap();
        let wildcard = PathPattern::parse("/a/{*x}").unwrap();

        assert_eq!(fixed.specificity_cmp(&capture), Ordering::Less);
        assert_eq!(capture.specificity_cmp(&wildcard), Ordering::Less);
        assert_eq!(wildcard.specificity_cmp(&fixed), Ordering::Greater);
    }
}

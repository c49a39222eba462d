//! Resource and action patterns used by policy rules.
//!
//! Resource patterns are matched segment by segment against the request
//! path:
//!
//! | Pattern           | Matches                                            |
//! |-------------------|----------------------------------------------------|
//! | `*`               | every path                                         |
//! | `/guides`         | exactly `/guides` (a trailing slash is ignored)    |
//! | `/guides/*`       | `/guides` and everything beneath it                |
//! | `/guides/:id`     | `/guides/42`, not `/guides/42/items`               |
//! | `/guides/{id}/x`  | `/guides/42/x`                                     |
//! | `/a/*/c`          | `/a/b/c` (a non-final `*` is a single segment)     |
//!
//! Prefix matching works on whole segments, so `/admin/*` never matches
//! `/administrator`.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use crate::{Error, Result};

/// A single segment of a [`ResourcePattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Matches any one non-empty path segment.
    Any,
}

/// Compiled resource pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    source: String,
    segments: Vec<Segment>,
    /// When set, the pattern also matches any path below its segments.
    prefix: bool,
}

impl ResourcePattern {
    /// Compiles a resource pattern.
    ///
    /// The pattern must be `*` or start with `/`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();

        if pattern == "*" {
            return Ok(Self {
                source: pattern.to_owned(),
                segments: Vec::new(),
                prefix: true,
            });
        }

        if !pattern.starts_with('/') {
            return Err(Error::config(format!(
                "resource pattern '{pattern}' must start with '/' or be '*'"
            )));
        }

        let raw: Vec<&str> = split_path(pattern).collect();
        let mut prefix = false;
        let mut segments = Vec::with_capacity(raw.len());

        for (index, segment) in raw.iter().enumerate() {
            let is_last = index + 1 == raw.len();
            match *segment {
                "*" if is_last => prefix = true,
                "*" => segments.push(Segment::Any),
                s if is_placeholder(s) => segments.push(Segment::Any),
                s if s.contains('*') => {
                    return Err(Error::config(format!(
                        "resource pattern '{pattern}' uses '*' inside a segment"
                    )));
                }
                s => segments.push(Segment::Literal(s.to_owned())),
            }
        }

        Ok(Self {
            source: pattern.to_owned(),
            segments,
            prefix,
        })
    }

    /// Returns `true` if `path` is covered by this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let mut path_segments = split_path(path);

        for expected in &self.segments {
            let Some(actual) = path_segments.next() else {
                return false;
            };

            if let Segment::Literal(literal) = expected
                && literal != actual
            {
                return false;
            }
        }

        self.prefix || path_segments.next().is_none()
    }

    /// Returns the pattern as written in the policy source.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for ResourcePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compiled action pattern.
///
/// Accepts `*`, a single verb (`GET`), or an alternation written either as
/// `GET|POST` or `(GET)|(POST)`. Verbs are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPattern {
    /// Any action.
    Any,
    /// One of the listed verbs, stored upper-cased.
    OneOf(Vec<String>),
}

impl ActionPattern {
    /// Compiles an action pattern.
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern == "*" {
            return Ok(Self::Any);
        }

        let verbs: Vec<String> = pattern
            .split('|')
            .map(|verb| {
                verb.trim()
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .trim()
                    .to_ascii_uppercase()
            })
            .collect();

        if verbs.iter().any(String::is_empty) {
            return Err(Error::config(format!(
                "action pattern '{pattern}' contains an empty verb"
            )));
        }

        Ok(Self::OneOf(verbs))
    }

    /// Returns `true` if `action` is covered by this pattern.
    pub fn matches(&self, action: &str) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(verbs) => verbs.iter().any(|verb| verb.eq_ignore_ascii_case(action)),
        }
    }

    /// Convenience wrapper over [`matches`](Self::matches) for HTTP methods.
    #[inline]
    pub fn matches_method(&self, method: &Method) -> bool {
        self.matches(method.as_str())
    }
}

impl FromStr for ActionPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ActionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::OneOf(verbs) => f.write_str(&verbs.join("|")),
        }
    }
}

/// Splits a path into its non-empty segments.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn is_placeholder(segment: &str) -> bool {
    (segment.starts_with(':') && segment.len() > 1)
        || (segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> ResourcePattern {
        ResourcePattern::parse(s).unwrap()
    }

    #[test]
    fn literal_pattern_matches_exact_path() {
        let p = pattern("/admin/student_guides");
        assert!(p.matches("/admin/student_guides"));
        assert!(p.matches("/admin/student_guides/"));
        assert!(!p.matches("/admin/student_guides/42"));
        assert!(!p.matches("/admin"));
        assert!(!p.matches("/admin/student_guide"));
    }

    #[test]
    fn trailing_wildcard_is_segment_prefix() {
        let p = pattern("/admin/*");
        assert!(p.matches("/admin"));
        assert!(p.matches("/admin/image"));
        assert!(p.matches("/admin/student_guides/42"));
        assert!(!p.matches("/administrator"));
        assert!(!p.matches("/content/admin/image"));
    }

    #[test]
    fn inner_wildcard_matches_single_segment() {
        let p = pattern("/student_guides/*/permissions");
        assert!(p.matches("/student_guides/42/permissions"));
        assert!(!p.matches("/student_guides/permissions"));
        assert!(!p.matches("/student_guides/1/2/permissions"));
    }

    #[test]
    fn placeholders_match_single_segment() {
        for source in ["/student_guides/:id", "/student_guides/{id}"] {
            let p = pattern(source);
            assert!(p.matches("/student_guides/42"), "{source}");
            assert!(!p.matches("/student_guides"), "{source}");
            assert!(!p.matches("/student_guides/42/x"), "{source}");
        }
    }

    #[test]
    fn bare_star_matches_everything() {
        let p = pattern("*");
        assert!(p.matches("/"));
        assert!(p.matches("/anything/at/all"));
    }

    #[test]
    fn root_pattern_matches_root_only() {
        let p = pattern("/");
        assert!(p.matches("/"));
        assert!(!p.matches("/guides"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(ResourcePattern::parse("admin/*").is_err());
        assert!(ResourcePattern::parse("/ad*min").is_err());
    }

    #[test]
    fn action_alternation_forms() {
        let plain = ActionPattern::parse("GET|POST").unwrap();
        let casbin = ActionPattern::parse("(GET)|(POST)").unwrap();
        assert_eq!(plain, casbin);
        assert!(plain.matches("post"));
        assert!(plain.matches_method(&Method::GET));
        assert!(!plain.matches_method(&Method::DELETE));
    }

    #[test]
    fn action_star_and_errors() {
        assert!(ActionPattern::parse("*").unwrap().matches("PATCH"));
        assert!(ActionPattern::parse("GET||POST").is_err());
        assert!(ActionPattern::parse("").is_err());
    }
}

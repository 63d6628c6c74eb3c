// Copyright 2025 Central Dogma Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::error::CoreError;

/// Validates an absolute, slash-delimited entry path: must start with `/`,
/// must not contain empty segments, `.` or `..` segments.
pub fn validate_path(path: &str) -> Result<(), CoreError> {
    if !path.starts_with('/') {
        return Err(CoreError::InvalidPath(format!(
            "path must be absolute: {path}"
        )));
    }
    for segment in path.split('/').skip(1) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(CoreError::InvalidPath(format!(
                "invalid path segment in {path}"
            )));
        }
    }
    Ok(())
}

/// A glob path pattern: `**` matches any number of segments, `*` matches
/// exactly one segment, and a pattern may be a comma-separated list of
/// alternatives, any one of which matching is sufficient.
#[derive(Debug, Clone)]
pub struct PathPattern {
    alternatives: Vec<Vec<Segment>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// May itself contain `*` wildcards (matching any run of characters
    /// within the segment, never across a `/`), so `*.json` and
    /// `release-*` are valid segments, not only a bare `*`.
    Literal(String),
    Star,
    DoubleStar,
}

/// Glob-matches a single path segment against a pattern segment that may
/// contain `*` wildcards (each matching zero or more characters, never
/// spanning the segment boundary since segments are already split on `/`).
fn segment_matches(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            if !rest.starts_with(part) {
                return false;
            }
            rest = &rest[part.len()..];
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else if let Some(pos) = rest.find(part) {
            rest = &rest[pos + part.len()..];
        } else {
            return false;
        }
    }
    true
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, CoreError> {
        if pattern.is_empty() {
            return Err(CoreError::InvalidPattern("empty pattern".to_string()));
        }
        let mut alternatives = Vec::new();
        for alt in pattern.split(',') {
            let alt = alt.trim();
            if alt.is_empty() {
                return Err(CoreError::InvalidPattern(format!(
                    "empty alternative in {pattern}"
                )));
            }
            let segments = alt
                .trim_start_matches('/')
                .split('/')
                .map(|s| match s {
                    "**" => Segment::DoubleStar,
                    "*" => Segment::Star,
                    other => Segment::Literal(other.to_string()),
                })
                .collect();
            alternatives.push(segments);
        }
        Ok(PathPattern { alternatives })
    }

    /// Matches against an absolute path (leading `/` stripped before comparison).
    pub fn matches(&self, path: &str) -> bool {
        let path_segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        self.alternatives
            .iter()
            .any(|alt| match_segments(alt, &path_segments))
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match (pattern.first(), path.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(Segment::DoubleStar), _) => {
            // ** matches zero or more remaining segments.
            if match_segments(&pattern[1..], path) {
                return true;
            }
            if !path.is_empty() && match_segments(pattern, &path[1..]) {
                return true;
            }
            false
        }
        (Some(Segment::Star), Some(_)) => match_segments(&pattern[1..], &path[1..]),
        (Some(Segment::Star), None) => false,
        (Some(Segment::Literal(lit)), Some(seg)) => {
            segment_matches(lit, seg) && match_segments(&pattern[1..], &path[1..])
        }
        (Some(Segment::Literal(_)), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_absolute_path() {
        assert!(validate_path("/a/b.json").is_ok());
        assert!(validate_path("a/b.json").is_err());
        assert!(validate_path("/a/../b").is_err());
        assert!(validate_path("/a//b").is_err());
    }

    #[test]
    fn star_matches_one_segment() {
        let p = PathPattern::parse("/configs/*.json").unwrap();
        assert!(p.matches("/configs/a.json"));
        assert!(!p.matches("/configs/sub/a.json"));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let p = PathPattern::parse("/configs/**").unwrap();
        assert!(p.matches("/configs/a.json"));
        assert!(p.matches("/configs/sub/deep/a.json"));
        assert!(p.matches("/configs"));
    }

    #[test]
    fn star_matches_partial_segment() {
        let p = PathPattern::parse("/release-*").unwrap();
        assert!(p.matches("/release-1.2.3"));
        assert!(!p.matches("/beta-1.2.3"));
        assert!(!p.matches("/release-1.2.3/extra"));
    }

    #[test]
    fn comma_separates_alternatives() {
        let p = PathPattern::parse("/a.json,/b.json").unwrap();
        assert!(p.matches("/a.json"));
        assert!(p.matches("/b.json"));
        assert!(!p.matches("/c.json"));
    }
}

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

//! A small `.gitignore`-style matcher for `REMOTE_TO_LOCAL` mirroring
//! (SPEC_FULL.md §4.D "applying `gitignore` and path-validity rules").
//! Supports the common subset: blank lines and `#` comments are skipped,
//! `!pattern` negates an earlier match, and each pattern reuses the
//! repository path-glob syntax (`*`, `**`) against the path relative to
//! `remotePath`. This is not a full `.gitignore` implementation (no
//! anchoring semantics for bare filenames vs `/`-rooted patterns beyond
//! what `PathPattern` already gives us) but covers the cases the scheduler
//! needs: excluding whole subtrees and file extensions.

use dogma_core::PathPattern;

enum Rule {
    Ignore(PathPattern),
    Allow(PathPattern),
}

pub struct Gitignore {
    rules: Vec<Rule>,
}

impl Gitignore {
    pub fn parse(source: &str) -> Self {
        let mut rules = Vec::new();
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (negate, pattern) = match line.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let glob = normalize(pattern);
            let Ok(parsed) = PathPattern::parse(&glob) else {
                continue;
            };
            rules.push(if negate {
                Rule::Allow(parsed)
            } else {
                Rule::Ignore(parsed)
            });
        }
        Self { rules }
    }

    /// Last matching rule wins, matching `.gitignore`'s own precedence.
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let path = format!("/{}", rel_path.trim_start_matches('/'));
        let mut ignored = false;
        for rule in &self.rules {
            match rule {
                Rule::Ignore(p) if p.matches(&path) => ignored = true,
                Rule::Allow(p) if p.matches(&path) => ignored = false,
                _ => {}
            }
        }
        ignored
    }
}

/// A bare pattern like `target` or `*.log` should match at any depth, the
/// way `.gitignore` treats patterns with no embedded `/`; any pattern,
/// rooted or not, also matches everything beneath it when it names a
/// directory rather than a single file.
fn normalize(pattern: &str) -> String {
    let trimmed = pattern.trim_end_matches('/').trim_start_matches('/');
    if pattern.contains('/') {
        format!("{trimmed},{trimmed}/**")
    } else {
        format!("{trimmed},{trimmed}/**,**/{trimmed},**/{trimmed}/**")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_matching_extension_at_any_depth() {
        let gi = Gitignore::parse("*.log");
        assert!(gi.is_ignored("debug.log"));
        assert!(gi.is_ignored("nested/deep/debug.log"));
        assert!(!gi.is_ignored("debug.json"));
    }

    #[test]
    fn negation_re_allows_a_previously_ignored_path() {
        let gi = Gitignore::parse("*.log\n!important.log");
        assert!(gi.is_ignored("debug.log"));
        assert!(!gi.is_ignored("important.log"));
    }

    #[test]
    fn rooted_pattern_only_matches_its_own_subtree() {
        let gi = Gitignore::parse("/build");
        assert!(gi.is_ignored("build/output.json"));
        assert!(!gi.is_ignored("nested/build/output.json"));
    }

    #[test]
    fn empty_gitignore_ignores_nothing() {
        let gi = Gitignore::parse("");
        assert!(!gi.is_ignored("anything.json"));
    }
}

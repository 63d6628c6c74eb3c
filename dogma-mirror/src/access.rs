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

//! `MirrorAccessController` (SPEC_FULL.md §4.D "Access control"): an
//! ordered list of `(targetPattern, allow)` rules, first match wins,
//! default deny.

use dogma_core::PathPattern;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRule {
    pub id: String,
    pub order: i32,
    pub target_pattern: String,
    pub allow: bool,
}

/// Evaluates `isAllowed(uri)` against an ordered rule set; rules are
/// re-sorted by `order` on construction so callers can hand them over in
/// any order (e.g. straight from a meta-repository listing).
pub struct MirrorAccessController {
    rules: Vec<AccessRule>,
}

impl MirrorAccessController {
    pub fn new(mut rules: Vec<AccessRule>) -> Self {
        rules.sort_by_key(|r| r.order);
        Self { rules }
    }

    /// SPEC_FULL.md §8 testable property: "`isAllowed(uri)` = value of the
    /// `allow` flag of the first rule (by `order`) whose `targetPattern`
    /// matches; deny if none." Patterns reuse the repository path-glob
    /// matcher (`**`, `*`, comma-alternatives) against the URI treated as
    /// a slash-delimited string.
    pub fn is_allowed(&self, uri: &str) -> bool {
        for rule in &self.rules {
            let Ok(pattern) = PathPattern::parse(&rule.target_pattern) else {
                continue;
            };
            if pattern.matches(uri) {
                return rule.allow;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, order: i32, pattern: &str, allow: bool) -> AccessRule {
        AccessRule {
            id: id.to_string(),
            order,
            target_pattern: pattern.to_string(),
            allow,
        }
    }

    #[test]
    fn default_is_deny() {
        let controller = MirrorAccessController::new(vec![]);
        assert!(!controller.is_allowed("/github.com/foo/bar"));
    }

    #[test]
    fn first_matching_rule_by_order_wins() {
        let controller = MirrorAccessController::new(vec![
            rule("deny-all", 10, "/**", false),
            rule("allow-foo", 0, "/github.com/foo/**", true),
        ]);
        assert!(controller.is_allowed("/github.com/foo/bar"));
        assert!(!controller.is_allowed("/github.com/other/bar"));
    }

    #[test]
    fn rules_are_evaluated_in_order_regardless_of_insertion_order() {
        let controller = MirrorAccessController::new(vec![
            rule("allow-foo", 5, "/github.com/foo/**", true),
            rule("deny-all", 1, "/**", false),
        ]);
        // order=1 (deny-all) matches first even though it was inserted
        // second.
        assert!(!controller.is_allowed("/github.com/foo/bar"));
    }
}

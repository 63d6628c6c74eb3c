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
use serde::{Deserialize, Serialize};
use std::fmt;

/// A revision number of a [`crate::Commit`].
///
/// Positive values are absolute (`1` is the initial commit). Negative values
/// are relative to head: `-1` is head itself, `-2` the commit before it, and
/// so on. `0` is never a valid revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(i32);

impl Revision {
    /// Revision `1`, the repository's first commit.
    pub const INIT: Revision = Revision(1);
    /// Revision `-1`, a relative reference to head.
    pub const HEAD: Revision = Revision(-1);

    pub fn new(value: i32) -> Self {
        Revision(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_relative(&self) -> bool {
        self.0 < 0
    }

    /// Resolves this revision against a concrete `head` revision number,
    /// returning an absolute, 1-based revision.
    ///
    /// On an empty repository (`head == 0`) there is no absolute revision
    /// yet, but `HEAD` (`-1`) still normalizes to `0` — the state "before
    /// the first commit" — so that the first commit to a fresh repository
    /// can be proposed against it.
    pub fn normalize(&self, head: i32) -> Result<Revision, CoreError> {
        if self.0 == 0 {
            return Err(CoreError::RevisionNotFound(self.0));
        }
        if head == 0 {
            return if self.0 == -1 {
                Ok(Revision(0))
            } else {
                Err(CoreError::RevisionNotFound(self.0))
            };
        }
        let abs = if self.0 < 0 { head + self.0 + 1 } else { self.0 };
        if abs < 1 || abs > head {
            return Err(CoreError::RevisionNotFound(self.0));
        }
        Ok(Revision(abs))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Revision {
    fn from(v: i32) -> Self {
        Revision(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_head() {
        assert_eq!(Revision::HEAD.normalize(5).unwrap(), Revision::new(5));
    }

    #[test]
    fn normalize_relative() {
        assert_eq!(Revision::new(-2).normalize(5).unwrap(), Revision::new(4));
    }

    #[test]
    fn normalize_absolute() {
        assert_eq!(Revision::new(3).normalize(5).unwrap(), Revision::new(3));
    }

    #[test]
    fn normalize_zero_fails() {
        assert!(Revision::new(0).normalize(5).is_err());
    }

    #[test]
    fn normalize_out_of_range_fails() {
        assert!(Revision::new(6).normalize(5).is_err());
        assert!(Revision::new(-6).normalize(5).is_err());
    }

    #[test]
    fn normalize_head_on_empty_repo() {
        assert_eq!(Revision::HEAD.normalize(0).unwrap(), Revision::new(0));
    }

    #[test]
    fn normalize_absolute_on_empty_repo_fails() {
        assert!(Revision::new(1).normalize(0).is_err());
        assert!(Revision::new(-2).normalize(0).is_err());
    }
}

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

//! Entry- and tree-level diffing (SPEC_FULL.md §4.A "Diff semantics"):
//! RFC-6902 JSON patches for JSON/YAML entries, unified diffs for text.

use crate::error::StorageError;
use dogma_core::{EntryContent, EntryType};
use serde::{Deserialize, Serialize};
use similar::{Algorithm, TextDiff};
use std::collections::BTreeMap;

/// The diff of a single entry between two revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryDiff {
    /// The entry exists only on the new side.
    Upsert(EntryContent),
    /// The entry exists only on the old side.
    Remove,
    /// RFC-6902 JSON patch, present on both sides with the same JSON/YAML type.
    JsonPatch(serde_json::Value),
    /// Unified-format textual diff, present on both sides as text.
    TextPatch(String),
}

/// A full comparison between two trees, keyed by path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeDiff {
    pub changes: BTreeMap<String, EntryDiff>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Diffs two entries at the same path. `old`/`new` are `None` when the path
/// is absent on that side (an upsert or a removal).
pub fn diff_entries(
    old: Option<&EntryContent>,
    new: Option<&EntryContent>,
) -> Result<Option<EntryDiff>, StorageError> {
    match (old, new) {
        (None, None) => Ok(None),
        (None, Some(new)) => Ok(Some(EntryDiff::Upsert(new.clone()))),
        (Some(_), None) => Ok(Some(EntryDiff::Remove)),
        (Some(old), Some(new)) => {
            if old == new {
                return Ok(None);
            }
            match (old.entry_type(), new.entry_type()) {
                (EntryType::Json, EntryType::Json) | (EntryType::Yaml, EntryType::Yaml) => {
                    let old_json = old.as_json().expect("json/yaml entry has json content");
                    let new_json = new.as_json().expect("json/yaml entry has json content");
                    let patch = json_patch::diff(old_json, new_json);
                    let value = serde_json::to_value(&patch)
                        .map_err(|e| StorageError::QueryExecution(e.to_string()))?;
                    Ok(Some(EntryDiff::JsonPatch(value)))
                }
                (EntryType::Text, EntryType::Text) => {
                    let old_text = old.as_text().unwrap_or_default();
                    let new_text = new.as_text().unwrap_or_default();
                    Ok(Some(EntryDiff::TextPatch(unified_diff(old_text, new_text))))
                }
                _ => Err(StorageError::QueryExecution(
                    "entry type changed across revisions".to_string(),
                )),
            }
        }
    }
}

/// Renders a unified diff between two text blobs using patience diff,
/// matching the ordering/readability tradeoff this diff engine is
/// grounded on.
pub fn unified_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new);
    diff.unified_diff().context_radius(3).to_string()
}

/// Applies a unified-format diff (as produced by [`unified_diff`], or any
/// compatible `@@ -l,s +l,s @@` hunk stream) to `original`, returning the
/// patched text. This is the inverse of `unified_diff`: `apply_unified_diff
/// (a, unified_diff(a, b)) == b`.
pub fn apply_unified_diff(original: &str, patch: &str) -> Result<String, StorageError> {
    let original_lines = split_lines_keep_ending(original);
    let mut result = String::new();
    let mut cursor = 0usize;
    let mut lines = patch.lines().peekable();

    while let Some(line) = lines.next() {
        if line.starts_with("--- ") || line.starts_with("+++ ") || line.is_empty() {
            continue;
        }
        let Some((old_start, _old_len)) = parse_hunk_header(line)? else {
            continue;
        };
        // Copy untouched lines preceding the hunk. `old_start == 0` is the
        // conventional header for a hunk inserted into an empty file.
        let hunk_start = old_start.saturating_sub(1);
        while cursor < hunk_start && cursor < original_lines.len() {
            result.push_str(&original_lines[cursor]);
            cursor += 1;
        }

        while let Some(&next) = lines.peek() {
            if next.starts_with("@@ ") {
                break;
            }
            let body = lines.next().unwrap();
            if body.starts_with('\\') {
                // "\ No newline at end of file" — the preceding line's
                // ending was already taken verbatim from the source text.
                continue;
            }
            if body.is_empty() {
                continue;
            }
            let (tag, content) = body.split_at(1);
            match tag {
                " " => {
                    if cursor >= original_lines.len() {
                        return Err(StorageError::QueryExecution(
                            "patch context exceeds file length".to_string(),
                        ));
                    }
                    result.push_str(&original_lines[cursor]);
                    cursor += 1;
                }
                "-" => {
                    if cursor >= original_lines.len() {
                        return Err(StorageError::QueryExecution(
                            "patch removes past end of file".to_string(),
                        ));
                    }
                    cursor += 1;
                }
                "+" => {
                    result.push_str(content);
                    if lines.peek().map_or(true, |l| !l.starts_with('\\')) {
                        result.push('\n');
                    }
                }
                _ => {
                    return Err(StorageError::QueryExecution(format!(
                        "invalid hunk line: {body}"
                    )))
                }
            }
        }
    }

    while cursor < original_lines.len() {
        result.push_str(&original_lines[cursor]);
        cursor += 1;
    }
    Ok(result)
}

fn split_lines_keep_ending(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split_inclusive('\n').map(str::to_string).collect()
    }
}

/// Parses a `@@ -l,s +l,s @@` hunk header, returning the old side's
/// `(start, len)`. Returns `Ok(None)` for a line that isn't a hunk header.
fn parse_hunk_header(line: &str) -> Result<Option<(usize, usize)>, StorageError> {
    let Some(rest) = line.strip_prefix("@@ ") else {
        return Ok(None);
    };
    let Some(inner) = rest.split(" @@").next() else {
        return Ok(None);
    };
    let old_part = inner.split_whitespace().next().ok_or_else(|| {
        StorageError::QueryExecution(format!("invalid hunk header: {line}"))
    })?;
    parse_range(old_part, line).map(Some)
}

fn parse_range(part: &str, line: &str) -> Result<(usize, usize), StorageError> {
    let trimmed = part.trim_start_matches(['-', '+']);
    let mut fields = trimmed.splitn(2, ',');
    let start: usize = fields
        .next()
        .unwrap_or("0")
        .parse()
        .map_err(|_| StorageError::QueryExecution(format!("invalid hunk header: {line}")))?;
    let len: usize = fields.next().and_then(|s| s.parse().ok()).unwrap_or(1);
    Ok((start, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_entries_produce_no_diff() {
        let a = EntryContent::Text("same\n".to_string());
        assert!(diff_entries(Some(&a), Some(&a)).unwrap().is_none());
    }

    #[test]
    fn json_diff_emits_json_patch() {
        let old = EntryContent::Json(serde_json::json!({"x": 1}));
        let new = EntryContent::Json(serde_json::json!({"x": 2}));
        let diff = diff_entries(Some(&old), Some(&new)).unwrap().unwrap();
        assert!(matches!(diff, EntryDiff::JsonPatch(_)));
    }

    #[test]
    fn numeric_equivalence_is_a_no_op() {
        let old = EntryContent::Json(serde_json::json!({"x": 1}));
        let new = EntryContent::Json(serde_json::json!({"x": 1.0}));
        // serde_json collapses 1 and 1.0 to the same Value, so this is a no-op.
        assert!(diff_entries(Some(&old), Some(&new)).unwrap().is_none());
    }

    #[test]
    fn text_diff_is_unified_format() {
        let old = EntryContent::Text("line1\nline2\n".to_string());
        let new = EntryContent::Text("line1\nline2-modified\n".to_string());
        let diff = diff_entries(Some(&old), Some(&new)).unwrap().unwrap();
        match diff {
            EntryDiff::TextPatch(text) => {
                assert!(text.contains("-line2"));
                assert!(text.contains("+line2-modified"));
            }
            _ => panic!("expected text patch"),
        }
    }

    #[test]
    fn apply_unified_diff_round_trips() {
        let old = "line1\nline2\nline3\n";
        let new = "line1\nline2-modified\nline3\nline4\n";
        let patch = unified_diff(old, new);
        assert_eq!(apply_unified_diff(old, &patch).unwrap(), new);
    }

    #[test]
    fn apply_unified_diff_handles_pure_insertion() {
        let old = "";
        let new = "first\nsecond\n";
        let patch = unified_diff(old, new);
        assert_eq!(apply_unified_diff(old, &patch).unwrap(), new);
    }

    #[test]
    fn apply_unified_diff_handles_pure_removal() {
        let old = "a\nb\nc\n";
        let new = "a\nc\n";
        let patch = unified_diff(old, new);
        assert_eq!(apply_unified_diff(old, &patch).unwrap(), new);
    }

    #[test]
    fn type_change_is_an_error() {
        let old = EntryContent::Json(serde_json::json!({"x": 1}));
        let new = EntryContent::Text("x".to_string());
        assert!(diff_entries(Some(&old), Some(&new)).is_err());
    }

    #[test]
    fn creation_is_upsert_removal_is_remove() {
        let new = EntryContent::Text("new\n".to_string());
        assert!(matches!(
            diff_entries(None, Some(&new)).unwrap().unwrap(),
            EntryDiff::Upsert(_)
        ));
        assert!(matches!(
            diff_entries(Some(&new), None).unwrap().unwrap(),
            EntryDiff::Remove
        ));
    }
}

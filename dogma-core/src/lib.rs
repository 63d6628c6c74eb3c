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

//! Shared data model and ambient utilities for Central Dogma's storage and
//! coordination engine: revisions, entries, changes, commits, projects, path
//! patterns and the layered process configuration.

pub mod change;
pub mod commit;
pub mod config;
pub mod entry;
pub mod error;
pub mod pattern;
pub mod project;
pub mod revision;

pub use change::{Change, ChangeContent};
pub use commit::{Author, Commit, CommitDetail, CommitMessage};
pub use config::DogmaConfig;
pub use entry::{Entry, EntryContent, EntryType};
pub use error::CoreError;
pub use pattern::PathPattern;
pub use project::{Project, RepositoryMeta, RepositoryStatus, META_REPOSITORY_NAME};
pub use revision::Revision;

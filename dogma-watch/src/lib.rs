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

//! The Watch Engine (SPEC_FULL.md §4.C): long-poll subscriptions over the
//! commit-event mediator channel, with jittered timeouts.

pub mod engine;
pub mod error;
pub mod jitter;

pub use engine::{WatchEngine, WatchMetrics};
pub use error::WatchError;
pub use jitter::apply_jitter;

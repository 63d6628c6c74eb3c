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

//! Timeout jitter (SPEC_FULL.md §4.C.1): `effective = requested *
//! uniform(0.8, 1.0)`, with the requested timeout clamped to `policyMax`
//! *before* jitter is sampled, so jitter only ever narrows an
//! already-capped timeout and never extends it past the policy ceiling.

use rand::Rng;
use std::time::Duration;

/// Computes the jittered, policy-clamped effective timeout for a watch
/// request's requested timeout, both in milliseconds.
pub fn apply_jitter(requested_ms: u64, policy_max_ms: u64) -> Duration {
    let capped = requested_ms.min(policy_max_ms);
    let factor: f64 = rand::thread_rng().gen_range(0.8..=1.0);
    let effective = (capped as f64 * factor).round() as u64;
    Duration::from_millis(effective)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_never_extends_past_policy_max() {
        for _ in 0..1000 {
            let d = apply_jitter(10_000, 5_000);
            assert!(d.as_millis() <= 5_000);
        }
    }

    #[test]
    fn jitter_stays_within_the_capped_interval() {
        for _ in 0..1000 {
            let d = apply_jitter(1_000, 60_000);
            let ms = d.as_millis() as u64;
            assert!((800..=1_000).contains(&ms), "{ms} out of [800, 1000]");
        }
    }

    #[test]
    fn requested_under_policy_max_is_not_clamped_before_jitter() {
        // requested=100, policyMax=60_000: capped stays 100, jitter narrows
        // it to [80, 100], never up toward policyMax.
        for _ in 0..1000 {
            let d = apply_jitter(100, 60_000);
            let ms = d.as_millis() as u64;
            assert!((80..=100).contains(&ms), "{ms} out of [80, 100]");
        }
    }
}

/*
 * Created on Wed Jul 29 2026
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2026, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

use rand::Rng;

/// A half-open `[start, end)` key range owned exclusively by one worker.
///
/// No two workers are ever handed overlapping ranges, so the oracle replay in
/// [`crate::workload`] can assert agreement after every single operation
/// without risking a cross-thread race on the same key -- while workers'
/// distinct ranges still land in overlapping branches of the same shared
/// trie, so the structure is under genuine concurrent pressure regardless.
#[derive(Clone, Copy, Debug)]
pub struct KeyRange {
    pub start: u64,
    pub end: u64,
}

impl KeyRange {
    pub fn sample(&self, rng: &mut impl Rng) -> u64 {
        rng.gen_range(self.start..self.end)
    }
}

/// Split `0..total_keys` into `workers` equal (or near-equal) disjoint ranges.
pub fn partition_keyspace(total_keys: u64, workers: usize) -> Vec<KeyRange> {
    let workers = workers.max(1) as u64;
    let chunk = (total_keys / workers).max(1);
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == workers { total_keys } else { start + chunk };
            KeyRange { start, end }
        })
        .collect()
}

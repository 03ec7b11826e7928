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

//! The randomized per-worker workload that a pool of threads replays
//! concurrently against one shared [`CtrieMap`], each against its own
//! [`KeyRange`]. Since a worker's range is never touched by any other
//! worker, its private `HashMap` oracle can assert agreement after *every*
//! operation rather than only at the end of the run -- there is no other
//! writer to race against on those keys -- while the shared trie is still
//! under genuine concurrent pressure, since every worker's distinct range
//! still hashes into overlapping branches of the same structure.

use crate::utils::KeyRange;
use ctrie::{ConditionalOutcome, CtrieMap};
use rand::Rng;
use std::{collections::HashMap, sync::Arc};

#[derive(Clone, Copy, Debug)]
enum Op {
    Insert,
    Remove,
    PutIfAbsent,
    Replace,
    RemoveIf,
}

const OPS: [Op; 5] = [
    Op::Insert,
    Op::Remove,
    Op::PutIfAbsent,
    Op::Replace,
    Op::RemoveIf,
];

/// Summary of one worker's run, logged by the caller once every worker
/// reports back.
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub ops_run: usize,
    pub final_len: usize,
}

/// Run `op_count` randomized operations against `key` values drawn from
/// `range`, checking after every single one that `map` and a private oracle
/// agree. Panics (via `assert_eq!`) at the first divergence.
pub fn run_worker(
    map: &Arc<CtrieMap<u64, u64>>,
    range: KeyRange,
    op_count: usize,
    mut rng: impl Rng,
) -> WorkerReport {
    let mut oracle: HashMap<u64, u64> = HashMap::new();
    for i in 0..op_count {
        let key = range.sample(&mut rng);
        let op = OPS[rng.gen_range(0..OPS.len())];
        // distinguishable but deterministic given (key, i): lets a failing
        // assertion's printed value be traced back to the op that wrote it.
        let value = (key << 20) | i as u64;

        match op {
            Op::Insert => {
                let expected = oracle.insert(key, value);
                let got = map.insert(key, value);
                assert_eq!(got, expected, "insert({key}) diverged from the oracle");
            }
            Op::Remove => {
                let expected = oracle.remove(&key);
                let got = map.remove(&key);
                assert_eq!(got, expected, "remove({key}) diverged from the oracle");
            }
            Op::PutIfAbsent => {
                let expected = oracle.get(&key).copied();
                let got = map.put_if_absent(key, value);
                assert_eq!(got, expected, "put_if_absent({key}) diverged from the oracle");
                oracle.entry(key).or_insert(value);
            }
            Op::Replace => match oracle.get(&key).copied() {
                None => assert_eq!(
                    map.replace(&key, &value, value),
                    ConditionalOutcome::Absent,
                    "replace({key}) should see absent"
                ),
                Some(current) => {
                    // expect the oracle's own current value, so the replace always commits
                    let got = map.replace(&key, &current, value);
                    assert_eq!(got, ConditionalOutcome::Ok, "replace({key}) should commit");
                    oracle.insert(key, value);
                }
            },
            Op::RemoveIf => match oracle.get(&key).copied() {
                None => assert_eq!(
                    map.remove_if(&key, &value),
                    ConditionalOutcome::Absent,
                    "remove_if({key}) should see absent"
                ),
                Some(current) => {
                    let got = map.remove_if(&key, &current);
                    assert_eq!(got, ConditionalOutcome::Ok, "remove_if({key}) should commit");
                    oracle.remove(&key);
                }
            },
        }
        assert_eq!(
            map.get(&key),
            oracle.get(&key).copied(),
            "post-op read of {key} diverged from the oracle"
        );
    }
    WorkerReport {
        ops_run: op_count,
        final_len: oracle.len(),
    }
}

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

//! End-to-end scenarios from §8, plus the round-trip laws and the
//! no-lost-update concurrency property. Exercises the public [`CtrieMap`]
//! facade exclusively; the protocol-level machinery is covered by the inline
//! `#[cfg(test)]` modules next to the code that owns it (see `node.rs`).

use crate::{error::ConditionalOutcome, CtrieMap};
use std::sync::{Arc, Barrier};
use std::thread;

// S1. Empty map lookup.
#[test]
fn s1_empty_map_lookup() {
    let map: CtrieMap<i32, i32> = CtrieMap::new();
    assert_eq!(map.get(&42), None);
}

// S2. Single insert round-trip.
#[test]
fn s2_single_insert_round_trip() {
    let map = CtrieMap::new();
    assert_eq!(map.insert("a", 1), None);
    assert_eq!(map.get(&"a"), Some(1));
    assert_eq!(map.remove(&"a"), Some(1));
    assert_eq!(map.get(&"a"), None);
}

// S3. Hash-colliding keys. A newtype whose Hash impl ignores its payload
// forces every value into the same bucket, so two distinct keys land in a
// `Collisions` leaf together.
#[derive(Clone, Eq, PartialEq, Debug)]
struct SameHash(u32);

impl std::hash::Hash for SameHash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        0u64.hash(state);
    }
}

#[test]
fn s3_hash_colliding_keys() {
    let map = CtrieMap::new();
    let k1 = SameHash(1);
    let k2 = SameHash(2);
    map.insert(k1.clone(), 1);
    map.insert(k2.clone(), 2);
    assert_eq!(map.get(&k1), Some(1));
    assert_eq!(map.get(&k2), Some(2));
    assert_eq!(map.remove(&k1), Some(1));
    assert_eq!(map.get(&k2), Some(2));
    assert_eq!(map.get(&k1), None);
}

// S3b. Keys whose hashes agree through every branchable level (bits 0-34) but
// differ above the §4.1 cutoff. A naive implementation that keeps branching
// past MAX_BRANCH_LEVEL would still answer these lookups correctly, so this
// only catches the regression when paired with the introspect check below.
#[derive(Clone, Default)]
struct IdentityHasher(u64);

impl std::hash::Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }
    fn write(&mut self, _bytes: &[u8]) {
        unreachable!("identity hasher test only ever hashes u64 keys");
    }
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }
}

#[derive(Clone, Default)]
struct IdentityBuildHasher;

impl std::hash::BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher(0)
    }
}

#[test]
fn s3b_hash_colliding_above_branch_cutoff_without_full_hash_equality() {
    let map: CtrieMap<u64, u64, IdentityBuildHasher> = CtrieMap::with_hasher(IdentityBuildHasher);
    let k1 = 0u64;
    let k2 = 1u64 << 40; // agrees with k1 through bit 34, differs only above the cutoff
    map.insert(k1, 1);
    map.insert(k2, 2);
    assert_eq!(map.get(&k1), Some(1));
    assert_eq!(map.get(&k2), Some(2));
    assert_eq!(map.remove(&k1), Some(1));
    assert_eq!(map.get(&k2), Some(2));
    assert_eq!(map.get(&k1), None);
}

#[cfg(feature = "introspect")]
#[test]
fn s3b_structural_invariants_hold_above_branch_cutoff() {
    let map: CtrieMap<u64, u64, IdentityBuildHasher> = CtrieMap::with_hasher(IdentityBuildHasher);
    let k1 = 0u64;
    let k2 = 1u64 << 40;
    map.insert(k1, 1);
    map.insert(k2, 2);
    assert!(crate::introspect::check(&map).is_empty());
}

// S4. Snapshot isolation.
#[test]
fn s4_snapshot_isolation() {
    let live = CtrieMap::new();
    live.insert("x", 1);
    let snap = live.snapshot();
    live.insert("x", 2);
    assert_eq!(live.get(&"x"), Some(2));
    assert_eq!(snap.get(&"x"), Some(1));
}

// S5. Post-snapshot write to frozen.
#[test]
fn s5_post_snapshot_write_to_frozen() {
    let live = CtrieMap::new();
    live.insert("x", 1);
    let snap = live.snapshot();
    live.insert("x", 2);
    snap.insert("y", 9);
    assert_eq!(live.get(&"y"), None);
    assert_eq!(snap.get(&"y"), Some(9));
}

// S6. Concurrent put_if_absent: exactly one of n racing threads wins.
#[test]
fn s6_concurrent_put_if_absent_has_one_winner() {
    const THREADS: usize = 8;
    let map = Arc::new(CtrieMap::new());
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|tid| {
            let map = map.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                map.put_if_absent("k", tid)
            })
        })
        .collect();
    let results: Vec<Option<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter(|r| r.is_none()).collect();
    assert_eq!(winners.len(), 1, "exactly one thread should observe absent");
    let final_value = map.get(&"k").expect("key must be present after the race");
    for result in &results {
        if let Some(loser_saw) = result {
            assert_eq!(*loser_saw, final_value, "every loser must see the winner's value");
        }
    }
}

// Round-trip laws (§8).
#[test]
fn round_trip_insert_then_lookup() {
    let map = CtrieMap::new();
    map.insert("k", 1);
    assert_eq!(map.get(&"k"), Some(1));
}

#[test]
fn round_trip_reinsert_overwrites() {
    let map = CtrieMap::new();
    map.insert("k", 1);
    map.insert("k", 2);
    assert_eq!(map.get(&"k"), Some(2));
}

#[test]
fn round_trip_insert_then_remove_then_lookup() {
    let map = CtrieMap::new();
    map.insert("k", 1);
    map.remove(&"k");
    assert_eq!(map.get(&"k"), None);
}

#[test]
fn conditional_replace_and_remove() {
    let map = CtrieMap::new();
    map.insert("k", 1);
    assert_eq!(map.replace(&"k", &0, 2), ConditionalOutcome::Mismatch(1));
    assert_eq!(map.replace(&"k", &1, 2), ConditionalOutcome::Ok);
    assert_eq!(map.get(&"k"), Some(2));
    assert_eq!(map.remove_if(&"k", &0), ConditionalOutcome::Mismatch(2));
    assert_eq!(map.remove_if(&"k", &2), ConditionalOutcome::Ok);
    assert_eq!(map.get(&"k"), None);
    assert_eq!(map.replace(&"missing", &0, 1), ConditionalOutcome::Absent);
    assert_eq!(map.remove_if(&"missing", &0), ConditionalOutcome::Absent);
}

#[test]
fn put_if_absent_returns_previous_when_occupied() {
    let map = CtrieMap::new();
    assert_eq!(map.put_if_absent("k", 1), None);
    assert_eq!(map.put_if_absent("k", 2), Some(1));
    assert_eq!(map.get(&"k"), Some(1));
}

// Many keys through one map exercises branch expansion past a single level
// (§4.5's `expand`) without relying on engineered collisions.
#[test]
fn many_keys_survive_insert_and_removal() {
    let map = CtrieMap::new();
    for i in 0..2000i64 {
        map.insert(i, i * 2);
    }
    assert_eq!(map.len(), 2000);
    for i in 0..2000i64 {
        assert_eq!(map.get(&i), Some(i * 2));
    }
    for i in (0..2000i64).step_by(2) {
        assert_eq!(map.remove(&i), Some(i * 2));
    }
    assert_eq!(map.len(), 1000);
    for i in 0..2000i64 {
        if i % 2 == 0 {
            assert_eq!(map.get(&i), None);
        } else {
            assert_eq!(map.get(&i), Some(i * 2));
        }
    }
}

#[test]
fn snapshot_of_snapshot_is_independent() {
    let root = CtrieMap::new();
    root.insert("a", 1);
    let snap1 = root.snapshot();
    snap1.insert("b", 2);
    let snap2 = snap1.snapshot();
    snap2.insert("c", 3);

    assert_eq!(root.get(&"a"), Some(1));
    assert_eq!(root.get(&"b"), None);
    assert_eq!(root.get(&"c"), None);

    assert_eq!(snap1.get(&"a"), Some(1));
    assert_eq!(snap1.get(&"b"), Some(2));
    assert_eq!(snap1.get(&"c"), None);

    assert_eq!(snap2.get(&"a"), Some(1));
    assert_eq!(snap2.get(&"b"), Some(2));
    assert_eq!(snap2.get(&"c"), Some(3));
}

// Sequential-consistency property (§8.1): a randomized single-threaded
// interleaving of every operation family must track a plain HashMap exactly.
#[test]
fn randomized_single_thread_matches_hashmap_oracle() {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::HashMap;

    let mut rng = StdRng::seed_from_u64(0xC7_12E);
    let map = CtrieMap::new();
    let mut oracle: HashMap<u16, u16> = HashMap::new();

    for i in 0..20_000u32 {
        let key = rng.gen_range(0..256u16);
        let value = i as u16;
        match rng.gen_range(0..5) {
            0 => assert_eq!(map.insert(key, value), oracle.insert(key, value)),
            1 => assert_eq!(map.remove(&key), oracle.remove(&key)),
            2 => {
                let got = map.put_if_absent(key, value);
                let expected = oracle.get(&key).copied();
                assert_eq!(got, expected);
                oracle.entry(key).or_insert(value);
            }
            3 => match oracle.get(&key).copied() {
                None => assert_eq!(map.replace(&key, &value, value), ConditionalOutcome::Absent),
                Some(current) => {
                    assert_eq!(map.replace(&key, &current, value), ConditionalOutcome::Ok);
                    oracle.insert(key, value);
                }
            },
            _ => match oracle.get(&key).copied() {
                None => assert_eq!(map.remove_if(&key, &value), ConditionalOutcome::Absent),
                Some(current) => {
                    assert_eq!(map.remove_if(&key, &current), ConditionalOutcome::Ok);
                    oracle.remove(&key);
                }
            },
        }
        assert_eq!(map.get(&key), oracle.get(&key).copied(), "diverged at op {i} on key {key}");
    }
    assert_eq!(map.len(), oracle.len());
}

#[cfg(feature = "introspect")]
#[test]
fn structural_invariants_hold_after_mixed_workload() {
    let map = CtrieMap::new();
    for i in 0..500i64 {
        map.insert(i, i);
    }
    for i in (0..500i64).step_by(3) {
        map.remove(&i);
    }
    let snap = map.snapshot();
    for i in 500..700i64 {
        map.insert(i, i);
    }
    assert!(crate::introspect::check(&map).is_empty());
    assert!(crate::introspect::check(&snap).is_empty());
}

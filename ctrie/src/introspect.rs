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

//! Structural invariant checking, gated behind the `introspect` feature so the
//! cost never reaches a release build. A full walk of a quiescent trie (no
//! in-flight operations) should find every Branch Idle, every bitmap matching
//! its children array, and a single generation shared by the whole reachable
//! set — INV1–INV3 and INV5 from the data model. This is exactly the "test
//! harness that pauses all threads and traverses" property 4/5/6 in §8 calls
//! for; it's meant to be run between rounds of a stress test, not concurrently
//! with live mutators (a walk racing a mutator will legitimately observe a
//! transient non-Idle status and should not be treated as a violation).

use crate::{
    gen::{same_generation, Generation},
    map::CtrieMap,
    node::{branch_divergence_level, phys_index, BranchNode, Node, MAX_BRANCH_LEVEL},
};
use std::{fmt, hash::Hash, sync::Arc};

/// A single structural defect found while walking a trie.
#[derive(Debug, Clone)]
pub enum Violation {
    /// INV3: `popcount(bitmap)` didn't match the children array length.
    BitmapMismatch { path: Vec<u32>, popcount: u32, len: usize },
    /// A branch's status was not `Idle` at a point the caller asserted was quiescent.
    NotIdle { path: Vec<u32> },
    /// INV5: a branch's generation didn't match the generation the walk started with.
    GenerationMismatch { path: Vec<u32> },
    /// A `Collisions` leaf was found with fewer than two entries, or with entries
    /// that don't all share a branch prefix (both would mean it was built
    /// incorrectly).
    MalformedCollisions { path: Vec<u32>, len: usize },
    /// §4.1: a `Branch` was found at or past `MAX_BRANCH_LEVEL`. Branching must
    /// stop at that cutoff and fall back to a `Collisions` leaf instead.
    BranchBeyondCutoff { path: Vec<u32> },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BitmapMismatch { path, popcount, len } => write!(
                f,
                "bitmap/array mismatch at {path:?}: popcount={popcount} children.len()={len}"
            ),
            Self::NotIdle { path } => write!(f, "non-idle branch status at {path:?}"),
            Self::GenerationMismatch { path } => {
                write!(f, "generation mismatch at {path:?}")
            }
            Self::MalformedCollisions { path, len } => {
                write!(f, "malformed collisions leaf at {path:?}: {len} entries")
            }
            Self::BranchBeyondCutoff { path } => {
                write!(f, "branch found at or past MAX_BRANCH_LEVEL at {path:?}")
            }
        }
    }
}

/// Walk every branch reachable from `map`'s current root, checking INV1/INV2
/// (quiescent branches are Idle), INV3 (bitmap/array agreement), and INV5
/// (generation homogeneity), and returning every violation found rather than
/// stopping at the first. An empty vector means the trie is structurally
/// sound as of this walk.
///
/// Only meaningful when called with no concurrent mutators in flight — see
/// the module docs.
pub fn check<K, V, S>(map: &CtrieMap<K, V, S>) -> Vec<Violation>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    let root = map.root_handle();
    let generation = root.generation();
    let mut violations = Vec::new();
    walk(&root.child.load_full(), &generation, &mut Vec::new(), &mut violations);
    violations
}

fn walk<K, V>(
    node: &Arc<Node<K, V>>,
    generation: &Generation,
    path: &mut Vec<u32>,
    out: &mut Vec<Violation>,
) {
    match &**node {
        Node::Branch(b) => {
            let level = path.len() as u32 * crate::node::BITS_PER_LEVEL;
            if level >= MAX_BRANCH_LEVEL {
                out.push(Violation::BranchBeyondCutoff { path: path.clone() });
            }
            check_branch(b, generation, path, out);
            for slot in 0..crate::node::BRANCH_WIDTH {
                if let Some(child) = b.child_at_slot(slot) {
                    path.push(slot);
                    walk(&child.load_full(), generation, path, out);
                    path.pop();
                }
            }
        }
        Node::Single(_) => (),
        Node::Collisions(c) => {
            let malformed = c.entries.len() < 2
                || c.entries
                    .windows(2)
                    .any(|w| branch_divergence_level(w[0].2, w[1].2, 0).is_some());
            if malformed {
                out.push(Violation::MalformedCollisions {
                    path: path.clone(),
                    len: c.entries.len(),
                });
            }
        }
    }
}

fn check_branch<K, V>(
    b: &BranchNode<K, V>,
    generation: &Generation,
    path: &[u32],
    out: &mut Vec<Violation>,
) {
    if !b.status.load().is_idle() {
        out.push(Violation::NotIdle { path: path.to_vec() });
    }
    if !same_generation(&b.generation, generation) {
        out.push(Violation::GenerationMismatch { path: path.to_vec() });
    }
    let popcount = b.bitmap.count_ones();
    if popcount as usize != b.children.len() {
        out.push(Violation::BitmapMismatch {
            path: path.to_vec(),
            popcount,
            len: b.children.len(),
        });
    }
    // every occupied logical slot's physical index must fall within range, and
    // every physical index must map back to exactly one logical slot (a
    // stronger, redundant check on the same bitmap/children relationship).
    let mut seen = vec![false; b.children.len()];
    for slot in 0..crate::node::BRANCH_WIDTH {
        if b.bitmap & (1 << slot) != 0 {
            let phys = phys_index(b.bitmap, slot);
            if phys < seen.len() {
                seen[phys] = true;
            }
        }
    }
    if seen.iter().any(|seen| !seen) {
        out.push(Violation::BitmapMismatch {
            path: path.to_vec(),
            popcount,
            len: b.children.len(),
        });
    }
}

/*
 * Created on Tue Jul 28 2026
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

//! Node family: `Branch`, `Single`, `Collisions`, plus the slot arithmetic that
//! maps a hash-derived logical slot to a physical offset in a branch's dense
//! children array.

use {
    crate::{gen::Generation, status::Status},
    arc_swap::ArcSwap,
    std::sync::Arc,
};

/// Branching factor: 32 children per level, 5 bits of hash consumed per level.
pub const BITS_PER_LEVEL: u32 = 5;
pub const BRANCH_WIDTH: u32 = 1 << BITS_PER_LEVEL;
pub const LEVEL_MASK: u64 = (BRANCH_WIDTH - 1) as u64;
/// §4.1: "if the trie would need to branch beyond 32 bits of hash (L >= 32),
/// further disambiguation uses a Collisions leaf." The branching width is
/// fixed at 32 regardless of the hash's own bit width, so once a walk would
/// need to create a `Branch` at a level at or past this cutoff, it stops and
/// falls back to a `Collisions` leaf instead — even if the two hashes still
/// differ somewhere above this cutoff. The deepest level a `Branch` may ever
/// occupy is therefore 30 (30 + `BITS_PER_LEVEL` == 35 >= 32).
pub const MAX_BRANCH_LEVEL: u32 = 32;

/// A node is one of three shapes. Leaves carry no `status`: per the protocol,
/// a descriptor that finds a leaf occupying the slot it's replacing treats that
/// leaf's status as permanently `Idle` and skips the pinning CAS entirely.
pub enum Node<K, V> {
    Branch(BranchNode<K, V>),
    Single(SingleNode<K, V>),
    Collisions(CollisionsNode<K, V>),
}

/// Interior node. `bitmap` and `generation` are fixed at construction time;
/// `status` is the only field ever mutated in place (and only ever via CAS).
pub struct BranchNode<K, V> {
    pub(crate) status: ArcSwap<Status<K, V>>,
    pub(crate) children: Box<[ArcSwap<Node<K, V>>]>,
    pub(crate) bitmap: u32,
    pub(crate) generation: Generation,
}

/// Leaf holding exactly one key/value pair. Deep-immutable once published (INV4).
/// Carries its own full 64-bit hash so that resolving a collision at a deeper
/// level never needs to re-hash the key the leaf already belongs to.
pub struct SingleNode<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

/// Leaf holding every pair that selects the same slot at every level a
/// `Branch` may occupy (every level below `MAX_BRANCH_LEVEL`). Order is
/// insertion-arbitrary; lookups scan linearly. Entries are *not* guaranteed
/// to share a full 64-bit hash — two keys reach the same Collisions leaf the
/// instant they agree through the last branchable level, even if their
/// hashes still differ somewhere above it — so each entry keeps its own
/// hash, for use if it's ever collapsed back down to a `Single` leaf.
pub struct CollisionsNode<K, V> {
    pub(crate) entries: Vec<(K, V, u64)>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new_single(key: K, value: V, hash: u64) -> Self {
        Node::Single(SingleNode { key, value, hash })
    }

    pub(crate) fn new_collisions(entries: Vec<(K, V, u64)>) -> Self {
        debug_assert!(entries.len() >= 2, "logic, collisions node with <2 entries");
        debug_assert!(
            entries
                .windows(2)
                .all(|w| branch_divergence_level(w[0].2, w[1].2, 0).is_none()),
            "logic, collisions node entries don't share a branch prefix"
        );
        Node::Collisions(CollisionsNode { entries })
    }

    pub(crate) fn new_empty_branch(generation: Generation) -> Self {
        Node::Branch(BranchNode {
            status: ArcSwap::from_pointee(Status::Idle),
            children: Vec::new().into_boxed_slice(),
            bitmap: 0,
            generation,
        })
    }

    /// The status slot of a branch, or `None` for a leaf (leaves are synthetically
    /// always-Idle and are never the target of a pinning CAS).
    pub(crate) fn status(&self) -> Option<&ArcSwap<Status<K, V>>> {
        match self {
            Node::Branch(b) => Some(&b.status),
            Node::Single(_) | Node::Collisions(_) => None,
        }
    }

    pub(crate) fn as_branch(&self) -> Option<&BranchNode<K, V>> {
        match self {
            Node::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }
}

/// The logical slot selected by `hash` at `level`: five bits starting at
/// bit position `level`. A free function (not an associated one) so callers
/// never need a turbofish just to name `K, V` they don't otherwise care about.
pub(crate) fn slot_at(hash: u64, level: u32) -> u32 {
    ((hash >> level) & LEVEL_MASK) as u32
}

/// The level at which `a` and `b` first select different logical slots at or
/// after `start_level`, provided that happens before `MAX_BRANCH_LEVEL`.
/// `None` means `a` and `b` are indistinguishable by branching — every
/// `Branch` level agrees on their slot — so §4.1 mandates a `Collisions` leaf
/// rather than creating another `Branch`, regardless of whether `a` and `b`
/// still differ somewhere above the cutoff.
pub(crate) fn branch_divergence_level(a: u64, b: u64, start_level: u32) -> Option<u32> {
    let mut level = start_level;
    while level < MAX_BRANCH_LEVEL {
        if slot_at(a, level) != slot_at(b, level) {
            return Some(level);
        }
        level += BITS_PER_LEVEL;
    }
    None
}

/// The physical index of logical slot `s` in a dense `children` array with
/// the given `bitmap`.
pub(crate) fn phys_index(bitmap: u32, slot: u32) -> usize {
    (bitmap & (slot_bit(slot) - 1)).count_ones() as usize
}

impl<K, V> BranchNode<K, V> {
    /// True iff the logical slot selected by `hash` at `level` is unoccupied —
    /// i.e. there's nothing to descend into, and a mutation must happen here.
    pub(crate) fn free_at(&self, hash: u64, level: u32) -> bool {
        let slot = slot_at(hash, level);
        self.bitmap & (1 << slot) == 0
    }

    pub(crate) fn child_at_slot(&self, slot: u32) -> Option<&ArcSwap<Node<K, V>>> {
        if self.bitmap & slot_bit(slot) == 0 {
            None
        } else {
            Some(&self.children[phys_index(self.bitmap, slot)])
        }
    }

    /// Build a copy of this branch with `node` inserted at the (currently free)
    /// logical `slot`, tagged with `status` (the installing descriptor) and
    /// `generation`. This is a fresh allocation: the unchanged slots simply copy
    /// the existing `Arc<Node<K,V>>` pointer, sharing the subtree rather than
    /// cloning it.
    pub(crate) fn with_inserted(
        &self,
        slot: u32,
        node: Arc<Node<K, V>>,
        status: Status<K, V>,
        generation: Generation,
    ) -> BranchNode<K, V> {
        debug_assert!(self.bitmap & slot_bit(slot) == 0, "logic, slot occupied");
        let phys = phys_index(self.bitmap, slot);
        let mut children = Vec::with_capacity(self.children.len() + 1);
        for existing in &self.children[..phys] {
            children.push(ArcSwap::new(existing.load_full()));
        }
        children.push(ArcSwap::new(node));
        for existing in &self.children[phys..] {
            children.push(ArcSwap::new(existing.load_full()));
        }
        BranchNode {
            status: ArcSwap::from_pointee(status),
            children: children.into_boxed_slice(),
            bitmap: self.bitmap | slot_bit(slot),
            generation,
        }
    }

    /// Build a copy of this branch with the child at logical `slot` replaced.
    pub(crate) fn with_replaced(
        &self,
        slot: u32,
        node: Arc<Node<K, V>>,
        status: Status<K, V>,
        generation: Generation,
    ) -> BranchNode<K, V> {
        debug_assert!(self.bitmap & slot_bit(slot) != 0, "logic, slot empty");
        let phys = phys_index(self.bitmap, slot);
        let mut children = Vec::with_capacity(self.children.len());
        for (i, existing) in self.children.iter().enumerate() {
            if i == phys {
                children.push(ArcSwap::new(node.clone()));
            } else {
                children.push(ArcSwap::new(existing.load_full()));
            }
        }
        BranchNode {
            status: ArcSwap::from_pointee(status),
            children: children.into_boxed_slice(),
            bitmap: self.bitmap,
            generation,
        }
    }

    /// Build a copy of this branch with the occupied logical `slot` cleared.
    /// `popcount(bitmap)` shrinks to match (INV3).
    pub(crate) fn with_removed(
        &self,
        slot: u32,
        status: Status<K, V>,
        generation: Generation,
    ) -> BranchNode<K, V> {
        debug_assert!(self.bitmap & slot_bit(slot) != 0, "logic, slot already empty");
        let phys = phys_index(self.bitmap, slot);
        let mut children = Vec::with_capacity(self.children.len() - 1);
        for (i, existing) in self.children.iter().enumerate() {
            if i != phys {
                children.push(ArcSwap::new(existing.load_full()));
            }
        }
        BranchNode {
            status: ArcSwap::from_pointee(status),
            children: children.into_boxed_slice(),
            bitmap: self.bitmap & !slot_bit(slot),
            generation,
        }
    }

    /// A shallow clone of this branch re-tagged with a fresh generation — the
    /// navigator's refresh copy. Every slot keeps the same pointee; only the
    /// branch's own identity (and hence its status/generation) changes.
    pub(crate) fn shallow_clone_for_generation(
        &self,
        status: Status<K, V>,
        generation: Generation,
    ) -> BranchNode<K, V> {
        let children: Vec<_> = self
            .children
            .iter()
            .map(|slot| ArcSwap::new(slot.load_full()))
            .collect();
        BranchNode {
            status: ArcSwap::from_pointee(status),
            children: children.into_boxed_slice(),
            bitmap: self.bitmap,
            generation,
        }
    }

    /// Number of occupied logical slots. Used for optional branch contraction
    /// on remove (§4.5) — collapsing a branch with a single leaf child.
    pub(crate) fn occupancy(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn single_child(&self) -> Option<&ArcSwap<Node<K, V>>> {
        if self.children.len() == 1 {
            Some(&self.children[0])
        } else {
            None
        }
    }
}

#[inline(always)]
fn slot_bit(slot: u32) -> u32 {
    1u32 << slot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_at_consumes_five_bits_per_level() {
        let hash: u64 = 0b11010_00110_00001;
        assert_eq!(slot_at(hash, 0), 0b00001);
        assert_eq!(slot_at(hash, 5), 0b00110);
        assert_eq!(slot_at(hash, 10), 0b11010);
    }

    #[test]
    fn phys_index_is_popcount_of_lower_bits() {
        // bitmap with slots 1, 3, 4 occupied
        let bitmap = (1 << 1) | (1 << 3) | (1 << 4);
        assert_eq!(phys_index(bitmap, 1), 0);
        assert_eq!(phys_index(bitmap, 3), 1);
        assert_eq!(phys_index(bitmap, 4), 2);
    }

    #[test]
    fn free_at_reflects_bitmap() {
        let gen = crate::gen::new_generation();
        let branch = match Node::<u32, u32>::new_empty_branch(gen.clone()) {
            Node::Branch(b) => b,
            _ => unreachable!(),
        };
        assert!(branch.free_at(0, 0));
        let leaf = Arc::new(Node::new_single(1u32, 2u32, 0));
        let branch = branch.with_inserted(0, leaf, Status::Idle, gen);
        assert!(!branch.free_at(0, 0));
        assert_eq!(branch.occupancy(), 1);
    }

    #[test]
    fn with_removed_shrinks_bitmap_and_array_together() {
        let gen = crate::gen::new_generation();
        let branch = match Node::<u32, u32>::new_empty_branch(gen.clone()) {
            Node::Branch(b) => b,
            _ => unreachable!(),
        };
        let leaf_a = Arc::new(Node::new_single(1u32, 10u32, 1));
        let leaf_b = Arc::new(Node::new_single(2u32, 20u32, 2));
        let branch = branch
            .with_inserted(1, leaf_a, Status::Idle, gen.clone())
            .with_inserted(2, leaf_b, Status::Idle, gen.clone());
        assert_eq!(branch.occupancy(), 2);
        let branch = branch.with_removed(1, Status::Idle, gen);
        assert_eq!(branch.occupancy(), 1);
        assert!(branch.free_at(1, 0));
        assert!(!branch.free_at(2, 0));
    }
}

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

//! The status family: `Idle`, `Mutate`, `Snap`. A closed, three-case tagged
//! union matched exhaustively wherever it's inspected — no trait object, no
//! open subtyping, because the set of descriptor shapes is fixed (§9).
//!
//! Every status lives behind one `Arc<Status<K, V>>` allocation, so CAS-ing a
//! status is always a single pointer swap regardless of how many fields the
//! underlying descriptor carries. Descriptor identity is reference identity:
//! two statuses are "the same descriptor" iff `Arc::ptr_eq` says so over the
//! *outer* `Arc<Status<K, V>>`, never over the payload. Nothing interns or
//! deduplicates these.

use {
    crate::{gen::Generation, node::Node, root::Root},
    arc_swap::{ArcSwap, ArcSwapOption},
    std::sync::{Arc, Weak},
};

pub(crate) enum Status<K, V> {
    Idle,
    Mutate(MutateDesc<K, V>),
    Snap(SnapDesc<K, V>),
}

impl<K, V> Status<K, V> {
    pub(crate) fn is_idle(&self) -> bool {
        matches!(self, Status::Idle)
    }
}

/// Where a mutation installs its result: either the map's single `Root` slot,
/// or logical `slot` of a `Branch` that was reached while descending. Folding
/// the spec's `index` into this enum (rather than carrying it separately)
/// keeps the descriptor from needing to know whether its parent is a `Root`
/// or a `Branch`.
pub(crate) enum MutTarget<K, V> {
    Root(Arc<Root<K, V>>),
    Branch { holder: Arc<Node<K, V>>, slot: u32 },
}

impl<K, V> MutTarget<K, V> {
    pub(crate) fn status(&self) -> &ArcSwap<Status<K, V>> {
        match self {
            MutTarget::Root(root) => &root.status,
            MutTarget::Branch { holder, .. } => {
                &holder.as_branch().expect("logic, mut target branch holder is not a branch").status
            }
        }
    }

    pub(crate) fn child_slot(&self) -> &ArcSwap<Node<K, V>> {
        match self {
            MutTarget::Root(root) => &root.child,
            MutTarget::Branch { holder, slot } => holder
                .as_branch()
                .expect("logic, mut target branch holder is not a branch")
                .child_at_slot(*slot)
                .expect("logic, mut target slot unoccupied"),
        }
    }
}

impl<K, V> Clone for MutTarget<K, V> {
    fn clone(&self) -> Self {
        match self {
            MutTarget::Root(root) => MutTarget::Root(root.clone()),
            MutTarget::Branch { holder, slot } => MutTarget::Branch {
                holder: holder.clone(),
                slot: *slot,
            },
        }
    }
}

/// `d = (parent, child, newChild, index)` from §4.2, `index` folded into
/// `parent: MutTarget`.
pub(crate) struct MutateDesc<K, V> {
    pub(crate) parent: MutTarget<K, V>,
    pub(crate) child: Arc<Node<K, V>>,
    pub(crate) new_child: Arc<Node<K, V>>,
}

/// `s = (oldGen, newTrieGen, newSnapGen, frozen)` from §4.3, plus a back-reference
/// to the `Root` the descriptor is installed on (not present in the source
/// formulation, which implicitly closes over it; needed here because `complete`
/// is a free function that any helping thread may call with only the
/// descriptor in hand). `Weak`, not `Arc`: `Root.status` holds this descriptor
/// strongly, so a strong back-reference would form an uncollectable cycle
/// (`Root -> Status -> SnapDesc -> Root`).
pub(crate) struct SnapDesc<K, V> {
    pub(crate) root: Weak<Root<K, V>>,
    pub(crate) old_gen: Generation,
    pub(crate) new_trie_gen: Generation,
    pub(crate) new_snap_gen: Generation,
    /// Written exactly once: first-writer-wins CAS from `None` to `Some` (INV6).
    pub(crate) frozen: ArcSwapOption<Root<K, V>>,
}

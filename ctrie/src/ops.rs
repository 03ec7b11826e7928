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

//! Operation envelopes: the walk-locate-then-install shape shared by every
//! mutation, and the plain read used by lookups. Callers supply the key's
//! hash already computed (by the facade, against its `BuildHasher`); nothing
//! in here ever hashes a key itself.

use {
    crate::{
        error::{invariant_violation, ConditionalOutcome},
        gen::Generation,
        mutate::{self, MutateResult},
        nav,
        node::{branch_divergence_level, slot_at, BranchNode, Node, BITS_PER_LEVEL, MAX_BRANCH_LEVEL},
        root::Root,
        status::{MutTarget, Status},
    },
    arc_swap::ArcSwap,
    std::sync::Arc,
};

/// Where a walk bottomed out: `branch` is the deepest Branch reached, `slot`
/// is the logical slot within it that either holds the occupant relevant to
/// the operation or is free, and `holder` is how to reach `branch` itself for
/// a replace-this-branch `Mutate` (the grandparent's view of it).
struct Located<K, V> {
    generation: Generation,
    holder: MutTarget<K, V>,
    branch: Arc<Node<K, V>>,
    level: u32,
    slot: u32,
}

/// Descend from `root` following `hash`'s bits, refreshing stale-generation
/// branches as we go (§4.4), until we reach a Branch whose slot for `hash` at
/// the current level is either free or occupied by a non-Branch (a `Single`
/// or `Collisions` leaf, or nothing).
fn locate<K, V>(root: &Arc<Root<K, V>>, hash: u64) -> Located<K, V> {
    let generation = root.generation();
    let mut holder = MutTarget::Root(root.clone());
    let mut level = 0u32;
    loop {
        debug_assert!(
            level < MAX_BRANCH_LEVEL,
            "ctrie: invariant violation: branch depth exceeded MAX_BRANCH_LEVEL"
        );
        let node = nav::read_refreshed(&holder, &generation);
        let branch = node
            .as_branch()
            .unwrap_or_else(|| invariant_violation!("locate reached a non-branch holder"));
        let slot = slot_at(hash, level);
        if branch.free_at(hash, level) {
            return Located {
                generation,
                holder,
                branch: node.clone(),
                level,
                slot,
            };
        }
        let child = branch
            .child_at_slot(slot)
            .unwrap_or_else(|| invariant_violation!("occupied slot has no child"))
            .load_full();
        if child.is_branch() {
            holder = MutTarget::Branch {
                holder: node.clone(),
                slot,
            };
            level += BITS_PER_LEVEL;
            continue;
        }
        return Located {
            generation,
            holder,
            branch: node.clone(),
            level,
            slot,
        };
    }
}

fn empty_branch<K, V>(generation: Generation) -> BranchNode<K, V> {
    BranchNode {
        status: ArcSwap::from_pointee(Status::Idle),
        children: Vec::new().into_boxed_slice(),
        bitmap: 0,
        generation,
    }
}

/// Build the replacement for a slot that currently holds `Single(old_key,
/// old_value)` when `new_key` (a different key, same slot at `start_level -
/// BITS_PER_LEVEL`) needs to land there too. Per §4.1, branching is only
/// valid below `MAX_BRANCH_LEVEL`: if the two hashes agree at every level up
/// to that cutoff, no further `Branch` may be created even though the hashes
/// might still differ somewhere above it — go straight to a `Collisions`
/// leaf. Otherwise nest `Branch`es, one per level, down to the first level at
/// which the hashes pick different slots, then wrap back up to `start_level`.
fn expand<K: Clone, V: Clone>(
    old_key: K,
    old_value: V,
    old_hash: u64,
    new_key: K,
    new_value: V,
    new_hash: u64,
    start_level: u32,
    generation: &Generation,
) -> Arc<Node<K, V>> {
    let level = match branch_divergence_level(old_hash, new_hash, start_level) {
        Some(level) => level,
        None => {
            return Arc::new(Node::new_collisions(vec![
                (old_key, old_value, old_hash),
                (new_key, new_value, new_hash),
            ]))
        }
    };
    let old_slot = slot_at(old_hash, level);
    let new_slot = slot_at(new_hash, level);
    let old_leaf = Arc::new(Node::new_single(old_key, old_value, old_hash));
    let new_leaf = Arc::new(Node::new_single(new_key, new_value, new_hash));
    let innermost = empty_branch(generation.clone())
        .with_inserted(old_slot, old_leaf, Status::Idle, generation.clone())
        .with_inserted(new_slot, new_leaf, Status::Idle, generation.clone());
    let mut node = Arc::new(Node::Branch(innermost));
    while level > start_level {
        level -= BITS_PER_LEVEL;
        let slot = slot_at(old_hash, level);
        node = Arc::new(Node::Branch(empty_branch(generation.clone()).with_inserted(
            slot,
            node,
            Status::Idle,
            generation.clone(),
        )));
    }
    node
}

pub(crate) fn lookup<K, V>(root: &Arc<Root<K, V>>, key: &K, hash: u64) -> Option<V>
where
    K: Eq,
    V: Clone,
{
    let mut node = root.child.load_full();
    let mut level = 0u32;
    loop {
        match &*node {
            Node::Branch(b) => {
                if b.free_at(hash, level) {
                    return None;
                }
                let slot = slot_at(hash, level);
                let child = b
                    .child_at_slot(slot)
                    .unwrap_or_else(|| invariant_violation!("occupied slot has no child"))
                    .load_full();
                node = child;
                level += BITS_PER_LEVEL;
            }
            Node::Single(s) => return if &s.key == key { Some(s.value.clone()) } else { None },
            Node::Collisions(c) => {
                return c.entries.iter().find(|(k, _, _)| k == key).map(|(_, v, _)| v.clone())
            }
        }
    }
}

pub(crate) fn insert<K, V>(root: &Arc<Root<K, V>>, key: K, value: V, hash: u64) -> Option<V>
where
    K: Eq + Clone,
    V: Clone,
{
    loop {
        let loc = locate(root, hash);
        let branch = loc
            .branch
            .as_branch()
            .unwrap_or_else(|| invariant_violation!("locate returned a non-branch"));
        let existing = branch.child_at_slot(loc.slot).map(|s| s.load_full());
        let (new_child, previous) = match &existing {
            None => {
                let leaf = Arc::new(Node::new_single(key.clone(), value.clone(), hash));
                let nb = branch.with_inserted(loc.slot, leaf, Status::Idle, loc.generation.clone());
                (Arc::new(Node::Branch(nb)), None)
            }
            Some(occupant) => match &**occupant {
                Node::Single(s) if s.key == key => {
                    let leaf = Arc::new(Node::new_single(key.clone(), value.clone(), hash));
                    let nb = branch.with_replaced(loc.slot, leaf, Status::Idle, loc.generation.clone());
                    (Arc::new(Node::Branch(nb)), Some(s.value.clone()))
                }
                Node::Single(s) => {
                    let replacement = expand(
                        s.key.clone(),
                        s.value.clone(),
                        s.hash,
                        key.clone(),
                        value.clone(),
                        hash,
                        loc.level + BITS_PER_LEVEL,
                        &loc.generation,
                    );
                    let nb =
                        branch.with_replaced(loc.slot, replacement, Status::Idle, loc.generation.clone());
                    (Arc::new(Node::Branch(nb)), None)
                }
                Node::Collisions(c) => {
                    let mut entries = c.entries.clone();
                    let previous = entries
                        .iter()
                        .position(|(k, _, _)| *k == key)
                        .map(|i| entries.remove(i).1);
                    entries.push((key.clone(), value.clone(), hash));
                    let leaf = Arc::new(Node::new_collisions(entries));
                    let nb = branch.with_replaced(loc.slot, leaf, Status::Idle, loc.generation.clone());
                    (Arc::new(Node::Branch(nb)), previous)
                }
                Node::Branch(_) => invariant_violation!("locate returned a branch as a terminal occupant"),
            },
        };
        match mutate::install(loc.holder.clone(), loc.branch.clone(), new_child) {
            Some(MutateResult::Committed) => return previous,
            Some(MutateResult::Lost) | None => continue,
        }
    }
}

pub(crate) fn put_if_absent<K, V>(root: &Arc<Root<K, V>>, key: K, value: V, hash: u64) -> Option<V>
where
    K: Eq + Clone,
    V: Clone,
{
    loop {
        let loc = locate(root, hash);
        let branch = loc
            .branch
            .as_branch()
            .unwrap_or_else(|| invariant_violation!("locate returned a non-branch"));
        let existing = branch.child_at_slot(loc.slot).map(|s| s.load_full());
        let new_child = match &existing {
            None => {
                let leaf = Arc::new(Node::new_single(key.clone(), value.clone(), hash));
                Arc::new(Node::Branch(branch.with_inserted(
                    loc.slot,
                    leaf,
                    Status::Idle,
                    loc.generation.clone(),
                )))
            }
            Some(occupant) => match &**occupant {
                Node::Single(s) if s.key == key => return Some(s.value.clone()),
                Node::Single(s) => {
                    let replacement = expand(
                        s.key.clone(),
                        s.value.clone(),
                        s.hash,
                        key.clone(),
                        value.clone(),
                        hash,
                        loc.level + BITS_PER_LEVEL,
                        &loc.generation,
                    );
                    Arc::new(Node::Branch(branch.with_replaced(
                        loc.slot,
                        replacement,
                        Status::Idle,
                        loc.generation.clone(),
                    )))
                }
                Node::Collisions(c) => {
                    if let Some((_, v, _)) = c.entries.iter().find(|(k, _, _)| *k == key) {
                        return Some(v.clone());
                    }
                    let mut entries = c.entries.clone();
                    entries.push((key.clone(), value.clone(), hash));
                    Arc::new(Node::Branch(branch.with_replaced(
                        loc.slot,
                        Arc::new(Node::new_collisions(entries)),
                        Status::Idle,
                        loc.generation.clone(),
                    )))
                }
                Node::Branch(_) => invariant_violation!("locate returned a branch as a terminal occupant"),
            },
        };
        match mutate::install(loc.holder.clone(), loc.branch.clone(), new_child) {
            Some(MutateResult::Committed) => return None,
            Some(MutateResult::Lost) | None => continue,
        }
    }
}

pub(crate) fn remove<K, V>(root: &Arc<Root<K, V>>, key: &K, hash: u64) -> Option<V>
where
    K: Eq + Clone,
    V: Clone,
{
    loop {
        let loc = locate(root, hash);
        let branch = loc
            .branch
            .as_branch()
            .unwrap_or_else(|| invariant_violation!("locate returned a non-branch"));
        let existing = branch.child_at_slot(loc.slot).map(|s| s.load_full());
        let (new_child, removed) = match &existing {
            None => return None,
            Some(occupant) => match &**occupant {
                Node::Single(s) if &s.key == key => (
                    Arc::new(Node::Branch(branch.with_removed(
                        loc.slot,
                        Status::Idle,
                        loc.generation.clone(),
                    ))),
                    Some(s.value.clone()),
                ),
                Node::Single(_) => return None,
                Node::Collisions(c) => {
                    let mut entries = c.entries.clone();
                    let pos = match entries.iter().position(|(k, _, _)| k == key) {
                        Some(p) => p,
                        None => return None,
                    };
                    let (_, removed_value, _) = entries.remove(pos);
                    let replacement = if entries.len() == 1 {
                        let (k, v, h) = entries.into_iter().next().expect("logic, one entry remains");
                        Arc::new(Node::new_single(k, v, h))
                    } else {
                        Arc::new(Node::new_collisions(entries))
                    };
                    (
                        Arc::new(Node::Branch(branch.with_replaced(
                            loc.slot,
                            replacement,
                            Status::Idle,
                            loc.generation.clone(),
                        ))),
                        Some(removed_value),
                    )
                }
                Node::Branch(_) => invariant_violation!("locate returned a branch as a terminal occupant"),
            },
        };
        match mutate::install(loc.holder.clone(), loc.branch.clone(), new_child) {
            Some(MutateResult::Committed) => return removed,
            Some(MutateResult::Lost) | None => continue,
        }
    }
}

pub(crate) fn replace<K, V>(
    root: &Arc<Root<K, V>>,
    key: &K,
    expected: &V,
    new_value: V,
    hash: u64,
) -> ConditionalOutcome<V>
where
    K: Eq + Clone,
    V: Clone + PartialEq,
{
    loop {
        let loc = locate(root, hash);
        let branch = loc
            .branch
            .as_branch()
            .unwrap_or_else(|| invariant_violation!("locate returned a non-branch"));
        let existing = branch.child_at_slot(loc.slot).map(|s| s.load_full());
        let new_child = match &existing {
            None => return ConditionalOutcome::Absent,
            Some(occupant) => match &**occupant {
                Node::Single(s) if &s.key == key => {
                    if s.value != *expected {
                        return ConditionalOutcome::Mismatch(s.value.clone());
                    }
                    let leaf = Arc::new(Node::new_single(key.clone(), new_value.clone(), hash));
                    Arc::new(Node::Branch(branch.with_replaced(
                        loc.slot,
                        leaf,
                        Status::Idle,
                        loc.generation.clone(),
                    )))
                }
                Node::Single(_) => return ConditionalOutcome::Absent,
                Node::Collisions(c) => {
                    let pos = match c.entries.iter().position(|(k, _, _)| k == key) {
                        Some(p) => p,
                        None => return ConditionalOutcome::Absent,
                    };
                    if c.entries[pos].1 != *expected {
                        return ConditionalOutcome::Mismatch(c.entries[pos].1.clone());
                    }
                    let mut entries = c.entries.clone();
                    entries[pos].1 = new_value.clone();
                    Arc::new(Node::Branch(branch.with_replaced(
                        loc.slot,
                        Arc::new(Node::new_collisions(entries)),
                        Status::Idle,
                        loc.generation.clone(),
                    )))
                }
                Node::Branch(_) => invariant_violation!("locate returned a branch as a terminal occupant"),
            },
        };
        match mutate::install(loc.holder.clone(), loc.branch.clone(), new_child) {
            Some(MutateResult::Committed) => return ConditionalOutcome::Ok,
            Some(MutateResult::Lost) | None => continue,
        }
    }
}

pub(crate) fn remove_if<K, V>(
    root: &Arc<Root<K, V>>,
    key: &K,
    expected: &V,
    hash: u64,
) -> ConditionalOutcome<V>
where
    K: Eq + Clone,
    V: Clone + PartialEq,
{
    loop {
        let loc = locate(root, hash);
        let branch = loc
            .branch
            .as_branch()
            .unwrap_or_else(|| invariant_violation!("locate returned a non-branch"));
        let existing = branch.child_at_slot(loc.slot).map(|s| s.load_full());
        let new_child = match &existing {
            None => return ConditionalOutcome::Absent,
            Some(occupant) => match &**occupant {
                Node::Single(s) if &s.key == key => {
                    if s.value != *expected {
                        return ConditionalOutcome::Mismatch(s.value.clone());
                    }
                    Arc::new(Node::Branch(branch.with_removed(
                        loc.slot,
                        Status::Idle,
                        loc.generation.clone(),
                    )))
                }
                Node::Single(_) => return ConditionalOutcome::Absent,
                Node::Collisions(c) => {
                    let pos = match c.entries.iter().position(|(k, _, _)| k == key) {
                        Some(p) => p,
                        None => return ConditionalOutcome::Absent,
                    };
                    if c.entries[pos].1 != *expected {
                        return ConditionalOutcome::Mismatch(c.entries[pos].1.clone());
                    }
                    let mut entries = c.entries.clone();
                    entries.remove(pos);
                    let replacement = if entries.len() == 1 {
                        let (k, v, h) = entries.into_iter().next().expect("logic, one entry remains");
                        Arc::new(Node::new_single(k, v, h))
                    } else {
                        Arc::new(Node::new_collisions(entries))
                    };
                    Arc::new(Node::Branch(branch.with_replaced(
                        loc.slot,
                        replacement,
                        Status::Idle,
                        loc.generation.clone(),
                    )))
                }
                Node::Branch(_) => invariant_violation!("locate returned a branch as a terminal occupant"),
            },
        };
        match mutate::install(loc.holder.clone(), loc.branch.clone(), new_child) {
            Some(MutateResult::Committed) => return ConditionalOutcome::Ok,
            Some(MutateResult::Lost) | None => continue,
        }
    }
}

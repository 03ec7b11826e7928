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

//! The mutation engine: the five-step CAS sequence of §4.2 and the helping
//! routine that drives any `Mutate` descriptor to a terminal state.
//!
//! `complete` is written iteratively (a `loop`, not recursion) per §9: helping
//! chains are bounded by the number of live descriptors, not by trie depth, so
//! a recursive encoding would risk unbounded stack growth under heavy helping.

use {
    crate::{
        node::Node,
        snapshot,
        status::{MutTarget, MutateDesc, Status},
        sync::Backoff,
    },
    arc_swap::ArcSwap,
    log::trace,
    std::sync::Arc,
};

/// Outcome of attempting to drive one `Mutate` descriptor through the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MutateResult {
    /// Step 3 (the linearization point) is known to have executed for this
    /// descriptor: `new_child` is, or was, installed at `parent[index]`.
    Committed,
    /// The install never happened: another descriptor beat us to `parent[index]`.
    /// The operation envelope must re-walk from the root.
    Lost,
}

/// CAS `slot` from `expected` to `new`. Returns `Ok(())` on success, `Err(actual)`
/// with the value actually observed on failure (which may itself need helping).
pub(crate) fn cas_status<K, V>(
    slot: &ArcSwap<Status<K, V>>,
    expected: &Arc<Status<K, V>>,
    new: Arc<Status<K, V>>,
) -> Result<(), Arc<Status<K, V>>> {
    let prev = slot.compare_and_swap(expected, new);
    if Arc::ptr_eq(&prev, expected) {
        Ok(())
    } else {
        Err(Arc::clone(&prev))
    }
}

/// Attempt to install `new_child` at `parent`'s slot, replacing `child`.
/// Builds and owns the `Mutate` descriptor for the duration of the call.
/// Returns `None` if we couldn't even start (parent was already busy with a
/// different descriptor, which we helped) — the caller must retry the whole
/// walk from the root. Otherwise returns the descriptor's terminal outcome.
pub(crate) fn install<K, V>(
    parent: MutTarget<K, V>,
    child: Arc<Node<K, V>>,
    new_child: Arc<Node<K, V>>,
) -> Option<MutateResult> {
    let idle_status: Arc<Status<K, V>> = Arc::new(Status::Idle);
    let d: Arc<Status<K, V>> = Arc::new(Status::Mutate(MutateDesc {
        parent,
        child,
        new_child,
    }));
    let Status::Mutate(desc) = &*d else {
        unreachable!("logic, just constructed a Mutate status")
    };
    // pre-pin newChild to `d` while it's still unpublished and therefore
    // uncontended: step 4 of §4.2 expects newChild.status to already read `d`
    // by the time step 3 makes it visible to other threads.
    if let Some(new_status_slot) = desc.new_child.status() {
        new_status_slot.store(d.clone());
    }
    match cas_status(desc.parent.status(), &idle_status, d.clone()) {
        Ok(()) => Some(complete(&d)),
        Err(current) => {
            // someone else holds parent.status; help them, signal retry.
            trace!("install: parent busy, helping before retry");
            help(&current);
            None
        }
    }
}

/// Drive `d` (a `Status::Mutate` or `Status::Snap`) to a terminal state.
/// Total and idempotent: safe to call any number of times, by any thread,
/// including after `d` has already reached its terminal state.
pub(crate) fn help<K, V>(status: &Arc<Status<K, V>>) {
    match &**status {
        Status::Idle => (),
        Status::Mutate(_) => {
            complete(status);
        }
        Status::Snap(_) => {
            snapshot::complete(status);
        }
    }
}

pub(crate) fn complete<K, V>(d: &Arc<Status<K, V>>) -> MutateResult {
    let desc = match &**d {
        Status::Mutate(desc) => desc,
        _ => unreachable!("logic, complete(mutate) called on a non-Mutate status"),
    };
    let backoff = Backoff::new();
    loop {
        let parent_status = desc.parent.status().load_full();
        if Arc::ptr_eq(&parent_status, d) {
            // we (or our payload) currently own parent.status; look at the
            // child we're trying to evict.
            match desc.child.status() {
                None => {
                    // leaf child: synthetically always-Idle, step 2 is a no-op.
                    commit(d, desc);
                    continue;
                }
                Some(child_status_slot) => {
                    let child_status = child_status_slot.load_full();
                    if child_status.is_idle() {
                        // step 2: pin the child to us.
                        let _ = cas_status(child_status_slot, &child_status, d.clone());
                        continue;
                    } else if Arc::ptr_eq(&child_status, d) {
                        // (d, d): steps 3, 4, 5.
                        commit(d, desc);
                        continue;
                    } else {
                        // (d, other): someone else is using this child.
                        let current = desc.parent.child_slot().load_full();
                        if !Arc::ptr_eq(&current, &desc.child) {
                            // the install race is lost.
                            trace!("complete: lost the install race, releasing parent");
                            let _ = cas_status(
                                desc.parent.status(),
                                d,
                                Arc::new(Status::Idle),
                            );
                            return MutateResult::Lost;
                        }
                        help(&child_status);
                        backoff.snooze();
                        continue;
                    }
                }
            }
        } else {
            // parent has already moved past d: figure out whether we committed.
            let current = desc.parent.child_slot().load_full();
            if Arc::ptr_eq(&current, &desc.new_child) {
                return MutateResult::Committed;
            }
            let committed_then_superseded = match desc.new_child.status() {
                // newChild's status differs from d only if some later descriptor
                // pinned it after observing it installed, which can only happen
                // once our own step 3 has run.
                Some(new_status_slot) => !Arc::ptr_eq(&new_status_slot.load_full(), d),
                // a leaf newChild is never pinned by anyone; this signal is
                // vacuous for leaves, so we fall back to the weaker (but still
                // sound, see DESIGN.md) assumption that a vanished slot means
                // a later op observed and replaced our install.
                None => true,
            };
            if committed_then_superseded {
                return MutateResult::Committed;
            }
            if let Some(child_status_slot) = desc.child.status() {
                help(&child_status_slot.load_full());
            }
            return MutateResult::Lost;
        }
    }
}

fn commit<K, V>(d: &Arc<Status<K, V>>, desc: &MutateDesc<K, V>) {
    // step 3: the linearization point.
    let _ = desc.parent.child_slot().compare_and_swap(&desc.child, desc.new_child.clone());
    // step 4: unpin newChild, if it's a branch, before unpinning the parent (§4.2
    // rationale: this ordering is what makes "newChild.status != d" a safe
    // success signal for observers that arrive after the fact).
    if let Some(new_status_slot) = desc.new_child.status() {
        let _ = cas_status(new_status_slot, d, Arc::new(Status::Idle));
    }
    // step 5: release the parent.
    let _ = cas_status(desc.parent.status(), d, Arc::new(Status::Idle));
}

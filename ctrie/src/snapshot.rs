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

//! The snapshot engine: §4.3's `Snap` descriptor. Freezes the live root's
//! current subtree into an independent `Root` under a new generation, and
//! retargets the live root to a different new generation of its own — so both
//! roots can evolve, lazily copying stale-generation branches on descent
//! (the navigator, §4.4), without ever touching each other's writes.

use {
    crate::{
        gen::new_generation,
        mutate::cas_status,
        root::Root,
        status::{SnapDesc, Status},
        sync::Backoff,
    },
    arc_swap::{ArcSwap, ArcSwapOption},
    log::{debug, trace},
    std::sync::Arc,
};

/// Install a `Snap` descriptor on `root` and drive it to completion, returning
/// the frozen `Root` handle. Loops past contention from concurrent mutators
/// and concurrent snapshotters on the same root (only one `Snap` can own
/// `root.status` at a time; a mutator that races in first is helped, not
/// blocked on).
pub(crate) fn snapshot<K, V>(root: &Arc<Root<K, V>>) -> Arc<Root<K, V>> {
    let backoff = Backoff::new();
    loop {
        let idle_status: Arc<Status<K, V>> = Arc::new(Status::Idle);
        let old_gen = root.generation();
        let s: Arc<Status<K, V>> = Arc::new(Status::Snap(SnapDesc {
            root: Arc::downgrade(root),
            old_gen,
            new_trie_gen: new_generation(),
            new_snap_gen: new_generation(),
            frozen: ArcSwapOption::from(None),
        }));
        match cas_status(&root.status, &idle_status, s.clone()) {
            Ok(()) => {
                return complete(&s).expect("logic, root is held alive by our own Arc")
            }
            Err(current) => {
                trace!("snapshot: root busy, helping before retry");
                crate::mutate::help(&current);
                backoff.snooze();
            }
        }
    }
}

/// Idempotent completion routine for a `Snap` descriptor, mirroring the
/// `Mutate` engine's `complete`: any thread that observes `s` may call this
/// and drive it forward; repeated invocations after termination are no-ops.
///
/// Returns `None` only in the (exotic) case where every strong reference to
/// the target root vanished while we were helping — there's then nothing
/// left to complete.
pub(crate) fn complete<K, V>(s: &Arc<Status<K, V>>) -> Option<Arc<Root<K, V>>> {
    let desc = match &**s {
        Status::Snap(desc) => desc,
        _ => unreachable!("logic, complete(snap) called on a non-Snap status"),
    };
    let root = desc.root.upgrade()?;
    debug!("snapshot: freezing generation into a new independent root");
    // (a) the subtree pointer cannot change while root.status == s, because
    // every mutation's step 1 requires root.status to be Idle first.
    let shared_child = root.child.load_full();
    // (b) first writer publishes the frozen root (INV6).
    let frozen_root = Arc::new(Root {
        status: ArcSwap::from_pointee(Status::Idle),
        child: ArcSwap::new(shared_child),
        generation: ArcSwap::new(desc.new_snap_gen.clone()),
    });
    let _ = desc
        .frozen
        .compare_and_swap(None::<Arc<Root<K, V>>>, Some(frozen_root));
    // (c) retarget the live root to its own fresh generation.
    let _ = root
        .generation
        .compare_and_swap(&desc.old_gen, desc.new_trie_gen.clone());
    // (d) release the root.
    let _ = cas_status(&root.status, s, Arc::new(Status::Idle));
    Some(
        desc.frozen
            .load_full()
            .expect("logic, INV6: frozen root published by (b)"),
    )
}

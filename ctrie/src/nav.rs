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

//! The navigator (§4.4): read-with-refresh. A walk descends by repeatedly
//! asking the navigator for the child of its current position; if that child
//! is a branch still tagged with a generation older than the walk's own, the
//! navigator lazily shallow-clones it under the current generation and
//! installs the clone via an ordinary `Mutate`, exactly as if some other
//! thread had written it. Leaves never carry a generation and are returned
//! as-is.

use crate::{
    gen::{same_generation, Generation},
    mutate::{self, MutateResult},
    node::Node,
    status::{MutTarget, Status},
    sync::Backoff,
};
use log::trace;
use std::sync::Arc;

/// Read the child held at `parent`'s slot, refreshing it in place first if
/// it's a branch whose generation has fallen behind `generation`. Returns the
/// child that's current as of some point during the call — under concurrent
/// mutation a caller must still be prepared to retry at a higher level (§4.5).
pub(crate) fn read_refreshed<K, V>(
    parent: &MutTarget<K, V>,
    generation: &Generation,
) -> Arc<Node<K, V>> {
    let backoff = Backoff::new();
    loop {
        let child = parent.child_slot().load_full();
        let stale_branch = match &*child {
            Node::Branch(b) => !same_generation(&b.generation, generation),
            Node::Single(_) | Node::Collisions(_) => false,
        };
        if !stale_branch {
            return child;
        }
        trace!("read_refreshed: branch generation stale, shallow-cloning into the current generation");
        let refreshed = match &*child {
            Node::Branch(b) => Arc::new(Node::Branch(
                b.shallow_clone_for_generation(Status::Idle, generation.clone()),
            )),
            _ => unreachable!("logic, stale_branch only set for Node::Branch"),
        };
        match mutate::install(parent.clone(), child.clone(), refreshed.clone()) {
            Some(MutateResult::Committed) => return refreshed,
            // either we lost the race (someone else refreshed or mutated this
            // slot first) or couldn't even start (parent was busy); either way
            // the next load will see whatever is current.
            Some(MutateResult::Lost) | None => {
                backoff.snooze();
                continue;
            }
        }
    }
}

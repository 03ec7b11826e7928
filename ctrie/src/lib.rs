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

//! A concurrent, lock-free hash array mapped trie (a "Ctrie") with O(1)
//! amortized snapshots.
//!
//! The trie is a 32-way branching structure (5 hash bits consumed per level)
//! built from three node shapes — `Branch`, `Single`, `Collisions` — and two
//! lock-free protocols: a five-step `Mutate` descriptor that installs one
//! replacement child under a `compare_and_swap`-driven helping scheme, and a
//! `Snap` descriptor that freezes the live root's subtree into an
//! independent, generation-tagged copy in a single CAS. Every other thread
//! that meets an in-flight descriptor drives it to completion itself rather
//! than blocking, which is what makes the whole thing lock-free: no thread
//! can stall the others by being descheduled mid-operation.
//!
//! The only type most callers need is [`CtrieMap`].

mod error;
mod gen;
mod mutate;
mod nav;
mod node;
mod ops;
mod root;
mod snapshot;
mod status;
mod sync;

mod map;

pub use error::ConditionalOutcome;
pub use map::CtrieMap;

#[cfg(feature = "introspect")]
pub mod introspect;

#[cfg(test)]
mod tests;

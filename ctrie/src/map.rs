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

//! [`CtrieMap`]: the concrete key/value facade over the lock-free core. The
//! core itself only knows about `Root`/`Node`/`Status`; this is what a caller
//! actually holds and calls.

use {
    crate::{error::ConditionalOutcome, node::Node, ops, root::Root, snapshot},
    std::{
        fmt,
        hash::{BuildHasher, Hash, Hasher, RandomState},
        sync::Arc,
    },
};

/// A concurrent, lock-free hash array mapped trie with O(1) amortized
/// snapshots. Cloning a `CtrieMap` is cheap (an `Arc` clone of the `Root`) and
/// yields another handle onto the *same* live map; use [`CtrieMap::snapshot`]
/// to get an independent, frozen copy instead.
pub struct CtrieMap<K, V, S = RandomState> {
    root: Arc<Root<K, V>>,
    hasher: S,
}

impl<K, V> CtrieMap<K, V, RandomState> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V> Default for CtrieMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> CtrieMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            root: Root::new(),
            hasher,
        }
    }

    fn hash_of(&self, key: &K) -> u64
    where
        K: Hash,
        S: BuildHasher,
    {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

impl<K, V, S> CtrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    pub fn get(&self, key: &K) -> Option<V> {
        ops::lookup(&self.root, key, self.hash_of(key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `value` at `key`, returning the previous value if one existed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let hash = self.hash_of(&key);
        ops::insert(&self.root, key, value, hash)
    }

    /// Inserts `value` at `key` only if `key` is currently absent, returning
    /// the value already there if it was.
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V> {
        let hash = self.hash_of(&key);
        ops::put_if_absent(&self.root, key, value, hash)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let hash = self.hash_of(key);
        ops::remove(&self.root, key, hash)
    }

    /// Removes `key` only if its current value equals `expected`.
    pub fn remove_if(&self, key: &K, expected: &V) -> ConditionalOutcome<V>
    where
        V: PartialEq,
    {
        let hash = self.hash_of(key);
        ops::remove_if(&self.root, key, expected, hash)
    }

    /// Replaces `key`'s value with `new_value` only if its current value
    /// equals `expected`.
    pub fn replace(&self, key: &K, expected: &V, new_value: V) -> ConditionalOutcome<V>
    where
        V: PartialEq,
    {
        let hash = self.hash_of(key);
        ops::replace(&self.root, key, expected, new_value, hash)
    }

    /// The underlying `Root` handle, for the `introspect` feature's structural
    /// walk. Not part of the public API surface.
    #[cfg_attr(not(feature = "introspect"), allow(dead_code))]
    pub(crate) fn root_handle(&self) -> &Arc<Root<K, V>> {
        &self.root
    }

    /// Takes an O(1) amortized snapshot: an independent map sharing the
    /// current subtree on a copy-on-descent basis. Writes to either map are
    /// invisible to the other.
    pub fn snapshot(&self) -> Self {
        Self {
            root: snapshot::snapshot(&self.root),
            hasher: self.hasher.clone(),
        }
    }

    /// The number of entries reachable from the root, computed by a full
    /// read-only walk. `O(n)`: the core offers no cheap cardinality, so this
    /// is never cached.
    pub fn len(&self) -> usize {
        count(&self.root.child.load_full())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn count<K, V>(node: &Arc<Node<K, V>>) -> usize {
    match &**node {
        Node::Branch(b) => (0..crate::node::BRANCH_WIDTH)
            .filter_map(|slot| b.child_at_slot(slot))
            .map(|slot| count(&slot.load_full()))
            .sum(),
        Node::Single(_) => 1,
        Node::Collisions(c) => c.entries.len(),
    }
}

impl<K, V, S: Clone> Clone for CtrieMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V, S> fmt::Debug for CtrieMap<K, V, S>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone + fmt::Debug,
    S: BuildHasher + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtrieMap").field("len", &self.len()).finish()
    }
}

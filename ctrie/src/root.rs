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

//! The `Root`: the externally addressable entry point of one map. A live map
//! holds exactly one `Arc<Root<K,V>>`; `snapshot()` mints another one sharing
//! the same subtree at the moment of the snap.

use {
    crate::{
        gen::{new_generation, Generation},
        node::Node,
        status::Status,
    },
    arc_swap::ArcSwap,
    std::sync::Arc,
};

pub struct Root<K, V> {
    pub(crate) status: ArcSwap<Status<K, V>>,
    pub(crate) child: ArcSwap<Node<K, V>>,
    pub(crate) generation: ArcSwap<crate::gen::GenTag>,
}

impl<K, V> Root<K, V> {
    pub(crate) fn new() -> Arc<Self> {
        let generation = new_generation();
        Arc::new(Self {
            status: ArcSwap::from_pointee(Status::Idle),
            child: ArcSwap::from_pointee(Node::new_empty_branch(generation.clone())),
            generation: ArcSwap::new(generation),
        })
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation.load_full()
    }
}

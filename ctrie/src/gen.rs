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

//! Generation tokens.
//!
//! A [`Generation`] has no observable payload; only its identity matters. Two
//! generations are "the same" iff they're the same allocation, which is exactly
//! what `Arc` pointer-equality gives us for free.

use std::sync::Arc;

/// Zero-sized marker. The only thing that matters about a generation is which
/// allocation of this type it points to.
pub(crate) struct GenTag;

/// An opaque, cloneable, reference-identity token.
pub type Generation = Arc<GenTag>;

/// Mint a fresh generation, distinct (by identity) from every other one ever minted.
pub fn new_generation() -> Generation {
    Arc::new(GenTag)
}

/// True iff both tokens were minted by the same [`new_generation`] call.
pub fn same_generation(a: &Generation, b: &Generation) -> bool {
    Arc::ptr_eq(a, b)
}

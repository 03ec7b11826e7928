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

//! Outcomes and failure kinds. There is no catch-all `Error` type here: a
//! `put_if_absent` finding the key occupied, or a `replace` finding the wrong
//! expected value, is not a failure of the engine — it's an ordinary answer,
//! so each operation family gets its own small outcome enum instead of
//! shoehorning "absent" and "mismatch" into a shared `Result::Err`.

use std::fmt;

/// Outcome of `replace` and `remove_if`: both are "do this only if the
/// current value equals an expectation" operations over a key that may or
/// may not be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalOutcome<V> {
    /// The condition held; the operation committed.
    Ok,
    /// The key was present but held a different value than expected.
    Mismatch(V),
    /// The key was not present at all.
    Absent,
}

impl<V> ConditionalOutcome<V> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl<V: fmt::Display> fmt::Display for ConditionalOutcome<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Mismatch(v) => write!(f, "mismatch (found {v})"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Abort the process (in debug builds) because the protocol's own invariants
/// were violated — a Branch reached with a generation that isn't refreshable,
/// a descriptor found in a shape `complete` doesn't recognize, and so on.
/// These indicate a bug in this crate, never a caller error, so they panic
/// rather than returning a `Result` the caller could reasonably handle.
macro_rules! invariant_violation {
    ($($arg:tt)*) => {
        unreachable!("ctrie: invariant violation: {}", format_args!($($arg)*))
    };
}
pub(crate) use invariant_violation;

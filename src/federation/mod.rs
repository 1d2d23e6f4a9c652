//-
// Copyright (c) 2026, Scramble developers
//
// This file is part of Scramble.
//
// Scramble is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Scramble is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Scramble. If not, see <http://www.gnu.org/licenses/>.

//! Federated public key resolution.
//!
//! A client holding a batch of hash addresses (`keyhash@host`) asks its own
//! server to resolve them. Addresses on that server are answered from the
//! local key store; the rest are forwarded, one request per host, to the
//! servers named in the batch. Other servers are untrusted, may be slow, and
//! may be unreachable, so the whole batch is bounded by a deadline and every
//! address always gets an answer, even if only a failure.
//!
//! The server never vouches for a key. The client must check that every
//! address it asked about is present in the result and that each key hashes
//! to the hash it was requested by.

pub mod aggregate;
pub mod dispatch;
pub mod fetch;
pub mod result;

pub use self::dispatch::{Caller, Dispatcher};
pub use self::fetch::{HttpKeyFetcher, KeyFetcher};
pub use self::result::{KeyResult, ResolutionMap, FAILED_TO_RETRIEVE};

/// The path on every server which answers batch lookups.
pub const PUBLIC_KEYS_PATH: &str = "/publickeys";

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

use std::collections::BTreeSet;

use super::result::{KeyResult, ResolutionMap};
use crate::address::HashAddress;

/// Folds the results for one batch into a single `ResolutionMap`.
///
/// Results come from the local key store and from other servers in any
/// order. Since each address belongs to exactly one host, sources never
/// compete for the same entry. `finish()` guarantees one entry per requested
/// address, substituting the failure sentinel for anything still missing.
#[derive(Debug)]
pub struct Aggregator {
    requested: BTreeSet<String>,
    results: ResolutionMap,
}

impl Aggregator {
    pub fn new<'a>(
        requested: impl IntoIterator<Item = &'a HashAddress>,
    ) -> Self {
        Self {
            requested: requested.into_iter().map(|a| a.to_string()).collect(),
            results: ResolutionMap::new(),
        }
    }

    /// Records the result of looking `addr` up in the local key store.
    pub fn add_local(&mut self, addr: &HashAddress, pub_key: Option<String>) {
        let result = match pub_key {
            Some(pub_key) if !pub_key.is_empty() => KeyResult::found(pub_key),
            _ => KeyResult::failed(),
        };
        self.insert(addr.to_string(), result);
    }

    /// Marks every address in `addrs` as failed.
    pub fn add_failure(&mut self, addrs: &[HashAddress]) {
        for addr in addrs {
            self.insert(addr.to_string(), KeyResult::failed());
        }
    }

    /// Records a response from another server, to which `sent` was the
    /// batch that was requested.
    ///
    /// Only entries for addresses in `sent` are considered. Entries carrying
    /// a key are taken as successes; anything else the other server said is
    /// discarded and the address is marked failed. Returns the number of
    /// addresses resolved.
    pub fn add_remote(
        &mut self,
        sent: &[HashAddress],
        mut response: ResolutionMap,
    ) -> usize {
        let mut resolved = 0;
        for addr in sent {
            let addr = addr.to_string();
            let result = match response.remove(&addr) {
                Some(r) if r.is_found() => {
                    resolved += 1;
                    KeyResult::found(r.pub_key)
                },
                _ => KeyResult::failed(),
            };
            self.insert(addr, result);
        }

        resolved
    }

    /// Returns the complete result map.
    pub fn finish(mut self) -> ResolutionMap {
        for addr in &self.requested {
            if !self.results.contains_key(addr) {
                self.results.insert(addr.clone(), KeyResult::failed());
            }
        }

        debug_assert_eq!(self.requested.len(), self.results.len());
        self.results
    }

    fn insert(&mut self, addr: String, result: KeyResult) {
        if self.requested.contains(&addr) {
            self.results.insert(addr, result);
        }
    }
}

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

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use super::{host_pattern, AddressError, Hosted};

/// The longest key hash accepted in a hash address.
pub const MAX_KEY_HASH_LEN: usize = 128;

lazy_static! {
    static ref RX_HASH_ADDRESS: Regex = Regex::new(concat!(
        "^([A-Za-z0-9]{1,128})@(",
        host_pattern!(),
        ")$"
    ))
    .unwrap();
    static ref RX_KEY_HASH: Regex =
        Regex::new("^[A-Za-z0-9]{1,128}$").unwrap();
}

/// Returns whether `hash` is syntactically acceptable as a public key hash.
///
/// Accepted hashes are plain alphanumerics, which also makes them safe to use
/// directly as file names.
pub fn is_valid_key_hash(hash: &str) -> bool {
    RX_KEY_HASH.is_match(hash)
}

/// Identifies a public key by its hash and the host expected to serve it,
/// written `keyhash@host`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashAddress {
    pub key_hash: String,
    pub host: String,
}

impl HashAddress {
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let cap = RX_HASH_ADDRESS
            .captures(s)
            .ok_or_else(|| AddressError::InvalidHashAddress(s.to_owned()))?;
        Ok(Self {
            key_hash: cap[1].to_owned(),
            host: cap[2].to_owned(),
        })
    }

    /// Parses a comma-separated batch such as `ab12@foo.com,cd34@bar.com`.
    ///
    /// The whole batch is rejected if any element is invalid. Duplicates are
    /// dropped, keeping the first occurrence, since each distinct address gets
    /// exactly one result.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, AddressError> {
        if list.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::<&str>::new();
        let mut ret = Vec::<Self>::new();
        for part in list.split(',') {
            let addr = Self::parse(part)?;
            if seen.insert(part) {
                ret.push(addr);
            }
        }

        Ok(ret)
    }
}

impl fmt::Display for HashAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.key_hash, self.host)
    }
}

impl FromStr for HashAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, AddressError> {
        Self::parse(s)
    }
}

impl Hosted for HashAddress {
    fn host(&self) -> &str {
        &self.host
    }
}

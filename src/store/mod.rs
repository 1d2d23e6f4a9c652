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

//! Storage of public keys owned by users of this server.
//!
//! Keys are opaque strings to the server; clients generate them and are
//! responsible for checking that a key matches the hash it was requested by.

mod dir;

use std::collections::HashMap;
use std::sync::RwLock;

pub use self::dir::DirKeyStore;
use crate::support::error::Error;

/// Looks up public keys known to this server by their hash.
pub trait KeyStore: Send + Sync {
    /// Returns the public key whose hash is `key_hash`, or `None` if this
    /// server does not know it.
    fn lookup_pub_key(&self, key_hash: &str) -> Result<Option<String>, Error>;
}

/// A `KeyStore` held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key_hash: impl Into<String>, key: impl Into<String>) {
        self.keys
            .write()
            .unwrap()
            .insert(key_hash.into(), key.into());
    }
}

impl KeyStore for MemoryKeyStore {
    fn lookup_pub_key(&self, key_hash: &str) -> Result<Option<String>, Error> {
        Ok(self.keys.read().unwrap().get(key_hash).cloned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn memory_store() {
        let store = MemoryKeyStore::new();
        assert_eq!(None, store.lookup_pub_key("ab12").unwrap());
        store.insert("ab12", "PUBKEY_A");
        assert_eq!(
            Some("PUBKEY_A".to_owned()),
            store.lookup_pub_key("ab12").unwrap()
        );
        assert_eq!(None, store.lookup_pub_key("AB12").unwrap());
    }
}

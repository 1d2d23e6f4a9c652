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

//! A key store kept as a flat directory of files.
//!
//! Each public key is stored in a file named `<hash>.pub`, whose entire
//! content is the key. Hashes are restricted to alphanumerics, so a hash is
//! always a safe file name.

use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use log::info;

use super::KeyStore;
use crate::address::hash::is_valid_key_hash;
use crate::support::error::Error;

const MAX_KEY_FILE_SIZE: u64 = 256 * 1024;

#[derive(Clone, Debug)]
pub struct DirKeyStore {
    root: PathBuf,
}

impl DirKeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the key directory if it does not already exist.
    pub fn init(&self) -> Result<(), Error> {
        match fs::DirBuilder::new().mode(0o750).create(&self.root) {
            Ok(()) => {
                info!("Created key directory {}", self.root.display());
                Ok(())
            },
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores `key` under `key_hash`, replacing any key already there.
    ///
    /// The key is written to a temporary file first so that readers never
    /// observe a partial key.
    pub fn insert(&self, key_hash: &str, key: &str) -> Result<(), Error> {
        let path = self.key_path(key_hash)?;
        if key.len() as u64 > MAX_KEY_FILE_SIZE {
            return Err(Error::KeyFileTooLarge);
        }

        let tmp_path = self.root.join(format!(".{key_hash}.tmp"));
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(key.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn key_path(&self, key_hash: &str) -> Result<PathBuf, Error> {
        if !is_valid_key_hash(key_hash) {
            return Err(Error::InvalidKeyHash);
        }

        Ok(self.root.join(format!("{key_hash}.pub")))
    }
}

impl KeyStore for DirKeyStore {
    fn lookup_pub_key(&self, key_hash: &str) -> Result<Option<String>, Error> {
        let path = self.key_path(key_hash)?;
        let file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if io::ErrorKind::NotFound == e.kind() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut key = String::new();
        file.take(MAX_KEY_FILE_SIZE + 1).read_to_string(&mut key)?;
        if key.len() as u64 > MAX_KEY_FILE_SIZE {
            return Err(Error::KeyFileTooLarge);
        }

        Ok(Some(key))
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn store_and_look_up() {
        let root = TempDir::new().unwrap();
        let store = DirKeyStore::new(root.path().join("keys"));
        store.init().unwrap();
        store.init().unwrap();

        assert_eq!(None, store.lookup_pub_key("ab12").unwrap());
        store.insert("ab12", "-----BEGIN PGP PUBLIC KEY BLOCK-----").unwrap();
        assert_eq!(
            Some("-----BEGIN PGP PUBLIC KEY BLOCK-----".to_owned()),
            store.lookup_pub_key("ab12").unwrap()
        );

        store.insert("ab12", "replaced").unwrap();
        assert_eq!(
            Some("replaced".to_owned()),
            store.lookup_pub_key("ab12").unwrap()
        );
        assert!(!root.path().join("keys/.ab12.tmp").exists());
    }

    #[test]
    fn rejects_unsafe_hashes() {
        let root = TempDir::new().unwrap();
        let store = DirKeyStore::new(root.path());

        assert_matches!(
            Err(Error::InvalidKeyHash),
            store.lookup_pub_key("../../etc/passwd")
        );
        assert_matches!(Err(Error::InvalidKeyHash), store.lookup_pub_key(""));
        assert_matches!(
            Err(Error::InvalidKeyHash),
            store.insert(".hidden", "key")
        );
    }

    #[test]
    fn rejects_oversized_keys() {
        let root = TempDir::new().unwrap();
        let store = DirKeyStore::new(root.path());
        let huge = "k".repeat(MAX_KEY_FILE_SIZE as usize + 1);

        assert_matches!(
            Err(Error::KeyFileTooLarge),
            store.insert("ab12", &huge)
        );

        fs::write(root.path().join("ab12.pub"), &huge).unwrap();
        assert_matches!(
            Err(Error::KeyFileTooLarge),
            store.lookup_pub_key("ab12")
        );
    }
}

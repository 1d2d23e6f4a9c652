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


use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use log::info;

use super::main::{open_key_store, ServerAddKeySubcommand};
use crate::support::error::Error;
use crate::support::system_config::SystemConfig;

pub fn add(
    system_config: SystemConfig,
    root: PathBuf,
    cmd: ServerAddKeySubcommand,
) {
    let key = if cmd.file.to_str() == Some("-") {
        let mut key = String::new();
        io::stdin()
            .read_to_string(&mut key)
            .map(|_| key)
            .unwrap_or_else(|e| die!(EX_IOERR, "Error reading stdin: {}", e))
    } else {
        fs::read_to_string(&cmd.file).unwrap_or_else(|e| {
            die!(EX_NOINPUT, "Error reading '{}': {}", cmd.file.display(), e)
        })
    };

    if key.trim().is_empty() {
        die!(EX_DATAERR, "The public key is empty");
    }

    let key_store = open_key_store(&system_config, &root);
    match key_store.insert(&cmd.hash, &key) {
        Ok(()) => info!(
            "Stored public key for {}@{}",
            cmd.hash, system_config.server.host_name
        ),
        Err(e @ Error::InvalidKeyHash) | Err(e @ Error::KeyFileTooLarge) => {
            die!(EX_DATAERR, "{}", e)
        },
        Err(e) => fatal!(EX_CANTCREAT, "Unable to store key: {}", e),
    }
}

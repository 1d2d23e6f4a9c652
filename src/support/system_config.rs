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

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The system-wide configuration for Scramble.
///
/// This is stored in a file named `scramble.toml` under the Scramble system
/// root, which is typically `/usr/local/etc/scramble` or `/etc/scramble`.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Options for looking up public keys on other servers.
    ///
    /// The defaults are reasonable for most installations.
    #[serde(default)]
    pub federation: FederationConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The canonical host name of this server.
    ///
    /// Hash addresses on this host are resolved from the local key store, and
    /// this host is never looked up in DNS when grouping by mail exchanger.
    ///
    /// If unset, the system host name is used.
    pub host_name: String,

    /// The address the HTTP server listens on.
    pub listen: String,

    /// The directory containing one file per known public key, named after
    /// the key's hash. Relative paths are relative to the system root.
    pub key_dir: PathBuf,

    /// The file holding session credentials, relative to the system root.
    ///
    /// If unset, no session ever authenticates, and every caller is treated
    /// as another server.
    pub credentials: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_name: String::new(),
            listen: "0.0.0.0:8888".to_owned(),
            key_dir: "keys".into(),
            credentials: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FederationConfig {
    /// How long, in milliseconds, a batch lookup may wait for other servers
    /// in total.
    pub deadline_ms: u64,

    /// The maximum number of other servers a single batch talks to at once.
    pub max_concurrent_hosts: usize,

    /// Talk to other servers over plain HTTP instead of HTTPS.
    ///
    /// This is only useful for testing several servers on one machine.
    pub insecure_http: bool,

    /// Responses from other servers larger than this are discarded.
    pub max_response_bytes: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 5_000,
            max_concurrent_hosts: 16,
            insecure_http: false,
            max_response_bytes: 1024 * 1024,
        }
    }
}

impl FederationConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn scheme(&self) -> &'static str {
        if self.insecure_http {
            "http"
        } else {
            "https"
        }
    }
}

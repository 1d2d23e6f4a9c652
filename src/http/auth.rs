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

//! Session authentication.
//!
//! The browser client keeps its session in three cookies: `token` (the user
//! name), `passHash`, and optionally `passHashOld`, which lets a session keep
//! working across a password change. Requests without a valid session are
//! treated as coming from another server.

use std::collections::HashMap;
use std::path::Path;

use axum::http::{header::COOKIE, HeaderMap};
use serde::Deserialize;

use crate::address::EmailAddress;
use crate::support::error::Error;

/// A logged-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserId {
    pub token: String,
    /// The hash of the user's public key, which is also the local part of
    /// their address.
    pub public_hash: String,
}

impl UserId {
    /// The user's address on `host`.
    pub fn email_address(&self, host: &str) -> EmailAddress {
        EmailAddress {
            name: self.public_hash.clone(),
            host: host.to_owned(),
        }
    }
}

/// The session cookies presented with a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub token: String,
    pub pass_hash: String,
    pub pass_hash_old: String,
}

impl SessionCookies {
    /// Extracts the session cookies from `headers`.
    ///
    /// Returns `None` if `token` or `passHash` is absent. A missing
    /// `passHashOld` is treated as empty.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let mut token = None;
        let mut pass_hash = None;
        let mut pass_hash_old = None;

        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };

            for cookie in value.split(';') {
                let Some((name, value)) = cookie.trim().split_once('=') else {
                    continue;
                };
                let slot = match name {
                    "token" => &mut token,
                    "passHash" => &mut pass_hash,
                    "passHashOld" => &mut pass_hash_old,
                    _ => continue,
                };
                *slot = Some(value.to_owned());
            }
        }

        Some(Self {
            token: token?,
            pass_hash: pass_hash?,
            pass_hash_old: pass_hash_old.unwrap_or_default(),
        })
    }
}

/// Checks session credentials.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, cookies: &SessionCookies) -> Option<UserId>;
}

/// One account in a `CredentialTable`.
#[derive(Clone, Debug, Deserialize)]
pub struct Credential {
    pub token: String,
    pub password_hash: String,
    #[serde(default)]
    pub password_hash_old: String,
    pub public_hash: String,
}

#[derive(Debug, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    user: Vec<Credential>,
}

/// An `Authenticator` over a fixed set of accounts.
///
/// This is loaded from a TOML file containing a list of `[[user]]` tables,
/// each with the fields of `Credential`.
#[derive(Debug, Default)]
pub struct CredentialTable {
    by_token: HashMap<String, Credential>,
}

impl CredentialTable {
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            by_token: credentials
                .into_iter()
                .map(|c| (c.token.clone(), c))
                .collect(),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let file: CredentialFile = toml::from_str(text)?;
        Ok(Self::new(file.user))
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }
}

impl Authenticator for CredentialTable {
    fn authenticate(&self, cookies: &SessionCookies) -> Option<UserId> {
        let credential = self.by_token.get(&cookies.token)?;

        // An empty hash never matches, so a blank cookie can't match an
        // account with no old password.
        let current = !cookies.pass_hash.is_empty()
            && cookies.pass_hash == credential.password_hash;
        let old = !cookies.pass_hash_old.is_empty()
            && cookies.pass_hash_old == credential.password_hash_old;

        if current || old {
            Some(UserId {
                token: credential.token.clone(),
                public_hash: credential.public_hash.clone(),
            })
        } else {
            None
        }
    }
}

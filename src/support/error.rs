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

use std::io;

use thiserror::Error;

use crate::address::AddressError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid public key hash")]
    InvalidKeyHash,
    #[error("Public key file too large")]
    KeyFileTooLarge,
    #[error("Remote host responded with HTTP status {0}")]
    HttpStatus(u16),
    #[error("Remote response exceeded {0} bytes")]
    ResponseTooLarge(usize),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Dns(#[from] hickory_resolver::error::ResolveError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

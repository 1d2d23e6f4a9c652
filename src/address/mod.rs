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

//! Address types used by the mail and key-lookup protocols.
//!
//! Two schemes are in use. Mailbox addresses (`name@host`, see `email`) name
//! a person, and may carry a tag after `#` in the local part. Hash addresses
//! (`keyhash@host`, see `hash`) name a public key by its hash together with
//! the host that is expected to be able to serve it.

// Shared between the two address grammars. A host is one or more
// dot-separated labels, optionally followed by a port so that test
// deployments on loopback can federate with each other.
macro_rules! host_pattern {
    () => {
        r"[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*(?::[0-9]{1,5})?"
    };
}
pub(crate) use host_pattern;

pub mod email;
pub mod grouping;
pub mod hash;

use thiserror::Error;

pub use self::email::{EmailAddress, EmailAddresses};
pub use self::grouping::{group_by_host, group_by_mx_host, HostBuckets};
pub use self::hash::HashAddress;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid email address {0:?}")]
    InvalidAddress(String),
    #[error("Invalid angled email address {0:?}")]
    InvalidAngledAddress(String),
    #[error("Invalid hash address {0:?}")]
    InvalidHashAddress(String),
}

/// Whether `a` and `b` name the same host. Host names are compared without
/// regard to ASCII case, as in DNS.
pub fn same_host(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Anything that is routed according to a host name.
pub trait Hosted {
    fn host(&self) -> &str;
}

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

use async_trait::async_trait;
use log::{debug, warn};
use rand::seq::SliceRandom;

pub use hickory_resolver::Name;

use super::error::Error;

pub type Resolver = hickory_resolver::AsyncResolver<
    hickory_resolver::name_server::GenericConnector<
        hickory_resolver::name_server::TokioRuntimeProvider,
    >,
>;

/// Maps a host to the host that receives its mail.
#[async_trait]
pub trait MxLookup: Send + Sync {
    /// Returns the mail exchanger for `host`, or `None` if it could not be
    /// determined.
    async fn lookup_mx(&self, host: &str) -> Option<String>;
}

/// `MxLookup` backed by real DNS.
pub struct HickoryMxResolver {
    resolver: Resolver,
}

impl HickoryMxResolver {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    /// Creates a resolver using the system DNS configuration
    /// (`/etc/resolv.conf` on UNIX).
    pub fn from_system_conf() -> Result<Self, Error> {
        Ok(Self::new(
            hickory_resolver::AsyncResolver::tokio_from_system_conf()?,
        ))
    }
}

#[async_trait]
impl MxLookup for HickoryMxResolver {
    async fn lookup_mx(&self, host: &str) -> Option<String> {
        use hickory_resolver::error::ResolveErrorKind as Rek;

        let mut name = match Name::from_str_relaxed(host) {
            Ok(name) => name,
            Err(e) => {
                debug!("Not looking up MX of invalid domain {}: {}", host, e);
                return None;
            },
        };
        name.set_fqdn(true);

        match self.resolver.mx_lookup(name).await {
            Ok(records) => {
                let records = records
                    .iter()
                    .map(|mx| (mx.exchange().to_ascii(), mx.preference()))
                    .collect::<Vec<_>>();
                // A successful lookup with nothing in it is the same as no
                // records at all.
                if records.is_empty() {
                    return Some(host.to_owned());
                }

                let chosen = choose_exchanger(records);
                if chosen.is_none() {
                    debug!("{} publishes a null MX", host);
                }
                chosen
            },

            Err(e) => match *e.kind() {
                // RFC 5321 § 5.1: with no MX records, the domain itself is the
                // mail exchanger.
                Rek::NoRecordsFound { .. } => {
                    debug!("No MX record for {}, using it directly", host);
                    Some(host.to_owned())
                },
                _ => {
                    warn!("DNS error looking up MX for {}: {}", host, e);
                    None
                },
            },
        }
    }
}

/// Selects the most preferred exchanger among `(name, preference)` pairs.
///
/// Lower preference values are more preferred. Equally preferred exchangers
/// are chosen between randomly to spread load as RFC 5321 asks. The returned
/// name never has a trailing dot.
fn choose_exchanger(mut records: Vec<(String, u16)>) -> Option<String> {
    records.shuffle(&mut rand::thread_rng());
    records
        .into_iter()
        .min_by_key(|&(_, preference)| preference)
        .map(|(name, _)| name.trim_end_matches('.').to_owned())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    fn rec(name: &str, pref: u16) -> (String, u16) {
        (name.to_owned(), pref)
    }

    #[test]
    fn exchanger_choice() {
        assert_eq!(None, choose_exchanger(vec![]));
        assert_eq!(
            Some("mx.example.com".to_owned()),
            choose_exchanger(vec![rec("mx.example.com.", 10)])
        );
        assert_eq!(
            Some("primary.example.com".to_owned()),
            choose_exchanger(vec![
                rec("backup.example.com.", 20),
                rec("primary.example.com.", 5),
                rec("tertiary.example.com.", 30),
            ])
        );

        for _ in 0..16 {
            let chosen = choose_exchanger(vec![
                rec("a.example.com.", 10),
                rec("b.example.com.", 10),
                rec("c.example.com.", 50),
            ])
            .unwrap();
            assert!(
                "a.example.com" == chosen || "b.example.com" == chosen,
                "{chosen}"
            );
        }

        // A null MX ("." per RFC 7505) is not an exchanger.
        assert_eq!(None, choose_exchanger(vec![rec(".", 0)]));
    }
}

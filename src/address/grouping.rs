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

use std::collections::BTreeMap;

use log::debug;

use super::{same_host, Hosted};
use crate::support::dns::MxLookup;

/// Items partitioned by host.
///
/// Every input item lands in exactly one bucket. Iteration is ordered by
/// host so that anything derived from a grouping is deterministic.
pub type HostBuckets<T> = BTreeMap<String, Vec<T>>;

/// Groups `items` by their host, preserving input order within each bucket.
pub fn group_by_host<T: Hosted>(
    items: impl IntoIterator<Item = T>,
) -> HostBuckets<T> {
    let mut buckets = HostBuckets::<T>::new();
    for item in items {
        buckets.entry(item.host().to_owned()).or_default().push(item);
    }
    buckets
}

/// Like `group_by_host`, but keys each bucket by the mail exchanger of its
/// host instead of the host itself.
///
/// Returns `(resolved, failed)`. Hosts that share a mail exchanger are
/// coalesced into one `resolved` bucket. Buckets whose MX lookup failed are
/// placed unchanged into `failed`, keyed by the original host.
///
/// `self_host` is never looked up; its bucket goes directly into `resolved`
/// under `self_host`, whatever the letter case of the addresses' hosts.
/// This keeps the server from looking itself up (which would fail anyway in
/// deployments without real DNS, such as local testing).
pub async fn group_by_mx_host<T: Hosted, M: MxLookup + ?Sized>(
    items: impl IntoIterator<Item = T>,
    self_host: &str,
    mx: &M,
) -> (HostBuckets<T>, HostBuckets<T>) {
    let mut resolved = HostBuckets::<T>::new();
    let mut failed = HostBuckets::<T>::new();

    let mut to_look_up = Vec::<(String, Vec<T>)>::new();
    for (host, items) in group_by_host(items) {
        if same_host(&host, self_host) {
            resolved.entry(self_host.to_owned()).or_default().extend(items);
        } else {
            to_look_up.push((host, items));
        }
    }

    let exchangers = futures::future::join_all(
        to_look_up.iter().map(|&(ref host, _)| mx.lookup_mx(host)),
    )
    .await;

    for ((host, items), exchanger) in to_look_up.into_iter().zip(exchangers)
    {
        match exchanger {
            Some(exchanger) => {
                debug!("{} routes to MX {}", host, exchanger);
                resolved.entry(exchanger).or_default().extend(items);
            },
            None => {
                debug!("MX lookup for {} failed", host);
                failed.insert(host, items);
            },
        }
    }

    (resolved, failed)
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use super::*;
    use crate::address::{EmailAddress, EmailAddresses, HashAddress};

    struct FakeMx {
        records: HashMap<&'static str, &'static str>,
        queried: Mutex<Vec<String>>,
    }

    impl FakeMx {
        fn new(records: &[(&'static str, &'static str)]) -> Self {
            Self {
                records: records.iter().copied().collect(),
                queried: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MxLookup for FakeMx {
        async fn lookup_mx(&self, host: &str) -> Option<String> {
            self.queried.lock().unwrap().push(host.to_owned());
            self.records.get(host).map(|&mx| mx.to_owned())
        }
    }

    fn addrs(s: &str) -> Vec<EmailAddress> {
        EmailAddresses::parse_list(s).unwrap().0
    }

    fn strings(v: &[EmailAddress]) -> Vec<String> {
        v.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn group_by_host_basics() {
        assert!(group_by_host(Vec::<EmailAddress>::new()).is_empty());

        let buckets = group_by_host(addrs("a@x.com,b@y.com,c@x.com"));
        assert_eq!(2, buckets.len());
        assert_eq!(vec!["a@x.com", "c@x.com"], strings(&buckets["x.com"]));
        assert_eq!(vec!["b@y.com"], strings(&buckets["y.com"]));
    }

    #[test]
    fn group_hash_addresses() {
        let batch = HashAddress::parse_list("ab12@hostA,cd34@hostB").unwrap();
        let buckets = group_by_host(batch);
        assert_eq!("ab12", buckets["hostA"][0].key_hash);
        assert_eq!("cd34", buckets["hostB"][0].key_hash);
    }

    #[tokio::main(flavor = "current_thread")]
    async fn mx_group(
        list: &str,
        self_host: &str,
        mx: &FakeMx,
    ) -> (HostBuckets<EmailAddress>, HostBuckets<EmailAddress>) {
        group_by_mx_host(addrs(list), self_host, mx).await
    }

    #[test]
    fn mx_grouping_coalesces_and_fails() {
        let mx = FakeMx::new(&[
            ("gmail.com", "mx.google.com"),
            ("googlemail.com", "mx.google.com"),
            ("example.com", "mail.example.com"),
        ]);
        let (resolved, failed) = mx_group(
            "a@gmail.com,b@nowhere.invalid,c@googlemail.com,d@example.com",
            "scramble.io",
            &mx,
        );

        assert_eq!(2, resolved.len());
        assert_eq!(
            vec!["a@gmail.com", "c@googlemail.com"],
            strings(&resolved["mx.google.com"])
        );
        assert_eq!(
            vec!["d@example.com"],
            strings(&resolved["mail.example.com"])
        );

        assert_eq!(1, failed.len());
        assert_eq!(
            vec!["b@nowhere.invalid"],
            strings(&failed["nowhere.invalid"])
        );
    }

    #[test]
    fn mx_grouping_skips_self() {
        let mx = FakeMx::new(&[("scramble.io", "elsewhere.net")]);
        let (resolved, failed) = mx_group(
            "a@scramble.io,b@localhost:8888,c@scramble.io",
            "scramble.io",
            &mx,
        );

        assert_eq!(
            vec!["a@scramble.io", "c@scramble.io"],
            strings(&resolved["scramble.io"])
        );
        assert!(!resolved.contains_key("elsewhere.net"));
        assert_eq!(
            vec!["b@localhost:8888"],
            strings(&failed["localhost:8888"])
        );
        assert_eq!(
            vec!["localhost:8888".to_owned()],
            *mx.queried.lock().unwrap()
        );
    }

    #[test]
    fn mx_grouping_self_merges_with_exchanger_bucket() {
        // Another domain whose exchanger is this server shares the bucket.
        let mx = FakeMx::new(&[("alias.org", "scramble.io")]);
        let (resolved, failed) =
            mx_group("a@scramble.io,b@alias.org", "scramble.io", &mx);
        assert!(failed.is_empty());
        assert_eq!(
            vec!["a@scramble.io", "b@alias.org"],
            strings(&resolved["scramble.io"])
        );
    }

    #[test]
    fn mx_grouping_self_ignores_case() {
        let mx = FakeMx::new(&[]);
        let (resolved, failed) =
            mx_group("a@Scramble.IO,b@scramble.io", "scramble.io", &mx);
        assert!(failed.is_empty());
        assert_eq!(1, resolved.len());
        assert_eq!(
            vec!["a@Scramble.IO", "b@scramble.io"],
            strings(&resolved["scramble.io"])
        );
        assert!(mx.queried.lock().unwrap().is_empty());
    }

    #[test]
    fn mx_grouping_empty() {
        let mx = FakeMx::new(&[]);
        let (resolved, failed) = mx_group("", "scramble.io", &mx);
        assert!(resolved.is_empty());
        assert!(failed.is_empty());
        assert!(mx.queried.lock().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn group_by_host_partitions(
            pairs in prop::collection::vec(
                ("[a-z]{1,4}", "[a-c]{1,2}\\.com"), 0..30),
        ) {
            let input = pairs
                .iter()
                .map(|(n, h)| EmailAddress::parse(&format!("{n}@{h}")).unwrap())
                .collect::<Vec<_>>();
            let buckets = group_by_host(input.clone());

            let mut total = 0;
            for (host, bucket) in &buckets {
                prop_assert!(!bucket.is_empty());
                for a in bucket {
                    prop_assert_eq!(host, &a.host);
                }
                // Order within the bucket follows the input.
                let expected = input
                    .iter()
                    .filter(|a| &a.host == host)
                    .cloned()
                    .collect::<Vec<_>>();
                prop_assert_eq!(&expected, bucket);
                total += bucket.len();
            }
            prop_assert_eq!(input.len(), total);
        }
    }
}

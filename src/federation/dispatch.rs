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

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::{
    aggregate::Aggregator, fetch::KeyFetcher, result::ResolutionMap,
};
use crate::address::{group_by_host, same_host, HashAddress};
use crate::store::KeyStore;
use crate::support::{
    error::Error, log_prefix::LogPrefix, system_config::SystemConfig,
};

/// Who submitted a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caller {
    /// No session; presumably another server asking about our own keys.
    Server,
    /// A logged-in user of this server, identified by their key hash.
    User(String),
}

/// Resolves batches of hash addresses, locally and by asking other servers.
pub struct Dispatcher {
    self_host: String,
    key_store: Arc<dyn KeyStore>,
    fetcher: Arc<dyn KeyFetcher>,
    deadline: Duration,
    max_concurrent_hosts: usize,
}

/// What one per-host task reports back.
struct HostOutcome {
    host: String,
    addrs: Vec<HashAddress>,
    result: Result<ResolutionMap, Error>,
}

impl Dispatcher {
    pub fn new(
        self_host: String,
        key_store: Arc<dyn KeyStore>,
        fetcher: Arc<dyn KeyFetcher>,
        deadline: Duration,
        max_concurrent_hosts: usize,
    ) -> Self {
        Self {
            self_host,
            key_store,
            fetcher,
            deadline,
            max_concurrent_hosts: max_concurrent_hosts.max(1),
        }
    }

    pub fn from_config(
        config: &SystemConfig,
        key_store: Arc<dyn KeyStore>,
        fetcher: Arc<dyn KeyFetcher>,
    ) -> Self {
        Self::new(
            config.server.host_name.clone(),
            key_store,
            fetcher,
            config.federation.deadline(),
            config.federation.max_concurrent_hosts,
        )
    }

    pub fn self_host(&self) -> &str {
        &self.self_host
    }

    /// Resolves `batch` on behalf of `caller`.
    ///
    /// The result always has exactly one entry per distinct address in
    /// `batch`.
    pub async fn resolve(
        &self,
        log_prefix: &LogPrefix,
        caller: &Caller,
        batch: &[HashAddress],
    ) -> ResolutionMap {
        match *caller {
            Caller::Server => self.resolve_for_server(log_prefix, batch).await,
            Caller::User(ref user) => {
                debug!(
                    "{} Resolving {} address(es) for {}",
                    log_prefix,
                    batch.len(),
                    user
                );
                self.resolve_federated(log_prefix, batch).await
            },
        }
    }

    /// Handles a batch from another server.
    ///
    /// Servers only ever exchange what is local to the server being asked,
    /// so nothing is forwarded. Addresses on any other host are answered with
    /// the failure sentinel rather than looked up, so that this server never
    /// speaks for keys it does not host.
    async fn resolve_for_server(
        &self,
        log_prefix: &LogPrefix,
        batch: &[HashAddress],
    ) -> ResolutionMap {
        let mut aggregator = Aggregator::new(batch);
        let mut local = Vec::<HashAddress>::new();
        for (host, addrs) in group_by_host(batch.iter().cloned()) {
            if same_host(&host, &self.self_host) {
                local.extend(addrs);
            } else {
                info!(
                    "{} Refusing to answer for {} address(es) on {}",
                    log_prefix,
                    addrs.len(),
                    host
                );
                aggregator.add_failure(&addrs);
            }
        }

        self.resolve_locally(log_prefix, &mut aggregator, local).await;
        aggregator.finish()
    }

    /// Handles a batch from one of our own users.
    ///
    /// Local addresses are looked up directly. Every other host gets one
    /// request for its share of the batch; at most `max_concurrent_hosts`
    /// are in flight at once. Whatever has not come back when the deadline
    /// expires is cancelled and reported as failed.
    async fn resolve_federated(
        &self,
        log_prefix: &LogPrefix,
        batch: &[HashAddress],
    ) -> ResolutionMap {
        let deadline = Instant::now() + self.deadline;
        let mut aggregator = Aggregator::new(batch);
        let permits = Arc::new(Semaphore::new(self.max_concurrent_hosts));
        let mut tasks = JoinSet::<HostOutcome>::new();

        let mut local = Vec::<HashAddress>::new();

        for (host, addrs) in group_by_host(batch.iter().cloned()) {
            if same_host(&host, &self.self_host) {
                local.extend(addrs);
                continue;
            }

            debug!(
                "{} Asking {} for {} key(s)",
                log_prefix,
                host,
                addrs.len()
            );
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // The semaphore is never closed, so this can't fail; the
                // permit is held until the request is done.
                let _permit = permits.acquire_owned().await;
                let result = fetcher.fetch(&host, &addrs).await;
                HostOutcome {
                    host,
                    addrs,
                    result,
                }
            });
        }

        // Remote requests are already under way while the store is read.
        self.resolve_locally(log_prefix, &mut aggregator, local).await;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(None) => break,
                Ok(Some(Ok(outcome))) => {
                    record_outcome(log_prefix, &mut aggregator, outcome)
                },
                Ok(Some(Err(e))) => {
                    // Its addresses are filled in by finish()
                    error!("{} Key lookup task failed: {}", log_prefix, e);
                },
                Err(_) => {
                    warn!(
                        "{} Deadline expired with {} host(s) outstanding",
                        log_prefix,
                        tasks.len()
                    );
                    break;
                },
            }
        }

        if !tasks.is_empty() {
            tasks.abort_all();
            tokio::spawn(reap(log_prefix.clone(), tasks));
        }

        aggregator.finish()
    }

    /// Looks `addrs` up in the local key store.
    ///
    /// The store may block on the file system, so the lookups run on the
    /// blocking thread pool.
    async fn resolve_locally(
        &self,
        log_prefix: &LogPrefix,
        aggregator: &mut Aggregator,
        addrs: Vec<HashAddress>,
    ) {
        if addrs.is_empty() {
            return;
        }

        let key_store = Arc::clone(&self.key_store);
        let lookups = tokio::task::spawn_blocking(move || {
            addrs
                .into_iter()
                .map(|addr| {
                    let pub_key = key_store.lookup_pub_key(&addr.key_hash);
                    (addr, pub_key)
                })
                .collect::<Vec<_>>()
        })
        .await;

        let lookups = match lookups {
            Ok(lookups) => lookups,
            Err(e) => {
                // Its addresses are filled in by finish()
                error!("{} Local key lookup task failed: {}", log_prefix, e);
                return;
            },
        };

        for (addr, pub_key) in lookups {
            match pub_key {
                Ok(pub_key) => aggregator.add_local(&addr, pub_key),
                Err(e) => {
                    error!(
                        "{} Error looking up local key {}: {}",
                        log_prefix, addr.key_hash, e
                    );
                    aggregator.add_failure(std::slice::from_ref(&addr));
                },
            }
        }
    }
}

fn record_outcome(
    log_prefix: &LogPrefix,
    aggregator: &mut Aggregator,
    outcome: HostOutcome,
) {
    match outcome.result {
        Ok(response) => {
            let resolved = aggregator.add_remote(&outcome.addrs, response);
            debug!(
                "{} {} resolved {}/{} key(s)",
                log_prefix,
                outcome.host,
                resolved,
                outcome.addrs.len()
            );
        },
        Err(e) => {
            warn!(
                "{} Key lookup on {} failed: {}",
                log_prefix, outcome.host, e
            );
            aggregator.add_failure(&outcome.addrs);
        },
    }
}

/// Waits for the aborted tasks of a batch whose response has already been
/// sent, so that every one of them is seen to terminate.
async fn reap(log_prefix: LogPrefix, mut tasks: JoinSet<HostOutcome>) {
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(outcome) => debug!(
                "{} Discarding late response from {}",
                log_prefix, outcome.host
            ),
            Err(e) if e.is_cancelled() => debug!(
                "{} Cancelled a key lookup past the deadline",
                log_prefix
            ),
            Err(e) => {
                error!("{} Key lookup task failed: {}", log_prefix, e)
            },
        }
    }
}

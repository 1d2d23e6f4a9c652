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

use std::time::Duration;

use async_trait::async_trait;

use super::{result::ResolutionMap, PUBLIC_KEYS_PATH};
use crate::address::HashAddress;
use crate::support::{error::Error, system_config::FederationConfig};

/// Asks another server to resolve a batch of hash addresses it hosts.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Requests `addrs`, all of which are on `host`, from `host`.
    ///
    /// The returned map is exactly what the other server said; nothing about
    /// it is trusted yet.
    async fn fetch(
        &self,
        host: &str,
        addrs: &[HashAddress],
    ) -> Result<ResolutionMap, Error>;
}

/// `KeyFetcher` which POSTs to `/publickeys/` on the other server.
#[derive(Clone, Debug)]
pub struct HttpKeyFetcher {
    client: reqwest::Client,
    scheme: &'static str,
    max_response_bytes: usize,
}

impl HttpKeyFetcher {
    pub fn new(config: &FederationConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.deadline())
            .connect_timeout(config.deadline().min(Duration::from_secs(3)))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            scheme: config.scheme(),
            max_response_bytes: config.max_response_bytes,
        })
    }

    fn url(&self, host: &str) -> String {
        format!("{}://{}{}/", self.scheme, host, PUBLIC_KEYS_PATH)
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(
        &self,
        host: &str,
        addrs: &[HashAddress],
    ) -> Result<ResolutionMap, Error> {
        let addresses = addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut response = self
            .client
            .post(self.url(host))
            .form(&[("addresses", addresses)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        // The response is dropped on every return path below, which closes
        // or recycles the connection.
        let mut body = Vec::<u8>::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(Error::ResponseTooLarge(self.max_response_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn url_construction() {
        let mut config = FederationConfig::default();
        let fetcher = HttpKeyFetcher::new(&config).unwrap();
        assert_eq!(
            "https://scramble.io/publickeys/",
            fetcher.url("scramble.io")
        );

        config.insecure_http = true;
        let fetcher = HttpKeyFetcher::new(&config).unwrap();
        assert_eq!(
            "http://localhost:8888/publickeys/",
            fetcher.url("localhost:8888")
        );
    }
}

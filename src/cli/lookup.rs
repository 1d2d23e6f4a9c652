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

use super::main::{
    dispatcher, open_key_store, runtime, ServerMxRouteSubcommand,
    ServerResolveSubcommand,
};
use crate::address::{group_by_mx_host, EmailAddresses, HashAddress};
use crate::federation::Caller;
use crate::support::dns::HickoryMxResolver;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;

pub fn mx_route(system_config: SystemConfig, cmd: ServerMxRouteSubcommand) {
    let addresses = EmailAddresses::parse_list(&cmd.addresses)
        .unwrap_or_else(|e| die!(EX_DATAERR, "{}", e));

    let (resolved, failed) = runtime().block_on(async {
        let resolver = HickoryMxResolver::from_system_conf().unwrap_or_else(
            |e| fatal!(EX_CONFIG, "Unable to set up DNS resolver: {}", e),
        );
        group_by_mx_host(
            addresses,
            &system_config.server.host_name,
            &resolver,
        )
        .await
    });

    for (exchanger, addresses) in resolved {
        println!(
            "{}: {}",
            exchanger,
            EmailAddresses::from(addresses).angled(", ")
        );
    }

    for (host, addresses) in failed {
        println!(
            "{} (no route): {}",
            host,
            EmailAddresses::from(addresses).angled(", ")
        );
    }
}

pub fn resolve(
    system_config: SystemConfig,
    root: PathBuf,
    cmd: ServerResolveSubcommand,
) {
    let batch = HashAddress::parse_list(&cmd.addresses)
        .unwrap_or_else(|e| die!(EX_DATAERR, "{}", e));

    let key_store = open_key_store(&system_config, &root);
    let dispatcher = dispatcher(&system_config, key_store);
    let log_prefix = LogPrefix::new("cli".to_owned());
    let caller = Caller::User(format!("uid {}", nix::unistd::getuid()));

    let result = runtime()
        .block_on(dispatcher.resolve(&log_prefix, &caller, &batch));

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => fatal!(EX_SOFTWARE, "Unable to format result: {}", e),
    }
}

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
use std::sync::Arc;

use log::info;
use tokio::net::TcpListener;

use super::main::{dispatcher, load_credentials, open_key_store, runtime};
use crate::http::server::{self, ServerState};
use crate::support::system_config::SystemConfig;

pub fn serve(system_config: SystemConfig, root: PathBuf) {
    let key_store = open_key_store(&system_config, &root);
    let credentials = load_credentials(&system_config, &root);
    info!(
        "Loaded {} account(s); serving keys from '{}'",
        credentials.len(),
        key_store.root().display()
    );

    let state = Arc::new(ServerState {
        dispatcher: dispatcher(&system_config, Arc::clone(&key_store)),
        key_store,
        authenticator: Arc::new(credentials),
    });

    runtime().block_on(async {
        let listener = match TcpListener::bind(&system_config.server.listen)
            .await
        {
            Ok(l) => l,
            Err(e) => fatal!(
                EX_OSERR,
                "Unable to listen on {}: {}",
                system_config.server.listen,
                e
            ),
        };

        if let Err(e) = server::serve(listener, state).await {
            fatal!(EX_OSERR, "Server failed: {}", e);
        }
    });
}

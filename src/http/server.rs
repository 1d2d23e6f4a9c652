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
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::net::TcpListener;

use super::auth::{Authenticator, SessionCookies};
use crate::address::{hash::is_valid_key_hash, HashAddress};
use crate::federation::{Caller, Dispatcher, PUBLIC_KEYS_PATH};
use crate::store::KeyStore;
use crate::support::log_prefix::LogPrefix;

/// Everything the request handlers share.
pub struct ServerState {
    pub dispatcher: Dispatcher,
    pub key_store: Arc<dyn KeyStore>,
    pub authenticator: Arc<dyn Authenticator>,
}

#[derive(Debug, Deserialize)]
struct PublicKeysForm {
    #[serde(default)]
    addresses: String,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(PUBLIC_KEYS_PATH, post(public_keys))
        .route(&format!("{PUBLIC_KEYS_PATH}/"), post(public_keys))
        .route("/user/:hash", get(public_key))
        .with_state(state)
}

/// Serves HTTP on `listener` until an I/O error occurs.
pub async fn serve(
    listener: TcpListener,
    state: Arc<ServerState>,
) -> io::Result<()> {
    info!(
        "Serving {} on {}",
        state.dispatcher.self_host(),
        listener.local_addr()?
    );
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// `POST /publickeys` looks up many public keys from many
/// `<public key hash>@<host>` addresses.
///
/// Logged-in users get keys from any host, which this server fetches on
/// their behalf. Everyone else (i.e. other servers) only gets keys hosted
/// here. Nothing returned is vouched for; the client must hash each key and
/// compare it against the address it asked for.
async fn public_keys(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<PublicKeysForm>,
) -> Response {
    let log_prefix = LogPrefix::new(format!("http:{peer}"));
    if let Some(agent) =
        headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
    {
        log_prefix.set_user_agent(agent.to_owned());
    }

    let batch = match HashAddress::parse_list(&form.addresses) {
        Ok(batch) => batch,
        Err(e) => {
            warn!("{} Rejecting key lookup: {}", log_prefix, e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        },
    };

    let caller = match SessionCookies::from_headers(&headers)
        .and_then(|cookies| state.authenticator.authenticate(&cookies))
    {
        Some(user) => {
            log_prefix.set_user(
                user.email_address(state.dispatcher.self_host()).to_string(),
            );
            Caller::User(user.public_hash)
        },
        None => Caller::Server,
    };

    let result = state.dispatcher.resolve(&log_prefix, &caller, &batch).await;
    info!(
        "{} Resolved {}/{} public key(s)",
        log_prefix,
        result.values().filter(|r| r.is_found()).count(),
        result.len()
    );
    Json(result).into_response()
}

/// `GET /user/<public key hash>` returns one public key hosted here.
async fn public_key(
    State(state): State<Arc<ServerState>>,
    Path(hash): Path<String>,
) -> Response {
    if !is_valid_key_hash(&hash) {
        return (StatusCode::BAD_REQUEST, "Invalid public key hash")
            .into_response();
    }

    let key_store = Arc::clone(&state.key_store);
    let lookup_hash = hash.clone();
    let lookup = tokio::task::spawn_blocking(move || {
        key_store.lookup_pub_key(&lookup_hash)
    })
    .await;

    match lookup {
        Ok(Ok(Some(key))) => key.into_response(),
        Ok(Ok(None)) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Ok(Err(e)) => {
            error!("Error loading public key {}: {}", hash, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
        Err(e) => {
            error!("Public key lookup task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

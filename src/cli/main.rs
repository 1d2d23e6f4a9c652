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


use std::fs;
use std::io::Read;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;
use structopt::StructOpt;

use crate::federation::{Dispatcher, HttpKeyFetcher};
use crate::http::auth::CredentialTable;
use crate::store::DirKeyStore;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Commands to be run on the Scramble server system.
    Server(ServerSubcommand),
}

#[derive(StructOpt, Default)]
pub(super) struct ServerCommonOptions {
    /// The directory containing `scramble.toml` etc
    /// [default: /etc/scramble or /usr/local/etc/scramble]
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,
}

#[derive(StructOpt)]
enum ServerSubcommand {
    /// Run the HTTP server.
    ///
    /// This serves public keys from the key directory to anyone, and looks
    /// keys up on other servers on behalf of logged-in users.
    Serve(ServerCommonOptions),
    MxRoute(ServerMxRouteSubcommand),
    Resolve(ServerResolveSubcommand),
    AddKey(ServerAddKeySubcommand),
}

impl ServerSubcommand {
    fn common_options(&mut self) -> ServerCommonOptions {
        match *self {
            ServerSubcommand::Serve(ref mut c) => mem::take(c),
            ServerSubcommand::MxRoute(ref mut c) => mem::take(&mut c.common),
            ServerSubcommand::Resolve(ref mut c) => mem::take(&mut c.common),
            ServerSubcommand::AddKey(ref mut c) => mem::take(&mut c.common),
        }
    }
}

/// Show which mail exchanger each recipient would be routed through.
///
/// Recipients are grouped by host, then each host is replaced by its MX.
/// Hosts that share an MX end up in the same group. Recipients on this
/// server's own host are never looked up. Hosts whose MX could not be
/// determined are listed separately.
#[derive(StructOpt)]
pub(super) struct ServerMxRouteSubcommand {
    #[structopt(flatten)]
    pub(super) common: ServerCommonOptions,

    /// Comma-separated recipient addresses, e.g.
    /// `alice@example.com,bob#news@example.org`.
    pub(super) addresses: String,
}

/// Look up a batch of public keys as a logged-in user would.
///
/// The result is printed as the same JSON the server returns for
/// `POST /publickeys`.
#[derive(StructOpt)]
pub(super) struct ServerResolveSubcommand {
    #[structopt(flatten)]
    pub(super) common: ServerCommonOptions,

    /// Comma-separated key addresses, e.g. `ab12@example.com,cd34@example.org`.
    pub(super) addresses: String,
}

/// Add or replace a public key in the key directory.
#[derive(StructOpt)]
pub(super) struct ServerAddKeySubcommand {
    #[structopt(flatten)]
    pub(super) common: ServerCommonOptions,

    /// The hash of the key, which is the local part of its addresses.
    pub(super) hash: String,

    /// The file holding the public key. "-" will read from stdin.
    #[structopt(parse(from_os_str), default_value = "-")]
    pub(super) file: PathBuf,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    match cmd {
        Command::Server(cmd) => server(cmd),
    }
}

fn server(mut cmd: ServerSubcommand) {
    let common = cmd.common_options();
    let root = common.root.unwrap_or_else(|| {
        if Path::new("/etc/scramble/scramble.toml").is_file() {
            "/etc/scramble".to_owned().into()
        } else if Path::new("/usr/local/etc/scramble/scramble.toml").is_file()
        {
            "/usr/local/etc/scramble".to_owned().into()
        } else {
            die!(
                EX_CONFIG,
                "Neither /etc/scramble nor /usr/local/etc/scramble looks like\n\
                 the Scramble root; use --root=/path/to/scramble if your\n\
                 installation is elsewhere."
            )
        }
    });

    let system_config_path = root.join("scramble.toml");
    let mut system_config_toml = Vec::new();
    if let Err(e) = fs::File::open(&system_config_path)
        .and_then(|mut f| f.read_to_end(&mut system_config_toml))
    {
        die!(
            EX_CONFIG,
            "Error reading '{}': {}",
            system_config_path.display(),
            e
        );
    }

    let mut system_config: SystemConfig =
        match toml::from_slice(&system_config_toml) {
            Ok(config) => config,
            Err(e) => die!(
                EX_CONFIG,
                "Error in config file at '{}': {}",
                system_config_path.display(),
                e
            ),
        };

    if matches!(cmd, ServerSubcommand::Serve(..))
        && Ok(true) != nix::unistd::isatty(2)
    {
        // Right now we have this awkward situation where you can use log4rs
        // *or* syslog, because log4rs-syslog hasn't been updated in quite a
        // while.
        let log_config_file = root.join("logging.toml");
        if log_config_file.is_file() {
            log4rs::init_file(
                log_config_file,
                log4rs::file::Deserializers::new(),
            )
            .expect("Failed to initialise logging");
        } else {
            let formatter = syslog::Formatter3164 {
                facility: syslog::Facility::LOG_MAIL,
                hostname: None,
                process: env!("CARGO_PKG_NAME").to_owned(),
                pid: nix::unistd::getpid().as_raw(),
            };

            let logger =
                syslog::unix(formatter).expect("Failed to connect to syslog");
            log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
                .map(|_| log::set_max_level(log::LevelFilter::Info))
                .expect("Failed to initialise logging");
        }
    } else {
        // Running interactively or as a one-off tool; ignore logging
        // configuration and just write to stderr.
        crate::init_simple_log();
    }

    if system_config.server.host_name.is_empty() {
        system_config.server.host_name = system_host_name();
    }

    match cmd {
        ServerSubcommand::Serve(_) => super::serve::serve(system_config, root),
        ServerSubcommand::MxRoute(cmd) => {
            super::lookup::mx_route(system_config, cmd)
        },
        ServerSubcommand::Resolve(cmd) => {
            super::lookup::resolve(system_config, root, cmd)
        },
        ServerSubcommand::AddKey(cmd) => {
            super::key::add(system_config, root, cmd)
        },
    }
}

fn system_host_name() -> String {
    let mut buf = [0u8; 256];
    let host_name_cstr =
        nix::unistd::gethostname(&mut buf).unwrap_or_else(|e| {
            fatal!(
                EX_OSERR,
                "Failed to determine host name; you may \
                 need to explicitly configure it: {}",
                e
            )
        });
    host_name_cstr
        .to_str()
        .unwrap_or_else(|_| fatal!(EX_OSERR, "System host name is not UTF-8"))
        .to_owned()
}

pub(super) fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            fatal!(EX_OSERR, "Failed to start async runtime: {}", e)
        })
}

pub(super) fn open_key_store(
    system_config: &SystemConfig,
    root: &Path,
) -> Arc<DirKeyStore> {
    let key_store = DirKeyStore::new(root.join(&system_config.server.key_dir));
    if let Err(e) = key_store.init() {
        fatal!(
            EX_CANTCREAT,
            "Unable to set up key directory '{}': {}",
            key_store.root().display(),
            e
        );
    }

    Arc::new(key_store)
}

pub(super) fn load_credentials(
    system_config: &SystemConfig,
    root: &Path,
) -> CredentialTable {
    match system_config.server.credentials {
        Some(ref path) => {
            let path = root.join(path);
            CredentialTable::load(&path).unwrap_or_else(|e| {
                fatal!(
                    EX_CONFIG,
                    "Unable to load credentials from '{}': {}",
                    path.display(),
                    e
                )
            })
        },
        None => {
            warn!(
                "No credentials file configured; every request will be \
                 treated as coming from another server"
            );
            CredentialTable::default()
        },
    }
}

pub(super) fn dispatcher(
    system_config: &SystemConfig,
    key_store: Arc<DirKeyStore>,
) -> Dispatcher {
    let fetcher = HttpKeyFetcher::new(&system_config.federation)
        .unwrap_or_else(|e| {
            fatal!(EX_SOFTWARE, "Failed to set up HTTP client: {}", e)
        });

    Dispatcher::from_config(system_config, key_store, Arc::new(fetcher))
}

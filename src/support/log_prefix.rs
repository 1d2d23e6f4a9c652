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

use std::fmt;
use std::sync::{Arc, Mutex};

/// Tracks text that should be included at the start of every log statement
/// concerning one request.
///
/// Clones of a `LogPrefix` share the same underlying data.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
struct Inner {
    protocol: String,
    user: Option<String>,
    user_agent: Option<String>,
}

impl LogPrefix {
    pub fn new(protocol: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                protocol: sanitise(protocol),
                user: None,
                user_agent: None,
            })),
        }
    }

    pub fn set_user(&self, user: String) {
        self.inner.lock().unwrap().user = Some(sanitise(user));
    }

    pub fn set_user_agent(&self, user_agent: String) {
        self.inner.lock().unwrap().user_agent = Some(sanitise(user_agent));
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        write!(f, "{}", inner.protocol)?;
        match (&inner.user, &inner.user_agent) {
            (None, None) => Ok(()),
            (Some(user), None) => write!(f, "[{user}]"),
            (None, Some(agent)) => write!(f, "[agent={agent}]"),
            (Some(user), Some(agent)) => write!(f, "[{user} agent={agent}]"),
        }
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn formatting() {
        let prefix = LogPrefix::new("http:192.0.2.1:4321".to_owned());
        assert_eq!("http:192.0.2.1:4321", prefix.to_string());

        let shared = prefix.clone();
        shared.set_user_agent("curl/8.0\r\n".to_owned());
        assert_eq!("http:192.0.2.1:4321[agent=curl/8.0]", prefix.to_string());

        prefix.set_user("ab12".to_owned());
        assert_eq!(
            "http:192.0.2.1:4321[ab12 agent=curl/8.0]",
            shared.to_string()
        );

        let long = LogPrefix::new("x".repeat(100));
        assert_eq!(64, long.to_string().len());
    }
}

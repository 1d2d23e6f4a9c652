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

use serde::{Deserialize, Serialize};

/// The error text for every address that could not be resolved, whatever
/// the cause.
pub const FAILED_TO_RETRIEVE: &str = "Failed to retrieve public key";

/// The disposition of one requested address.
///
/// Exactly one field is non-empty: `pub_key` on success, `err` on failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyResult {
    #[serde(rename = "PubKey", default)]
    pub pub_key: String,
    #[serde(rename = "Err", default)]
    pub err: String,
}

impl KeyResult {
    pub fn found(pub_key: String) -> Self {
        Self {
            pub_key,
            err: String::new(),
        }
    }

    pub fn failed() -> Self {
        Self {
            pub_key: String::new(),
            err: FAILED_TO_RETRIEVE.to_owned(),
        }
    }

    pub fn is_found(&self) -> bool {
        !self.pub_key.is_empty()
    }
}

/// Results keyed by the requested address string.
///
/// This is the JSON body of every `/publickeys` response, both the ones this
/// server sends and the ones it receives from other servers.
pub type ResolutionMap = BTreeMap<String, KeyResult>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn json_shape() {
        let mut map = ResolutionMap::new();
        map.insert("ab12@hostA".to_owned(), KeyResult::found("K".to_owned()));
        map.insert("cd34@hostB".to_owned(), KeyResult::failed());

        assert_eq!(
            concat!(
                r#"{"ab12@hostA":{"PubKey":"K","Err":""},"#,
                r#""cd34@hostB":{"PubKey":"","#,
                r#""Err":"Failed to retrieve public key"}}"#,
            ),
            serde_json::to_string(&map).unwrap()
        );
    }

    #[test]
    fn lenient_decoding() {
        let map: ResolutionMap =
            serde_json::from_str(r#"{"a@b":{"PubKey":"K"},"c@d":{}}"#)
                .unwrap();
        assert!(map["a@b"].is_found());
        assert_eq!("", map["a@b"].err);
        assert!(!map["c@d"].is_found());

        assert!(serde_json::from_str::<ResolutionMap>(
            r#"{"a@b":{"PubKey":42}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<ResolutionMap>("[]").is_err());
    }
}

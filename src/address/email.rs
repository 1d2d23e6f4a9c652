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
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use super::{host_pattern, same_host, AddressError, Hosted};

/// Separates the mailbox name from an optional tag in the local part.
pub const TAG_SEPARATOR: char = '#';

lazy_static! {
    static ref RX_ADDRESS: Regex = Regex::new(concat!(
        "^([A-Za-z0-9._%+#-]+)@(",
        host_pattern!(),
        ")$"
    ))
    .unwrap();
}

/// A mailbox address of the form `name@host`.
///
/// `name` may include a tag following the first `#`, which is preserved by
/// the `Display` implementation but dropped by `canonical()`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmailAddress {
    pub name: String,
    pub host: String,
}

impl EmailAddress {
    /// Parse `s`, which must be exactly one address with nothing around it.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        Self::parse_opt(s)
            .ok_or_else(|| AddressError::InvalidAddress(s.to_owned()))
    }

    /// Like `parse`, but just reports whether the address was valid.
    pub fn parse_opt(s: &str) -> Option<Self> {
        let cap = RX_ADDRESS.captures(s)?;
        Some(Self {
            name: cap[1].to_owned(),
            host: cap[2].to_owned(),
        })
    }

    /// Splits the name into what precedes the first `#` and what follows.
    ///
    /// If there is no `#`, the tag is empty.
    pub fn name_and_tag(&self) -> (&str, &str) {
        self.name
            .split_once(TAG_SEPARATOR)
            .unwrap_or((self.name.as_str(), ""))
    }

    /// Renders `name@host` with any tag removed.
    pub fn canonical(&self) -> String {
        format!("{}@{}", self.name_and_tag().0, self.host)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.host)
    }
}

impl FromStr for EmailAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, AddressError> {
        Self::parse(s)
    }
}

impl Hosted for EmailAddress {
    fn host(&self) -> &str {
        &self.host
    }
}

/// An ordered list of addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmailAddresses(pub Vec<EmailAddress>);

impl EmailAddresses {
    /// Parses a comma-separated list, e.g. `foo@bar.com,baz@boo.com`.
    ///
    /// The empty string produces an empty list. If any element is malformed,
    /// the whole list is rejected.
    pub fn parse_list(list: &str) -> Result<Self, AddressError> {
        if list.is_empty() {
            return Ok(Self::default());
        }

        list.split(',')
            .map(EmailAddress::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Parses a list like `<foo@bar.com>,<baz@boo.com>`, where the separator
    /// between elements is `delim`.
    pub fn parse_angled_list(
        list: &str,
        delim: &str,
    ) -> Result<Self, AddressError> {
        if list.is_empty() {
            return Ok(Self::default());
        }

        list.split(delim)
            .map(|part| {
                part.strip_prefix('<')
                    .and_then(|p| p.strip_suffix('>'))
                    .ok_or_else(|| {
                        AddressError::InvalidAngledAddress(part.to_owned())
                    })
                    .and_then(EmailAddress::parse)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EmailAddress> {
        self.0.iter()
    }

    /// The full (tag-preserving) string form of each address.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|a| a.to_string()).collect()
    }

    /// Renders `<foo@bar.com>,<baz@boo.com>` (with `delim` in place of the
    /// comma), using the canonical form of each address.
    pub fn angled(&self, delim: &str) -> String {
        if self.0.is_empty() {
            return String::new();
        }

        let inner = self
            .0
            .iter()
            .map(EmailAddress::canonical)
            .collect::<Vec<_>>()
            .join(&format!(">{delim}<"));
        format!("<{inner}>")
    }

    /// Like `angled()`, but drops the leftmost items so that the result is
    /// no longer than `limit` bytes.
    ///
    /// This is what bounds the `References` chain of a thread: the most
    /// recent entries are the ones kept.
    pub fn angled_capped_to_bytes(&self, delim: &str, limit: usize) -> String {
        let mut full = self.angled(delim);
        if full.len() <= limit {
            return full;
        }

        // '<' cannot occur inside an address, so the first one at or after
        // the cut point starts a complete element. The cut point may be
        // inside a multibyte delimiter, so search bytes; '<' is ASCII and
        // always lands on a character boundary.
        let cut = full.len() - limit;
        match full.as_bytes()[cut..].iter().position(|&b| b'<' == b) {
            Some(start) => full.split_off(cut + start),
            None => String::new(),
        }
    }

    /// Returns the addresses whose host is `host`, in order.
    pub fn filter_by_host(&self, host: &str) -> Self {
        Self(
            self.0
                .iter()
                .filter(|a| same_host(&a.host, host))
                .cloned()
                .collect(),
        )
    }
}

impl fmt::Display for EmailAddresses {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_strings().join(","))
    }
}

impl From<Vec<EmailAddress>> for EmailAddresses {
    fn from(v: Vec<EmailAddress>) -> Self {
        Self(v)
    }
}

impl FromIterator<EmailAddress> for EmailAddresses {
    fn from_iter<I: IntoIterator<Item = EmailAddress>>(it: I) -> Self {
        Self(it.into_iter().collect())
    }
}

impl IntoIterator for EmailAddresses {
    type Item = EmailAddress;
    type IntoIter = std::vec::IntoIter<EmailAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a EmailAddresses {
    type Item = &'a EmailAddress;
    type IntoIter = std::slice::Iter<'a, EmailAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn addr(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    fn list(s: &str) -> EmailAddresses {
        EmailAddresses::parse_list(s).unwrap()
    }

    #[test]
    fn parse_simple() {
        assert_eq!(
            EmailAddress {
                name: "foo".to_owned(),
                host: "bar.com".to_owned(),
            },
            addr("foo@bar.com")
        );
        assert_eq!("localhost:8888", addr("a.b+c@localhost:8888").host);
        assert_eq!("foo#work", addr("foo#work@bar.com").name);
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in &[
            "",
            "foo",
            "@bar.com",
            "foo@",
            "foo@bar@baz.com",
            "foo bar@baz.com",
            " foo@bar.com",
            "foo@bar.com ",
            "foo@bar..com",
            "foo@.bar.com",
            "foo@bar.com.",
            "foo@bar.com:",
            "foo@bar.com:123456",
            "<foo@bar.com>",
            "foo@ba_r.com",
        ] {
            assert_eq!(
                Err(AddressError::InvalidAddress((*bad).to_owned())),
                EmailAddress::parse(bad),
                "{bad:?}"
            );
            assert_eq!(None, EmailAddress::parse_opt(bad));
        }
    }

    #[test]
    fn tag_handling() {
        let a = addr("foo#work@bar.com");
        assert_eq!(("foo", "work"), a.name_and_tag());
        assert_eq!("foo@bar.com", a.canonical());
        assert_eq!("foo#work@bar.com", a.to_string());

        let a = addr("foo#a#b@bar.com");
        assert_eq!(("foo", "a#b"), a.name_and_tag());

        let a = addr("foo@bar.com");
        assert_eq!(("foo", ""), a.name_and_tag());
        assert_eq!("foo@bar.com", a.canonical());

        let a = addr("foo#@bar.com");
        assert_eq!(("foo", ""), a.name_and_tag());
    }

    #[test]
    fn parse_list_is_all_or_nothing() {
        assert_eq!(EmailAddresses::default(), list(""));
        assert!(list("").is_empty());

        let l = list("foo@bar.com,baz@boo.com");
        assert_eq!(2, l.len());
        assert_eq!("foo@bar.com,baz@boo.com", l.to_string());

        assert_eq!(
            Err(AddressError::InvalidAddress("nope".to_owned())),
            EmailAddresses::parse_list("foo@bar.com,nope,baz@boo.com")
        );
        assert_eq!(
            Err(AddressError::InvalidAddress(String::new())),
            EmailAddresses::parse_list("foo@bar.com,")
        );
    }

    #[test]
    fn parse_angled_list() {
        let l =
            EmailAddresses::parse_angled_list("<a@b.com> <c@d.com>", " ")
                .unwrap();
        assert_eq!(vec![addr("a@b.com"), addr("c@d.com")], l.0);

        assert!(EmailAddresses::parse_angled_list("", ",")
            .unwrap()
            .is_empty());

        assert_eq!(
            Err(AddressError::InvalidAngledAddress("c@d.com>".to_owned())),
            EmailAddresses::parse_angled_list("<a@b.com>,c@d.com>", ",")
        );
        assert_eq!(
            Err(AddressError::InvalidAngledAddress("<c@d.com".to_owned())),
            EmailAddresses::parse_angled_list("<a@b.com>,<c@d.com", ",")
        );
        assert_eq!(
            Err(AddressError::InvalidAngledAddress("<".to_owned())),
            EmailAddresses::parse_angled_list("<", ",")
        );
        assert_eq!(
            Err(AddressError::InvalidAddress("x".to_owned())),
            EmailAddresses::parse_angled_list("<x>", ",")
        );
    }

    #[test]
    fn angled_rendering() {
        assert_eq!("", EmailAddresses::default().angled(","));
        assert_eq!("<a@b.com>", list("a@b.com").angled(","));
        assert_eq!(
            "<a@b.com> <c@d.com>",
            list("a#x@b.com,c@d.com").angled(" ")
        );
    }

    #[test]
    fn capped_rendering_drops_oldest() {
        let l = list("aaaa@b.com,cccc@d.com,eeee@f.com");
        let full = l.angled(",");
        assert_eq!(38, full.len());

        assert_eq!(full, l.angled_capped_to_bytes(",", 38));
        assert_eq!(full, l.angled_capped_to_bytes(",", 1000));
        assert_eq!(
            "<cccc@d.com>,<eeee@f.com>",
            l.angled_capped_to_bytes(",", 37)
        );
        assert_eq!(
            "<cccc@d.com>,<eeee@f.com>",
            l.angled_capped_to_bytes(",", 25)
        );
        assert_eq!("<eeee@f.com>", l.angled_capped_to_bytes(",", 24));
        assert_eq!("<eeee@f.com>", l.angled_capped_to_bytes(",", 12));
        assert_eq!("", l.angled_capped_to_bytes(",", 11));
        assert_eq!("", l.angled_capped_to_bytes(",", 0));
        assert_eq!(
            "",
            EmailAddresses::default().angled_capped_to_bytes(",", 0)
        );
    }

    #[test]
    fn capped_rendering_with_multibyte_delimiter() {
        let l = list("aaaa@b.com,cccc@d.com");
        // 12 + 3 + 12 bytes
        assert_eq!(27, l.angled("\u{2014}").len());

        for limit in 12..27 {
            assert_eq!(
                "<cccc@d.com>",
                l.angled_capped_to_bytes("\u{2014}", limit),
                "{limit}"
            );
        }
        assert_eq!("", l.angled_capped_to_bytes("\u{2014}", 11));
        assert_eq!(
            "<aaaa@b.com>\u{2014}<cccc@d.com>",
            l.angled_capped_to_bytes("\u{2014}", 27)
        );
    }

    #[test]
    fn filtering_by_host() {
        let l = list("a@x.com,b@y.com,c@x.com");
        assert_eq!(list("a@x.com,c@x.com"), l.filter_by_host("x.com"));
        assert!(l.filter_by_host("z.com").is_empty());
        assert_eq!(list("a@x.com,c@x.com"), l.filter_by_host("X.Com"));
    }

    proptest! {
        #[test]
        fn canonical_round_trips(
            s in "[a-z0-9._%+-]{1,20}@[a-z0-9-]{1,10}(\\.[a-z0-9-]{1,10}){0,3}"
        ) {
            prop_assert_eq!(&s, &addr(&s).canonical());
            prop_assert_eq!(&s, &addr(&s).to_string());
        }

        #[test]
        fn capped_rendering_fits_and_is_well_formed(
            names in prop::collection::vec("[a-z]{1,12}", 0..10),
            delim in "[ ,\u{2014}\u{e9}]{1,2}",
            limit in 0usize..200,
        ) {
            let l = names
                .iter()
                .map(|n| addr(&format!("{n}@example.com")))
                .collect::<EmailAddresses>();
            let capped = l.angled_capped_to_bytes(&delim, limit);
            prop_assert!(capped.len() <= limit);
            if !capped.is_empty() {
                prop_assert!(capped.starts_with('<'));
                prop_assert!(capped.ends_with('>'));
                prop_assert!(l.angled(&delim).ends_with(&capped));
                let parsed =
                    EmailAddresses::parse_angled_list(&capped, &delim);
                prop_assert!(parsed.is_ok());
            }
        }
    }
}

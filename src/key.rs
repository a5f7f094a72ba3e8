//! Composite keys: one opaque token per `(source group, library)` pair.
//!
//! The picker hands the browser a flat list of these strings, and the same
//! token is what gets persisted in configuration. A source group is a site
//! url, so the separator is built from `|`, which is not a legal URI
//! character and therefore never appears inside a group.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator between the source group and the library id.
pub const SEPARATOR: &str = "||";

/// A decoded `(source group, library id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    /// Site url (or other top-level collection boundary).
    pub group: String,
    /// Library identifier within the group.
    pub library_id: String,
}

impl CompositeKey {
    pub fn new(group: impl Into<String>, library_id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            library_id: library_id.into(),
        }
    }

    /// The encoded token for this pair.
    pub fn encode(&self) -> String {
        encode(&self.group, &self.library_id)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.group, self.library_id)
    }
}

/// Marker error for [`FromStr`]; carries no detail because invalid keys are
/// never reported, only skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid composite key")]
pub struct InvalidKey;

impl FromStr for CompositeKey {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s).ok_or(InvalidKey)
    }
}

/// Join a group and library id into one token.
pub fn encode(group: &str, library_id: &str) -> String {
    format!("{group}{SEPARATOR}{library_id}")
}

/// Split a token on the first separator.
///
/// Returns `None` when the separator is missing or either side is empty.
/// Callers skip `None` rather than abort the batch.
pub fn decode(key: &str) -> Option<CompositeKey> {
    let (group, library_id) = key.split_once(SEPARATOR)?;
    if group.is_empty() || library_id.is_empty() {
        return None;
    }
    Some(CompositeKey::new(group, library_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_joins_with_separator() {
        assert_eq!(
            encode("https://contoso.example/sites/hr", "3f2a"),
            "https://contoso.example/sites/hr||3f2a"
        );
    }

    #[test]
    fn decode_splits_on_first_separator_only() {
        let key = decode("https://contoso.example/sites/hr||lib||odd").unwrap();
        assert_eq!(key.group, "https://contoso.example/sites/hr");
        assert_eq!(key.library_id, "lib||odd");
    }

    #[test]
    fn decode_keeps_url_colons_in_group() {
        let key = decode("https://[::1]:8443/sites/dev||lib").unwrap();
        assert_eq!(key.group, "https://[::1]:8443/sites/dev");
        assert_eq!(key.library_id, "lib");
    }

    #[test]
    fn decode_rejects_malformed_keys() {
        assert_eq!(decode("no-separator-here"), None);
        assert_eq!(decode("||lib"), None);
        assert_eq!(decode("https://contoso.example||"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn display_and_from_str_agree() {
        let key = CompositeKey::new("https://contoso.example", "abc");
        let parsed: CompositeKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert_eq!(key.encode(), key.to_string());
        assert_eq!("broken".parse::<CompositeKey>(), Err(InvalidKey));
    }

    #[test]
    fn invalid_key_is_a_std_error() {
        let err: Box<dyn std::error::Error> = "broken".parse::<CompositeKey>().unwrap_err().into();
        assert_eq!(err.to_string(), "invalid composite key");
    }
}

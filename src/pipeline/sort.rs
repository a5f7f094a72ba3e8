//! Sort orders for the result set.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::document::Document;

/// The closed set of sort orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    ModifiedNewest,
    ModifiedOldest,
    SizeLargest,
    SizeSmallest,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        Self::NameAsc,
        Self::NameDesc,
        Self::ModifiedNewest,
        Self::ModifiedOldest,
        Self::SizeLargest,
        Self::SizeSmallest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::ModifiedNewest => "modified-newest",
            Self::ModifiedOldest => "modified-oldest",
            Self::SizeLargest => "size-largest",
            Self::SizeSmallest => "size-smallest",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown sort key name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort key \"{0}\"")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

/// Collation key for names: compatibility-decomposed, diacritics stripped,
/// lowercased. "Éclair" and "eclair" compare equal.
pub fn collation_key(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn modified_or_epoch(doc: &Document) -> DateTime<Utc> {
    doc.modified.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Stable in-place sort; equal keys keep their relative order.
pub fn sort_documents(documents: &mut [Document], key: SortKey) {
    match key {
        SortKey::NameAsc => documents.sort_by_cached_key(|d| collation_key(&d.name)),
        SortKey::NameDesc => documents.sort_by_cached_key(|d| Reverse(collation_key(&d.name))),
        SortKey::ModifiedNewest => documents.sort_by_key(|d| Reverse(modified_or_epoch(d))),
        SortKey::ModifiedOldest => documents.sort_by_key(modified_or_epoch),
        SortKey::SizeLargest => documents.sort_by_key(|d| Reverse(d.size_bytes)),
        SortKey::SizeSmallest => documents.sort_by_key(|d| d.size_bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(id: &str, name: &str, size: u64, modified: Option<i64>) -> Document {
        Document {
            id: id.into(),
            name: name.into(),
            size_bytes: size,
            modified: modified.map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
            ..Default::default()
        }
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn names_collate_ignoring_case_and_accents() {
        let mut docs = vec![
            doc("1", "zeta.txt", 0, None),
            doc("2", "Éclair.pdf", 0, None),
            doc("3", "apple.doc", 0, None),
            doc("4", "eclair.pdf", 0, None),
        ];
        sort_documents(&mut docs, SortKey::NameAsc);
        // "Éclair" and "eclair" tie, so they keep their input order.
        assert_eq!(ids(&docs), vec!["3", "2", "4", "1"]);

        sort_documents(&mut docs, SortKey::NameDesc);
        assert_eq!(ids(&docs), vec!["1", "2", "4", "3"]);
    }

    #[test]
    fn missing_dates_sort_as_epoch() {
        let mut docs = vec![
            doc("old", "a", 0, Some(1_000)),
            doc("none", "b", 0, None),
            doc("new", "c", 0, Some(2_000_000_000)),
        ];
        sort_documents(&mut docs, SortKey::ModifiedNewest);
        assert_eq!(ids(&docs), vec!["new", "old", "none"]);
        sort_documents(&mut docs, SortKey::ModifiedOldest);
        assert_eq!(ids(&docs), vec!["none", "old", "new"]);
    }

    #[test]
    fn size_sort_is_stable() {
        let mut docs = vec![
            doc("a", "a", 10, None),
            doc("b", "b", 0, None),
            doc("c", "c", 10, None),
            doc("d", "d", 0, None),
        ];
        sort_documents(&mut docs, SortKey::SizeLargest);
        assert_eq!(ids(&docs), vec!["a", "c", "b", "d"]);
        sort_documents(&mut docs, SortKey::SizeSmallest);
        assert_eq!(ids(&docs), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn sort_keys_parse_from_names() {
        for key in SortKey::ALL {
            assert_eq!(key.as_str().parse::<SortKey>().unwrap(), key);
        }
        let err = "relevance".parse::<SortKey>().unwrap_err();
        assert_eq!(err, UnknownSortKey("relevance".into()));
        let boxed: Box<dyn std::error::Error> = err.into();
        assert_eq!(boxed.to_string(), "unknown sort key \"relevance\"");
    }
}

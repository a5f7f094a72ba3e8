//! Match highlighting for display strings.
//!
//! Splits a string into alternating unmatched/matched segments for a search
//! query, case-insensitively, so a renderer can emphasise the hits.

/// A run of text and whether it matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub matched: bool,
}

/// Split `text` around every non-overlapping occurrence of `query`.
///
/// Matching runs on the lowercased text, the same comparison the search
/// filter makes, so every document the filter keeps has a highlighted run.
/// A match that starts or ends inside a character whose lowercase form is
/// longer than one char widens to cover that whole character.
///
/// An empty query or text yields the whole text as one unmatched segment.
pub fn segments<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    let needle = query.to_lowercase();
    if needle.is_empty() || text.is_empty() {
        return vec![Segment {
            text,
            matched: false,
        }];
    }

    let folded = Folded::new(text);
    let mut out = Vec::new();
    let mut plain_start = 0;
    for (lo, hit) in folded.lowered.match_indices(needle.as_str()) {
        let start = folded.original_start(lo).max(plain_start);
        let end = folded.original_end(lo + hit.len());
        if start >= end {
            continue;
        }
        if plain_start < start {
            out.push(Segment {
                text: &text[plain_start..start],
                matched: false,
            });
        }
        out.push(Segment {
            text: &text[start..end],
            matched: true,
        });
        plain_start = end;
    }
    if plain_start < text.len() {
        out.push(Segment {
            text: &text[plain_start..],
            matched: false,
        });
    }
    out
}

/// Lowercased text plus the byte offset pairs `(lowered, original)` at each
/// character boundary, ending with a sentinel at both lengths.
struct Folded {
    lowered: String,
    bounds: Vec<(usize, usize)>,
}

impl Folded {
    fn new(text: &str) -> Self {
        let mut bounds = Vec::with_capacity(text.len() + 1);
        let mut lo = 0;
        for (orig, c) in text.char_indices() {
            bounds.push((lo, orig));
            lo += c.to_lowercase().map(char::len_utf8).sum::<usize>();
        }
        bounds.push((lo, text.len()));

        // `str::to_lowercase` only differs from the per-char mapping on a
        // final sigma, which keeps its byte length.
        let whole = text.to_lowercase();
        let lowered = if whole.len() == lo {
            whole
        } else {
            text.chars().flat_map(char::to_lowercase).collect()
        };
        Self { lowered, bounds }
    }

    /// Start of the original char whose lowercase form contains `lo`.
    fn original_start(&self, lo: usize) -> usize {
        let idx = self.bounds.partition_point(|b| b.0 <= lo);
        self.bounds.get(idx.saturating_sub(1)).map_or(0, |b| b.1)
    }

    /// End of the original char whose lowercase form contains `lo - 1`.
    fn original_end(&self, lo: usize) -> usize {
        let idx = self.bounds.partition_point(|b| b.0 < lo);
        self.bounds
            .get(idx)
            .or(self.bounds.last())
            .map_or(0, |b| b.1)
    }
}

//! Preview-image resolution.
//!
//! A pure decision tree that picks the best preview url a library can offer:
//!
//! 1. the rich drive thumbnail service, when the library exposed a drive id
//!    and the item carries a file identifier;
//! 2. the legacy video thumbnail stream, for videos with a file identifier;
//! 3. the legacy `getpreview.ashx` handler, which works for anything with an
//!    absolute href.

use crate::kind::is_video;

/// Size token for default rich thumbnails.
pub const RICH_SIZE_DEFAULT: &str = "large";
/// Size token for high-resolution rich thumbnails.
pub const RICH_SIZE_HD: &str = "c1920x1080";
/// Query suffix on the rich video sub-path.
pub const RICH_VIDEO_PREFER: &str = "prefer=noRedirect,closestavailablesize,extendCacheMaxAge";
/// Name of the legacy preview's resolution parameter.
pub const RESOLUTION_PARAM: &str = "resolution";

/// Requested preview quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Resolution {
    #[default]
    Default,
    High,
}

impl Resolution {
    fn rich_size(self) -> &'static str {
        match self {
            Self::Default => RICH_SIZE_DEFAULT,
            Self::High => RICH_SIZE_HD,
        }
    }

    fn legacy_value(self) -> &'static str {
        match self {
            Self::Default => "0",
            Self::High => "6",
        }
    }
}

/// Everything the resolver needs to know about one item.
#[derive(Debug, Clone, Copy)]
pub struct PreviewRequest<'a> {
    /// Lowercase file extension token.
    pub file_kind: &'a str,
    /// Rich-preview capability (drive) id for the library, if resolved.
    pub capability_id: Option<&'a str>,
    /// File-level identifier, present only for items supporting rich preview.
    pub file_id: Option<&'a str>,
    /// Site url without trailing slash.
    pub site_url: &'a str,
    pub library_id: &'a str,
    /// Absolute link to the file.
    pub href: &'a str,
}

/// Which tier of the decision tree produced a url.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTier {
    Rich,
    LegacyVideo,
    LegacyGeneric,
}

/// Pick the tier for a request. First match wins.
pub fn preview_tier(req: &PreviewRequest<'_>) -> PreviewTier {
    match (req.capability_id, req.file_id) {
        (Some(_), Some(_)) => PreviewTier::Rich,
        (_, Some(_)) if is_video(req.file_kind) => PreviewTier::LegacyVideo,
        _ => PreviewTier::LegacyGeneric,
    }
}

/// Resolve the preview url for an item.
pub fn resolve(req: &PreviewRequest<'_>, resolution: Resolution) -> String {
    let site = req.site_url.trim_end_matches('/');
    match (preview_tier(req), req.capability_id, req.file_id) {
        (PreviewTier::Rich, Some(drive), Some(file)) => {
            let base = format!(
                "{site}/_api/v2.1/drives/{drive}/items/{file}/thumbnails/0/{}/content",
                resolution.rich_size()
            );
            if is_video(req.file_kind) {
                format!("{base}?{RICH_VIDEO_PREFER}")
            } else {
                base
            }
        }
        (PreviewTier::LegacyVideo, _, Some(file)) => format!(
            "{site}/_api/VideoService/Channels('{}')/Videos('{file}')/ThumbnailStream",
            req.library_id
        ),
        _ => {
            let url = format!(
                "{site}/_layouts/15/getpreview.ashx?path={}",
                urlencoding::encode(req.href)
            );
            set_resolution(&url, resolution)
        }
    }
}

/// Set the `resolution` query parameter, replacing any existing value.
///
/// Applying this twice yields the same url as applying it once.
pub fn set_resolution(url: &str, resolution: Resolution) -> String {
    set_query_param(url, RESOLUTION_PARAM, resolution.legacy_value())
}

fn set_query_param(url: &str, name: &str, value: &str) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    };

    let mut pairs: Vec<String> = Vec::new();
    let mut replaced = false;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let key = pair.split_once('=').map_or(pair, |(k, _)| k);
        if key.eq_ignore_ascii_case(name) {
            // Keep the position of the first occurrence, drop the rest.
            if !replaced {
                pairs.push(format!("{name}={value}"));
                replaced = true;
            }
        } else {
            pairs.push(pair.to_string());
        }
    }
    if !replaced {
        pairs.push(format!("{name}={value}"));
    }

    let mut out = format!("{path}?{}", pairs.join("&"));
    if let Some(frag) = fragment {
        out.push('#');
        out.push_str(frag);
    }
    out
}

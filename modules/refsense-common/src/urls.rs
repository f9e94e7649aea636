//! URL extraction and canonicalization.
//!
//! Everything here is pure string/URL work — redirect expansion lives in the
//! parser crate, which owns the HTTP client.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::SourceNetwork;

/// Matches http(s) URLs in free text. Trailing prose punctuation is trimmed
/// after matching, not excluded by the pattern.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\)\]]+"#).unwrap());

static TWITTER_POST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|mobile\.)?(?:twitter\.com|x\.com)/[A-Za-z0-9_]+/status(?:es)?/(\d+)").unwrap()
});

static MASTODON_POST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[a-z0-9][a-z0-9.-]*\.[a-z]{2,}/@[A-Za-z0-9_.]+/(\d+)/?$").unwrap()
});

static BLUESKY_POST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://bsky\.(?:app|social)/profile/[^/]+/post/([a-zA-Z0-9]+)").unwrap()
});

/// Query parameters that never change the identity of the linked resource.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "mc_cid",
    "mc_eid",
    "ref",
    "utm_campaign",
    "utm_content",
    "utm_medium",
    "utm_source",
    "utm_term",
];

/// Scan free text for URLs, first-seen order, no dedup.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']).to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

/// Spans (byte ranges into `text`) of every URL match. Used by the trimmer to
/// avoid cutting inside a URL.
pub fn url_spans(text: &str) -> Vec<(usize, usize)> {
    URL_RE.find_iter(text).map(|m| (m.start(), m.end())).collect()
}

/// Stable dedup, first occurrence wins.
pub fn remove_dups_ordered(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

/// Apply canonical-form rules without touching the network: unify Twitter
/// domains onto x.com, lowercase scheme/host, drop fragments and tracking
/// params, sort the remaining query pairs. Unparseable input is returned
/// unchanged.
pub fn canonicalize_url(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    match parsed.host_str() {
        Some("twitter.com") | Some("www.twitter.com") | Some("mobile.twitter.com") => {
            let _ = parsed.set_host(Some("x.com"));
        }
        _ => {}
    }

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let mut pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.sort();
        if pairs.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }

    parsed.to_string()
}

/// Identify a social-platform post URL and its platform-local post ID.
pub fn platform_post_id(url: &str) -> Option<(SourceNetwork, String)> {
    if let Some(caps) = TWITTER_POST_RE.captures(url) {
        return Some((SourceNetwork::Twitter, caps[1].to_string()));
    }
    if let Some(caps) = BLUESKY_POST_RE.captures(url) {
        return Some((SourceNetwork::Bluesky, caps[1].to_string()));
    }
    if let Some(caps) = MASTODON_POST_RE.captures(url) {
        return Some((SourceNetwork::Mastodon, caps[1].to_string()));
    }
    None
}

pub fn is_social_post_url(url: &str) -> bool {
    platform_post_id(url).is_some()
}

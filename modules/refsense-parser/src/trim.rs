//! Length-budget trimming for threads.
//!
//! The budget is best-effort, not a hard bound: a cut that would land inside
//! a URL is extended to the URL's end, so output can slightly exceed
//! `max_chars` but never contains a severed URL.

use std::collections::HashSet;

use refsense_common::types::{Post, QuotedReferencingPost, ReferencingPost, Thread};
use refsense_common::urls::url_spans;

#[derive(Debug, Clone)]
pub struct TrimmedThread {
    pub thread: Thread,
    /// References present in the original thread but absent after trimming,
    /// order-preserving. Together with the trimmed thread's references this
    /// exactly partitions the original reference set.
    pub unparsed_urls: Vec<String>,
}

/// A post's budget footprint: its own content plus any quoted content.
fn footprint(post: &QuotedReferencingPost) -> usize {
    let quoted = post
        .quoted_post
        .as_ref()
        .map(|q| q.post.char_length())
        .unwrap_or(0);
    post.post.post.char_length() + quoted
}

/// Trim a thread to roughly `max_chars` characters, keeping as many whole
/// leading posts as fit. The post at the truncation boundary is
/// content-trimmed into the remaining budget rather than discarded; its
/// quoted content, if any, is trimmed into whatever the main content left
/// over.
pub fn trim_thread(thread: &Thread, max_chars: usize) -> TrimmedThread {
    let total: usize = thread.posts.iter().map(footprint).sum();
    if total <= max_chars {
        return TrimmedThread {
            thread: thread.clone(),
            unparsed_urls: Vec::new(),
        };
    }

    let original_refs = thread.reference_urls();
    let mut budget = max_chars;
    let mut kept: Vec<QuotedReferencingPost> = Vec::new();

    for post in &thread.posts {
        let len = footprint(post);
        if len <= budget {
            kept.push(post.clone());
            budget -= len;
            continue;
        }
        if let Some(boundary) = trim_boundary_post(post, budget) {
            kept.push(boundary);
        }
        break;
    }

    let trimmed = Thread::new(kept);
    let included: HashSet<String> = trimmed.reference_urls().into_iter().collect();
    let unparsed_urls = original_refs
        .into_iter()
        .filter(|u| !included.contains(u))
        .collect();

    TrimmedThread {
        thread: trimmed,
        unparsed_urls,
    }
}

/// Trim the post at the truncation boundary. Returns None when no budget is
/// left at all. Reference URLs are re-extracted from the trimmed content, so
/// references that fell out of scope drop out here.
fn trim_boundary_post(post: &QuotedReferencingPost, budget: usize) -> Option<QuotedReferencingPost> {
    if budget == 0 {
        return None;
    }

    let content = trim_text_url_safe(post.post.content(), budget);
    if content.is_empty() {
        return None;
    }

    // URL-extension overshoot can push usage past the budget; the leftover
    // clamps to zero and the quoted content is omitted rather than guessed at.
    let leftover = budget.saturating_sub(content.chars().count());

    let quoted_post = match &post.quoted_post {
        Some(quoted) if leftover > 0 => {
            let quoted_content = trim_text_url_safe(quoted.content(), leftover);
            if quoted_content.is_empty() {
                None
            } else {
                let base = Post {
                    content: quoted_content,
                    ..quoted.post.clone()
                };
                Some(ReferencingPost::new(base, quoted.quoted_url.clone()))
            }
        }
        _ => None,
    };

    // The quoted-post URL stays a reference only while the quote itself
    // survives; otherwise the trimmed content alone decides.
    let quoted_url = if quoted_post.is_some() {
        post.post.quoted_url.clone()
    } else {
        None
    };

    let base = Post {
        content,
        ..post.post.post.clone()
    };
    Some(QuotedReferencingPost::new(
        ReferencingPost::new(base, quoted_url),
        quoted_post,
    ))
}

/// Cut `text` to at most `budget_chars` characters, extending the cut to the
/// end of any URL it would otherwise sever.
pub fn trim_text_url_safe(text: &str, budget_chars: usize) -> String {
    if text.chars().count() <= budget_chars {
        return text.to_string();
    }
    if budget_chars == 0 {
        return String::new();
    }

    let mut cut = text
        .char_indices()
        .nth(budget_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    // Spans are non-overlapping and ordered, so at most one straddles the cut.
    for (start, end) in url_spans(text) {
        if start < cut && end > cut {
            cut = end;
            break;
        }
    }

    text[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsense_common::types::SourceNetwork;

    fn make_post(content: &str, url: &str) -> QuotedReferencingPost {
        QuotedReferencingPost::new(
            ReferencingPost::new(
                Post::new("ada", content, url, SourceNetwork::Twitter),
                None,
            ),
            None,
        )
    }

    #[test]
    fn trim_text_short_input_untouched() {
        assert_eq!(trim_text_url_safe("hello", 10), "hello");
        assert_eq!(trim_text_url_safe("hello", 5), "hello");
    }

    #[test]
    fn trim_text_cuts_plain_text() {
        assert_eq!(trim_text_url_safe("hello world", 5), "hello");
    }

    #[test]
    fn trim_text_never_severs_a_url() {
        let text = "see https://example.com/a-rather-long-path and more";
        // Budget lands mid-URL: the cut extends to the URL's end.
        let out = trim_text_url_safe(text, 15);
        assert!(out.contains("https://example.com/a-rather-long-path"));
        assert!(out.chars().count() >= 15);
        assert!(!out.contains("and more"));
    }

    #[test]
    fn trim_text_multibyte_safe() {
        let text = "héllo wörld ünd mähr";
        let out = trim_text_url_safe(text, 7);
        assert_eq!(out.chars().count(), 7);
        assert_eq!(out, "héllo w");
    }

    #[test]
    fn whole_thread_within_budget_untouched() {
        let thread = Thread::new(vec![
            make_post("short one", "https://x.com/ada/status/1"),
            make_post("short two", "https://x.com/ada/status/2"),
        ]);
        let trimmed = trim_thread(&thread, 100);
        assert_eq!(trimmed.thread.posts.len(), 2);
        assert!(trimmed.unparsed_urls.is_empty());
    }

    #[test]
    fn whole_posts_kept_boundary_post_trimmed() {
        let thread = Thread::new(vec![
            make_post("aaaaaaaaaa", "https://x.com/ada/status/1"),
            make_post("bbbbbbbbbb", "https://x.com/ada/status/2"),
        ]);
        let trimmed = trim_thread(&thread, 15);
        assert_eq!(trimmed.thread.posts.len(), 2);
        assert_eq!(trimmed.thread.posts[0].post.content(), "aaaaaaaaaa");
        assert_eq!(trimmed.thread.posts[1].post.content(), "bbbbb");
    }

    #[test]
    fn posts_past_exhausted_budget_dropped() {
        let thread = Thread::new(vec![
            make_post("aaaaaaaaaa", "https://x.com/ada/status/1"),
            make_post("bbbbbbbbbb", "https://x.com/ada/status/2"),
            make_post("cccccccccc", "https://x.com/ada/status/3"),
        ]);
        let trimmed = trim_thread(&thread, 10);
        assert_eq!(trimmed.thread.posts.len(), 1);
        assert_eq!(trimmed.thread.posts[0].post.content(), "aaaaaaaaaa");
    }

    #[test]
    fn reference_set_partitions_after_trim() {
        let thread = Thread::new(vec![
            make_post("keep https://kept.org here", "https://x.com/ada/status/1"),
            make_post("lose https://lost.net entirely", "https://x.com/ada/status/2"),
        ]);
        let original: HashSet<String> = thread.reference_urls().into_iter().collect();
        let trimmed = trim_thread(&thread, 26);

        let retained: HashSet<String> = trimmed.thread.reference_urls().into_iter().collect();
        let unparsed: HashSet<String> = trimmed.unparsed_urls.iter().cloned().collect();

        assert!(retained.contains("https://kept.org"));
        assert!(unparsed.contains("https://lost.net"));
        assert!(retained.is_disjoint(&unparsed));
        let union: HashSet<String> = retained.union(&unparsed).cloned().collect();
        assert_eq!(union, original);
    }

    #[test]
    fn boundary_ref_urls_reextracted_from_trimmed_content() {
        let thread = Thread::new(vec![make_post(
            "first https://a.com then later https://b.org end",
            "https://x.com/ada/status/1",
        )]);
        // Budget covers the first URL but cuts before the second.
        let trimmed = trim_thread(&thread, 22);
        let refs = trimmed.thread.reference_urls();
        assert_eq!(refs, vec!["https://a.com"]);
        assert_eq!(trimmed.unparsed_urls, vec!["https://b.org"]);
    }

    #[test]
    fn quoted_content_trimmed_with_leftover_budget() {
        let quoted = ReferencingPost::new(
            Post::new(
                "bob",
                "quoted text that is fairly long",
                "https://x.com/bob/status/9",
                SourceNetwork::Twitter,
            ),
            None,
        );
        let quoting = QuotedReferencingPost::new(
            ReferencingPost::new(
                Post::new(
                    "ada",
                    "my comment on this",
                    "https://x.com/ada/status/1",
                    SourceNetwork::Twitter,
                ),
                Some("https://x.com/bob/status/9".to_string()),
            ),
            Some(quoted),
        );
        let thread = Thread::new(vec![
            make_post("aaaaaaaaaa", "https://x.com/ada/status/0"),
            quoting,
        ]);
        // Pad post consumes 10; the quoting post's main content (18 chars)
        // fits whole; the quoted content gets the 6 leftover chars.
        let trimmed = trim_thread(&thread, 34);
        let boundary = &trimmed.thread.posts[1];
        assert_eq!(boundary.post.content(), "my comment on this");
        let quoted = boundary.quoted_post.as_ref().expect("quoted kept");
        assert_eq!(quoted.content(), "quoted");
        assert_eq!(
            boundary.post.quoted_url.as_deref(),
            Some("https://x.com/bob/status/9")
        );
    }

    #[test]
    fn zero_leftover_omits_quoted_content() {
        let quoted = ReferencingPost::new(
            Post::new(
                "bob",
                "quoted text",
                "https://x.com/bob/status/9",
                SourceNetwork::Twitter,
            ),
            None,
        );
        let quoting = QuotedReferencingPost::new(
            ReferencingPost::new(
                Post::new(
                    "ada",
                    "a comment far longer than the budget allows",
                    "https://x.com/ada/status/1",
                    SourceNetwork::Twitter,
                ),
                Some("https://x.com/bob/status/9".to_string()),
            ),
            Some(quoted),
        );
        let thread = Thread::new(vec![quoting]);
        let trimmed = trim_thread(&thread, 10);
        let boundary = &trimmed.thread.posts[0];
        assert_eq!(boundary.post.content(), "a comment ");
        assert!(boundary.quoted_post.is_none());
        assert!(boundary.post.quoted_url.is_none());
    }
}

//! Prompt case selection and thread rendering.
//!
//! Reference URLs become `<ref_n>` tokens numbered by thread-global first
//! appearance, so numbering stays consistent across every post and every
//! task prompt built from the same thread.

use std::collections::HashMap;

use refsense_common::ontology::PromptCase;
use refsense_common::types::{ReferenceMetadata, Thread};

const POST_SEPARATOR: &str = "\n---\n";

/// A thread rendered for prompting.
#[derive(Debug, Clone)]
pub struct RenderedThread {
    /// Post contents with reference tokens substituted and quoted posts
    /// inlined, joined in thread order.
    pub content: String,
    /// Item type / title / summary lines for resolved references; empty when
    /// nothing resolved.
    pub metadata_block: String,
    pub case: PromptCase,
    /// Canonical (thread-global) reference order backing the token numbering.
    pub reference_urls: Vec<String>,
    /// Metadata in token order, with `order` and `ref_source_url` assigned.
    pub metadata: Vec<ReferenceMetadata>,
}

pub struct ThreadRenderer {
    quoted_context_len: Option<usize>,
}

impl ThreadRenderer {
    pub fn new(quoted_context_len: Option<usize>) -> Self {
        Self { quoted_context_len }
    }

    pub fn render(
        &self,
        thread: &Thread,
        metadata: &HashMap<String, ReferenceMetadata>,
    ) -> RenderedThread {
        let reference_urls = thread.reference_urls();
        let case = PromptCase::for_reference_count(reference_urls.len());

        // Longer URLs substitute first so a URL that prefixes another never
        // swallows the longer one's tail.
        let mut numbered: Vec<(usize, &String)> = reference_urls.iter().enumerate().collect();
        numbered.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let substitute = |text: &str| -> String {
            let mut out = text.to_string();
            for (idx, url) in &numbered {
                out = out.replace(url.as_str(), &format!("<ref_{}>", idx + 1));
            }
            out
        };

        let mut parts = Vec::new();
        for post in &thread.posts {
            let mut rendered = substitute(post.post.content());
            if let (Some(quoted), Some(quoted_url)) = (&post.quoted_post, &post.post.quoted_url) {
                if let Some(pos) = reference_urls.iter().position(|u| u == quoted_url) {
                    let mut quoted_content = quoted.content().to_string();
                    // Truncate first, wrap after: the tags are never split.
                    if let Some(max) = self.quoted_context_len {
                        if quoted_content.chars().count() > max {
                            quoted_content = quoted_content.chars().take(max).collect();
                        }
                    }
                    rendered.push_str(&format!(
                        "\n<quoted ref_{}>{}</quoted>",
                        pos + 1,
                        substitute(&quoted_content)
                    ));
                }
            }
            parts.push(rendered);
        }

        // Which post first referenced each URL, for nested quote chains.
        let mut source_map: HashMap<String, String> = HashMap::new();
        for post in &thread.posts {
            for url in post.reference_urls(true) {
                source_map
                    .entry(url)
                    .or_insert_with(|| post.post.post.url.clone());
            }
        }

        let mut ordered_metadata = Vec::with_capacity(reference_urls.len());
        let mut metadata_lines = Vec::new();
        for (idx, url) in reference_urls.iter().enumerate() {
            let mut meta = metadata.get(url).cloned().unwrap_or_default();
            meta.order = idx + 1;
            meta.ref_source_url = source_map.get(url).cloned();
            if meta.is_resolved() {
                let mut line = format!("<ref_{}> ({}): {}", idx + 1, meta.item_type, meta.title);
                if !meta.summary.is_empty() {
                    line.push_str("\nSummary: ");
                    line.push_str(&meta.summary);
                }
                metadata_lines.push(line);
            }
            ordered_metadata.push(meta);
        }
        let metadata_block = if metadata_lines.is_empty() {
            String::new()
        } else {
            format!("Reference metadata:\n{}", metadata_lines.join("\n"))
        };

        RenderedThread {
            content: parts.join(POST_SEPARATOR),
            metadata_block,
            case,
            reference_urls,
            metadata: ordered_metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsense_common::types::{Post, QuotedReferencingPost, ReferencingPost, SourceNetwork};

    fn make_post(content: &str, url: &str) -> QuotedReferencingPost {
        QuotedReferencingPost::new(
            ReferencingPost::new(
                Post::new("ada", content, url, SourceNetwork::Twitter),
                None,
            ),
            None,
        )
    }

    fn render(thread: &Thread) -> RenderedThread {
        ThreadRenderer::new(None).render(thread, &HashMap::new())
    }

    #[test]
    fn single_reference_selects_single_ref_case() {
        let thread = Thread::new(vec![make_post(
            "see https://a.com",
            "https://x.com/ada/status/1",
        )]);
        let rendered = render(&thread);
        assert_eq!(rendered.case, PromptCase::SingleRef);
        assert_eq!(rendered.content, "see <ref_1>");
    }

    #[test]
    fn second_reference_flips_to_multi_ref_case() {
        let thread = Thread::new(vec![make_post(
            "see https://a.com and https://b.org",
            "https://x.com/ada/status/1",
        )]);
        let rendered = render(&thread);
        assert_eq!(rendered.case, PromptCase::MultiRef);
        assert_eq!(rendered.content, "see <ref_1> and <ref_2>");
    }

    #[test]
    fn no_references_selects_zero_ref_case() {
        let thread = Thread::new(vec![make_post(
            "just thinking out loud",
            "https://x.com/ada/status/1",
        )]);
        let rendered = render(&thread);
        assert_eq!(rendered.case, PromptCase::ZeroRef);
        assert!(rendered.reference_urls.is_empty());
    }

    #[test]
    fn thread_global_numbering_spans_posts() {
        let thread = Thread::new(vec![
            make_post("intro https://a.com", "https://x.com/ada/status/1"),
            make_post(
                "more on https://a.com plus https://b.org",
                "https://x.com/ada/status/2",
            ),
        ]);
        let rendered = render(&thread);
        assert_eq!(
            rendered.content,
            "intro <ref_1>\n---\nmore on <ref_1> plus <ref_2>"
        );
    }

    #[test]
    fn prefixing_urls_do_not_collide() {
        let thread = Thread::new(vec![make_post(
            "short https://a.com long https://a.com/deeper",
            "https://x.com/ada/status/1",
        )]);
        let rendered = render(&thread);
        assert_eq!(rendered.content, "short <ref_1> long <ref_2>");
    }

    #[test]
    fn quoted_post_wrapped_with_reference_token() {
        let quoted = ReferencingPost::new(
            Post::new(
                "bob",
                "the original claim",
                "https://x.com/bob/status/9",
                SourceNetwork::Twitter,
            ),
            None,
        );
        let quoting = QuotedReferencingPost::new(
            ReferencingPost::new(
                Post::new(
                    "ada",
                    "strong words",
                    "https://x.com/ada/status/1",
                    SourceNetwork::Twitter,
                ),
                Some("https://x.com/bob/status/9".to_string()),
            ),
            Some(quoted),
        );
        let thread = Thread::new(vec![quoting]);
        let rendered = render(&thread);
        assert_eq!(
            rendered.content,
            "strong words\n<quoted ref_1>the original claim</quoted>"
        );
    }

    #[test]
    fn quoted_content_truncated_before_wrapping() {
        let quoted = ReferencingPost::new(
            Post::new(
                "bob",
                "a very long original message",
                "https://x.com/bob/status/9",
                SourceNetwork::Twitter,
            ),
            None,
        );
        let quoting = QuotedReferencingPost::new(
            ReferencingPost::new(
                Post::new(
                    "ada",
                    "look",
                    "https://x.com/ada/status/1",
                    SourceNetwork::Twitter,
                ),
                Some("https://x.com/bob/status/9".to_string()),
            ),
            Some(quoted),
        );
        let thread = Thread::new(vec![quoting]);
        let rendered = ThreadRenderer::new(Some(6)).render(&thread, &HashMap::new());
        assert_eq!(
            rendered.content,
            "look\n<quoted ref_1>a very</quoted>"
        );
    }

    #[test]
    fn metadata_block_lists_resolved_references_only() {
        let thread = Thread::new(vec![make_post(
            "see https://a.com and https://b.org",
            "https://x.com/ada/status/1",
        )]);
        let mut metadata = HashMap::new();
        metadata.insert(
            "https://a.com".to_string(),
            ReferenceMetadata {
                item_type: "journalArticle".to_string(),
                title: "A Paper".to_string(),
                summary: "About things.".to_string(),
                ..Default::default()
            },
        );
        let rendered = ThreadRenderer::new(None).render(&thread, &metadata);
        assert!(rendered
            .metadata_block
            .contains("<ref_1> (journalArticle): A Paper"));
        assert!(rendered.metadata_block.contains("Summary: About things."));
        assert!(!rendered.metadata_block.contains("<ref_2>"));
    }

    #[test]
    fn metadata_order_assigned_during_rendering() {
        let thread = Thread::new(vec![make_post(
            "see https://a.com and https://b.org",
            "https://x.com/ada/status/1",
        )]);
        let rendered = render(&thread);
        assert_eq!(rendered.metadata.len(), 2);
        assert_eq!(rendered.metadata[0].order, 1);
        assert_eq!(rendered.metadata[1].order, 2);
        assert_eq!(
            rendered.metadata[0].ref_source_url.as_deref(),
            Some("https://x.com/ada/status/1")
        );
    }
}

//! Inbound request shapes and conversion into the immutable thread model.
//!
//! Only input validation errors and unknown-platform URLs propagate to the
//! caller; everything downstream degrades instead of failing.

use serde::Deserialize;

use refsense_common::config::MAX_POSTS_PER_REQUEST;
use refsense_common::types::{Post, QuotedReferencingPost, ReferencingPost, Thread};
use refsense_common::urls::{canonicalize_url, extract_urls, platform_post_id};
use refsense_common::RefSenseError;

use crate::expand::UrlExpander;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    pub id: String,
    pub name: String,
    pub username: String,
    pub platform_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    pub author: AuthorPayload,
    pub content: String,
    pub url: String,
    #[serde(default)]
    pub quoted_thread: Option<Box<PostPayload>>,
    /// Accepted for interface compatibility; currently unused.
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

/// A request carries either a single post or an ordered thread of posts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParseRequest {
    Thread(Vec<PostPayload>),
    Post(Box<PostPayload>),
}

impl ParseRequest {
    fn into_posts(self) -> Vec<PostPayload> {
        match self {
            ParseRequest::Thread(posts) => posts,
            ParseRequest::Post(post) => vec![*post],
        }
    }
}

/// Build the immutable thread from a request, canonicalizing every URL that
/// appears in post content. With an expander, shortened URLs are resolved
/// over the network first; without one, canonical-form rules apply alone.
pub async fn build_thread(
    request: ParseRequest,
    expander: Option<&UrlExpander>,
) -> Result<Thread, RefSenseError> {
    let posts = request.into_posts();
    if posts.is_empty() {
        return Err(RefSenseError::Validation(
            "request contains no posts".to_string(),
        ));
    }
    if posts.len() > MAX_POSTS_PER_REQUEST {
        return Err(RefSenseError::Validation(format!(
            "thread has {} posts, maximum is {MAX_POSTS_PER_REQUEST}",
            posts.len()
        )));
    }

    let mut converted = Vec::with_capacity(posts.len());
    for payload in posts {
        converted.push(convert_post(payload, expander).await?);
    }
    Ok(Thread::new(converted))
}

async fn convert_post(
    payload: PostPayload,
    expander: Option<&UrlExpander>,
) -> Result<QuotedReferencingPost, RefSenseError> {
    let PostPayload {
        author,
        content,
        url,
        quoted_thread,
        parameters: _,
    } = payload;

    // Quote nesting is bounded to one level: a deeper quote contributes only
    // its URL to the quoted post's references.
    let quoted = match quoted_thread {
        Some(q) => {
            let nested_url = q.quoted_thread.as_ref().map(|n| canonicalize_url(&n.url));
            Some(convert_referencing(q.author, q.content, q.url, nested_url, expander).await?)
        }
        None => None,
    };
    let quoted_url = quoted.as_ref().map(|q| q.post.url.clone());

    let referencing = convert_referencing(author, content, url, quoted_url, expander).await?;
    Ok(QuotedReferencingPost::new(referencing, quoted))
}

async fn convert_referencing(
    author: AuthorPayload,
    content: String,
    url: String,
    quoted_url: Option<String>,
    expander: Option<&UrlExpander>,
) -> Result<ReferencingPost, RefSenseError> {
    let (network, _) =
        platform_post_id(&url).ok_or_else(|| RefSenseError::UnknownUrlType(url.clone()))?;

    let content = normalize_content(&content, expander).await;
    let post = Post::new(author.name, content, canonicalize_url(&url), network);
    Ok(ReferencingPost::new(post, quoted_url))
}

/// Substitute every URL in the content with its expanded canonical form, so
/// downstream extraction and token rendering see one spelling per reference.
async fn normalize_content(content: &str, expander: Option<&UrlExpander>) -> String {
    let (expanded, original) = match expander {
        Some(exp) => exp.extract_and_expand_urls(content).await,
        None => {
            let original = extract_urls(content);
            let expanded = original.iter().map(|u| canonicalize_url(u)).collect();
            (expanded, original)
        }
    };

    let mut out = content.to_string();
    for (orig, exp) in original.iter().zip(expanded.iter()) {
        if orig != exp {
            out = out.replace(orig.as_str(), exp);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsense_common::types::SourceNetwork;

    fn author() -> AuthorPayload {
        AuthorPayload {
            id: "1".to_string(),
            name: "Ada".to_string(),
            username: "ada".to_string(),
            platform_id: "twitter".to_string(),
        }
    }

    fn payload(content: &str, url: &str) -> PostPayload {
        PostPayload {
            author: author(),
            content: content.to_string(),
            url: url.to_string(),
            quoted_thread: None,
            parameters: None,
        }
    }

    #[tokio::test]
    async fn single_post_request_builds_one_post_thread() {
        let request = ParseRequest::Post(Box::new(payload(
            "reading https://a.com/paper",
            "https://x.com/ada/status/1",
        )));
        let thread = build_thread(request, None).await.unwrap();
        assert_eq!(thread.posts.len(), 1);
        assert_eq!(thread.posts[0].post.post.source_network, SourceNetwork::Twitter);
        assert_eq!(thread.reference_urls(), vec!["https://a.com/paper"]);
    }

    #[tokio::test]
    async fn empty_request_rejected() {
        let request = ParseRequest::Thread(Vec::new());
        assert!(matches!(
            build_thread(request, None).await,
            Err(RefSenseError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn oversized_thread_rejected() {
        let posts: Vec<PostPayload> = (0..41)
            .map(|i| payload("hi", &format!("https://x.com/ada/status/{i}")))
            .collect();
        let request = ParseRequest::Thread(posts);
        assert!(matches!(
            build_thread(request, None).await,
            Err(RefSenseError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_platform_url_rejected_with_url() {
        let request = ParseRequest::Post(Box::new(payload("hi", "https://example.com/blog/1")));
        match build_thread(request, None).await {
            Err(RefSenseError::UnknownUrlType(url)) => {
                assert_eq!(url, "https://example.com/blog/1");
            }
            other => panic!("expected UnknownUrlType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn content_urls_canonicalized_in_place() {
        let request = ParseRequest::Post(Box::new(payload(
            "see https://twitter.com/bob/status/2?utm_source=share",
            "https://x.com/ada/status/1",
        )));
        let thread = build_thread(request, None).await.unwrap();
        assert_eq!(
            thread.posts[0].post.content(),
            "see https://x.com/bob/status/2"
        );
        assert_eq!(
            thread.reference_urls(),
            vec!["https://x.com/bob/status/2"]
        );
    }

    #[tokio::test]
    async fn quoted_thread_materialized_one_level_deep() {
        let mut inner = payload("deepest https://c.net/d", "https://x.com/carol/status/3");
        inner.quoted_thread = None;
        let mut middle = payload("quoting https://b.org/claims", "https://x.com/bob/status/2");
        middle.quoted_thread = Some(Box::new(inner));
        let mut outer = payload("my take", "https://x.com/ada/status/1");
        outer.quoted_thread = Some(Box::new(middle));

        let request = ParseRequest::Post(Box::new(outer));
        let thread = build_thread(request, None).await.unwrap();
        let post = &thread.posts[0];

        let quoted = post.quoted_post.as_ref().expect("quoted post kept");
        assert_eq!(quoted.post.url, "https://x.com/bob/status/2");
        // The second-level quote survives only as a reference URL.
        assert_eq!(
            quoted.reference_urls(),
            vec!["https://b.org/claims", "https://x.com/carol/status/3"]
        );
        assert_eq!(
            thread.reference_urls(),
            vec![
                "https://x.com/bob/status/2",
                "https://b.org/claims",
                "https://x.com/carol/status/3"
            ]
        );
    }

    #[test]
    fn request_json_accepts_both_shapes() {
        let single = r#"{
            "author": {"id": "1", "name": "Ada", "username": "ada", "platformId": "twitter"},
            "content": "hello",
            "url": "https://x.com/ada/status/1"
        }"#;
        assert!(matches!(
            serde_json::from_str::<ParseRequest>(single).unwrap(),
            ParseRequest::Post(_)
        ));

        let thread = format!("[{single}, {single}]");
        assert!(matches!(
            serde_json::from_str::<ParseRequest>(&thread).unwrap(),
            ParseRequest::Thread(_)
        ));
    }
}

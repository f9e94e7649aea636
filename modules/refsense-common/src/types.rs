use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::urls::{extract_urls, platform_post_id, remove_dups_ordered};

// --- Source networks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceNetwork {
    Twitter,
    Mastodon,
    Bluesky,
    Unknown,
}

impl std::fmt::Display for SourceNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceNetwork::Twitter => write!(f, "twitter"),
            SourceNetwork::Mastodon => write!(f, "mastodon"),
            SourceNetwork::Bluesky => write!(f, "bluesky"),
            SourceNetwork::Unknown => write!(f, "unknown"),
        }
    }
}

// --- Post / thread model ---

/// A single social-media post. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub author: String,
    pub content: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub source_network: SourceNetwork,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default)]
    pub is_repost: bool,
}

impl Post {
    pub fn new(
        author: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
        source_network: SourceNetwork,
    ) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            url: url.into(),
            created_at: None,
            source_network,
            is_reply: false,
            is_repost: false,
        }
    }

    /// Character length of the content (not bytes).
    pub fn char_length(&self) -> usize {
        self.content.chars().count()
    }
}

/// A post plus the external URLs its content references.
///
/// `ref_urls` is raw and order-preserving: extracted from the content at
/// construction, minus URLs pointing at this post's own media, plus the
/// quoted-post URL when one exists. Dedup happens in `reference_urls()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencingPost {
    #[serde(flatten)]
    pub post: Post,
    pub ref_urls: Vec<String>,
    pub quoted_url: Option<String>,
}

impl ReferencingPost {
    pub fn new(post: Post, quoted_url: Option<String>) -> Self {
        let own_id = platform_post_id(&post.url);
        let mut ref_urls: Vec<String> = extract_urls(&post.content)
            .into_iter()
            .filter(|u| {
                // A URL carrying this post's own platform ID is a media
                // attachment, not an external reference.
                match (platform_post_id(u), &own_id) {
                    (Some(ref id), Some(own)) => id != own,
                    _ => true,
                }
            })
            .collect();
        if let Some(q) = &quoted_url {
            ref_urls.push(q.clone());
        }
        Self {
            post,
            ref_urls,
            quoted_url,
        }
    }

    /// The canonical projection: deduplicated, order-preserving.
    pub fn reference_urls(&self) -> Vec<String> {
        remove_dups_ordered(self.ref_urls.clone())
    }

    pub fn content(&self) -> &str {
        &self.post.content
    }
}

/// A post that may quote another post. Quote nesting is bounded to one level:
/// the quoted post's own quotes are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedReferencingPost {
    #[serde(flatten)]
    pub post: ReferencingPost,
    pub quoted_post: Option<ReferencingPost>,
}

impl QuotedReferencingPost {
    pub fn new(post: ReferencingPost, quoted_post: Option<ReferencingPost>) -> Self {
        Self { post, quoted_post }
    }

    /// Own references, then the quoted post's, deduplicated in that order.
    pub fn reference_urls(&self, include_quoted: bool) -> Vec<String> {
        let mut urls = self.post.ref_urls.clone();
        if include_quoted {
            if let Some(quoted) = &self.quoted_post {
                urls.extend(quoted.ref_urls.clone());
            }
        }
        remove_dups_ordered(urls)
    }
}

/// An ordered sequence of posts from one author, treated as one unit.
/// Constructed once per request; immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub posts: Vec<QuotedReferencingPost>,
}

impl Thread {
    pub fn new(posts: Vec<QuotedReferencingPost>) -> Self {
        Self { posts }
    }

    pub fn author(&self) -> &str {
        self.posts
            .first()
            .map(|p| p.post.post.author.as_str())
            .unwrap_or("")
    }

    pub fn url(&self) -> &str {
        self.posts
            .first()
            .map(|p| p.post.post.url.as_str())
            .unwrap_or("")
    }

    /// Per-post canonical lists concatenated in thread order, deduplicated
    /// globally. This ordering is the index space for per-reference answers.
    pub fn reference_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        for post in &self.posts {
            urls.extend(post.reference_urls(true));
        }
        remove_dups_ordered(urls)
    }

    /// Sum of post content lengths in chars. Quoted content is not counted;
    /// the trimmer budgets it separately.
    pub fn char_length(&self) -> usize {
        self.posts.iter().map(|p| p.post.post.char_length()).sum()
    }
}

// --- Reference metadata ---

/// Bibliographic metadata for one reference URL. Created fresh per parse
/// request; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    pub item_type: String,
    pub title: String,
    pub summary: String,
    /// 1-indexed position of first appearance, assigned during rendering.
    /// 0 = unassigned.
    #[serde(default)]
    pub order: usize,
    /// The post that first referenced this URL, for nested quote chains.
    #[serde(default)]
    pub ref_source_url: Option<String>,
    #[serde(default)]
    pub debug: Vec<String>,
}

impl ReferenceMetadata {
    /// Placeholder for a reference that is itself a social-media post.
    /// Synthesized locally, no lookup.
    pub fn forum_post(url: &str) -> Self {
        Self {
            item_type: "forumPost".to_string(),
            title: url.to_string(),
            ..Default::default()
        }
    }

    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            debug: vec![message.into()],
            ..Default::default()
        }
    }

    /// A record counts as resolved when the lookup produced anything usable.
    pub fn is_resolved(&self) -> bool {
        !self.item_type.is_empty() || !self.title.is_empty()
    }

    /// Cap the summary at `max` chars. -1 disables truncation.
    pub fn truncate_summary(&mut self, max: i64) {
        if max < 0 {
            return;
        }
        let max = max as usize;
        if self.summary.chars().count() > max {
            self.summary = self.summary.chars().take(max).collect();
        }
    }
}

// --- Reference tagging answers ---

/// One per-reference answer from the reference tagging task.
///
/// `ref_number` is 1-indexed as claimed by the model; reconciliation re-keys
/// it to the 0-indexed canonical position (-1 = zero-reference sentinel).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubAnswer {
    pub ref_number: i64,
    /// Why these labels apply, in the model's words.
    #[serde(default)]
    pub reasoning: String,
    /// Relation labels chosen for this reference.
    #[serde(default)]
    pub final_answer: Vec<String>,
    #[serde(default)]
    pub ref_url: Option<String>,
}

impl SubAnswer {
    pub fn empty(ref_number: i64, reasoning: impl Into<String>) -> Self {
        Self {
            ref_number,
            reasoning: reasoning.into(),
            final_answer: Vec::new(),
            ref_url: None,
        }
    }
}

/// The reference tagging task's answer: one `SubAnswer` per reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answer {
    pub sub_answers: Vec<SubAnswer>,
    /// Reconciliation anomaly notes. Never fatal.
    #[serde(default)]
    pub debug: Vec<String>,
}

// --- Combined output ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    NotClassified,
    CitoidDetectedResearch,
    AiDetectedResearch,
    NotResearch,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::NotClassified => write!(f, "not_classified"),
            Classification::CitoidDetectedResearch => write!(f, "citoid_detected_research"),
            Classification::AiDetectedResearch => write!(f, "ai_detected_research"),
            Classification::NotResearch => write!(f, "not_research"),
        }
    }
}

/// Everything the pipeline produced for one post. Read-only after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinedOutput {
    pub keywords: Vec<String>,
    /// The academic/not-academic keyword from the keywords task.
    pub research_keyword: String,
    pub topics: Vec<String>,
    pub hashtags: Vec<String>,
    /// Outer list aligned 1:1 with canonical reference order, or length 1
    /// with an empty entry when there are no references.
    pub reference_tags: Vec<Vec<String>>,
    /// Item types of the resolved references, in reference order.
    pub item_types: Vec<String>,
    pub reference_urls: Vec<String>,
    /// References that fell out of scope during trimming.
    pub unparsed_urls: Vec<String>,
    /// Resolved metadata in reference order.
    pub metadata: Vec<ReferenceMetadata>,
    pub filter_classification: Classification,
    pub debug: Vec<String>,
}

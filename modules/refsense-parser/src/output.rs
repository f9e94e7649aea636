//! Combined output assembly and triple conversion.
//!
//! Triples stay plain structs; turning them into an RDF serialization is a
//! boundary adapter's job, not this crate's.

use serde::Serialize;

use refsense_common::types::{Answer, CombinedOutput};

use crate::prompt::RenderedThread;
use crate::tasks::{TaskOutput, TaskResult};

/// Object value for labels on a post that references nothing.
pub const NO_REFERENCE_OBJECT: &str = "urn:refsense:no-reference";
pub const KEYWORD_PREDICATE: &str = "hasKeyword";
pub const TOPIC_PREDICATE: &str = "hasTopic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Flatten per-task results plus the reconciled tagger answer into one
/// read-only structure. `reconciled` is None when the tagger was not active.
pub fn build_combined_output(
    rendered: &RenderedThread,
    unparsed_urls: Vec<String>,
    results: Vec<TaskResult>,
    reconciled: Option<Answer>,
) -> CombinedOutput {
    let mut output = CombinedOutput {
        reference_urls: rendered.reference_urls.clone(),
        unparsed_urls,
        metadata: rendered.metadata.clone(),
        item_types: rendered
            .metadata
            .iter()
            .filter(|m| !m.item_type.is_empty())
            .map(|m| m.item_type.clone())
            .collect(),
        ..Default::default()
    };

    for result in results {
        if let Some(err) = result.errors {
            output
                .debug
                .push(format!("task {} degraded: {err}", result.kind.name()));
        }
        match result.output {
            TaskOutput::Keywords {
                keywords,
                research_keyword,
            } => {
                output.keywords = keywords;
                output.research_keyword = research_keyword;
            }
            TaskOutput::Topics { topics } => output.topics = topics,
            TaskOutput::Hashtags { hashtags } => output.hashtags = hashtags,
            // The raw tagger answer is superseded by the reconciled one.
            TaskOutput::ReferenceTags { .. } => {}
        }
    }

    if let Some(answer) = reconciled {
        output.reference_tags = answer
            .sub_answers
            .iter()
            .map(|s| s.final_answer.clone())
            .collect();
        output.debug.extend(answer.debug);
    }

    output
}

/// Mechanical conversion to (subject, predicate, object) triples: one triple
/// per accepted label × reference pair, plus keyword and topic triples.
pub fn to_triples(post_url: &str, output: &CombinedOutput) -> Vec<Triple> {
    let mut triples = Vec::new();

    for (i, tags) in output.reference_tags.iter().enumerate() {
        let object = output
            .reference_urls
            .get(i)
            .cloned()
            .unwrap_or_else(|| NO_REFERENCE_OBJECT.to_string());
        for tag in tags {
            triples.push(Triple {
                subject: post_url.to_string(),
                predicate: tag.clone(),
                object: object.clone(),
            });
        }
    }

    for keyword in &output.keywords {
        triples.push(Triple {
            subject: post_url.to_string(),
            predicate: KEYWORD_PREDICATE.to_string(),
            object: keyword.clone(),
        });
    }
    for topic in &output.topics {
        triples.push(Triple {
            subject: post_url.to_string(),
            predicate: TOPIC_PREDICATE.to_string(),
            object: topic.clone(),
        });
    }

    triples
}

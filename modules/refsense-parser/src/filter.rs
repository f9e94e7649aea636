//! The deterministic research filter.

use refsense_common::ontology::{ACADEMIC_ITEM_TYPES, ACADEMIC_KEYWORD, TOPIC_WHITELIST};
use refsense_common::types::{Classification, CombinedOutput};

/// Threshold at and above which a post is classified as not research.
const NOT_RESEARCH_SCORE: u32 = 2;

/// Pure scoring function over a post's combined output.
///
/// A resolved reference with an academic item type is accepted outright.
/// Otherwise the post accumulates a point for each research-negative signal:
/// no whitelisted topic, no academic keyword, no references at all.
pub fn classify(output: &CombinedOutput) -> Classification {
    if output
        .item_types
        .iter()
        .any(|t| ACADEMIC_ITEM_TYPES.contains(&t.as_str()))
    {
        return Classification::CitoidDetectedResearch;
    }

    let mut score = 0u32;
    if !output
        .topics
        .iter()
        .any(|t| TOPIC_WHITELIST.contains(&t.as_str()))
    {
        score += 1;
    }
    if output.research_keyword != ACADEMIC_KEYWORD {
        score += 1;
    }
    if output.reference_urls.is_empty() {
        score += 1;
    }

    if score >= NOT_RESEARCH_SCORE {
        Classification::NotResearch
    } else {
        Classification::AiDetectedResearch
    }
}

//! The closed label vocabulary, topic lists, and item-type whitelist.
//!
//! Loaded once at startup into an immutable [`Ontology`] that is passed
//! explicitly to the components that need it.

use serde::{Deserialize, Serialize};

// --- Prompt cases ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCase {
    ZeroRef,
    SingleRef,
    MultiRef,
}

impl PromptCase {
    /// Case selection is purely a function of canonical reference count.
    pub fn for_reference_count(count: usize) -> Self {
        match count {
            0 => PromptCase::ZeroRef,
            1 => PromptCase::SingleRef,
            _ => PromptCase::MultiRef,
        }
    }
}

impl std::fmt::Display for PromptCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptCase::ZeroRef => write!(f, "zero_ref"),
            PromptCase::SingleRef => write!(f, "single_ref"),
            PromptCase::MultiRef => write!(f, "multi_ref"),
        }
    }
}

// --- Labels ---

/// One relation label: how a post relates to a referenced resource (or, for
/// zero-reference labels, what kind of post it is).
#[derive(Debug, Clone, Copy)]
pub struct LabelDef {
    pub name: &'static str,
    pub description: &'static str,
    pub cases: &'static [PromptCase],
}

const ALL_CASES: &[PromptCase] = &[
    PromptCase::ZeroRef,
    PromptCase::SingleRef,
    PromptCase::MultiRef,
];
const REF_CASES: &[PromptCase] = &[PromptCase::SingleRef, PromptCase::MultiRef];

static LABELS: &[LabelDef] = &[
    LabelDef {
        name: "announce",
        description: "the author announces a new resource of their own (paper, dataset, tool)",
        cases: REF_CASES,
    },
    LabelDef {
        name: "agrees",
        description: "the author endorses claims made in the referenced work",
        cases: REF_CASES,
    },
    LabelDef {
        name: "disagrees",
        description: "the author disputes or contradicts claims made in the referenced work",
        cases: REF_CASES,
    },
    LabelDef {
        name: "reviews",
        description: "the author critically assesses the referenced work in some depth",
        cases: REF_CASES,
    },
    LabelDef {
        name: "quote",
        description: "the author quotes text from the referenced work",
        cases: REF_CASES,
    },
    LabelDef {
        name: "recommendation",
        description: "the author recommends the referenced resource to others",
        cases: REF_CASES,
    },
    LabelDef {
        name: "reading",
        description: "the author is reading (or has read) the referenced work",
        cases: REF_CASES,
    },
    LabelDef {
        name: "watching",
        description: "the author is watching the referenced recording or talk",
        cases: REF_CASES,
    },
    LabelDef {
        name: "listening",
        description: "the author is listening to the referenced episode or recording",
        cases: REF_CASES,
    },
    LabelDef {
        name: "funding",
        description: "the reference is a funding call or grant opportunity",
        cases: REF_CASES,
    },
    LabelDef {
        name: "mentions",
        description: "the reference is mentioned without any stronger relation applying",
        cases: REF_CASES,
    },
    LabelDef {
        name: "question",
        description: "the post asks a question",
        cases: ALL_CASES,
    },
    LabelDef {
        name: "discussion",
        description: "the post elaborates on or discusses ideas without a specific claim relation",
        cases: ALL_CASES,
    },
    LabelDef {
        name: "event",
        description: "the post announces an event such as a conference, workshop or talk",
        cases: ALL_CASES,
    },
    LabelDef {
        name: "job",
        description: "the post announces an open position",
        cases: ALL_CASES,
    },
    LabelDef {
        name: "other",
        description: "none of the other labels apply",
        cases: ALL_CASES,
    },
];

// --- Fixed vocabularies ---

/// Citoid item types that count as academic output. Any resolved reference
/// with one of these short-circuits the research filter.
pub const ACADEMIC_ITEM_TYPES: &[&str] = &[
    "journalArticle",
    "preprint",
    "book",
    "thesis",
    "conferencePaper",
    "report",
    "bookSection",
    "manuscript",
    "presentation",
];

/// Topics whose presence counts toward the post being research-related.
pub const TOPIC_WHITELIST: &[&str] = &[
    "academia",
    "philosophy",
    "research",
    "science",
    "technology",
];

/// The full topic vocabulary offered to the topics task.
pub const ALLOWED_TOPICS: &[&str] = &[
    "academia",
    "art",
    "business",
    "climate",
    "culture",
    "design",
    "economics",
    "education",
    "entertainment",
    "health",
    "humour",
    "literature",
    "news",
    "personal",
    "philosophy",
    "politics",
    "research",
    "science",
    "software",
    "sports",
    "technology",
    "other",
];

/// The keyword the keywords task emits for posts with academic content.
pub const ACADEMIC_KEYWORD: &str = "academic";
pub const NOT_ACADEMIC_KEYWORD: &str = "not-academic";

// --- Ontology ---

/// Immutable label/topic tables plus the prompt text fragments derived from
/// them. Build once with [`Ontology::load`], share by reference.
#[derive(Debug, Clone)]
pub struct Ontology {
    labels: &'static [LabelDef],
}

impl Ontology {
    pub fn load() -> Self {
        Self { labels: LABELS }
    }

    pub fn labels(&self) -> &[LabelDef] {
        self.labels
    }

    /// The label subset valid for a prompt case.
    pub fn allowed_labels(&self, case: PromptCase) -> Vec<&'static str> {
        self.labels
            .iter()
            .filter(|l| l.cases.contains(&case))
            .map(|l| l.name)
            .collect()
    }

    /// Rendered `- name: description` lines for a case, for prompt text.
    pub fn label_block(&self, case: PromptCase) -> String {
        self.labels
            .iter()
            .filter(|l| l.cases.contains(&case))
            .map(|l| format!("- {}: {}", l.name, l.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn topic_block(&self) -> String {
        ALLOWED_TOPICS.join(", ")
    }
}

impl Default for Ontology {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_selection_by_reference_count() {
        assert_eq!(PromptCase::for_reference_count(0), PromptCase::ZeroRef);
        assert_eq!(PromptCase::for_reference_count(1), PromptCase::SingleRef);
        assert_eq!(PromptCase::for_reference_count(2), PromptCase::MultiRef);
        assert_eq!(PromptCase::for_reference_count(17), PromptCase::MultiRef);
    }

    #[test]
    fn zero_ref_labels_exclude_claim_relations() {
        let ontology = Ontology::load();
        let zero = ontology.allowed_labels(PromptCase::ZeroRef);
        assert!(zero.contains(&"question"));
        assert!(zero.contains(&"discussion"));
        assert!(!zero.contains(&"disagrees"));
        assert!(!zero.contains(&"announce"));
    }

    #[test]
    fn single_ref_labels_include_claim_relations() {
        let ontology = Ontology::load();
        let single = ontology.allowed_labels(PromptCase::SingleRef);
        assert!(single.contains(&"disagrees"));
        assert!(single.contains(&"agrees"));
        assert!(single.contains(&"other"));
    }

    #[test]
    fn label_block_renders_names() {
        let ontology = Ontology::load();
        let block = ontology.label_block(PromptCase::MultiRef);
        assert!(block.contains("- disagrees:"));
        assert!(block.contains("- mentions:"));
    }

    #[test]
    fn endorses_is_not_a_label() {
        let ontology = Ontology::load();
        assert!(!ontology
            .allowed_labels(PromptCase::MultiRef)
            .contains(&"endorses"));
    }
}

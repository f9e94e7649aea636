//! The fixed task set: keywords, topics, reference tagging, hashtags.
//!
//! Each task renders its own prompt from the shared [`RenderedThread`] and
//! post-processes its own raw model response. Dispatch, retry and fallback
//! live in the dispatcher.

use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;

use ai_client::ModelClient;
use refsense_common::ontology::{Ontology, NOT_ACADEMIC_KEYWORD};
use refsense_common::types::{Answer, SubAnswer};
use refsense_common::urls::remove_dups_ordered;

use crate::prompt::RenderedThread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Keywords,
    Topics,
    ReferenceTagger,
    Hashtags,
}

/// All four tasks, in the order results are assembled.
pub const DEFAULT_ACTIVE_TASKS: &[TaskKind] = &[
    TaskKind::Keywords,
    TaskKind::Topics,
    TaskKind::ReferenceTagger,
    TaskKind::Hashtags,
];

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Keywords => "keywords",
            TaskKind::Topics => "topics",
            TaskKind::ReferenceTagger => "multi_reference_tagger",
            TaskKind::Hashtags => "hashtags",
        }
    }

    pub fn from_name(name: &str) -> Option<TaskKind> {
        match name {
            "keywords" => Some(TaskKind::Keywords),
            "topics" => Some(TaskKind::Topics),
            "multi_reference_tagger" => Some(TaskKind::ReferenceTagger),
            "hashtags" => Some(TaskKind::Hashtags),
            _ => None,
        }
    }

    /// Build the (system, user) prompt pair for this task.
    pub fn render_prompt(&self, rendered: &RenderedThread, ontology: &Ontology) -> (String, String) {
        let system = match self {
            TaskKind::Keywords => KEYWORDS_SYSTEM.to_string(),
            TaskKind::Topics => format!(
                "{TOPICS_SYSTEM}\n\nAllowed topics: {}.",
                ontology.topic_block()
            ),
            TaskKind::Hashtags => HASHTAGS_SYSTEM.to_string(),
            TaskKind::ReferenceTagger => {
                let labels = ontology.label_block(rendered.case);
                let case_instructions = match rendered.reference_urls.len() {
                    0 => ZERO_REF_INSTRUCTIONS.to_string(),
                    1 => SINGLE_REF_INSTRUCTIONS.to_string(),
                    n => format!(
                        "The post references {n} external resources, marked <ref_1> through <ref_{n}>. \
                         Return one sub_answer per reference, with ref_number matching the n in <ref_n>."
                    ),
                };
                format!("{TAGGER_SYSTEM}\n\n{case_instructions}\n\nAllowed labels:\n{labels}")
            }
        };

        let mut user = format!("Post:\n{}", rendered.content);
        if !rendered.metadata_block.is_empty() {
            user.push_str("\n\n");
            user.push_str(&rendered.metadata_block);
        }
        (system, user)
    }

    /// Invoke the model once and post-process the raw response.
    pub async fn invoke(
        &self,
        model: &dyn ModelClient,
        rendered: &RenderedThread,
        ontology: &Ontology,
    ) -> Result<TaskOutput> {
        let (system, user) = self.render_prompt(rendered, ontology);
        match self {
            TaskKind::Keywords => {
                let raw: KeywordsResponse = ai_client::extract(model, &system, &user).await?;
                Ok(TaskOutput::Keywords {
                    keywords: clean_terms(raw.keywords),
                    research_keyword: {
                        let kw = raw.academic_keyword.trim().to_lowercase();
                        if kw.is_empty() {
                            NOT_ACADEMIC_KEYWORD.to_string()
                        } else {
                            kw
                        }
                    },
                })
            }
            TaskKind::Topics => {
                let raw: TopicsResponse = ai_client::extract(model, &system, &user).await?;
                let topics = clean_terms(raw.topics)
                    .into_iter()
                    .map(|t| t.to_lowercase())
                    .filter(|t| {
                        refsense_common::ontology::ALLOWED_TOPICS.contains(&t.as_str())
                    })
                    .collect();
                Ok(TaskOutput::Topics { topics })
            }
            TaskKind::Hashtags => {
                let raw: HashtagsResponse = ai_client::extract(model, &system, &user).await?;
                let hashtags = clean_terms(
                    raw.hashtags
                        .into_iter()
                        .map(|h| h.trim_start_matches('#').to_string())
                        .collect(),
                );
                Ok(TaskOutput::Hashtags { hashtags })
            }
            TaskKind::ReferenceTagger => {
                let raw: TaggerResponse = ai_client::extract(model, &system, &user).await?;
                Ok(TaskOutput::ReferenceTags {
                    answer: Answer {
                        sub_answers: raw.sub_answers,
                        debug: Vec::new(),
                    },
                })
            }
        }
    }

    /// Static value substituted when retries are exhausted.
    pub fn fallback_output(&self) -> TaskOutput {
        match self {
            TaskKind::Keywords => TaskOutput::Keywords {
                keywords: Vec::new(),
                research_keyword: NOT_ACADEMIC_KEYWORD.to_string(),
            },
            TaskKind::Topics => TaskOutput::Topics { topics: Vec::new() },
            TaskKind::Hashtags => TaskOutput::Hashtags {
                hashtags: Vec::new(),
            },
            TaskKind::ReferenceTagger => TaskOutput::ReferenceTags {
                answer: Answer::default(),
            },
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A task's post-processed output.
#[derive(Debug, Clone)]
pub enum TaskOutput {
    Keywords {
        keywords: Vec<String>,
        research_keyword: String,
    },
    Topics {
        topics: Vec<String>,
    },
    ReferenceTags {
        answer: Answer,
    },
    Hashtags {
        hashtags: Vec<String>,
    },
}

/// One task invocation's outcome.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub kind: TaskKind,
    pub output: TaskOutput,
    /// `Some("fallback")` when retries were exhausted and the static
    /// fallback was substituted.
    pub errors: Option<String>,
}

fn clean_terms(terms: Vec<String>) -> Vec<String> {
    remove_dups_ordered(
        terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
    )
}

// --- Prompt templates ---

const KEYWORDS_SYSTEM: &str = "\
You are an assistant extracting keywords from social-media posts written by \
researchers. Return up to 6 keywords that characterize the post's subject \
matter, most salient first. Also set academic_keyword to exactly \"academic\" \
if the post concerns research content (papers, datasets, methods, scholarly \
discussion), or exactly \"not-academic\" otherwise.";

const TOPICS_SYSTEM: &str = "\
You are an assistant assigning topics to social-media posts written by \
researchers. Choose every topic from the allowed list that applies to the \
post. Return topics exactly as they appear in the list, nothing else.";

const HASHTAGS_SYSTEM: &str = "\
You are an assistant suggesting hashtags for social-media posts written by \
researchers. Return up to 5 short hashtags (without the leading #) a reader \
would use to find this post.";

const TAGGER_SYSTEM: &str = "\
You are an assistant annotating how a social-media post relates to the \
external resources it references. References appear in the post as <ref_n> \
tokens; quoted posts appear wrapped in <quoted ref_n>...</quoted>. For each \
sub_answer, explain your reasoning, then set final_answer to every allowed \
label that applies. Use only labels from the allowed list.";

const ZERO_REF_INSTRUCTIONS: &str = "\
The post references no external resources. Return exactly one sub_answer \
with ref_number 0 describing the post itself.";

const SINGLE_REF_INSTRUCTIONS: &str = "\
The post references one external resource, marked <ref_1>. Return exactly \
one sub_answer with ref_number 1.";

// --- Wire shapes ---

/// Accept a proper JSON array, a stringified JSON array, or null.
fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).map_err(de::Error::custom),
        serde_json::Value::String(ref s) => serde_json::from_str(s).map_err(de::Error::custom),
        serde_json::Value::Null => Ok(Vec::new()),
        _ => Err(de::Error::custom("expected an array or JSON string")),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct KeywordsResponse {
    /// Up to 6 keywords, most salient first.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub keywords: Vec<String>,
    /// Exactly "academic" or "not-academic".
    #[serde(default)]
    pub academic_keyword: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TopicsResponse {
    /// Topics drawn from the allowed list.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub topics: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HashtagsResponse {
    /// Hashtags without the leading #.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaggerResponse {
    /// One entry per <ref_n> reference token.
    #[serde(default)]
    pub sub_answers: Vec<SubAnswer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsense_common::ontology::PromptCase;

    fn rendered(case_refs: usize) -> RenderedThread {
        RenderedThread {
            content: "post body <ref_1>".to_string(),
            metadata_block: String::new(),
            case: PromptCase::for_reference_count(case_refs),
            reference_urls: (0..case_refs).map(|i| format!("https://r{i}.org")).collect(),
            metadata: Vec::new(),
        }
    }

    #[test]
    fn task_names_round_trip() {
        for kind in DEFAULT_ACTIVE_TASKS {
            assert_eq!(TaskKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(TaskKind::from_name("nope"), None);
    }

    #[test]
    fn tagger_prompt_carries_case_labels() {
        let ontology = Ontology::load();
        let (system, _) = TaskKind::ReferenceTagger.render_prompt(&rendered(0), &ontology);
        assert!(system.contains("references no external resources"));
        assert!(!system.contains("- disagrees:"));

        let (system, _) = TaskKind::ReferenceTagger.render_prompt(&rendered(2), &ontology);
        assert!(system.contains("references 2 external resources"));
        assert!(system.contains("- disagrees:"));
    }

    #[test]
    fn user_prompt_includes_metadata_block_when_present() {
        let ontology = Ontology::load();
        let mut r = rendered(1);
        r.metadata_block = "Reference metadata:\n<ref_1> (book): T".to_string();
        let (_, user) = TaskKind::Keywords.render_prompt(&r, &ontology);
        assert!(user.starts_with("Post:\npost body <ref_1>"));
        assert!(user.contains("Reference metadata:"));
    }

    #[test]
    fn keywords_response_accepts_stringified_array() {
        let raw: KeywordsResponse = serde_json::from_str(
            r#"{"keywords":"[\"ecology\",\"method\"]","academic_keyword":"academic"}"#,
        )
        .unwrap();
        assert_eq!(raw.keywords, vec!["ecology", "method"]);
    }

    #[test]
    fn keywords_response_accepts_null() {
        let raw: KeywordsResponse =
            serde_json::from_str(r#"{"keywords":null,"academic_keyword":""}"#).unwrap();
        assert!(raw.keywords.is_empty());
    }

    #[test]
    fn clean_terms_trims_and_dedups() {
        let terms = vec![
            " ecology ".to_string(),
            "ecology".to_string(),
            String::new(),
            "method".to_string(),
        ];
        assert_eq!(clean_terms(terms), vec!["ecology", "method"]);
    }

    #[test]
    fn fallback_outputs_are_empty() {
        match TaskKind::Keywords.fallback_output() {
            TaskOutput::Keywords {
                keywords,
                research_keyword,
            } => {
                assert!(keywords.is_empty());
                assert_eq!(research_keyword, NOT_ACADEMIC_KEYWORD);
            }
            _ => panic!("wrong variant"),
        }
        match TaskKind::ReferenceTagger.fallback_output() {
            TaskOutput::ReferenceTags { answer } => assert!(answer.sub_answers.is_empty()),
            _ => panic!("wrong variant"),
        }
    }
}

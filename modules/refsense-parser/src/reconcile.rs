//! Answer reconciliation for the reference tagging task.
//!
//! The model's claimed reference numbering is untrusted input; the canonical
//! reference list is the only source of truth. Reconciliation never fails —
//! every anomaly degrades to a logged warning plus a debug note, and a
//! corrected structure is always returned.

use std::collections::HashMap;

use tracing::warn;

use refsense_common::types::{Answer, SubAnswer};

/// Sentinel `ref_number` for the zero-reference case.
pub const NO_REFERENCE: i64 = -1;

const MISSING_ANSWER_NOTE: &str = "model did not answer for this reference";

/// Map a raw answer onto the canonical reference list: exactly
/// `max(1, refs.len())` sub-answers, `ref_number` re-keyed to the 0-indexed
/// canonical position (or -1 when there are no references), labels
/// normalized onto the allowed set.
pub fn reconcile_answer(raw: Answer, refs: &[String], allowed_labels: &[&str]) -> Answer {
    let mut debug = raw.debug;
    let mut sub_answers = Vec::with_capacity(refs.len().max(1));

    if refs.is_empty() {
        let mut iter = raw.sub_answers.into_iter();
        let mut sub = match iter.next() {
            Some(sub) => sub,
            None => {
                debug.push("model returned no sub-answer; synthesized an empty one".to_string());
                SubAnswer::empty(NO_REFERENCE, MISSING_ANSWER_NOTE)
            }
        };
        let extra = iter.count();
        if extra > 0 {
            warn!(extra, "Model returned multiple sub-answers for a zero-reference post");
            debug.push(format!(
                "expected one sub-answer for a zero-reference post, got {}; kept the first",
                extra + 1
            ));
        }
        sub.ref_number = NO_REFERENCE;
        sub.ref_url = None;
        sub.final_answer = normalize_labels(sub.final_answer, allowed_labels);
        sub_answers.push(sub);
    } else {
        // Claimed number → sub-answer; duplicates keep the first seen.
        let mut by_claim: HashMap<i64, SubAnswer> = HashMap::new();
        for sub in raw.sub_answers {
            if by_claim.contains_key(&sub.ref_number) {
                warn!(
                    ref_number = sub.ref_number,
                    "Duplicate sub-answer for claimed reference, keeping first"
                );
                debug.push(format!(
                    "duplicate sub-answer claiming reference {}; kept the first",
                    sub.ref_number
                ));
            } else {
                by_claim.insert(sub.ref_number, sub);
            }
        }

        for (i, url) in refs.iter().enumerate() {
            let claimed = i as i64 + 1;
            let mut sub = match by_claim.remove(&claimed) {
                Some(sub) => sub,
                None => {
                    warn!(reference = claimed, url, "Model skipped a reference");
                    debug.push(format!("synthesized empty sub-answer for reference {claimed}"));
                    SubAnswer::empty(0, MISSING_ANSWER_NOTE)
                }
            };
            sub.ref_number = i as i64;
            sub.ref_url = Some(url.clone());
            sub.final_answer = normalize_labels(sub.final_answer, allowed_labels);
            sub_answers.push(sub);
        }

        if !by_claim.is_empty() {
            let mut leftover: Vec<i64> = by_claim.into_keys().collect();
            leftover.sort_unstable();
            warn!(
                ?leftover,
                "Discarding sub-answers claiming out-of-range reference numbers"
            );
            debug.push(format!(
                "discarded sub-answers claiming out-of-range references {leftover:?}"
            ));
        }

        sub_answers.sort_by_key(|s| s.ref_number);
    }

    Answer { sub_answers, debug }
}

/// Character-only equivalence key: alphabetic chars, lowercased.
fn alpha_key(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Map free-text labels onto the closed allowed set. Matching ignores
/// everything except letters, so `"<Disagrees!>"` still lands on
/// `"disagrees"`. Labels with no match are dropped.
pub fn normalize_labels(labels: Vec<String>, allowed: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for label in labels {
        let key = alpha_key(&label);
        if key.is_empty() {
            continue;
        }
        match allowed.iter().find(|a| alpha_key(a) == key) {
            Some(a) => {
                let canonical = a.to_string();
                if !out.contains(&canonical) {
                    out.push(canonical);
                }
            }
            None => {
                warn!(label, "Dropping label outside the allowed set");
            }
        }
    }
    out
}

//! Single-post and batch orchestration.
//!
//! Metadata is fully resolved before any task dispatch begins, so the only
//! cross-post shared structure is read-only by the time it is shared. Task
//! invocations are the only other suspension points; everything else runs to
//! completion synchronously.

use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::ModelClient;
use refsense_common::ontology::Ontology;
use refsense_common::types::{CombinedOutput, Thread};
use refsense_common::urls::remove_dups_ordered;
use refsense_common::Config;

use crate::citoid::{backoff_delay, MetadataFetcher, MetadataResolver};
use crate::filter::classify;
use crate::output::build_combined_output;
use crate::prompt::{RenderedThread, ThreadRenderer};
use crate::reconcile::reconcile_answer;
use crate::tasks::{TaskKind, TaskOutput, TaskResult, DEFAULT_ACTIVE_TASKS};
use crate::trim::{trim_thread, TrimmedThread};

pub struct ThreadParser {
    model: Arc<dyn ModelClient>,
    resolver: MetadataResolver,
    ontology: Ontology,
    config: Config,
}

impl ThreadParser {
    pub fn new(
        model: Arc<dyn ModelClient>,
        fetcher: Arc<dyn MetadataFetcher>,
        config: Config,
    ) -> Self {
        let resolver = MetadataResolver::new(fetcher, config.max_summary_len);
        Self {
            model,
            resolver,
            ontology: Ontology::load(),
            config,
        }
    }

    /// Process one thread. All active tasks run concurrently; their joint
    /// completion is the barrier before post-processing.
    pub async fn process_thread(
        &self,
        thread: &Thread,
        active: Option<&[TaskKind]>,
    ) -> CombinedOutput {
        let active = active.unwrap_or(DEFAULT_ACTIVE_TASKS);
        let run_id = Uuid::new_v4();

        let trimmed = trim_thread(thread, self.config.max_chars);
        if !trimmed.unparsed_urls.is_empty() {
            info!(
                %run_id,
                dropped = trimmed.unparsed_urls.len(),
                "Trimming dropped references"
            );
        }

        let metadata = self.resolver.resolve(&trimmed.thread.reference_urls()).await;
        let renderer = ThreadRenderer::new(self.config.quoted_context_len);
        let rendered = renderer.render(&trimmed.thread, &metadata);
        info!(
            %run_id,
            case = %rendered.case,
            references = rendered.reference_urls.len(),
            tasks = active.len(),
            "Processing thread"
        );

        let results = join_all(
            active
                .iter()
                .map(|kind| self.invoke_with_retry(*kind, &rendered)),
        )
        .await;

        self.assemble(&trimmed, &rendered, results)
    }

    /// Process a batch. Metadata is resolved once for the union of every
    /// thread's references; the flattened thread × task work runs through one
    /// bounded-concurrency executor scoped to this call. Results preserve
    /// input order regardless of completion order.
    pub async fn process_batch(
        &self,
        threads: &[Thread],
        active: Option<&[TaskKind]>,
    ) -> Vec<CombinedOutput> {
        let active = active.unwrap_or(DEFAULT_ACTIVE_TASKS);
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            threads = threads.len(),
            tasks = active.len(),
            batch_size = self.config.batch_size,
            "Processing batch"
        );

        let trimmed: Vec<TrimmedThread> = threads
            .iter()
            .map(|t| trim_thread(t, self.config.max_chars))
            .collect();

        let mut all_refs = Vec::new();
        for t in &trimmed {
            all_refs.extend(t.thread.reference_urls());
        }
        let all_refs = remove_dups_ordered(all_refs);
        let metadata = self.resolver.resolve(&all_refs).await;

        let renderer = ThreadRenderer::new(self.config.quoted_context_len);
        let rendered: Vec<RenderedThread> = trimmed
            .iter()
            .map(|t| renderer.render(&t.thread, &metadata))
            .collect();

        let invocations = rendered
            .iter()
            .enumerate()
            .flat_map(|(i, r)| active.iter().map(move |kind| (i, *kind, r)));
        let results: Vec<(usize, TaskResult)> = stream::iter(
            invocations
                .map(|(i, kind, r)| async move { (i, self.invoke_with_retry(kind, r).await) }),
        )
        .buffer_unordered(self.config.batch_size.max(1))
        .collect()
        .await;

        // Input order restored here regardless of completion order.
        let mut per_thread: Vec<Vec<TaskResult>> = vec![Vec::new(); threads.len()];
        for (i, result) in results {
            per_thread[i].push(result);
        }

        trimmed
            .iter()
            .zip(rendered.iter())
            .zip(per_thread)
            .map(|((t, r), results)| self.assemble(t, r, results))
            .collect()
    }

    /// Bounded retry with exponential backoff; a task that exhausts its
    /// attempts degrades to its static fallback and never fails siblings.
    async fn invoke_with_retry(&self, kind: TaskKind, rendered: &RenderedThread) -> TaskResult {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 0..attempts {
            match kind
                .invoke(self.model.as_ref(), rendered, &self.ontology)
                .await
            {
                Ok(output) => {
                    return TaskResult {
                        kind,
                        output,
                        errors: None,
                    }
                }
                Err(e) => {
                    if attempt + 1 < attempts {
                        let backoff = backoff_delay(attempt);
                        warn!(
                            task = kind.name(),
                            attempt = attempt + 1,
                            backoff_secs = backoff.as_secs(),
                            error = %e,
                            "Task invocation failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                    } else {
                        warn!(
                            task = kind.name(),
                            error = %e,
                            "Task exhausted retries, substituting fallback"
                        );
                    }
                }
            }
        }
        TaskResult {
            kind,
            output: kind.fallback_output(),
            errors: Some("fallback".to_string()),
        }
    }

    fn assemble(
        &self,
        trimmed: &TrimmedThread,
        rendered: &RenderedThread,
        results: Vec<TaskResult>,
    ) -> CombinedOutput {
        let reconciled = results
            .iter()
            .find_map(|r| match &r.output {
                TaskOutput::ReferenceTags { answer } => Some(answer.clone()),
                _ => None,
            })
            .map(|answer| {
                let allowed = self.ontology.allowed_labels(rendered.case);
                reconcile_answer(answer, &rendered.reference_urls, &allowed)
            });

        let mut output = build_combined_output(
            rendered,
            trimmed.unparsed_urls.clone(),
            results,
            reconciled,
        );
        output.filter_classification = classify(&output);
        output
    }
}

//! Face-match batch orchestration.
//!
//! A search partitions the candidates into batches, and for each batch
//! fetches the candidate images, asks the oracle which ones show the
//! reference person, and keeps the confirmed IDs that were actually in the
//! batch. Batches run on a bounded pool (one at a time by default) and their
//! results are merged in batch order.
//!
//! Only a missing reference image fails the search. A candidate whose image
//! cannot be fetched is dropped from its batch; a batch whose oracle call
//! fails or returns unusable output contributes no matches. Both are logged
//! and counted in the [`MatchReport`].

use futures::future::join_all;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

use snapfind_core::{
    CandidatePhoto, EncodedImage, Error, ImageFetcher, MatchReport, OraclePrompt, ReferenceImage,
    Result, VisionOracle,
};
use snapfind_inference::{face_match_prompt, GeminiOracle, HttpImageFetcher, OracleVerdict};

use crate::batch::partition;
use crate::config::{FaceMatchConfig, MatcherConfig};

/// Upper bound for a single backoff delay.
const MAX_BACKOFF_MS: u64 = 10_000;

/// Finds the candidate photos that show the same person as a reference image.
///
/// Holds no per-search state; one instance serves any number of concurrent
/// searches.
pub struct FaceMatcher {
    oracle: Arc<dyn VisionOracle>,
    fetcher: Arc<dyn ImageFetcher>,
    config: MatcherConfig,
}

impl FaceMatcher {
    pub fn new(
        oracle: Arc<dyn VisionOracle>,
        fetcher: Arc<dyn ImageFetcher>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            oracle,
            fetcher,
            config,
        }
    }

    /// Build a matcher backed by the Gemini oracle and the HTTP image fetcher.
    pub fn from_config(config: FaceMatchConfig) -> Result<Self> {
        config.validate()?;
        let oracle = GeminiOracle::new(config.oracle)?;
        let fetcher = HttpImageFetcher::with_defaults()?;
        Ok(Self::new(Arc::new(oracle), Arc::new(fetcher), config.matcher))
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.oracle.model_name()
    }

    /// Check that the oracle is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        self.oracle.health_check().await
    }

    /// Decode a data-URL (or bare base64) reference once, then search.
    pub async fn search_data_url(
        &self,
        reference: Option<&str>,
        candidates: &[CandidatePhoto],
    ) -> Result<MatchReport> {
        let reference = reference
            .ok_or_else(|| Error::InvalidInput("No image provided".to_string()))
            .and_then(ReferenceImage::from_data_url)?;
        self.find_matches(Some(&reference), candidates).await
    }

    /// Run a face search over `candidates`.
    ///
    /// Fails only with `InvalidInput` when the reference image is missing or
    /// empty, before any network call is made.
    #[instrument(skip_all, fields(subsystem = "match", component = "orchestrator", op = "find_matches", candidate_count = candidates.len()))]
    pub async fn find_matches(
        &self,
        reference: Option<&ReferenceImage>,
        candidates: &[CandidatePhoto],
    ) -> Result<MatchReport> {
        let reference = reference
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Error::InvalidInput("No reference image provided".to_string()))?;

        let start = Instant::now();
        let deadline = start + Duration::from_millis(self.config.deadline_ms);

        let mut pending = partition(candidates, self.config.batch_size)
            .into_iter()
            .map(<[CandidatePhoto]>::to_vec)
            .enumerate()
            .collect::<Vec<_>>()
            .into_iter();

        let mut report = MatchReport {
            batches_total: pending.len(),
            ..Default::default()
        };
        if report.batches_total == 0 {
            debug!("No candidates to search");
            return Ok(report);
        }

        let runner = BatchRunner {
            oracle: self.oracle.clone(),
            fetcher: self.fetcher.clone(),
            reference: Arc::new(reference.clone()),
            request_timeout: Duration::from_millis(self.config.request_timeout_ms),
            max_retries: self.config.max_retries,
            retry_backoff_ms: self.config.retry_backoff_ms,
        };

        debug!(
            batches = report.batches_total,
            concurrency = self.config.max_concurrent_batches,
            "Starting face search"
        );

        let mut tasks = JoinSet::new();
        let mut spawn_next = |tasks: &mut JoinSet<BatchOutcome>| {
            if let Some((index, batch)) = pending.next() {
                let runner = runner.clone();
                tasks.spawn(async move { runner.run(index, batch).await });
            }
        };
        for _ in 0..self.config.max_concurrent_batches.max(1) {
            spawn_next(&mut tasks);
        }

        let mut outcomes = Vec::with_capacity(report.batches_total);
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(outcome))) => {
                    outcomes.push(outcome);
                    spawn_next(&mut tasks);
                }
                Ok(Some(Err(e))) => {
                    error!(error = ?e, "Batch task panicked");
                    report.batches_attempted += 1;
                    report.batches_failed += 1;
                    spawn_next(&mut tasks);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        deadline_ms = self.config.deadline_ms,
                        completed = outcomes.len(),
                        in_flight = tasks.len(),
                        "Face search deadline exceeded, abandoning remaining batches"
                    );
                    report.deadline_exceeded = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        outcomes.sort_by_key(|o| o.index);
        for outcome in outcomes {
            report.batches_attempted += 1;
            report.candidates_skipped += outcome.skipped;
            if outcome.failed {
                report.batches_failed += 1;
            }
            report.matches.extend(outcome.matches);
        }

        info!(
            candidate_count = candidates.len(),
            batches = report.batches_total,
            batches_failed = report.batches_failed,
            candidates_skipped = report.candidates_skipped,
            match_count = report.matches.len(),
            degraded = report.is_degraded(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Face search complete"
        );
        if report.is_total_failure() {
            error!(
                batches = report.batches_attempted,
                "Every face-match batch failed"
            );
        }

        Ok(report)
    }
}

/// What one batch contributed.
#[derive(Debug)]
struct BatchOutcome {
    index: usize,
    matches: Vec<CandidatePhoto>,
    skipped: usize,
    failed: bool,
}

/// Everything a spawned batch task needs, cloned per task.
#[derive(Clone)]
struct BatchRunner {
    oracle: Arc<dyn VisionOracle>,
    fetcher: Arc<dyn ImageFetcher>,
    reference: Arc<ReferenceImage>,
    request_timeout: Duration,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl BatchRunner {
    async fn run(self, index: usize, batch: Vec<CandidatePhoto>) -> BatchOutcome {
        let fetched = join_all(batch.iter().map(|photo| self.fetcher.fetch(&photo.url))).await;

        let mut skipped = 0;
        let mut shown: Vec<(&CandidatePhoto, EncodedImage)> = Vec::with_capacity(batch.len());
        for (photo, result) in batch.iter().zip(fetched) {
            match result {
                Ok(image) => {
                    trace!(batch_index = index, candidate_id = %photo.id, "Candidate image fetched");
                    shown.push((photo, image));
                }
                Err(e) => {
                    warn!(batch_index = index, candidate_id = %photo.id, error = %e, "Skipping candidate whose image could not be fetched");
                    skipped += 1;
                }
            }
        }

        let mut outcome = BatchOutcome {
            index,
            matches: Vec::new(),
            skipped,
            failed: false,
        };
        if shown.is_empty() {
            debug!(batch_index = index, "No candidate images in batch, skipping oracle call");
            return outcome;
        }

        let prompt = face_match_prompt(&self.reference, &shown);
        match self.ask(index, &prompt).await {
            Ok(OracleVerdict::Parsed { matched_ids }) => {
                let named: HashSet<&str> = matched_ids.iter().map(String::as_str).collect();
                outcome.matches = shown
                    .iter()
                    .filter(|(photo, _)| named.contains(photo.id.as_str()))
                    .map(|(photo, _)| (*photo).clone())
                    .collect();

                let unknown = named.len()
                    - shown
                        .iter()
                        .map(|(p, _)| p.id.as_str())
                        .collect::<HashSet<_>>()
                        .intersection(&named)
                        .count();
                if unknown > 0 {
                    warn!(batch_index = index, unknown, "Oracle named candidates not in the batch, ignoring them");
                }
                debug!(batch_index = index, batch_size = shown.len(), match_count = outcome.matches.len(), "Batch complete");
            }
            Ok(OracleVerdict::Unparsable { raw_text }) => {
                warn!(batch_index = index, response_len = raw_text.len(), response = %truncate(&raw_text, 200), "Oracle response could not be parsed, batch contributes no matches");
                outcome.failed = true;
            }
            Err(e) => {
                warn!(batch_index = index, error = %e, "Oracle call failed, batch contributes no matches");
                outcome.failed = true;
            }
        }
        outcome
    }

    /// Call the oracle with a per-call timeout, retrying transient failures.
    async fn ask(&self, index: usize, prompt: &OraclePrompt) -> Result<OracleVerdict> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.request_timeout, self.oracle.generate(prompt)).await {
                Ok(result) => result,
                Err(_) => Err(Error::OracleUnavailable(format!(
                    "No response within {}ms",
                    self.request_timeout.as_millis()
                ))),
            };

            match result {
                Ok(text) => return Ok(OracleVerdict::parse(&text)),
                Err(e) if e.is_transient() && attempt <= self.max_retries => {
                    let delay = backoff_delay(self.retry_backoff_ms, attempt);
                    warn!(batch_index = index, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Transient oracle failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff with up to 50% jitter, capped at `MAX_BACKOFF_MS`.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
    let jitter = rand::thread_rng().gen_range(0..=exp / 2);
    Duration::from_millis(exp.saturating_add(jitter).min(MAX_BACKOFF_MS))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

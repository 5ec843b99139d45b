//! Batch pre-generation of fusion payloads
//!
//! Composes payloads for common persona configurations ahead of time.
//! Jobs run on tokio tasks bounded by a semaphore; every job reports its own
//! outcome and a failing job never aborts the rest of the batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogLookup, PersonaSelection};
use crate::difficulty::{self, DifficultyTier};
use crate::error::{Error, Result};

use super::composer::{Composer, FocusArea, FusionPromptBlock, FusionRequest};
use super::prompt::render_client_instructions;

// ─────────────────────────────────────────────────────────────────
// Jobs
// ─────────────────────────────────────────────────────────────────

/// One configuration to pre-generate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PregenJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub selection: PersonaSelection,
    pub age: u32,
    pub industry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<FocusArea>,
    /// Untyped difficulty hint, normalized like any session input.
    #[serde(default)]
    pub difficulty: serde_json::Value,
}

impl PregenJob {
    /// Name used in reports: the job's own name or its batch position.
    pub fn label(&self, index: usize) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("#{}", index + 1), str::to_string)
    }
}

/// A successfully pre-generated payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PregenOutput {
    pub fingerprint: String,
    pub tier: DifficultyTier,
    pub block: FusionPromptBlock,
    pub instructions: String,
}

/// Outcome of one job, in batch order.
#[derive(Debug)]
pub struct PregenResult {
    pub index: usize,
    pub job: String,
    pub outcome: Result<PregenOutput>,
}

/// Resolve and compose a single job.
pub fn compose_job(catalog: &dyn CatalogLookup, composer: &Composer, job: &PregenJob) -> Result<PregenOutput> {
    let persona = catalog.resolve(&job.selection)?;
    let request = FusionRequest::new(job.age, &persona, &job.industry)
        .with_subcategory(job.subcategory.as_deref())
        .with_focus_areas(&job.focus_areas);
    let block = composer.compose(&request);
    let tier = difficulty::normalize_value(&job.difficulty);

    Ok(PregenOutput {
        fingerprint: block.fingerprint(),
        tier,
        instructions: render_client_instructions(&block, tier),
        block,
    })
}

// ─────────────────────────────────────────────────────────────────
// Tracker
// ─────────────────────────────────────────────────────────────────

/// State of one job within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug)]
struct JobRecord {
    label: String,
    state: JobState,
    started_at: Option<Instant>,
    completed_at: Option<Instant>,
}

/// Tracks job states and concurrency for one batch run.
#[derive(Debug, Default)]
pub struct PregenTracker {
    jobs: RwLock<HashMap<usize, JobRecord>>,
    running: RwLock<(usize, usize)>,
}

impl PregenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, index: usize, label: &str) {
        self.jobs.write().insert(
            index,
            JobRecord {
                label: label.to_string(),
                state: JobState::Queued,
                started_at: None,
                completed_at: None,
            },
        );
    }

    fn mark_running(&self, index: usize) {
        if let Some(record) = self.jobs.write().get_mut(&index) {
            record.state = JobState::Running;
            record.started_at = Some(Instant::now());
        }
        let mut running = self.running.write();
        running.0 += 1;
        running.1 = running.1.max(running.0);
    }

    fn mark_finished(&self, index: usize, success: bool) {
        let mut jobs = self.jobs.write();
        if let Some(record) = jobs.get_mut(&index) {
            if record.state == JobState::Running {
                let mut running = self.running.write();
                running.0 = running.0.saturating_sub(1);
            }
            record.state = if success { JobState::Completed } else { JobState::Failed };
            record.completed_at = Some(Instant::now());
        }
    }

    pub fn state(&self, index: usize) -> Option<JobState> {
        self.jobs.read().get(&index).map(|r| r.state)
    }

    pub fn count(&self, state: JobState) -> usize {
        self.jobs.read().values().filter(|r| r.state == state).count()
    }

    /// Highest number of jobs observed running at once.
    pub fn peak_running(&self) -> usize {
        self.running.read().1
    }

    /// Labels of failed jobs, in batch order.
    pub fn failed_labels(&self) -> Vec<String> {
        let jobs = self.jobs.read();
        let mut failed: Vec<(usize, String)> = jobs
            .iter()
            .filter(|(_, r)| r.state == JobState::Failed)
            .map(|(i, r)| (*i, r.label.clone()))
            .collect();
        failed.sort_by_key(|(i, _)| *i);
        failed.into_iter().map(|(_, label)| label).collect()
    }

    /// Wall-clock milliseconds a job spent running.
    pub fn execution_time_ms(&self, index: usize) -> Option<u64> {
        let jobs = self.jobs.read();
        let record = jobs.get(&index)?;
        match (record.started_at, record.completed_at) {
            (Some(start), Some(end)) => Some((end - start).as_millis() as u64),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────

/// Outcomes of a whole batch.
#[derive(Debug)]
pub struct PregenReport {
    pub results: Vec<PregenResult>,
    pub peak_running: usize,
}

impl PregenReport {
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.completed()
    }

    /// JSON-ready view: one entry per job with either output or error.
    pub fn entries(&self) -> Vec<PregenEntry<'_>> {
        self.results
            .iter()
            .map(|r| match &r.outcome {
                Ok(output) => PregenEntry {
                    job: &r.job,
                    ok: true,
                    output: Some(output),
                    error: None,
                },
                Err(e) => PregenEntry {
                    job: &r.job,
                    ok: false,
                    output: None,
                    error: Some(PregenError {
                        code: e.code().as_str(),
                        message: e.to_string(),
                    }),
                },
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct PregenEntry<'a> {
    pub job: &'a str,
    pub ok: bool,
    #[serde(flatten)]
    pub output: Option<&'a PregenOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PregenError>,
}

#[derive(Debug, Serialize)]
pub struct PregenError {
    pub code: String,
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────
// Pregenerator
// ─────────────────────────────────────────────────────────────────

/// Runs batches of composition jobs concurrently.
pub struct Pregenerator {
    catalog: Arc<dyn CatalogLookup>,
    composer: Arc<Composer>,
    max_concurrent: usize,
}

impl Pregenerator {
    /// `max_concurrent` of 0 uses one slot per CPU.
    pub fn new(catalog: Arc<dyn CatalogLookup>, composer: Composer, max_concurrent: usize) -> Self {
        let max_concurrent = if max_concurrent == 0 {
            num_cpus::get().max(1)
        } else {
            max_concurrent
        };
        Self {
            catalog,
            composer: Arc::new(composer),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub async fn run(&self, jobs: Vec<PregenJob>) -> PregenReport {
        self.run_tracked(jobs, Arc::new(PregenTracker::new())).await
    }

    /// Run a batch, recording progress in a caller-held tracker.
    pub async fn run_tracked(&self, jobs: Vec<PregenJob>, tracker: Arc<PregenTracker>) -> PregenReport {
        let total = jobs.len();
        info!(jobs = total, max_concurrent = self.max_concurrent, "Starting pre-generation batch");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(total);

        for (index, job) in jobs.into_iter().enumerate() {
            let label = job.label(index);
            tracker.add(index, &label);

            let catalog = self.catalog.clone();
            let composer = self.composer.clone();
            let semaphore = semaphore.clone();
            let tracker_task = tracker.clone();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = semaphore.acquire_owned().await.ok();
                tracker_task.mark_running(index);
                let outcome = compose_job(catalog.as_ref(), &composer, &job);
                tracker_task.mark_finished(index, outcome.is_ok());
                outcome
            });
            handles.push((index, label, handle));
        }

        let mut results = Vec::with_capacity(total);
        for (index, label, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracker.mark_finished(index, false);
                    Err(Error::PregenJobAborted {
                        job: label.clone(),
                        message: e.to_string(),
                    })
                }
            };

            match &outcome {
                Ok(output) => {
                    debug!(job = %label, fingerprint = %output.fingerprint, "Payload pre-generated");
                }
                Err(e) => {
                    warn!(job = %label, error = %e.format_for_log(), "Pre-generation job failed");
                }
            }
            results.push(PregenResult {
                index,
                job: label,
                outcome,
            });
        }

        let report = PregenReport {
            results,
            peak_running: tracker.peak_running(),
        };
        info!(
            completed = report.completed(),
            failed = report.failed(),
            "Pre-generation batch finished"
        );
        report
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

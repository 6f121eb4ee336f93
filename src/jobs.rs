// THEORY:
// The `jobs` module is the in-process side of the job control surface. Callers
// submit a frame source with analysis parameters, get an id back straight away,
// and poll that id until the run finishes. A completed run is written out as CSV
// and the status hands back a locator for it.
//
// Key architectural principles:
// 1.  **One Runner Per Job**: Every submission gets its own `PipelineRunner`. Runners
//     share nothing, so jobs run side by side without coordination. Each runner's
//     loop runs on tokio's blocking pool, because pulling frames may block on decode.
// 2.  **Bounded Parallelism**: A semaphore caps how many runners decode and analyze at
//     once. A job waiting for a slot reports `Pending`.
// 3.  **Status Is Derived, Not Stored**: While a job runs, its status is read straight
//     from the runner's progress channel. Only the terminal status is stored, after the
//     result has been persisted.
// 4.  **State Mapping**: Running -> Processing, Completed -> Done (with a locator),
//     Failed -> Failed (with the frame index and error kind), Cancelled -> Cancelled.
// 5.  **Explicit Release**: A finished job keeps its status and frame results until the
//     caller forgets it. Task handles of finished jobs are dropped on the next submit.

use crate::core_modules::frame_analyzer::AnalysisParams;
use crate::error::JobError;
use crate::export::{CsvOptions, write_csv};
use crate::frame_source::FrameSource;
use crate::pipeline::{
    CancelHandle, PipelineOutcome, PipelineResult, PipelineRunner, PipelineState, Progress,
};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identifies a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a finished job's CSV can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultLocator(PathBuf);

impl ResultLocator {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ResultLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// What a poller sees.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Processing { processed: u64, total: Option<u64> },
    Done { locator: ResultLocator },
    Failed {
        /// The frame that failed, or `None` when the run itself broke down.
        frame_index: Option<u64>,
        kind: &'static str,
        message: String,
    },
    Cancelled { processed: u64 },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Done { .. } | JobStatus::Failed { .. } | JobStatus::Cancelled { .. }
        )
    }

    fn from_progress(progress: &Progress) -> Self {
        match progress.state {
            PipelineState::Idle => JobStatus::Pending,
            // Terminal but not yet persisted still counts as processing.
            _ => JobStatus::Processing {
                processed: progress.processed,
                total: progress.total,
            },
        }
    }
}

struct Finished {
    status: JobStatus,
    result: PipelineResult,
}

struct JobEntry {
    progress: watch::Receiver<Progress>,
    cancel: CancelHandle,
    done: watch::Receiver<bool>,
    finished: Option<Finished>,
}

type JobTable = Arc<RwLock<HashMap<JobId, JobEntry>>>;

/// Runs pipelines as background jobs and tracks their status.
pub struct JobRegistry {
    jobs: JobTable,
    limiter: Arc<Semaphore>,
    results_dir: PathBuf,
    csv: CsvOptions,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl JobRegistry {
    pub fn new(results_dir: impl Into<PathBuf>, max_concurrent: usize, csv: CsvOptions) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            results_dir: results_dir.into(),
            csv,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Starts a job in the background. Must be called from within a tokio runtime.
    pub async fn submit<S>(&self, source: S, params: AnalysisParams) -> JobId
    where
        S: FrameSource + Send + 'static,
    {
        let id = JobId::new();
        let runner = PipelineRunner::new(params);
        let (done_tx, done_rx) = watch::channel(false);

        self.jobs.write().await.insert(
            id,
            JobEntry {
                progress: runner.subscribe(),
                cancel: runner.cancel_handle(),
                done: done_rx,
                finished: None,
            },
        );
        info!(
            job = %id,
            target_color = %params.target,
            threshold = params.threshold.value(),
            "job submitted"
        );

        let jobs = Arc::clone(&self.jobs);
        let limiter = Arc::clone(&self.limiter);
        let results_dir = self.results_dir.clone();
        let csv = self.csv;

        let handle = tokio::spawn(async move {
            // The semaphore is never closed, so a permit always arrives eventually.
            let _permit = limiter.acquire_owned().await;
            let run = move || finish(id, runner.run(source), &results_dir, &csv);
            let finished = match tokio::task::spawn_blocking(run).await {
                Ok(finished) => finished,
                Err(join_error) => {
                    error!(job = %id, %join_error, "pipeline task aborted");
                    Finished {
                        status: JobStatus::Failed {
                            frame_index: None,
                            kind: "Aborted",
                            message: join_error.to_string(),
                        },
                        result: PipelineResult::default(),
                    }
                }
            };

            if let Some(entry) = jobs.write().await.get_mut(&id) {
                entry.finished = Some(finished);
            }
            let _ = done_tx.send(true);
        });
        let mut handles = self.handles.lock().await;
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);

        id
    }

    pub async fn poll(&self, id: JobId) -> Result<JobStatus, JobError> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(&id)
            .ok_or_else(|| JobError::UnknownJob(id.to_string()))?;
        Ok(match &entry.finished {
            Some(finished) => finished.status.clone(),
            None => JobStatus::from_progress(&entry.progress.borrow()),
        })
    }

    /// Asks a job to stop at its next frame boundary. Finished jobs are unaffected.
    pub async fn cancel(&self, id: JobId) -> Result<(), JobError> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(&id)
            .ok_or_else(|| JobError::UnknownJob(id.to_string()))?;
        entry.cancel.cancel();
        info!(job = %id, "job cancellation requested");
        Ok(())
    }

    /// Resolves once the job has a terminal status, and returns it.
    pub async fn wait(&self, id: JobId) -> Result<JobStatus, JobError> {
        let mut done = {
            let jobs = self.jobs.read().await;
            let entry = jobs
                .get(&id)
                .ok_or_else(|| JobError::UnknownJob(id.to_string()))?;
            entry.done.clone()
        };
        if done.wait_for(|finished| *finished).await.is_err() {
            warn!(job = %id, "job task ended without reporting");
        }
        self.poll(id).await
    }

    /// The frames a finished job analyzed, including partial output from failed or
    /// cancelled runs. `None` while the job is still going.
    pub async fn partial_result(&self, id: JobId) -> Result<Option<PipelineResult>, JobError> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(&id)
            .ok_or_else(|| JobError::UnknownJob(id.to_string()))?;
        Ok(entry.finished.as_ref().map(|f| f.result.clone()))
    }

    /// Drops a finished job from the registry and returns its final status. The CSV
    /// of a `Done` job stays on disk and can still be fetched by its locator.
    pub async fn forget(&self, id: JobId) -> Result<JobStatus, JobError> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs
            .get(&id)
            .ok_or_else(|| JobError::UnknownJob(id.to_string()))?;
        if entry.finished.is_none() {
            return Err(JobError::StillRunning(id.to_string()));
        }
        let status = jobs
            .remove(&id)
            .and_then(|entry| entry.finished)
            .map(|finished| finished.status)
            .ok_or_else(|| JobError::UnknownJob(id.to_string()))?;
        debug!(job = %id, "job forgotten");
        Ok(status)
    }

    /// Reads the CSV a `Done` status points at.
    pub async fn fetch(&self, locator: &ResultLocator) -> Result<String, JobError> {
        match tokio::fs::read_to_string(locator.path()).await {
            Ok(csv) => Ok(csv),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(JobError::UnknownLocator(locator.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Cancels every job and waits for all of them to wind down.
    pub async fn shutdown(&self) {
        for entry in self.jobs.read().await.values() {
            entry.cancel.cancel();
        }
        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for joined in futures::future::join_all(handles).await {
            if let Err(join_error) = joined {
                warn!(%join_error, "job task did not shut down cleanly");
            }
        }
    }
}

// Runs on the blocking pool right after the pipeline, so the CSV is written with plain
// file I/O.
fn finish(id: JobId, outcome: PipelineOutcome, results_dir: &Path, csv: &CsvOptions) -> Finished {
    let processed = outcome.result.len() as u64;
    let status = match &outcome.state {
        PipelineState::Completed => match persist(id, &outcome.result, results_dir, csv) {
            Ok(locator) => {
                info!(job = %id, frames = processed, %locator, "job done");
                JobStatus::Done { locator }
            }
            Err(err) => {
                error!(job = %id, %err, "could not write job result");
                JobStatus::Failed {
                    frame_index: None,
                    kind: "ResultWriteError",
                    message: err.to_string(),
                }
            }
        },
        PipelineState::Failed { frame_index, error } => JobStatus::Failed {
            frame_index: Some(*frame_index),
            kind: error.kind(),
            message: error.to_string(),
        },
        PipelineState::Cancelled => JobStatus::Cancelled { processed },
        PipelineState::Idle | PipelineState::Running => JobStatus::Failed {
            frame_index: None,
            kind: "Aborted",
            message: format!("pipeline stopped in non-terminal state {:?}", outcome.state),
        },
    };

    Finished {
        status,
        result: outcome.result,
    }
}

fn persist(
    id: JobId,
    result: &PipelineResult,
    results_dir: &Path,
    csv: &CsvOptions,
) -> Result<ResultLocator, JobError> {
    std::fs::create_dir_all(results_dir)?;
    let path = results_dir.join(format!("{id}.csv"));
    write_csv(BufWriter::new(File::create(&path)?), result, csv)?;
    Ok(ResultLocator(path))
}

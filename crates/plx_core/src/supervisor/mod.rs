//! Worker process supervision.
//!
//! One supervising task per running job. It spawns the external worker,
//! accumulates the stdout payload, feeds stderr through the progress
//! parser, and drives the job record through exactly one terminal
//! transition. All record mutation goes through the store's guarded
//! mutators, so a worker that keeps emitting after cancellation can no
//! longer touch its job.

mod command;

pub use command::{ProcessLauncher, WorkerCommand, WorkerLauncher};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::oneshot;

use crate::config::WorkerSettings;
use crate::errors::{JobError, JobResult};
use crate::events::{EventBus, JobEvent};
use crate::models::{Job, JobStatus};
use crate::progress::{ProgressParser, ProgressSignal};
use crate::store::JobStore;

/// Read buffer size for the diagnostic stream.
const STDERR_CHUNK: usize = 4096;

/// Trailing diagnostic bytes preserved for failure messages.
const DIAGNOSTIC_TAIL_LIMIT: usize = 2048;

/// Parsed shape of the worker's final stdout payload.
#[derive(Debug, Default, Deserialize)]
struct WorkerReport {
    #[serde(default)]
    transcripts: HashMap<String, String>,
    #[serde(default)]
    successful: u32,
    #[serde(default)]
    failed: u32,
}

/// Termination handle for one job's running worker.
struct ActiveWorker {
    kill_tx: oneshot::Sender<()>,
}

/// Spawns, streams, and terminates worker processes, one per job.
pub struct WorkerSupervisor {
    store: Arc<JobStore>,
    bus: EventBus,
    settings: WorkerSettings,
    launcher: Arc<dyn WorkerLauncher>,
    active: Arc<Mutex<HashMap<String, ActiveWorker>>>,
}

impl WorkerSupervisor {
    /// Create a supervisor that launches real worker processes.
    pub fn new(store: Arc<JobStore>, bus: EventBus, settings: WorkerSettings) -> Self {
        Self {
            store,
            bus,
            settings,
            launcher: Arc::new(ProcessLauncher),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Substitute a custom launcher (builder pattern).
    pub fn with_launcher(mut self, launcher: Arc<dyn WorkerLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Start the worker for a pending job.
    ///
    /// Fails with `JobNotFound` for an unknown id and `NotStartable` for
    /// a job that is already processing or terminal. Everything after the
    /// spawn happens asynchronously; later worker failures surface through
    /// the job record and the `failed` event, not through this call.
    pub fn start(&self, job_id: &str) -> JobResult<()> {
        let job = self.store.try_promote(job_id)?;

        tracing::info!(
            job_id,
            owner_id = %job.owner_id,
            strategy = %job.options.strategy,
            items = job.items.len(),
            "starting worker"
        );
        self.bus.publish(JobEvent::Started {
            job_id: job.id.clone(),
            owner_id: job.owner_id.clone(),
        });

        let command = WorkerCommand::for_job(&job, &self.settings);
        let (kill_tx, kill_rx) = oneshot::channel();
        self.active
            .lock()
            .insert(job.id.clone(), ActiveWorker { kill_tx });

        let task = SupervisionTask {
            store: Arc::clone(&self.store),
            bus: self.bus.clone(),
            launcher: Arc::clone(&self.launcher),
            active: Arc::clone(&self.active),
            max_duration: match self.settings.max_job_duration_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };
        tokio::spawn(task.run(job, command, kill_rx));

        Ok(())
    }

    /// Cancel a job, terminating its worker if one is running.
    ///
    /// The termination signal is fired and the job is marked cancelled
    /// immediately; the worker is reaped in the background. Cancelling a
    /// job that already reached another terminal state is a no-op.
    pub fn cancel(&self, job_id: &str) -> JobResult<()> {
        // Validate existence before touching anything.
        let _ = self.store.get(job_id)?;

        if let Some(worker) = self.active.lock().remove(job_id) {
            let _ = worker.kill_tx.send(());
        }

        match self.store.finalize(job_id, JobStatus::Cancelled, |_| {}) {
            Some(job) => {
                tracing::info!(job_id, "job cancelled");
                self.bus.publish(JobEvent::Cancelled {
                    job_id: job.id,
                    owner_id: job.owner_id,
                });
            }
            None => tracing::debug!(job_id, "cancel ignored for terminal job"),
        }
        Ok(())
    }

    /// Number of jobs with a live worker entry.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

/// How the supervised worker came to an end.
enum ExitOutcome {
    Exited { success: bool, code: i32 },
    Cancelled,
    TimedOut,
}

/// Per-job supervising task state.
struct SupervisionTask {
    store: Arc<JobStore>,
    bus: EventBus,
    launcher: Arc<dyn WorkerLauncher>,
    active: Arc<Mutex<HashMap<String, ActiveWorker>>>,
    max_duration: Option<Duration>,
}

impl SupervisionTask {
    async fn run(self, job: Job, command: WorkerCommand, kill_rx: oneshot::Receiver<()>) {
        tracing::debug!(job_id = %job.id, command = %command, "spawning worker");

        let mut child = match self.launcher.spawn(&command) {
            Ok(child) => child,
            Err(e) => {
                self.active.lock().remove(&job.id);
                self.fail(&job.id, JobError::Spawn { source: e }.to_string());
                return;
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_task = tokio::spawn(read_all(stdout));
        let stderr_task = tokio::spawn(pump_diagnostics(
            Arc::clone(&self.store),
            self.bus.clone(),
            job.clone(),
            stderr,
        ));

        let outcome = self.await_exit(&mut child, kill_rx).await;

        // Both streams reach EOF once the worker is gone; every diagnostic
        // update must land before the terminal transition below.
        let raw_output = stdout_task.await.unwrap_or_default();
        let stderr_tail = stderr_task.await.unwrap_or_default();

        self.active.lock().remove(&job.id);

        match outcome {
            ExitOutcome::Cancelled => {
                // cancel() already finalized the record; remaining worker
                // output is discarded by the terminal-state guards.
                tracing::debug!(job_id = %job.id, "worker terminated after cancellation");
            }
            ExitOutcome::TimedOut => {
                let secs = self.max_duration.map(|d| d.as_secs()).unwrap_or_default();
                self.fail(
                    &job.id,
                    format!("worker exceeded the {}s execution ceiling", secs),
                );
            }
            ExitOutcome::Exited { success: true, .. } => {
                match serde_json::from_slice::<WorkerReport>(&raw_output) {
                    Ok(report) => self.complete(&job.id, report),
                    Err(e) => self.fail(&job.id, JobError::output_parse(e.to_string()).to_string()),
                }
            }
            ExitOutcome::Exited { code, .. } => {
                let detail = if stderr_tail.trim().is_empty() {
                    "no diagnostic output".to_string()
                } else {
                    stderr_tail.trim().to_string()
                };
                self.fail(&job.id, JobError::worker_failed(code, detail).to_string());
            }
        }
    }

    async fn await_exit(&self, child: &mut Child, mut kill_rx: oneshot::Receiver<()>) -> ExitOutcome {
        let ceiling = async {
            match self.max_duration {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        // The wait future borrows the child, so the kill happens after the
        // select resolves, not inside the other arms.
        let interrupted = tokio::select! {
            status = child.wait() => {
                return match status {
                    Ok(status) => ExitOutcome::Exited {
                        success: status.success(),
                        code: status.code().unwrap_or(-1),
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "failed waiting on worker");
                        ExitOutcome::Exited { success: false, code: -1 }
                    }
                };
            }
            _ = &mut kill_rx => ExitOutcome::Cancelled,
            _ = ceiling => ExitOutcome::TimedOut,
        };

        let _ = child.start_kill();
        let _ = child.wait().await;
        interrupted
    }

    /// Accept the worker's report and finalize the job as completed.
    fn complete(&self, job_id: &str, report: WorkerReport) {
        let finalized = self.store.finalize(job_id, JobStatus::Completed, |job| {
            job.results = report.transcripts;
            job.succeeded_count = report.successful;
            job.failed_count = report.failed;
            job.progress = 100;
        });

        match finalized {
            Some(job) => {
                tracing::info!(
                    job_id,
                    succeeded = job.succeeded_count,
                    failed = job.failed_count,
                    "job completed"
                );
                self.bus.publish(JobEvent::Completed {
                    job_id: job.id.clone(),
                    owner_id: job.owner_id.clone(),
                    succeeded_count: job.succeeded_count,
                    failed_count: job.failed_count,
                    results: job.results,
                });
            }
            None => tracing::debug!(job_id, "discarding completion for terminal job"),
        }
    }

    /// Record a failure diagnostic and finalize the job as failed.
    fn fail(&self, job_id: &str, detail: String) {
        let finalized = self.store.finalize(job_id, JobStatus::Failed, |job| {
            job.error_log.push(detail.clone());
        });

        match finalized {
            Some(job) => {
                tracing::warn!(job_id, error = %detail, "job failed");
                self.bus.publish(JobEvent::Failed {
                    job_id: job.id,
                    owner_id: job.owner_id,
                    error: detail,
                });
            }
            None => tracing::debug!(job_id, "discarding failure for terminal job"),
        }
    }
}

/// Accumulate the worker's primary output stream until EOF.
///
/// The stream carries one final JSON payload, not an incremental protocol,
/// so nothing is interpreted until the process exits.
async fn read_all(stdout: Option<ChildStdout>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stdout) = stdout {
        if let Err(e) = stdout.read_to_end(&mut buf).await {
            tracing::warn!(error = %e, "primary output stream read failed");
        }
    }
    buf
}

/// Feed the diagnostic stream through the progress parser, applying each
/// signal to the job record and publishing progress events. Returns a
/// bounded tail of the raw stream for failure diagnostics.
async fn pump_diagnostics(
    store: Arc<JobStore>,
    bus: EventBus,
    job: Job,
    stderr: Option<ChildStderr>,
) -> String {
    let mut tail = String::new();
    let Some(mut stderr) = stderr else {
        return tail;
    };

    let mut parser = ProgressParser::new();
    let mut buf = [0u8; STDERR_CHUNK];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                push_tail(&mut tail, &String::from_utf8_lossy(&buf[..n]));
                for signal in parser.feed(&buf[..n]) {
                    apply_signal(&store, &bus, &job, signal);
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "diagnostic stream read failed");
                break;
            }
        }
    }
    if let Some(signal) = parser.finish() {
        apply_signal(&store, &bus, &job, signal);
    }
    tail
}

fn apply_signal(store: &JobStore, bus: &EventBus, job: &Job, signal: ProgressSignal) {
    match signal {
        ProgressSignal::Processed { processed, .. } => {
            if let Some(updated) = store.update_if_active(&job.id, |j| j.record_progress(processed))
            {
                bus.publish(JobEvent::Progress {
                    job_id: updated.id.clone(),
                    owner_id: updated.owner_id.clone(),
                    progress: updated.progress,
                    processed_count: updated.processed_count,
                    total_count: updated.total_count(),
                });
            }
        }
        ProgressSignal::ItemSucceeded => {
            store.update_if_active(&job.id, |j| j.succeeded_count += 1);
        }
        ProgressSignal::ItemFailed => {
            store.update_if_active(&job.id, |j| j.failed_count += 1);
        }
    }
}

/// Append to the diagnostic tail, keeping only the trailing bytes.
fn push_tail(tail: &mut String, chunk: &str) {
    tail.push_str(chunk);
    if tail.len() > DIAGNOSTIC_TAIL_LIMIT {
        let mut cut = tail.len() - DIAGNOSTIC_TAIL_LIMIT;
        while !tail.is_char_boundary(cut) {
            cut += 1;
        }
        tail.drain(..cut);
    }
}

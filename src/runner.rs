//! The batch loop: resume check, retries with backoff, artifacts, ledger.
//!
//! Items are processed strictly one at a time in index order. For a
//! successful item both artifact files are renamed into place before its
//! `OK` row is appended, so any row in the ledger points at complete files.
//! A failing item ends in a `FAILED` row and the batch moves on.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backoff::{BackoffController, BackoffPolicy, secs_to_duration};
use crate::config::RunConfig;
use crate::error::{AttemptError, ItemError, PdgError};
use crate::generation::Generator;
use crate::state_machine::{AttemptOutcome, ItemRun, ItemState, RetryConfig, StateMachine, Transition};
use crate::storage::{ArtifactPaths, Ledger, LedgerRow, OutputLayout, WorkItem, write_json_atomic};
use crate::ui::BatchProgress;

/// What the signal watcher should do with an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First interrupt: stop after the current attempt.
    Graceful,
    /// Repeated interrupt: exit now.
    ForceExit,
}

/// Cooperative interrupt shared between the signal watcher and the runner.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record an interrupt signal. The first one triggers a graceful stop.
    pub fn signal(&self) -> SignalAction {
        if self.triggered.swap(true, Ordering::SeqCst) {
            SignalAction::ForceExit
        } else {
            self.notify.notify_waiters();
            SignalAction::Graceful
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for `wait`. Returns `false` when woken early by [`Shutdown::signal`].
    pub async fn sleep(&self, wait: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_triggered() {
            return false;
        }
        tokio::select! {
            _ = sleep(wait) => true,
            _ = notified => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub interrupted: bool,
}

enum ItemOutcome {
    Succeeded,
    Failed,
    Skipped,
    /// Shutdown during a retry wait; no ledger row, resumable next run.
    Abandoned,
}

/// `start..min(total, start + max)`, or `start..total` when `max == 0`.
pub fn item_range(total: usize, start: usize, max: usize) -> Range<usize> {
    let end = if max == 0 {
        total
    } else {
        total.min(start.saturating_add(max))
    };
    start.min(end)..end
}

pub struct BatchRunner<G> {
    generator: G,
    layout: OutputLayout,
    ledger: Ledger,
    retry_config: RetryConfig,
    backoff: BackoffController,
    shutdown: Arc<Shutdown>,
    show_progress: bool,
}

impl<G: Generator> BatchRunner<G> {
    pub fn new(generator: G, layout: OutputLayout, config: &RunConfig, shutdown: Arc<Shutdown>) -> Self {
        let ledger = Ledger::open(layout.ledger_path());
        Self {
            generator,
            layout,
            ledger,
            retry_config: RetryConfig {
                max_retries: config.max_retries,
            },
            backoff: BackoffController::new(BackoffPolicy::from(config), config.delay),
            shutdown,
            show_progress: false,
        }
    }

    /// Draw a progress bar on the terminal while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[cfg(test)]
    pub fn backoff(&self) -> &BackoffController {
        &self.backoff
    }

    /// Process `items[start..]`, at most `max` of them (0 = all).
    ///
    /// Only a failure to record a `FAILED` row is returned as an error;
    /// every per-item failure ends up in the ledger instead.
    pub async fn run(&mut self, items: &[WorkItem], start: usize, max: usize) -> Result<RunSummary, PdgError> {
        let range = item_range(items.len(), start, max);
        let run_id = Uuid::new_v4();
        let progress = if self.show_progress {
            BatchProgress::new(range.len())
        } else {
            BatchProgress::hidden(range.len())
        };
        info!(
            %run_id,
            start = range.start,
            end = range.end,
            total = items.len(),
            out = %self.layout.root().display(),
            "starting batch"
        );

        let mut summary = RunSummary::default();
        for item in &items[range] {
            if self.shutdown.is_triggered() {
                summary.interrupted = true;
                break;
            }

            match self.process(item, &progress).await? {
                ItemOutcome::Succeeded => summary.succeeded += 1,
                ItemOutcome::Failed => summary.failed += 1,
                ItemOutcome::Skipped => {
                    summary.skipped += 1;
                    continue;
                }
                ItemOutcome::Abandoned => {
                    summary.interrupted = true;
                    break;
                }
            }

            // Only after an item whose retry loop actually ran.
            if let Some(wait) = self.backoff.cooldown() {
                info!(secs = wait.as_secs_f64(), penalty = self.backoff.penalty(), "rate-limit cooldown");
                progress.cooldown(wait);
                self.shutdown.sleep(wait).await;
            }
        }
        if self.shutdown.is_triggered() {
            summary.interrupted = true;
        }

        info!(
            %run_id,
            ok = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            interrupted = summary.interrupted,
            "batch finished"
        );
        progress.finish(&summary);
        Ok(summary)
    }

    async fn process(&mut self, item: &WorkItem, progress: &BatchProgress) -> Result<ItemOutcome, PdgError> {
        let paths = self.layout.paths_for(item);
        let mut run = ItemRun::new(item.index, self.retry_config);

        if StateMachine::begin(&mut run, paths.is_complete()) == Transition::Skip {
            debug!(index = item.index, "artifacts exist, skipping");
            progress.skipped(item);
            return Ok(ItemOutcome::Skipped);
        }
        progress.start(item);

        loop {
            let outcome = match self.attempt(item, &paths).await {
                Ok(()) => AttemptOutcome::Success,
                Err(e) => {
                    let class = e.classify();
                    self.backoff.record_failure(&class);
                    warn!(index = item.index, %class, error = %e, "attempt failed");
                    if let Some(raw) = e.malformed_raw() {
                        debug!(index = item.index, raw, "unparseable model output");
                    }
                    AttemptOutcome::Failure {
                        class,
                        message: e.to_string(),
                    }
                }
            };

            match StateMachine::next(&mut run, outcome) {
                Transition::Complete(ItemState::Succeeded) => {
                    self.backoff.record_success();
                    info!(index = item.index, name = %item.name, ms = run.elapsed_ms(), "item done");
                    progress.succeeded(item);
                    self.shutdown.sleep(self.backoff.inter_call_delay()).await;
                    return Ok(ItemOutcome::Succeeded);
                }
                Transition::Retry { backoff_attempt, class } => {
                    if self.shutdown.is_triggered() {
                        warn!(index = item.index, "interrupted, leaving item for the next run");
                        return Ok(ItemOutcome::Abandoned);
                    }
                    let wait = self.backoff.next_delay(backoff_attempt, class.retry_after());
                    progress.retry(
                        run.attempts.attempt,
                        self.retry_config.max_retries,
                        &run.attempts.last_error,
                        wait,
                    );
                    if !self.shutdown.sleep(secs_to_duration(wait)).await {
                        warn!(index = item.index, "interrupted, leaving item for the next run");
                        return Ok(ItemOutcome::Abandoned);
                    }
                }
                other => {
                    let error = run.error.take().unwrap_or_else(|| ItemError::Fatal {
                        last_error: format!("unexpected transition {other:?}"),
                    });
                    warn!(index = item.index, name = %item.name, error = %error, "item failed");
                    self.ledger.append(&LedgerRow::failed(item, &error))?;
                    progress.failed(item, error.last_error());
                    return Ok(ItemOutcome::Failed);
                }
            }
        }
    }

    /// One generate-and-persist attempt. Artifacts are in place before the row is appended.
    async fn attempt(&self, item: &WorkItem, paths: &ArtifactPaths) -> Result<(), AttemptError> {
        let (result, report) = self.generator.produce(&item.name, &item.features).await?;
        write_json_atomic(&paths.description, &result)?;
        write_json_atomic(&paths.seo, &report)?;
        self.ledger
            .append(&LedgerRow::ok(item, &self.layout, paths, &result))?;
        Ok(())
    }
}

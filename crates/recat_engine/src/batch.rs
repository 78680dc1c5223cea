//! Batch orchestration: drives documents through the mutation gateway
//! under the rate budget, accumulating per-item outcomes.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use recat_core::{BatchResult, Document, MutationRequest};
use recat_logging::{engine_info, engine_warn};

use crate::budget::RateBudget;
use crate::gateway::{Mutation, MutationGateway};
use crate::quota::QuotaSource;
use crate::store::StoreError;

/// Fixed engine-side backoff after a rate-limited mutation.
const RATE_LIMIT_BACKOFF_MS: u64 = 60_000;

/// Progress callbacks invoked by the engine.
///
/// Every method defaults to a no-op, and calls are fire-and-forget: a sink
/// that panics is caught and logged, never allowed to abort the run. Sinks
/// must not block; the engine invokes them inline between mutations.
pub trait ProgressSink: Send + Sync {
    /// Overall completion percentage plus a snapshot of the accumulated
    /// result, after every counted outcome.
    fn on_progress(&self, percent: f64, snapshot: &BatchResult) {
        let _ = (percent, snapshot);
    }

    /// Per finished document: `true` when the store applied a change,
    /// `false` when nothing needed to be written.
    fn on_file_complete(&self, document: &Document, succeeded: bool) {
        let _ = (document, succeeded);
    }

    /// Per document that failed permanently.
    fn on_error(&self, document: &Document, error: &StoreError) {
        let _ = (document, error);
    }
}

/// Sink that ignores every notification.
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Engine-level knobs, passed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Retry a rate-limited item after the backoff instead of dropping it.
    ///
    /// Off by default to match the historical behavior, where a
    /// rate-limited item is neither counted in `processed` nor recorded in
    /// `errors`/`file_results` even though `total` includes it.
    pub retry_on_rate_limit: bool,
}

/// Cloneable handle for requesting a cooperative stop while a run holds
/// the engine exclusively.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request a stop. Items already in flight still finish; items that
    /// have not started return untouched.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previously requested stop.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates one batch run at a time: discovers the quota once,
/// partitions work into rate-budgeted windows, and aggregates outcomes.
///
/// Lifecycle: idle, running, then completed or stopped; both terminal
/// states return to idle on the next [`BatchEngine::run`], which clears
/// the stop flag unconditionally. `run` takes `&mut self`, so overlapping
/// runs on one engine are impossible by construction.
pub struct BatchEngine {
    gateway: MutationGateway,
    quota_source: Arc<dyn QuotaSource>,
    budget: RateBudget,
    options: BatchOptions,
    stop_requested: Arc<AtomicBool>,
}

impl BatchEngine {
    pub fn new(
        gateway: MutationGateway,
        quota_source: Arc<dyn QuotaSource>,
        budget: RateBudget,
        options: BatchOptions,
    ) -> Self {
        Self {
            gateway,
            quota_source,
            budget,
            options,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for stopping the run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop_requested.clone(),
        }
    }

    /// Request a cooperative stop of the current run.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Clear the stop flag without touching any result state.
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }

    /// Replace the budget so the next run re-fetches the live quota.
    pub fn reset_budget(&mut self, budget: RateBudget) {
        self.budget = budget;
    }

    /// Run the batch and return the aggregated result by value.
    ///
    /// The quota is fetched and the budget configured on the first run
    /// only. Per-item failures never abort the batch; they are converted
    /// into result entries at the unit-of-work boundary.
    pub async fn run(
        &mut self,
        documents: Vec<Document>,
        request: &MutationRequest,
        sink: &dyn ProgressSink,
    ) -> BatchResult {
        self.stop_requested.store(false, Ordering::SeqCst);

        if !self.budget.is_configured() {
            let quota = self.quota_source.fetch_quota().await;
            self.budget.configure(&quota);
        }

        let total = documents.len();
        engine_info!("starting batch run over {total} documents");
        let result = Mutex::new(BatchResult::new(total));

        let this: &Self = self;
        let width = this.budget.concurrency();
        this.budget
            .run(documents, width, |document| {
                this.unit_of_work(document, request, sink, &result)
            })
            .await;

        let result = result.into_inner().expect("lock batch result");
        engine_info!("batch run finished: {}", result.summary_line());
        result
    }

    async fn unit_of_work(
        &self,
        document: Document,
        request: &MutationRequest,
        sink: &dyn ProgressSink,
        result: &Mutex<BatchResult>,
    ) {
        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                // Deliberately uncounted: a stopped run under-reports
                // `processed` relative to `total`.
                return;
            }

            match self.gateway.mutate(&document.title, request).await {
                Ok(outcome) => {
                    let modified = outcome == Mutation::Applied;
                    let snapshot = {
                        let mut guard = result.lock().expect("lock batch result");
                        if modified {
                            guard.record_success(document.clone());
                        } else {
                            guard.record_skipped(document.clone());
                        }
                        guard.clone()
                    };
                    notify(sink, |sink| sink.on_file_complete(&document, modified));
                    notify(sink, |sink| {
                        sink.on_progress(snapshot.percent_complete(), &snapshot)
                    });
                    return;
                }
                Err(StoreError::RateLimited) => {
                    engine_warn!(
                        "rate limited while editing {:?}; backing off {}s",
                        document.title,
                        RATE_LIMIT_BACKOFF_MS / 1_000
                    );
                    self.budget.wait(Some(RATE_LIMIT_BACKOFF_MS)).await;
                    if self.options.retry_on_rate_limit {
                        continue;
                    }
                    // Historical behavior: the item vanishes from this
                    // run's accounting while `total` still counts it.
                    return;
                }
                Err(err) => {
                    let snapshot = {
                        let mut guard = result.lock().expect("lock batch result");
                        guard.record_failure(document.clone(), err.to_string());
                        guard.clone()
                    };
                    notify(sink, |sink| sink.on_error(&document, &err));
                    notify(sink, |sink| {
                        sink.on_progress(snapshot.percent_complete(), &snapshot)
                    });
                    return;
                }
            }
        }
    }
}

/// Invoke a sink callback, containing any panic so a notification failure
/// cannot abort the run.
fn notify(sink: &dyn ProgressSink, call: impl FnOnce(&dyn ProgressSink)) {
    if catch_unwind(AssertUnwindSafe(|| call(sink))).is_err() {
        engine_warn!("progress sink panicked; notification dropped");
    }
}

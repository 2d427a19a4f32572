use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crosscheck_core::{ResultRow, RowSource};
use crosscheck_translate::TranslatedValidation;

use crate::errors::ExecutionError;
use crate::model::{
    ExecutedValidation, ExecutionBatch, ExecutionOptions, ExecutionStatus, ValidationOutcome,
};
use crate::outcome::classify_rows;

/// Extra time past the statement timeout before a unit is abandoned.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

type Queue = Arc<Mutex<VecDeque<(usize, TranslatedValidation)>>>;

/// Runs gate-passed statements on a fixed pool of workers.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    options: ExecutionOptions,
}

impl ExecutionEngine {
    pub fn new(options: ExecutionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Execute every executable statement exactly once.
    ///
    /// Each statement runs in its own task, so a failing or panicking unit
    /// only produces an `error` outcome for itself. On cancellation, workers
    /// stop taking work, in-flight units resolve as `cancelled` errors and
    /// untouched statements are returned in `not_executed`.
    pub async fn execute(
        &self,
        source: Arc<dyn RowSource>,
        translated: Vec<TranslatedValidation>,
        cancel: &CancellationToken,
    ) -> ExecutionBatch {
        let started = Instant::now();
        let (runnable, skipped): (Vec<_>, Vec<_>) =
            translated.into_iter().partition(|t| t.is_executable());

        let indexed: Vec<(usize, TranslatedValidation)> = runnable.into_iter().enumerate().collect();
        let queue: Queue = Arc::new(Mutex::new(indexed.iter().cloned().collect()));
        let workers = self.options.max_concurrency.max(1).min(indexed.len());

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = queue.clone();
            let source = source.clone();
            let cancel = cancel.clone();
            let timeout = self.options.statement_timeout;
            handles.push(tokio::spawn(async move {
                run_worker(worker, queue, source, timeout, cancel).await
            }));
        }

        let mut executed: Vec<(usize, ExecutedValidation)> = Vec::with_capacity(indexed.len());
        for handle in handles {
            match handle.await {
                Ok(done) => executed.extend(done),
                Err(err) => warn!(event = "worker_failed", error = %err, "execution worker failed"),
            }
        }

        let remaining: Vec<(usize, TranslatedValidation)> = queue.lock().await.drain(..).collect();
        let accounted: BTreeSet<usize> = executed
            .iter()
            .map(|(index, _)| *index)
            .chain(remaining.iter().map(|(index, _)| *index))
            .collect();
        for (index, validation) in indexed {
            if !accounted.contains(&index) {
                let err = ExecutionError::TaskFailed("worker stopped before reporting".to_string());
                executed.push((index, failed(validation, Duration::ZERO, &err)));
            }
        }
        executed.sort_by_key(|(index, _)| *index);

        let batch = ExecutionBatch {
            executed: executed.into_iter().map(|(_, executed)| executed).collect(),
            skipped,
            not_executed: remaining.into_iter().map(|(_, validation)| validation).collect(),
            cancelled: cancel.is_cancelled(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            event = "execution_finished",
            executed = batch.executed.len(),
            skipped = batch.skipped.len(),
            not_executed = batch.not_executed.len(),
            cancelled = batch.cancelled,
            duration_ms = batch.duration_ms,
            "execution finished"
        );
        batch
    }
}

async fn run_worker(
    worker: usize,
    queue: Queue,
    source: Arc<dyn RowSource>,
    timeout: Duration,
    cancel: CancellationToken,
) -> Vec<(usize, ExecutedValidation)> {
    let mut done = Vec::new();
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let next = queue.lock().await.pop_front();
        let Some((index, validation)) = next else {
            break;
        };
        let executed = run_unit(worker, source.clone(), validation, timeout, &cancel).await;
        done.push((index, executed));
    }
    done
}

async fn run_unit(
    worker: usize,
    source: Arc<dyn RowSource>,
    validation: TranslatedValidation,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ExecutedValidation {
    let started = Instant::now();
    let sql = validation.sql.clone();
    let task = tokio::spawn(async move { source.fetch_rows(&sql, timeout).await });
    let abort = task.abort_handle();

    let result: Result<Vec<ResultRow>, ExecutionError> = tokio::select! {
        _ = cancel.cancelled() => {
            abort.abort();
            Err(ExecutionError::Cancelled)
        }
        joined = tokio::time::timeout(timeout + TIMEOUT_GRACE, task) => match joined {
            Ok(Ok(Ok(rows))) => Ok(rows),
            Ok(Ok(Err(err))) => Err(ExecutionError::Query(err)),
            Ok(Err(err)) => Err(join_failure(err)),
            Err(_) => {
                abort.abort();
                Err(ExecutionError::Timeout(timeout))
            }
        },
    };

    let elapsed = started.elapsed();
    let executed = match result {
        Ok(rows) => {
            let row_count = rows.len();
            ExecutedValidation {
                translated: validation,
                execution_status: ExecutionStatus::Success,
                duration_ms: elapsed.as_millis() as u64,
                row_count,
                outcome: classify_rows(rows),
                error: None,
                executed_at: Utc::now(),
            }
        }
        Err(err) => failed(validation, elapsed, &err),
    };

    info!(
        event = "validation_executed",
        worker,
        proposal_id = %executed.proposal_id(),
        status = executed.outcome.status.as_str(),
        issues = executed.outcome.issue_count,
        rows = executed.row_count,
        duration_ms = executed.duration_ms,
        error = executed.error.as_deref().unwrap_or(""),
    );
    executed
}

fn failed(validation: TranslatedValidation, elapsed: Duration, err: &ExecutionError) -> ExecutedValidation {
    ExecutedValidation {
        translated: validation,
        execution_status: ExecutionStatus::Error,
        duration_ms: elapsed.as_millis() as u64,
        row_count: 0,
        outcome: ValidationOutcome::error(),
        error: Some(err.to_string()),
        executed_at: Utc::now(),
    }
}

fn join_failure(err: JoinError) -> ExecutionError {
    if err.is_panic() {
        ExecutionError::Panicked(panic_message(err.into_panic()))
    } else {
        ExecutionError::TaskFailed(err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Bounded concurrent executor.
//!
//! Runs an ordered list of independent fetch tasks with at most `concurrency`
//! in flight and returns one outcome per task, at the task's position.
//!
//! A task that comes back empty, times out, panics or is cancelled yields
//! `None` at its own slot. Nothing a task does can affect its siblings.
//!
//! Cancellation is per run: every call takes its own token, so cancelling one
//! batch leaves the executor usable for the next.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// Default number of tasks in flight.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default per-task timeout.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug)]
pub struct BoundedExecutor {
    concurrency: usize,
    task_timeout: Option<Duration>,
}

impl BoundedExecutor {
    /// Create an executor running at most `concurrency` tasks at once.
    ///
    /// A concurrency of zero is treated as one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            task_timeout: Some(DEFAULT_TASK_TIMEOUT),
        }
    }

    /// Set the per-task timeout; `None` lets tasks run as long as they like.
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    /// Run `tasks` and return their outcomes in input order.
    pub async fn run<T, F, Fut>(&self, tasks: Vec<F>) -> Vec<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        self.run_with_cancel(tasks, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), stopping early once `cancel` fires.
    ///
    /// Running tasks resolve to `None` and tasks not yet started are never
    /// started. The output still has one slot per task.
    pub async fn run_with_cancel<T, F, Fut>(
        &self,
        tasks: Vec<F>,
        cancel: CancellationToken,
    ) -> Vec<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let total = tasks.len();
        let mut outcomes: Vec<Option<T>> = (0..total).map(|_| None).collect();

        let mut completed = futures::stream::iter(tasks.into_iter().enumerate())
            .map(|(index, task)| {
                let cancel = cancel.clone();
                let task_timeout = self.task_timeout;
                async move { (index, run_one(index, task, task_timeout, cancel).await) }
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, outcome)) = completed.next().await {
            outcomes[index] = outcome;
        }

        let missing = outcomes.iter().filter(|o| o.is_none()).count();
        debug!(
            "Executed {} tasks (concurrency {}), {} unavailable",
            total, self.concurrency, missing
        );

        outcomes
    }
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

async fn run_one<T, F, Fut>(
    index: usize,
    task: F,
    task_timeout: Option<Duration>,
    cancel: CancellationToken,
) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    if cancel.is_cancelled() {
        return None;
    }

    let guarded = AssertUnwindSafe(async move { task().await }).catch_unwind();

    let bounded = async {
        match task_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Task {} timed out after {:?}", index, limit);
                    Ok(None)
                }
            },
            None => guarded.await,
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Task {} cancelled", index);
            None
        }
        result = bounded => match result {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Task {} panicked", index);
                None
            }
        },
    }
}

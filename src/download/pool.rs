use super::CancelToken;
use crate::config::MAX_CONCURRENT_DOWNLOADS;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const POOL_POLL_MS: u64 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<R> {
    Completed(R),
    Panicked(String),
}

/// Outcomes in submission order. When cancelled, tasks that had not
/// finished are absent.
#[derive(Debug)]
pub struct PoolReport<R> {
    pub outcomes: Vec<(usize, TaskOutcome<R>)>,
    pub cancelled: bool,
}

/// Bounded thread pool: at most `max_concurrency` tasks run at once, a panic
/// in one task is reported as that task's outcome, and cancellation stops
/// dispatch and returns without waiting for in-flight tasks.
#[derive(Debug, Clone)]
pub struct TaskPool {
    max_concurrency: usize,
    completed: Arc<AtomicUsize>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

impl TaskPool {
    pub fn new(max_concurrency: usize) -> Self {
        Self::with_progress(max_concurrency, Arc::new(AtomicUsize::new(0)))
    }

    /// Pool that reports completions into a shared counter.
    pub fn with_progress(max_concurrency: usize, completed: Arc<AtomicUsize>) -> Self {
        Self {
            max_concurrency: max_concurrency.clamp(1, MAX_CONCURRENT_DOWNLOADS),
            completed,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn run<T, R, F>(&self, items: Vec<T>, cancel: &CancelToken, task: F) -> PoolReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(&CancelToken, T) -> R + Send + Sync + 'static,
    {
        let total = items.len();
        let task = Arc::new(task);
        let mut pending: VecDeque<(usize, T)> = items.into_iter().enumerate().collect();
        let (result_tx, result_rx) = mpsc::channel::<(usize, TaskOutcome<R>)>();
        let mut outcomes = Vec::with_capacity(total);
        let mut in_flight = 0usize;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            while in_flight < self.max_concurrency {
                let Some((index, item)) = pending.pop_front() else {
                    break;
                };
                let tx = result_tx.clone();
                let task = Arc::clone(&task);
                let token = cancel.clone();
                let completed = Arc::clone(&self.completed);
                let _ = thread::spawn(move || {
                    let outcome = match catch_unwind(AssertUnwindSafe(|| task(&token, item))) {
                        Ok(value) => TaskOutcome::Completed(value),
                        Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
                    };
                    completed.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send((index, outcome));
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            match result_rx.recv_timeout(Duration::from_millis(POOL_POLL_MS)) {
                Ok(done) => {
                    in_flight -= 1;
                    outcomes.push(done);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if cancelled {
            while let Ok(done) = result_rx.try_recv() {
                outcomes.push(done);
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);
        PoolReport {
            outcomes,
            cancelled,
        }
    }
}

//! Bounded-concurrency fan-out with index-stable results.
//!
//! [`schedule`] runs a worker over every input with at most `limit` workers in
//! flight. A single shared cursor hands out inputs in order; each lane pulls
//! the next input as soon as its previous one finishes, so a lane only waits
//! while its own worker is suspended on I/O.
//!
//! Results land at the index of their input, independent of completion order.
//! The first failure stops the cursor: inputs not yet started are never
//! dispatched, workers already in flight run to completion, and their
//! outcomes are discarded. Nothing is cancelled.
//!
//! ```rust
//! use hygiene_core::scheduler::schedule;
//!
//! # tokio_test_block_on(async {
//! let doubled = schedule(vec![1, 2, 3], 2, |n| async move { Ok::<_, ()>(n * 2) })
//!     .await
//!     .unwrap();
//! assert_eq!(doubled, vec![2, 4, 6]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;
use tracing::debug;

/// The first worker failure of a [`schedule`] call.
#[derive(Debug)]
pub struct TaskFailure<E> {
    /// Index of the input whose worker failed.
    pub index: usize,
    /// The worker's error.
    pub error: E,
}

impl<E: std::fmt::Display> std::fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task {} failed: {}", self.index, self.error)
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for TaskFailure<E> {}

/// Run `worker` over every item with at most `limit` workers in flight.
///
/// A `limit` of zero is treated as one. With `limit >= items.len()` every
/// item is dispatched at once. An empty input resolves immediately without
/// running anything.
///
/// The returned future resolves once no worker is running, so on failure it
/// still waits for in-flight workers to finish before returning the first
/// error.
pub async fn schedule<I, T, E, F, Fut>(
    items: Vec<I>,
    limit: usize,
    worker: F,
) -> Result<Vec<T>, TaskFailure<E>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let lanes = limit.clamp(1, total);
    debug!(total, lanes, "dispatching tasks");

    let cursor = Mutex::new(items.into_iter().enumerate());
    let slots: Mutex<Vec<Option<T>>> = Mutex::new((0..total).map(|_| None).collect());
    let halted = AtomicBool::new(false);
    let failure: Mutex<Option<TaskFailure<E>>> = Mutex::new(None);

    let (cursor, slots, halted, failure, worker) = (&cursor, &slots, &halted, &failure, &worker);

    join_all((0..lanes).map(|_| async move {
        loop {
            if halted.load(Ordering::SeqCst) {
                break;
            }
            let next = cursor.lock().unwrap_or_else(PoisonError::into_inner).next();
            let Some((index, item)) = next else {
                break;
            };

            match worker(item).await {
                Ok(value) => {
                    slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(value);
                },
                Err(error) => {
                    halted.store(true, Ordering::SeqCst);
                    let mut first = failure.lock().unwrap_or_else(PoisonError::into_inner);
                    if first.is_none() {
                        debug!(index, "task failed, halting dispatch");
                        *first = Some(TaskFailure { index, error });
                    }
                    break;
                },
            }
        }
    }))
    .await;

    if let Some(first) = failure
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
    {
        return Err(first);
    }

    // Without a failure every lane drained the cursor, so every slot is filled.
    let results = std::mem::take(&mut *slots.lock().unwrap_or_else(PoisonError::into_inner));
    Ok(results.into_iter().flatten().collect())
}

//! Fork-join work dispatcher.
//!
//! [`run`] executes `work(i)` for every `i` in `0..items` on a dedicated
//! pool of at most `workers` threads and returns once every item has
//! completed, or as soon as one has failed. Items are handed out by
//! [`Assignment`]; results come back in item order regardless of which
//! worker produced them.
//!
//! The dispatcher never rolls anything back. If an item has side effects
//! (a part file on disk, say) and a sibling fails, cleaning up is the
//! caller's job.

use crate::error::DispatchError;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// How item indices are distributed over workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Assignment {
    /// Worker `t` takes `[t * r, min((t + 1) * r, items))` with
    /// `r = ceil(items / workers)`.
    #[default]
    Contiguous,
    /// Worker `t` takes `t, t + workers, t + 2 * workers, ...`.
    RoundRobin,
}

/// Number of workers actually started for `items` items: never more than
/// `items`, and a worker whose contiguous range would be empty is dropped.
#[must_use]
pub fn effective_workers(workers: usize, items: usize, assignment: Assignment) -> usize {
    if items == 0 {
        return 0;
    }
    let workers = workers.clamp(1, items);
    match assignment {
        Assignment::Contiguous => items.div_ceil(items.div_ceil(workers)),
        Assignment::RoundRobin => workers,
    }
}

/// Item indices handled by `worker` out of `workers` started workers.
#[must_use]
pub fn worker_items(
    worker: usize,
    workers: usize,
    items: usize,
    assignment: Assignment,
) -> Vec<usize> {
    if workers == 0 || worker >= workers {
        return Vec::new();
    }
    match assignment {
        Assignment::Contiguous => {
            let range = items.div_ceil(workers);
            let start = (worker * range).min(items);
            let end = ((worker + 1) * range).min(items);
            (start..end).collect()
        }
        Assignment::RoundRobin => (worker..items).step_by(workers).collect(),
    }
}

/// Run `work` over `0..items` with contiguous assignment.
///
/// # Errors
/// Returns [`DispatchError::WorkerFailed`] when an item returned an error and
/// [`DispatchError::WorkerPanicked`] when an item panicked.
pub fn run<R, F>(workers: usize, items: usize, work: F) -> Result<Vec<R>, DispatchError>
where
    R: Send,
    F: Fn(usize) -> anyhow::Result<R> + Sync,
{
    run_with(workers, items, Assignment::Contiguous, work)
}

/// Run `work` over `0..items` with an explicit [`Assignment`].
///
/// # Errors
/// See [`run`].
pub fn run_with<R, F>(
    workers: usize,
    items: usize,
    assignment: Assignment,
    work: F,
) -> Result<Vec<R>, DispatchError>
where
    R: Send,
    F: Fn(usize) -> anyhow::Result<R> + Sync,
{
    let started = effective_workers(workers, items, assignment);
    if started == 0 {
        return Ok(Vec::new());
    }
    debug!(workers = started, items, ?assignment, "dispatching work items");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(started)
        .thread_name(|i| format!("slow5merge-worker-{i}"))
        .build()?;
    let abort = AtomicBool::new(false);

    let per_worker: Vec<Vec<(usize, R)>> = pool.install(|| {
        (0..started)
            .into_par_iter()
            .map(|t| {
                let mut done = Vec::new();
                for i in worker_items(t, started, items, assignment) {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let outcome = catch_unwind(AssertUnwindSafe(|| work(i)));
                    let err = match outcome {
                        Ok(Ok(r)) => {
                            done.push((i, r));
                            continue;
                        }
                        Ok(Err(source)) => DispatchError::WorkerFailed {
                            worker: t,
                            item: i,
                            source,
                        },
                        Err(payload) => DispatchError::WorkerPanicked {
                            worker: t,
                            message: panic_message(payload.as_ref()),
                        },
                    };
                    abort.store(true, Ordering::Relaxed);
                    return Err(err);
                }
                Ok(done)
            })
            .collect::<Result<Vec<_>, DispatchError>>()
    })?;

    let mut flat: Vec<(usize, R)> = per_worker.into_iter().flatten().collect();
    flat.sort_unstable_by_key(|(i, _)| *i);
    Ok(flat.into_iter().map(|(_, r)| r).collect())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

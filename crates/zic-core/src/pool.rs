//! Bounded worker pool for one album's transfers.
//!
//! Items are queued in album order and pulled by at most `workers` threads;
//! results come back through a channel and are stored by index. Workers check
//! the cancel token before taking each item and never abandon one midway.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Mutex;

use crate::cancel::CancelToken;

/// Runs `work` over `items` with at most `workers` running at once and blocks
/// until the pool drains. Slot `i` holds the result for item `i`, or None if
/// the item never started (cancellation) or its worker panicked.
pub fn run_bounded<T, R, F>(items: Vec<T>, workers: usize, cancel: &CancelToken, work: F) -> Vec<Option<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let count = items.len();
    let mut results: Vec<Option<R>> = (0..count).map(|_| None).collect();
    if count == 0 {
        return results;
    }

    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let (tx, rx) = mpsc::channel::<(usize, R)>();
    let num_workers = workers.max(1).min(count);
    let work = &work;
    let queue = &queue;

    std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            let tx = tx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("zic-worker-{}", i))
                .spawn_scoped(s, move || loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let next = match queue.lock() {
                        Ok(mut q) => q.pop_front(),
                        Err(poisoned) => poisoned.into_inner().pop_front(),
                    };
                    let Some((index, item)) = next else {
                        break;
                    };
                    let out = work(item);
                    if tx.send((index, out)).is_err() {
                        break;
                    }
                });
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => tracing::warn!("unable to start worker {}: {}", i, e),
            }
        }
        drop(tx);

        for (index, out) in rx {
            results[index] = Some(out);
        }
        for h in handles {
            if h.join().is_err() {
                tracing::error!("transfer worker panicked");
            }
        }
    });

    results
}

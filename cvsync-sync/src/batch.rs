//! Batch executor.
//!
//! Splits a write set into contiguous chunks and hands them to an async
//! operation one at a time. A chunk is awaited before the next one starts, so
//! CVSecurity never sees concurrent bulk writes from this process.
//!
//! There is no rollback: when a chunk fails, chunks already applied stay
//! applied and the remaining ones are never sent.

use std::future::Future;

/// What a fully successful [`run_in_batches`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub batches: usize,
    pub items: usize,
}

/// The first failing chunk of a [`run_in_batches`] call.
#[derive(Debug)]
pub struct BatchFailure<E> {
    /// 1-based index of the failing batch.
    pub batch: usize,
    /// Batches (and their items) that were applied before the failure.
    pub applied: BatchOutcome,
    pub error: E,
}

/// Partition `items` into chunks of at most `batch_size` and run `operation`
/// on each, sequentially.
///
/// A `batch_size` of zero yields no chunks at all.
pub async fn run_in_batches<T, F, Fut, E>(
    items: Vec<T>,
    batch_size: usize,
    mut operation: F,
) -> Result<BatchOutcome, BatchFailure<E>>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut applied = BatchOutcome::default();
    if batch_size == 0 {
        return Ok(applied);
    }

    let total = items.len().div_ceil(batch_size);
    let mut remaining = items.into_iter().peekable();

    while remaining.peek().is_some() {
        let chunk: Vec<T> = remaining.by_ref().take(batch_size).collect();
        let size = chunk.len();
        let batch = applied.batches + 1;

        tracing::info!(batch, of = total, size, "submitting batch");
        if let Err(error) = operation(chunk).await {
            return Err(BatchFailure {
                batch,
                applied,
                error,
            });
        }

        applied.batches += 1;
        applied.items += size;
    }

    Ok(applied)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

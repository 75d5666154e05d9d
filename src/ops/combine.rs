use futures_buffered::FuturesUnordered;
use futures_lite::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::executor::{Executor, Spawner};
use crate::future::{new, Future};

/// Waits for every input and returns their values in input order, failing
/// fast with the first observed error.
///
/// On failure no partial results are returned, and the remaining inputs are
/// *not* cancelled; they keep running and their outcomes are discarded. An
/// empty input fulfills immediately with an empty list.
pub fn combine<T>(futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    combine_with_executor(&Spawner, futures)
}

/// As [`combine`], driving the wait through `executor`.
pub fn combine_with_executor<E, T>(executor: &E, futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    E: Executor + ?Sized,
    T: Clone + Send + 'static,
{
    let (output, promise) = new();
    if futures.is_empty() {
        promise.success(Vec::new());
        return output;
    }
    executor.start(move || drain_fail_fast(futures), promise);
    output
}

/// As [`combine`], but the wait is abandoned with
/// [`Error::Cancelled`][Error::Cancelled] if `token` fires first.
pub fn combine_with_token<T>(token: &CancellationToken, futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let (output, promise) = new();
    if futures.is_empty() {
        promise.success(Vec::new());
        return output;
    }
    Spawner.start_with_token(
        token.child_token(),
        move |token| async move {
            match token.run_until_cancelled(drain_fail_fast(futures)).await {
                Some(result) => result,
                None => Err(Error::Cancelled),
            }
        },
        promise,
    );
    output
}

/// Waits for every input regardless of failures and returns their values in
/// input order.
///
/// If any inputs failed, the outcome is an
/// [`Error::Aggregate`][Error::Aggregate] carrying every failure in input
/// order, each independently inspectable. An empty input fulfills
/// immediately with an empty list.
pub fn combine_all<T>(futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    combine_all_with_executor(&Spawner, futures)
}

/// As [`combine_all`], driving the wait through `executor`.
pub fn combine_all_with_executor<E, T>(executor: &E, futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    E: Executor + ?Sized,
    T: Clone + Send + 'static,
{
    let (output, promise) = new();
    if futures.is_empty() {
        promise.success(Vec::new());
        return output;
    }
    executor.start(move || drain_collect_all(futures), promise);
    output
}

/// As [`combine_all`], but the wait is abandoned with
/// [`Error::Cancelled`][Error::Cancelled] if `token` fires first.
pub fn combine_all_with_token<T>(
    token: &CancellationToken,
    futures: Vec<Future<T>>,
) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let (output, promise) = new();
    if futures.is_empty() {
        promise.success(Vec::new());
        return output;
    }
    Spawner.start_with_token(
        token.child_token(),
        move |token| async move {
            match token.run_until_cancelled(drain_collect_all(futures)).await {
                Some(result) => result,
                None => Err(Error::Cancelled),
            }
        },
        promise,
    );
    output
}

fn indexed_waits<T>(
    futures: Vec<Future<T>>,
) -> (
    Vec<Option<T>>,
    FuturesUnordered<impl core::future::Future<Output = (usize, Result<T>)>>,
)
where
    T: Clone + Send + 'static,
{
    let slots = futures.iter().map(|_| None).collect();
    let mut pending = FuturesUnordered::new();
    for (index, future) in futures.into_iter().enumerate() {
        pending.push(async move { (index, future.wait().await) });
    }
    (slots, pending)
}

async fn drain_fail_fast<T>(futures: Vec<Future<T>>) -> Result<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let (mut slots, mut pending) = indexed_waits(futures);
    while let Some((index, result)) = pending.next().await {
        slots[index] = Some(result?);
    }
    // every slot is filled once the set has been drained
    Ok(slots.into_iter().flatten().collect())
}

async fn drain_collect_all<T>(futures: Vec<Future<T>>) -> Result<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let (mut slots, mut pending) = indexed_waits(futures);
    let mut failures: Vec<(usize, Error)> = Vec::new();
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(error) => failures.push((index, error)),
        }
    }
    if failures.is_empty() {
        Ok(slots.into_iter().flatten().collect())
    } else {
        failures.sort_by_key(|(index, _)| *index);
        Err(Error::aggregate(
            failures.into_iter().map(|(_, error)| error).collect(),
        ))
    }
}

//! Pluggable strategies for starting operations and binding their outcomes
//! to promises.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::future::{new, Future};
use crate::promise::Promise;
use crate::utils::{self, CatchUnwind};

/// A strategy for invoking an operation and feeding its outcome into a
/// promise.
///
/// Implementations must complete the promise exactly once, trap panics and
/// deliver them as [`Error::Panic`] failures, and hand the supplied
/// cancellation token through to the operation for cooperative shutdown.
/// Substituting an implementation (rate-limited, pooled, ...) changes how
/// operations are scheduled without touching any fulfillment semantics.
pub trait Executor {
    /// Runs `f` and completes `promise` with its outcome.
    fn start<T, F, Fut>(&self, f: F, promise: Promise<T>)
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: core::future::Future<Output = Result<T>> + Send + 'static;

    /// As [`start`][Executor::start], handing `token` to the operation so it
    /// can observe cancellation.
    fn start_with_token<T, F, Fut>(&self, token: CancellationToken, f: F, promise: Promise<T>)
    where
        T: Clone + Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: core::future::Future<Output = Result<T>> + Send + 'static;
}

/// The default executor: one freshly spawned task per operation.
///
/// Panics raised while constructing or driving the operation are trapped,
/// converted into [`Error::Panic`] with the payload message and a captured
/// backtrace, and delivered through the promise; the process never crashes
/// from this path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spawner;

impl Executor for Spawner {
    fn start<T, F, Fut>(&self, f: F, promise: Promise<T>)
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: core::future::Future<Output = Result<T>> + Send + 'static,
    {
        utils::spawn_detached(async move {
            let result = match catch_unwind(AssertUnwindSafe(f)) {
                Ok(fut) => match CatchUnwind::new(fut).await {
                    Ok(result) => result,
                    Err(payload) => Err(Error::from_panic(payload)),
                },
                Err(payload) => Err(Error::from_panic(payload)),
            };
            promise.complete(result);
        });
    }

    fn start_with_token<T, F, Fut>(&self, token: CancellationToken, f: F, promise: Promise<T>)
    where
        T: Clone + Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: core::future::Future<Output = Result<T>> + Send + 'static,
    {
        self.start(move || f(token), promise);
    }
}

/// Runs `f` on the default executor and returns a future for its outcome.
///
/// # Examples
///
/// ```
/// # #[tokio::main]
/// # async fn main() {
/// let future = async_promise::run(|| async { Ok(1 + 1) });
/// assert_eq!(future.wait().await.unwrap(), 2);
/// # }
/// ```
pub fn run<T, F, Fut>(f: F) -> Future<T>
where
    T: Clone + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: core::future::Future<Output = Result<T>> + Send + 'static,
{
    run_with_executor(&Spawner, f)
}

/// Runs `f` on `executor` and returns a future for its outcome.
pub fn run_with_executor<E, T, F, Fut>(executor: &E, f: F) -> Future<T>
where
    E: Executor + ?Sized,
    T: Clone + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: core::future::Future<Output = Result<T>> + Send + 'static,
{
    let (future, promise) = new();
    executor.start(f, promise);
    future
}

/// Runs `f` on the default executor, handing it a child of `token`.
///
/// Calling [`Future::cancel`] on the returned future cancels that child
/// token, so a cooperative operation observes both its caller's token and
/// explicit cancellation through one handle.
pub fn run_with_token<T, F, Fut>(token: &CancellationToken, f: F) -> Future<T>
where
    T: Clone + Send + 'static,
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: core::future::Future<Output = Result<T>> + Send + 'static,
{
    let (future, promise) = new();
    let child = token.child_token();
    {
        let child = child.clone();
        promise.on_cancel(move || child.cancel());
    }
    Spawner.start_with_token(child, f, promise);
    future
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn run_delivers_success() {
        let future = run(|| async { Ok("hello") });
        assert_eq!(future.wait().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn run_delivers_failure() {
        let future: Future<u32> = run(|| async { Err(Error::msg("oh no")) });
        assert_eq!(future.wait().await.unwrap_err().to_string(), "oh no");
    }

    #[tokio::test]
    async fn panics_become_errors() {
        let future: Future<u32> = run(|| async { panic!("boom") });
        let err = future.wait().await.unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn cancel_propagates_to_the_operation_token() {
        let parent = CancellationToken::new();
        let future: Future<u32> = run_with_token(&parent, |token| async move {
            token.cancelled().await;
            Err(Error::Cancelled)
        });
        future.cancel();
        assert!(future.wait().await.unwrap_err().is_cancelled());
        assert!(!parent.is_cancelled());
    }
}

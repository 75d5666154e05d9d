//! The read-only half of a future/promise pair.

use core::fmt;
use core::future::IntoFuture;
use std::sync::Arc;

use futures_lite::future::Boxed;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::promise::Promise;

pub use stream::ResultStream;

pub(crate) mod shared;
mod stream;

use shared::Shared;

/// Creates a connected future/promise pair.
///
/// The [`Future`] may be cloned and shared freely; the [`Promise`] is the
/// single writer. Cleanup to run on cancellation is registered through
/// [`Promise::on_cancel`].
///
/// # Examples
///
/// ```
/// # #[tokio::main]
/// # async fn main() {
/// let (future, promise) = async_promise::new::<u32>();
/// promise.success(2);
/// assert_eq!(future.wait().await.unwrap(), 2);
/// # }
/// ```
pub fn new<T>() -> (Future<T>, Promise<T>)
where
    T: Clone + Send + 'static,
{
    let shared = Arc::new(Shared::new());
    (
        Future {
            shared: shared.clone(),
        },
        Promise::from_shared(shared),
    )
}

/// Creates an already-successful future without spawning a task.
pub fn ready<T>(value: T) -> Future<T>
where
    T: Clone + Send + 'static,
{
    let (future, promise) = new();
    promise.success(value);
    future
}

/// Creates an already-failed future without spawning a task.
///
/// Useful for short-circuiting pipelines that expect a [`Future`].
pub fn failed<T>(error: Error) -> Future<T>
where
    T: Clone + Send + 'static,
{
    let (future, promise) = new();
    promise.failure(error);
    future
}

/// A read-only handle to the eventual result of a concurrently executing
/// operation.
///
/// All clones observe the same memoized outcome. Reads block only until the
/// bound [`Promise`] fulfills; afterwards they return immediately. Dropping
/// every clone while the operation runs does not stop the operation.
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("fulfilled", &self.shared.is_fulfilled())
            .finish()
    }
}

impl<T> Future<T> {
    /// Returns `true` once the outcome has been stored.
    pub fn is_fulfilled(&self) -> bool {
        self.shared.is_fulfilled()
    }

    /// Requests cooperative cancellation of the bound operation.
    ///
    /// Runs the cleanup hooks registered through [`Promise::on_cancel`] at
    /// most once across any number of calls. The operation itself keeps
    /// running until it observes its cancellation token.
    pub fn cancel(&self) {
        self.shared.cancel_state().cancel();
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Waits for fulfillment and returns the memoized result.
    ///
    /// Safe to call repeatedly and from any number of concurrent callers;
    /// every caller observes the identical outcome. Once the future is
    /// fulfilled this returns without suspending.
    pub async fn wait(&self) -> Result<T> {
        if let Some(result) = self.shared.peek() {
            return result;
        }
        let mut done = self.shared.subscribe();
        let _ = done.wait_for(|done| *done).await;
        match self.shared.peek() {
            Some(result) => result,
            // the signal only flips after the result is stored
            None => unreachable!("completion signalled without a stored result"),
        }
    }

    /// As [`wait`][Future::wait], but gives up with [`Error::Cancelled`] if
    /// `token` fires first.
    ///
    /// Only this caller's wait is abandoned; the future and any other
    /// waiters are unaffected.
    pub async fn wait_with_token(&self, token: &CancellationToken) -> Result<T> {
        match token.run_until_cancelled(self.wait()).await {
            Some(result) => result,
            None => Err(Error::Cancelled),
        }
    }

    /// Returns the result if already fulfilled, without blocking.
    pub fn try_result(&self) -> Option<Result<T>> {
        self.shared.peek()
    }

    /// Returns a one-element stream yielding the result once fulfilled.
    pub fn to_stream(&self) -> ResultStream<Boxed<Result<T>>> {
        let future = self.clone();
        ResultStream::new(Box::pin(async move { future.wait().await }))
    }

    /// As [`to_stream`][Future::to_stream], but the stream yields
    /// [`Error::Cancelled`] if `token` fires before fulfillment.
    pub fn to_stream_with_token(&self, token: &CancellationToken) -> ResultStream<Boxed<Result<T>>> {
        let future = self.clone();
        let token = token.clone();
        ResultStream::new(Box::pin(async move { future.wait_with_token(&token).await }))
    }

    /// Registers a callback fired once if and only if the future succeeds.
    ///
    /// Callbacks always run on their own task, never inline with either the
    /// registering or the fulfilling caller, and a callback panic is logged
    /// and discarded. Registering on an already-successful future fires the
    /// callback immediately (still on its own task).
    pub fn on_success<F>(&self, f: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.shared.push_success(Box::new(f));
    }

    /// Registers a callback fired once if and only if the future fails.
    pub fn on_error<F>(&self, f: F)
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.shared.push_error(Box::new(f));
    }

    /// Registers a callback fired exactly once with the full result,
    /// whatever the outcome.
    pub fn on_result<F>(&self, f: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        self.shared.push_result(Box::new(f));
    }

    /// As [`on_success`][Future::on_success]; the callback additionally
    /// receives a child of `token` scoped to its own execution, so the
    /// callback body can perform cancellable work without affecting the
    /// original token.
    pub fn on_success_with_token<F>(&self, token: &CancellationToken, f: F)
    where
        F: FnOnce(CancellationToken, T) + Send + 'static,
    {
        self.shared.push_token_success(token.clone(), Box::new(f));
    }

    /// Token-aware counterpart of [`on_error`][Future::on_error].
    pub fn on_error_with_token<F>(&self, token: &CancellationToken, f: F)
    where
        F: FnOnce(CancellationToken, Error) + Send + 'static,
    {
        self.shared.push_token_error(token.clone(), Box::new(f));
    }

    /// Token-aware counterpart of [`on_result`][Future::on_result].
    pub fn on_result_with_token<F>(&self, token: &CancellationToken, f: F)
    where
        F: FnOnce(CancellationToken, Result<T>) + Send + 'static,
    {
        self.shared.push_token_result(token.clone(), Box::new(f));
    }
}

impl<T: Clone + Send + 'static> IntoFuture for Future<T> {
    type Output = Result<T>;
    type IntoFuture = Boxed<Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

//! The write-only half of a future/promise pair.

use core::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::future::shared::Shared;

/// The exclusive writer bound to one [`Future`][crate::Future].
///
/// Whichever of [`success`][Promise::success], [`failure`][Promise::failure],
/// or [`complete`][Promise::complete] is called first fulfills the future;
/// later calls are silently ignored. A promise that is dropped without
/// fulfilling completes its future with [`Error::Dropped`] so no waiter can
/// block forever.
pub struct Promise<T: 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("fulfilled", &self.shared.is_fulfilled())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<T: 'static> Promise<T> {
    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Reports whether cancellation has been requested.
    ///
    /// Independent of fulfillment: a cancelled promise may still be
    /// fulfilled by an operation that notices the request late and completes
    /// with a cancellation error.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel_state().is_cancelled()
    }

    /// Registers a cleanup hook to run when the future is cancelled.
    ///
    /// Hooks run at most once across any number of cancel calls. If
    /// cancellation has already happened, the hook runs immediately on its
    /// own task.
    pub fn on_cancel<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.cancel_state().add_hook(Box::new(f));
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Fulfills the bound future with a value. No effect if already
    /// fulfilled.
    pub fn success(&self, value: T) {
        self.shared.fulfil(Ok(value));
    }

    /// Fulfills the bound future with an error. No effect if already
    /// fulfilled.
    pub fn failure(&self, error: Error) {
        self.shared.fulfil(Err(error));
    }

    /// Fulfills the bound future with a complete result, dispatching to
    /// [`success`][Promise::success] or [`failure`][Promise::failure]. No
    /// effect if already fulfilled.
    pub fn complete(&self, result: Result<T>) {
        self.shared.fulfil(result);
    }
}

impl<T: 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        // no-op when already fulfilled
        self.shared.fulfil_err(Error::Dropped);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn first_write_wins() {
        let (future, promise) = crate::new::<u32>();
        promise.success(1);
        promise.success(2);
        promise.failure(Error::msg("late"));
        assert_eq!(future.wait().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn drop_completes_with_error() {
        let (future, promise) = crate::new::<u32>();
        drop(promise);
        assert!(matches!(future.wait().await, Err(Error::Dropped)));
    }

    #[tokio::test]
    async fn complete_dispatches_on_error() {
        let (future, promise) = crate::new::<u32>();
        promise.complete(Err(Error::msg("nope")));
        assert_eq!(future.wait().await.unwrap_err().to_string(), "nope");
    }
}

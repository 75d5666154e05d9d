//! Fire-and-forget launchers.
//!
//! Thin wrappers over [`run`]/[`run_with_token`] that log failures and
//! trapped panics instead of surfacing them. They add no state or protocol
//! of their own.

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::executor::{run, run_with_token};

fn log_failure(error: Error) {
    tracing::error!(%error, "detached operation failed");
}

/// Runs an infallible operation in the background.
///
/// A panic inside the operation is trapped by the default executor and
/// logged, never propagated.
pub fn detach<F, Fut>(f: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: core::future::Future<Output = ()> + Send + 'static,
{
    try_detach(move || async move {
        f().await;
        Ok(())
    });
}

/// As [`detach`], handing the operation a child of `token`.
pub fn detach_with_token<F, Fut>(token: &CancellationToken, f: F)
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: core::future::Future<Output = ()> + Send + 'static,
{
    try_detach_with_token(token, move |token| async move {
        f(token).await;
        Ok(())
    });
}

/// Runs a fallible operation in the background, logging any failure.
pub fn try_detach<F, Fut>(f: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: core::future::Future<Output = Result<()>> + Send + 'static,
{
    run(f).on_error(log_failure);
}

/// As [`try_detach`], handing the operation a child of `token`.
pub fn try_detach_with_token<F, Fut>(token: &CancellationToken, f: F)
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: core::future::Future<Output = Result<()>> + Send + 'static,
{
    run_with_token(token, f).on_error(log_failure);
}

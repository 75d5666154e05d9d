use tokio_util::sync::CancellationToken;

use crate::executor::{Executor, Spawner};
use crate::future::{new, Future};

/// Returns a future holding the outcome of the future produced by `f` from
/// `future`'s success value, collapsing two levels of asynchrony into one.
///
/// If `future` fails, the failure propagates unchanged and `f` is never
/// invoked; if the nested future fails, its failure is the outcome.
pub fn flat_map<T, U, F>(future: Future<T>, f: F) -> Future<U>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(T) -> Future<U> + Send + 'static,
{
    flat_map_with_executor(&Spawner, future, f)
}

/// As [`flat_map`], driving the transform through `executor`.
pub fn flat_map_with_executor<E, T, U, F>(executor: &E, future: Future<T>, f: F) -> Future<U>
where
    E: Executor + ?Sized,
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(T) -> Future<U> + Send + 'static,
{
    let (output, promise) = new();
    executor.start(
        move || async move {
            let value = future.wait().await?;
            f(value).wait().await
        },
        promise,
    );
    output
}

/// As [`flat_map`], but both waits are abandoned with
/// [`Error::Cancelled`][crate::Error::Cancelled] if `token` fires first, and
/// `f` receives the token.
pub fn flat_map_with_token<T, U, F>(token: &CancellationToken, future: Future<T>, f: F) -> Future<U>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(CancellationToken, T) -> Future<U> + Send + 'static,
{
    let (output, promise) = new();
    Spawner.start_with_token(
        token.child_token(),
        move |token| async move {
            let value = future.wait_with_token(&token).await?;
            f(token.clone(), value).wait_with_token(&token).await
        },
        promise,
    );
    output
}

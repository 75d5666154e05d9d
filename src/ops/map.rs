use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::executor::{Executor, Spawner};
use crate::future::{new, Future};

/// Returns a future holding `f` applied to `future`'s success value.
///
/// If `future` fails, the failure propagates unchanged and `f` is never
/// invoked. A panic inside `f` fulfills the returned future with
/// [`Error::Panic`][crate::Error::Panic].
pub fn map<T, U, F>(future: Future<T>, f: F) -> Future<U>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(T) -> Result<U> + Send + 'static,
{
    map_with_executor(&Spawner, future, f)
}

/// As [`map`], driving the transform through `executor`.
pub fn map_with_executor<E, T, U, F>(executor: &E, future: Future<T>, f: F) -> Future<U>
where
    E: Executor + ?Sized,
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(T) -> Result<U> + Send + 'static,
{
    let (output, promise) = new();
    executor.start(
        move || async move {
            let value = future.wait().await?;
            f(value)
        },
        promise,
    );
    output
}

/// As [`map`], but the wait on `future` is abandoned with
/// [`Error::Cancelled`][crate::Error::Cancelled] if `token` fires first, and
/// `f` receives the token for cancellable work of its own.
pub fn map_with_token<T, U, F>(token: &CancellationToken, future: Future<T>, f: F) -> Future<U>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(CancellationToken, T) -> Result<U> + Send + 'static,
{
    let (output, promise) = new();
    Spawner.start_with_token(
        token.child_token(),
        move |token| async move {
            let value = future.wait_with_token(&token).await?;
            f(token, value)
        },
        promise,
    );
    output
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::future::{failed, ready};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn transforms_success() {
        let doubled = map(ready(21), |n: u32| Ok(n * 2));
        assert_eq!(doubled.wait().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn propagates_failure_without_invoking_f() {
        let invoked = Arc::new(AtomicBool::new(false));
        let seen = invoked.clone();
        let mapped: Future<u32> = map(failed(Error::msg("nope")), move |n: u32| {
            seen.store(true, Ordering::SeqCst);
            Ok(n)
        });
        assert_eq!(mapped.wait().await.unwrap_err().to_string(), "nope");
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn transform_panics_become_errors() {
        let mapped: Future<u32> = map(ready(1_u32), |_| panic!("bad transform"));
        let err = mapped.wait().await.unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("bad transform"));
    }

    #[tokio::test]
    async fn token_variant_aborts_the_wait() {
        let token = CancellationToken::new();
        token.cancel();
        let (input, _promise) = crate::new::<u32>();
        let mapped = map_with_token(&token, input, |_, n| Ok(n));
        assert!(mapped.wait().await.unwrap_err().is_cancelled());
    }
}

//! Cancellation tokens and deadlines.
//!
//! Cancellation is always carried by an explicit
//! [`CancellationToken`] parameter; there is no ambient cancellation state.
//! Deadlines are just tokens that fire on their own.

use std::time::Duration;

use tokio::runtime::Handle;

pub use tokio_util::sync::CancellationToken;

/// Returns a token that cancels itself once `timeout` elapses.
///
/// Waits abandoned through such a token surface the same
/// [`Error::Cancelled`][crate::Error::Cancelled] sentinel as explicit
/// cancellation.
pub fn with_deadline(timeout: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer = token.clone();
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if timer
                    .run_until_cancelled(tokio::time::sleep(timeout))
                    .await
                    .is_some()
                {
                    timer.cancel();
                }
            });
        }
        Err(_) => {
            std::thread::spawn(move || {
                std::thread::sleep(timeout);
                timer.cancel();
            });
        }
    }
    token
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn fires_after_the_timeout() {
        let token = with_deadline(Duration::from_millis(10));
        assert!(!token.is_cancelled());
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn manual_cancel_still_works() {
        let token = with_deadline(Duration::from_secs(60));
        token.cancel();
        assert!(token.is_cancelled());
    }
}

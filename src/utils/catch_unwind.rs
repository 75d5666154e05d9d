use core::any::Any;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::panic::{catch_unwind, AssertUnwindSafe};

use pin_project::pin_project;

/// Future adapter which traps panics raised while polling the inner future
/// and surfaces them as an `Err` carrying the panic payload.
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub(crate) struct CatchUnwind<F> {
    #[pin]
    inner: F,
}

impl<F> CatchUnwind<F> {
    pub(crate) fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: Future> Future for CatchUnwind<F> {
    type Output = Result<F::Output, Box<dyn Any + Send>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match catch_unwind(AssertUnwindSafe(|| this.inner.poll(cx))) {
            Ok(poll) => poll.map(Ok),
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_lite::future::block_on;

    #[test]
    fn passes_output_through() {
        let res = block_on(CatchUnwind::new(core::future::ready(12)));
        assert_eq!(res.unwrap(), 12);
    }

    #[test]
    fn traps_panics() {
        let res = block_on(CatchUnwind::new(async { panic!("boom"); }));
        let payload = res.unwrap_err();
        assert_eq!(crate::utils::payload_message(payload.as_ref()), "boom");
    }
}

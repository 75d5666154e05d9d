use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::Stream;
use pin_project::pin_project;

/// A one-element stream yielding the outcome of a [`Future`][crate::Future].
///
/// Created by [`Future::to_stream`][crate::Future::to_stream] and
/// [`Future::to_stream_with_token`][crate::Future::to_stream_with_token];
/// yields the memoized result once and then terminates, so futures can take
/// part in multiplexed-wait (`merge`-style) constructs.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct ResultStream<F> {
    #[pin]
    fut: Option<F>,
}

impl<F> ResultStream<F> {
    pub(crate) fn new(fut: F) -> Self {
        Self { fut: Some(fut) }
    }
}

impl<F> fmt::Debug for ResultStream<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream")
            .field("terminated", &self.fut.is_none())
            .finish()
    }
}

impl<F: Future> Stream for ResultStream<F> {
    type Item = F::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        match this.fut.as_mut().as_pin_mut() {
            None => Poll::Ready(None),
            Some(fut) => match fut.poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(output) => {
                    this.fut.set(None);
                    Poll::Ready(Some(output))
                }
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(self.fut.is_some());
        (remaining, Some(remaining))
    }
}

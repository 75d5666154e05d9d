//! Internal helpers shared across the crate.

use core::any::Any;
use core::future::Future;

use tokio::runtime::Handle;

pub(crate) use catch_unwind::CatchUnwind;

mod catch_unwind;

/// Spawns `fut` as an independently scheduled task.
///
/// Uses the ambient tokio runtime when one is present. Completion can also be
/// triggered from a plain thread, in which case the task is driven on a
/// dedicated thread instead so caller code never runs inline with the
/// fulfiller.
pub(crate) fn spawn_detached<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
        }
        Err(_) => {
            std::thread::spawn(move || futures_lite::future::block_on(fut));
        }
    }
}

/// Best-effort extraction of a human-readable message from a panic payload.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn payload_message_downcasts() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(payload_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(payload_message(boxed.as_ref()), "kaboom");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(payload_message(boxed.as_ref()), "non-string panic payload");
    }
}

//! Future/Promise pairs for eventual results.
//!
//! A [`Future`] is a read-only, cloneable handle to the eventual outcome of
//! a concurrently executing operation; its [`Promise`] is the single writer.
//! Fulfillment is write-once: whichever of [`Promise::success`],
//! [`Promise::failure`], or [`Promise::complete`] runs first stores the
//! result, wakes every blocked waiter at once, and fires each registered
//! callback on its own task. Cancellation is cooperative, carried by
//! explicit [`CancellationToken`] parameters, and panics anywhere in an
//! operation or callback are trapped rather than allowed to crash the
//! process.
//!
//! # Operations
//!
//! - [`new`]: create a connected future/promise pair.
//! - [`run`] / [`run_with_token`] / [`run_with_executor`]: start an
//!   operation and wrap its outcome; [`ready`] and [`failed`] wrap a known
//!   outcome without spawning.
//! - [`Future::wait`] / [`Future::wait_with_token`] /
//!   [`Future::to_stream`]: consume the outcome.
//! - [`Future::on_success`] / [`Future::on_error`] / [`Future::on_result`]
//!   (and `_with_token` forms): react to the outcome.
//! - [`map`] / [`flat_map`] / [`combine`] / [`combine_all`]: build new
//!   futures out of existing ones.
//! - [`detach`] / [`try_detach`] (and `_with_token` forms): fire-and-forget,
//!   logging failures instead of surfacing them.
//!
//! # Examples
//!
//! ```
//! use async_promise::{combine, run};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let futures = (1..=3)
//!     .map(|n| run(move || async move { Ok(n * 10) }))
//!     .collect();
//! let all = combine(futures);
//! assert_eq!(all.wait().await.unwrap(), vec![10, 20, 30]);
//! # }
//! ```

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod error;
mod executor;
mod future;
mod ops;
mod promise;
mod spawn;
mod token;
mod utils;

pub use error::{AggregateError, Error, OpaqueError, PanicError, Result};
pub use executor::{run, run_with_executor, run_with_token, Executor, Spawner};
pub use future::{failed, new, ready, Future, ResultStream};
pub use ops::{
    combine, combine_all, combine_all_with_executor, combine_all_with_token,
    combine_with_executor, combine_with_token, flat_map, flat_map_with_executor,
    flat_map_with_token, map, map_with_executor, map_with_token,
};
pub use promise::Promise;
pub use spawn::{detach, detach_with_token, try_detach, try_detach_with_token};
pub use token::{with_deadline, CancellationToken};

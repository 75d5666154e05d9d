//! Composition operators over futures.
//!
//! Every operator builds an ordinary future/promise pair internally and
//! drives it by waiting on its inputs, so all fulfillment guarantees
//! (write-once, broadcast wakeup, panic trapping) carry over. Each operator
//! comes in three forms:
//!
//! - the plain form, driven by the default [`Spawner`][crate::Spawner];
//! - a `_with_token` form that abandons the *wait* with
//!   [`Error::Cancelled`][crate::Error::Cancelled] when the token fires
//!   (the inputs keep running);
//! - a `_with_executor` form that substitutes the execution strategy used
//!   internally.
//!
//! | Name          | Semantics                                              |
//! | ---           | ---                                                    |
//! | [`map`]       | Transform a success value; errors pass through         |
//! | [`flat_map`]  | Transform into another future; collapses the nesting   |
//! | [`combine`]   | Wait for all, fail fast on the first observed error    |
//! | [`combine_all`] | Wait for all, aggregate every failure                |

pub use combine::{
    combine, combine_all, combine_all_with_executor, combine_all_with_token,
    combine_with_executor, combine_with_token,
};
pub use flat_map::{flat_map, flat_map_with_executor, flat_map_with_token};
pub use map::{map, map_with_executor, map_with_token};

mod combine;
mod flat_map;
mod map;

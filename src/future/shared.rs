//! The state cell shared between a future and its promise.
//!
//! All mutation happens inside the fulfillment protocol: take the state lock,
//! bail if already fulfilled, snapshot and clear the queued callbacks, store
//! the result, flip the broadcast signal, release the lock, then fire every
//! snapshotted callback on its own task. Registration takes the same lock, so
//! a registration call that returns before fulfillment is always captured by
//! the snapshot and fires exactly once.

use core::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use smallvec::SmallVec;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::utils;

pub(crate) type SuccessFn<T> = Box<dyn FnOnce(T) + Send>;
pub(crate) type ErrorFn = Box<dyn FnOnce(Error) + Send>;
pub(crate) type ResultFn<T> = Box<dyn FnOnce(Result<T>) + Send>;
pub(crate) type TokenSuccessFn<T> = Box<dyn FnOnce(CancellationToken, T) + Send>;
pub(crate) type TokenErrorFn = Box<dyn FnOnce(CancellationToken, Error) + Send>;
pub(crate) type TokenResultFn<T> = Box<dyn FnOnce(CancellationToken, Result<T>) + Send>;
pub(crate) type CancelFn = Box<dyn FnOnce() + Send>;

// No user code ever runs while these locks are held, so a poisoned lock can
// only mean a panic between us and the guard; recover the data either way.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callbacks queued while the future is pending.
///
/// Token-aware entries keep the token supplied at registration time; on
/// dispatch the callback receives a child token scoped to its own execution.
pub(crate) struct Callbacks<T> {
    success: SmallVec<[SuccessFn<T>; 2]>,
    error: SmallVec<[ErrorFn; 2]>,
    result: SmallVec<[ResultFn<T>; 2]>,
    token_success: SmallVec<[(CancellationToken, TokenSuccessFn<T>); 2]>,
    token_error: SmallVec<[(CancellationToken, TokenErrorFn); 2]>,
    token_result: SmallVec<[(CancellationToken, TokenResultFn<T>); 2]>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            success: SmallVec::new(),
            error: SmallVec::new(),
            result: SmallVec::new(),
            token_success: SmallVec::new(),
            token_error: SmallVec::new(),
            token_result: SmallVec::new(),
        }
    }
}

impl<T: Clone + Send + 'static> Callbacks<T> {
    fn dispatch_ok(self, value: T) {
        for cb in self.result {
            let value = value.clone();
            run_callback("on_result", move || cb(Ok(value)));
        }
        for (token, cb) in self.token_result {
            let value = value.clone();
            let scope = token.child_token();
            run_callback("on_result", move || cb(scope, Ok(value)));
        }
        for cb in self.success {
            let value = value.clone();
            run_callback("on_success", move || cb(value));
        }
        for (token, cb) in self.token_success {
            let value = value.clone();
            let scope = token.child_token();
            run_callback("on_success", move || cb(scope, value));
        }
        // error callbacks never fire for a success; they are dropped here
    }
}

impl<T: 'static> Callbacks<T> {
    fn dispatch_err(self, error: Error) {
        for cb in self.result {
            let error = error.clone();
            run_callback("on_result", move || cb(Err(error)));
        }
        for (token, cb) in self.token_result {
            let error = error.clone();
            let scope = token.child_token();
            run_callback("on_result", move || cb(scope, Err(error)));
        }
        for cb in self.error {
            let error = error.clone();
            run_callback("on_error", move || cb(error));
        }
        for (token, cb) in self.token_error {
            let error = error.clone();
            let scope = token.child_token();
            run_callback("on_error", move || cb(scope, error));
        }
    }
}

/// Runs a single registered callback on its own task, trapping panics so no
/// callback can affect the stored result, other callbacks, or the process.
pub(crate) fn run_callback(kind: &'static str, cb: impl FnOnce() + Send + 'static) {
    utils::spawn_detached(async move {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(cb)) {
            tracing::error!(
                callback = kind,
                message = utils::payload_message(payload.as_ref()),
                "future callback panicked"
            );
        }
    });
}

enum State<T> {
    Pending(Callbacks<T>),
    Fulfilled(Result<T>),
}

/// Cancellation flag plus cleanup hooks, independent of fulfillment state.
pub(crate) struct CancelState {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<CancelFn>>,
}

impl CancelState {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            hooks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Marks the state cancelled and runs the registered hooks. Only the
    /// first call has any effect.
    pub(crate) fn cancel(&self) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let hooks = mem::take(&mut *lock(&self.hooks));
        for hook in hooks {
            run_callback("on_cancel", hook);
        }
    }

    /// Queues a cleanup hook, or runs it immediately when cancellation has
    /// already happened.
    pub(crate) fn add_hook(&self, hook: CancelFn) {
        {
            let mut hooks = lock(&self.hooks);
            if !self.is_cancelled() {
                hooks.push(hook);
                return;
            }
        }
        run_callback("on_cancel", hook);
    }
}

pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
    done: watch::Sender<bool>,
    cancel: CancelState,
}

impl<T> Shared<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending(Callbacks::default())),
            done: watch::channel(false).0,
            cancel: CancelState::new(),
        }
    }

    pub(crate) fn cancel_state(&self) -> &CancelState {
        &self.cancel
    }

    pub(crate) fn is_fulfilled(&self) -> bool {
        matches!(*lock(&self.state), State::Fulfilled(_))
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.done.subscribe()
    }
}

impl<T: 'static> Shared<T> {
    /// Fulfills with an error without touching any stored success values.
    /// This is the path `Promise::drop` takes, where `T: Clone` is not
    /// available.
    pub(crate) fn fulfil_err(&self, error: Error) -> bool {
        let callbacks = {
            let mut state = lock(&self.state);
            let callbacks = match &mut *state {
                State::Fulfilled(_) => return false,
                State::Pending(callbacks) => mem::take(callbacks),
            };
            *state = State::Fulfilled(Err(error.clone()));
            // waiters observe the flip only after the result is stored
            self.done.send_replace(true);
            callbacks
        };
        callbacks.dispatch_err(error);
        true
    }
}

impl<T: Clone + Send + 'static> Shared<T> {
    pub(crate) fn peek(&self) -> Option<Result<T>> {
        match &*lock(&self.state) {
            State::Pending(_) => None,
            State::Fulfilled(result) => Some(result.clone()),
        }
    }

    /// The fulfillment protocol. Returns `false` when the future was already
    /// fulfilled and the call had no effect.
    pub(crate) fn fulfil(&self, result: Result<T>) -> bool {
        match result {
            Ok(value) => self.fulfil_ok(value),
            Err(error) => self.fulfil_err(error),
        }
    }

    fn fulfil_ok(&self, value: T) -> bool {
        let callbacks = {
            let mut state = lock(&self.state);
            let callbacks = match &mut *state {
                State::Fulfilled(_) => return false,
                State::Pending(callbacks) => mem::take(callbacks),
            };
            *state = State::Fulfilled(Ok(value.clone()));
            self.done.send_replace(true);
            callbacks
        };
        callbacks.dispatch_ok(value);
        true
    }

    pub(crate) fn push_success(&self, cb: SuccessFn<T>) {
        let fired = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.success.push(cb);
                    return;
                }
                State::Fulfilled(result) => result.as_ref().ok().cloned(),
            }
        };
        if let Some(value) = fired {
            run_callback("on_success", move || cb(value));
        }
    }

    pub(crate) fn push_error(&self, cb: ErrorFn) {
        let fired = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.error.push(cb);
                    return;
                }
                State::Fulfilled(result) => result.as_ref().err().cloned(),
            }
        };
        if let Some(error) = fired {
            run_callback("on_error", move || cb(error));
        }
    }

    pub(crate) fn push_result(&self, cb: ResultFn<T>) {
        let fired = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.result.push(cb);
                    return;
                }
                State::Fulfilled(result) => result.clone(),
            }
        };
        run_callback("on_result", move || cb(fired));
    }

    pub(crate) fn push_token_success(&self, token: CancellationToken, cb: TokenSuccessFn<T>) {
        let fired = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.token_success.push((token, cb));
                    return;
                }
                State::Fulfilled(result) => result.as_ref().ok().cloned(),
            }
        };
        if let Some(value) = fired {
            let scope = token.child_token();
            run_callback("on_success", move || cb(scope, value));
        }
    }

    pub(crate) fn push_token_error(&self, token: CancellationToken, cb: TokenErrorFn) {
        let fired = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.token_error.push((token, cb));
                    return;
                }
                State::Fulfilled(result) => result.as_ref().err().cloned(),
            }
        };
        if let Some(error) = fired {
            let scope = token.child_token();
            run_callback("on_error", move || cb(scope, error));
        }
    }

    pub(crate) fn push_token_result(&self, token: CancellationToken, cb: TokenResultFn<T>) {
        let fired = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.token_result.push((token, cb));
                    return;
                }
                State::Fulfilled(result) => result.clone(),
            }
        };
        let scope = token.child_token();
        run_callback("on_result", move || cb(scope, fired));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_write_wins() {
        let shared: Shared<u32> = Shared::new();
        assert!(shared.fulfil(Ok(1)));
        assert!(!shared.fulfil(Ok(2)));
        assert!(!shared.fulfil_err(Error::msg("late")));
        assert_eq!(shared.peek().unwrap().unwrap(), 1);
        assert!(shared.is_fulfilled());
    }

    #[test]
    fn peek_is_none_while_pending() {
        let shared: Shared<u32> = Shared::new();
        assert!(shared.peek().is_none());
        assert!(!shared.is_fulfilled());
    }

    #[test]
    fn cancel_state_runs_once() {
        let state = CancelState::new();
        assert!(!state.is_cancelled());
        state.cancel();
        state.cancel();
        assert!(state.is_cancelled());
    }
}

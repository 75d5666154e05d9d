//! Error types shared by futures, promises, and combinators.
//!
//! Every failure funnels into [`Error`], which is cheap to clone so the
//! memoized outcome of a future can be handed to any number of waiters and
//! callbacks.

use core::any::Any;
use core::fmt;
use core::ops::{Deref, DerefMut};
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::utils;

/// The result of an eventually-completed operation.
pub type Result<T> = core::result::Result<T, Error>;

/// The error half of a future's outcome.
///
/// All variants are cheaply cloneable; heavyweight contents sit behind an
/// `Arc` so a single stored outcome can fan out to every reader.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Failure reported by the operation itself.
    #[error(transparent)]
    Operation(OpaqueError),

    /// An ad-hoc, message-only failure.
    #[error("{0}")]
    Message(Arc<str>),

    /// The operation panicked; the panic was trapped and converted.
    #[error("operation panicked: {0}")]
    Panic(PanicError),

    /// A wait or operation was abandoned because its cancellation token
    /// fired, either explicitly or through a deadline.
    #[error("cancelled before completion")]
    Cancelled,

    /// The promise was dropped without ever being fulfilled.
    #[error("promise dropped before completion")]
    Dropped,

    /// Multiple operations failed; carries every constituent failure.
    #[error(transparent)]
    Aggregate(AggregateError),
}

impl Error {
    /// Wraps an arbitrary error value.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Operation(OpaqueError(Arc::new(error)))
    }

    /// Creates a message-only error.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::Message(message.to_string().into())
    }

    /// Returns `true` if this error marks a wait aborted by a cancellation
    /// token rather than a failure of the operation itself.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this error was converted from a trapped panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// Attempts to downcast a wrapped operation error to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Operation(OpaqueError(inner)) => inner.downcast_ref(),
            _ => None,
        }
    }

    /// Returns the constituent failures of an aggregate error.
    pub fn aggregated(&self) -> Option<&[Error]> {
        match self {
            Self::Aggregate(errors) => Some(errors.inner.as_slice()),
            _ => None,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = utils::payload_message(payload.as_ref());
        Self::Panic(PanicError {
            message: message.into(),
            backtrace: Arc::new(Backtrace::force_capture()),
        })
    }

    pub(crate) fn aggregate(errors: Vec<Error>) -> Self {
        Self::Aggregate(AggregateError::new(errors))
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::Message(message.into())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Message(message.into())
    }
}

/// A type-erased operation error with its source chain intact.
#[derive(Debug, Clone)]
pub struct OpaqueError(Arc<dyn StdError + Send + Sync>);

impl fmt::Display for OpaqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for OpaqueError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// A panic converted into an error: the payload message plus a backtrace
/// captured at the trap site.
#[derive(Debug, Clone)]
pub struct PanicError {
    message: Arc<str>,
    backtrace: Arc<Backtrace>,
}

impl PanicError {
    /// The panic payload rendered as text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The backtrace captured where the panic was trapped.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\nstack backtrace:\n{}", self.message, self.backtrace)
    }
}

impl StdError for PanicError {}

/// A collection of errors produced by a no-short-circuit fan-in.
#[derive(Clone)]
pub struct AggregateError {
    inner: Vec<Error>,
}

impl AggregateError {
    pub(crate) fn new(inner: Vec<Error>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}:")?;

        for (i, err) in self.inner.iter().enumerate() {
            writeln!(f, "- Error {}: {err}", i + 1)?;
        }

        Ok(())
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred", self.inner.len())
    }
}

impl Deref for AggregateError {
    type Target = Vec<Error>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for AggregateError {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl StdError for AggregateError {}

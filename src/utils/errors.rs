//! Application errors.

use std::fmt::Display;

use derive_more::Display;
use tracerr::{Trace, Traced};

use crate::platform;

/// Representation of an error which can be caused by an error returned from
/// the underlying platform (a JS exception in a browser).
pub trait Caused {
    /// Type of the wrapped platform error.
    type Error;

    /// Returns a name of this error.
    fn name(&self) -> &'static str;

    /// Returns a platform error if it is the cause.
    fn cause(self) -> Option<Self::Error>;
}

/// Application error exported to the embedder.
///
/// Carries the platform error when it is the cause, and the trace of the
/// propagation path.
#[derive(Clone, Debug, Display)]
#[display(fmt = "{}: {}\n{}", name, message, trace)]
pub struct StagehandError {
    name: &'static str,
    message: String,
    trace: Trace,
    source: Option<platform::Error>,
}

impl StagehandError {
    /// Returns a name of this error.
    #[inline]
    #[must_use]
    pub fn name(&self) -> String {
        String::from(self.name)
    }

    /// Returns a message of this error.
    #[inline]
    #[must_use]
    pub fn message(&self) -> String {
        self.message.clone()
    }

    /// Returns a trace of this error's propagation path.
    #[inline]
    #[must_use]
    pub fn trace(&self) -> String {
        self.trace.to_string()
    }

    /// Returns the platform error this error is caused by (if any).
    #[inline]
    #[must_use]
    pub fn source(&self) -> Option<platform::Error> {
        self.source.clone()
    }

    /// Prints this error with `log::error!()`.
    #[inline]
    pub fn print(&self) {
        log::error!("{}", self);
    }
}

impl<E: Caused<Error = platform::Error> + Display> From<(E, Trace)>
    for StagehandError
{
    fn from((err, trace): (E, Trace)) -> Self {
        Self {
            name: err.name(),
            message: err.to_string(),
            trace,
            source: err.cause(),
        }
    }
}

impl<E: Caused<Error = platform::Error> + Display> From<Traced<E>>
    for StagehandError
{
    #[inline]
    fn from(traced: Traced<E>) -> Self {
        Self::from(traced.into_parts())
    }
}

/// Occurs if a referenced object was dropped.
#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "Handle is in detached state")]
pub struct HandlerDetachedError;

impl Caused for HandlerDetachedError {
    type Error = platform::Error;

    fn name(&self) -> &'static str {
        "Detached"
    }

    fn cause(self) -> Option<Self::Error> {
        None
    }
}

/// Upgrades a provided [`Weak`] reference, or returns
/// [`HandlerDetachedError`] wrapped into [`tracerr::Traced`].
///
/// [`Weak`]: std::rc::Weak
#[macro_export]
macro_rules! upgrade_or_detached {
    ($v:expr) => {
        $v.upgrade().ok_or_else(|| {
            tracerr::new!($crate::utils::errors::HandlerDetachedError)
        })
    };
}

//! Platform error of the native adapter.

use derive_more::Display;

/// Wrapper for a platform error.
///
/// Mirrors the shape of a DOM exception: a well-known name plus a
/// human-readable message.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "{}: {}", name, message)]
pub struct Error {
    name: String,
    message: String,
}

impl Error {
    /// Creates a new [`Error`] with the given `name` and `message`.
    #[inline]
    #[must_use]
    pub fn new<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns a name of this error (e.g. `NotAllowedError`).
    #[inline]
    #[must_use]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    /// Returns a message of this error.
    #[inline]
    #[must_use]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

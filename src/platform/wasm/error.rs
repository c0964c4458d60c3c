//! Platform error of the browser adapter.

use std::fmt;

use wasm_bindgen::{JsCast as _, JsValue};

/// Wrapper for a JS exception.
///
/// Keeps the DOM exception name and message extracted eagerly, so the
/// error stays usable after crossing back into Rust-only code.
#[derive(Clone, Debug)]
pub struct Error {
    name: String,
    message: String,
    sys: Option<js_sys::Error>,
}

impl Error {
    /// Creates a new [`Error`] with the given `name` and `message`, not
    /// backed by any JS exception.
    #[must_use]
    pub fn new<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            sys: None,
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

    /// Returns the underlying JS exception, materializing one from the
    /// name and message when this error was born on the Rust side.
    #[must_use]
    pub fn sys_cause(&self) -> js_sys::Error {
        self.sys.clone().unwrap_or_else(|| {
            let err = js_sys::Error::new(&self.message);
            err.set_name(&self.name);
            err
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl From<JsValue> for Error {
    fn from(value: JsValue) -> Self {
        match value.dyn_into::<js_sys::Error>() {
            Ok(err) => Self {
                name: String::from(err.name()),
                message: String::from(err.message()),
                sys: Some(err),
            },
            Err(value) => Self {
                name: String::from("UnknownError"),
                message: value
                    .as_string()
                    .unwrap_or_else(|| String::from("no error message")),
                sys: None,
            },
        }
    }
}

//! Application error exported to the JS side.

use wasm_bindgen::prelude::*;

use crate::utils::errors::StagehandError as CoreError;

/// Application error exported to the JS side.
///
/// Carries the JS exception when it is the cause, and the trace of the
/// propagation path.
#[wasm_bindgen]
pub struct StagehandError(CoreError);

#[wasm_bindgen]
impl StagehandError {
    /// Returns a name of this error.
    #[must_use]
    pub fn name(&self) -> String {
        self.0.name()
    }

    /// Returns a message of this error.
    #[must_use]
    pub fn message(&self) -> String {
        self.0.message()
    }

    /// Returns a trace of this error's propagation path.
    #[must_use]
    pub fn trace(&self) -> String {
        self.0.trace()
    }

    /// Returns the JS exception this error is caused by, if any.
    #[must_use]
    pub fn source(&self) -> Option<js_sys::Error> {
        self.0.source().map(|cause| cause.sys_cause())
    }
}

impl From<CoreError> for StagehandError {
    fn from(err: CoreError) -> Self {
        err.print();
        Self(err)
    }
}

impl<E> From<tracerr::Traced<E>> for StagehandError
where
    CoreError: From<tracerr::Traced<E>>,
{
    fn from(traced: tracerr::Traced<E>) -> Self {
        Self::from(CoreError::from(traced))
    }
}

//! Functionality for calling platform callbacks.

use std::{cell::RefCell, marker::PhantomData};

use wasm_bindgen::JsValue;

/// Typed wrapper for a [`js_sys::Function`].
pub struct Function<T> {
    inner: js_sys::Function,
    _arg: PhantomData<T>,
}

impl Function<()> {
    /// Invokes the underlying JS function with no arguments.
    pub fn call0(&self) {
        drop(self.inner.call0(&JsValue::NULL));
    }
}

impl<T: Into<JsValue>> Function<T> {
    /// Invokes the underlying JS function with the given argument.
    pub fn call1(&self, arg: T) {
        drop(self.inner.call1(&JsValue::NULL, &arg.into()));
    }
}

impl<T> From<js_sys::Function> for Function<T> {
    fn from(func: js_sys::Function) -> Self {
        Self {
            inner: func,
            _arg: PhantomData,
        }
    }
}

/// Wrapper for a single argument callback function.
pub struct Callback<A>(RefCell<Option<Function<A>>>);

impl<A> Callback<A> {
    /// Sets the inner [`Function`].
    #[inline]
    pub fn set_func(&self, f: Function<A>) {
        self.0.borrow_mut().replace(f);
    }

    /// Indicates whether this [`Callback`] is set.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl<A: Into<JsValue>> Callback<A> {
    /// Invokes the underlying [`Function`] (if any) with the given
    /// argument.
    pub fn call1(&self, arg: A) {
        if let Some(f) = self.0.borrow().as_ref() {
            f.call1(arg);
        }
    }
}

impl Callback<()> {
    /// Invokes the underlying [`Function`] (if any) with no arguments.
    pub fn call0(&self) {
        if let Some(f) = self.0.borrow().as_ref() {
            f.call0();
        }
    }
}

impl<A> Default for Callback<A> {
    #[inline]
    fn default() -> Self {
        Self(RefCell::new(None))
    }
}

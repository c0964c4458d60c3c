//! Functionality for calling platform callbacks.

use std::{cell::RefCell, rc::Rc};

/// Wrapper for a single argument callback function.
pub struct Callback<A>(RefCell<Option<Rc<dyn Fn(A)>>>);

impl<A> Callback<A> {
    /// Sets the inner function.
    #[inline]
    pub fn set<F: Fn(A) + 'static>(&self, f: F) {
        self.0.borrow_mut().replace(Rc::new(f));
    }

    /// Indicates whether this [`Callback`] is set.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Invokes the underlying function (if any) with the given argument.
    pub fn call1(&self, arg: A) {
        let f = self.0.borrow().clone();
        if let Some(f) = f {
            f(arg);
        }
    }
}

impl Callback<()> {
    /// Invokes the underlying function (if any) passing no arguments.
    #[inline]
    pub fn call0(&self) {
        self.call1(());
    }
}

impl<A> Default for Callback<A> {
    #[inline]
    fn default() -> Self {
        Self(RefCell::new(None))
    }
}

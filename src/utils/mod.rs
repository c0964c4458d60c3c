//! Miscellaneous utility structs and functions.

#[macro_use]
pub mod errors;

pub use self::errors::{Caused, HandlerDetachedError, StagehandError};

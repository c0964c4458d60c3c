//! External API of the library.

#[cfg(target_arch = "wasm32")]
pub mod wasm;

//! Binary blob of the browser adapter.

use derive_more::From;
use wasm_bindgen::{JsValue, UnwrapThrowExt as _};

/// Wrapper around a [`web_sys::Blob`].
#[derive(Clone, Debug, From)]
pub struct Blob(web_sys::Blob);

impl Blob {
    /// Returns the size of this [`Blob`] in bytes.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.0.size() as u64
    }

    /// Returns the MIME type of this [`Blob`].
    #[inline]
    #[must_use]
    pub fn mime_type(&self) -> String {
        self.0.type_()
    }

    /// Returns a new [`Blob`] viewing the `[start, end)` byte range of
    /// this one.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn slice(&self, start: u64, end: u64) -> Self {
        Self(
            self.0
                .slice_with_f64_and_f64(start as f64, end as f64)
                .unwrap_throw(),
        )
    }

    /// Concatenates the given `parts` into one [`Blob`] in order.
    #[must_use]
    pub fn concat<M: Into<String>>(parts: &[Self], mime_type: M) -> Self {
        let sequence = js_sys::Array::new();
        for part in parts {
            sequence.push(part.0.as_ref());
        }
        let mut options = web_sys::BlobPropertyBag::new();
        options.type_(&mime_type.into());
        Self(
            web_sys::Blob::new_with_blob_sequence_and_options(
                sequence.as_ref(),
                &options,
            )
            .unwrap_throw(),
        )
    }

    /// Returns the underlying [`web_sys::Blob`].
    #[inline]
    #[must_use]
    pub fn as_sys(&self) -> &web_sys::Blob {
        &self.0
    }

    /// Returns the underlying [`web_sys::Blob`] as a [`JsValue`].
    #[inline]
    #[must_use]
    pub fn to_js(&self) -> JsValue {
        self.0.clone().into()
    }
}

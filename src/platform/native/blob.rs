//! Binary blob of the native adapter.

use std::rc::Rc;

/// Immutable binary blob with a MIME type.
///
/// Cheap to clone and to slice: all views share one underlying buffer.
#[derive(Clone, Debug)]
pub struct Blob {
    data: Rc<Vec<u8>>,
    start: usize,
    end: usize,
    mime_type: String,
}

impl Blob {
    /// Creates a new [`Blob`] owning the given bytes.
    #[must_use]
    pub fn from_bytes<M: Into<String>>(data: Vec<u8>, mime_type: M) -> Self {
        let end = data.len();
        Self {
            data: Rc::new(data),
            start: 0,
            end,
            mime_type: mime_type.into(),
        }
    }

    /// Returns the size of this [`Blob`] in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        (self.end - self.start) as u64
    }

    /// Returns the MIME type of this [`Blob`].
    #[inline]
    #[must_use]
    pub fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    /// Returns a new [`Blob`] viewing the `[start, end)` byte range of this
    /// one. The range is clamped to this [`Blob`]'s bounds.
    #[must_use]
    pub fn slice(&self, start: u64, end: u64) -> Self {
        let len = self.size();
        let start = start.min(len) as usize;
        let end = end.min(len).max(start as u64) as usize;
        Self {
            data: Rc::clone(&self.data),
            start: self.start + start,
            end: self.start + end,
            mime_type: self.mime_type.clone(),
        }
    }

    /// Concatenates the given `parts` into one [`Blob`] in order.
    #[must_use]
    pub fn concat<M: Into<String>>(parts: &[Self], mime_type: M) -> Self {
        let mut data =
            Vec::with_capacity(parts.iter().map(|p| p.size() as usize).sum());
        for part in parts {
            data.extend_from_slice(part.as_bytes());
        }
        Self::from_bytes(data, mime_type)
    }

    /// Returns the bytes viewed by this [`Blob`].
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicing_views_share_the_buffer() {
        let blob = Blob::from_bytes((0..=9).collect(), "video/webm");

        let head = blob.slice(0, 4);
        let tail = blob.slice(4, 100);

        assert_eq!(head.as_bytes(), &[0, 1, 2, 3]);
        assert_eq!(tail.as_bytes(), &[4, 5, 6, 7, 8, 9]);
        assert_eq!(head.size() + tail.size(), blob.size());
    }

    #[test]
    fn concat_preserves_order() {
        let parts = vec![
            Blob::from_bytes(vec![1], "video/webm"),
            Blob::from_bytes(vec![2], "video/webm"),
            Blob::from_bytes(vec![3], "video/webm"),
        ];

        let whole = Blob::concat(&parts, "video/webm");

        assert_eq!(whole.as_bytes(), &[1, 2, 3]);
    }
}

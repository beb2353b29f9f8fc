//! Caller-owned growable string buffer for the string getter.

use crate::error::ResultSetError;

/// Outcome of writing a cell into a [`StringBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringWrite {
    /// Bytes written
    pub len: usize,
    /// Buffer capacity after the write
    pub capacity: usize,
    /// Whether the buffer had to be reallocated
    pub grown: bool,
    /// Whether the cell was NULL (the buffer is left empty)
    pub is_null: bool,
}

/// A reusable text buffer the string getter writes into.
///
/// The getter grows the buffer when a value does not fit and reports the new
/// capacity back; values are never truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringBuffer {
    inner: String,
}

impl StringBuffer {
    /// An empty buffer without an allocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty buffer with at least `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: String::with_capacity(capacity),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn into_string(self) -> String {
        self.inner
    }

    /// Replace the contents with `value`, growing the allocation if needed.
    ///
    /// # Errors
    /// Returns `ResultSetError::OutOfRange` if the allocation cannot grow.
    pub(crate) fn assign(&mut self, value: &str) -> Result<StringWrite, ResultSetError> {
        let before = self.inner.capacity();
        self.inner.clear();
        if value.len() > before {
            self.inner.try_reserve_exact(value.len()).map_err(|e| {
                ResultSetError::OutOfRange(format!(
                    "cannot grow string buffer to {} bytes: {}",
                    value.len(),
                    e
                ))
            })?;
        }
        self.inner.push_str(value);

        Ok(StringWrite {
            len: self.inner.len(),
            capacity: self.inner.capacity(),
            grown: self.inner.capacity() != before,
            is_null: false,
        })
    }

    /// Empty the buffer for a NULL cell.
    pub(crate) fn assign_null(&mut self) -> StringWrite {
        self.inner.clear();
        StringWrite {
            len: 0,
            capacity: self.inner.capacity(),
            grown: false,
            is_null: true,
        }
    }
}

impl From<String> for StringBuffer {
    fn from(inner: String) -> Self {
        Self { inner }
    }
}

impl AsRef<str> for StringBuffer {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

//! Error taxonomy for the CS codec.
//!
//! Every error the codec can produce is a distinct, matchable variant so
//! that a caller can tell a truncated stream apart from a malformed v6
//! block section instead of staring at an opaque string.

use thiserror::Error as ThisError;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while reading or writing a CS file.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Header claimed a version outside the supported `1..=6` range.
    #[error("unsupported CS file version {0}, must be 1..=6")]
    UnsupportedVersion(i16),

    /// The stream ended before a field could be fully read.
    #[error("stream truncated: wanted {wanted} bytes, got {got}")]
    Truncated {
        /// Bytes the caller asked for.
        wanted: usize,
        /// Bytes actually available.
        got: usize,
    },

    /// The v6 block section's length accounting didn't work out: either
    /// the running `section_size` counter went negative, or a block
    /// decoder consumed a different number of bytes than its declared
    /// `block_size`.
    #[error("malformed v6 block section: {0}")]
    MalformedBlockSection(String),

    /// Two codecs were registered for the same tag.
    #[error("duplicate block codec registered for tag {0:?}")]
    DuplicateTag(Tag),

    /// A recognized block's payload didn't match its schema.
    #[error("failed to decode block {tag:?}: {cause}")]
    BlockDecodeFailed {
        /// The tag whose decoder failed.
        tag: Tag,
        /// Human-readable cause.
        cause: String,
    },

    /// `num_doppler_cells` or `num_range_cells` was non-positive when
    /// reading the spectrum.
    #[error("invalid spectrum dimensions: num_range_cells={num_range_cells}, num_doppler_cells={num_doppler_cells}")]
    InvalidDimensions {
        /// Declared range cell count.
        num_range_cells: i32,
        /// Declared doppler cell count.
        num_doppler_cells: i32,
    },

    /// Underlying I/O failure not otherwise classified.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A 4-character block tag, e.g. `ZONE` or `TIME`.
///
/// Kept as a fixed-size byte array rather than a `String` so it's cheap
/// to copy into error values and hash-map keys alike.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Build a tag from a 4-byte ASCII string literal, e.g. `Tag::new(b"ZONE")`.
    #[must_use]
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    /// Return the tag as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Render the tag as a `str` if it's valid ASCII, for display purposes.
    #[must_use]
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_display_round_trips_ascii() {
        let tag = Tag::new(b"ZONE");
        assert_eq!(format!("{tag}"), "ZONE");
        assert_eq!(format!("{tag:?}"), "ZONE");
    }

    #[test]
    fn error_messages_are_human_readable() {
        let e = Error::UnsupportedVersion(9);
        assert_eq!(format!("{e}"), "unsupported CS file version 9, must be 1..=6");
    }
}

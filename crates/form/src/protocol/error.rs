use std::io;
use thiserror::Error;

/// Fatal errors raised while decoding a form body or a query string.
///
/// The too-large condition is deliberately *not* part of this enum: exceeding
/// the byte budget is an expected outcome that callers must map to an HTTP
/// response themselves, so it is surfaced as [`FormOutcome::TooLarge`] rather
/// than raised through the error channel. The one exception is
/// [`FormError::TooLargeHeader`], which the decoder uses internally while
/// scanning a part's header block and which the reader converts into the
/// too-large outcome before it reaches callers.
///
/// [`FormOutcome::TooLarge`]: crate::reader::FormOutcome::TooLarge
#[derive(Error, Debug)]
pub enum FormError {
    #[error("malformed multipart body: {reason}")]
    Malformed { reason: String },

    #[error("invalid utf-8 byte {byte:#04x} in {location}")]
    BadEncoding { byte: u8, location: String },

    #[error("part header block too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("upload io error: {source}")]
    Upload { source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl FormError {
    pub fn malformed<S: ToString>(str: S) -> Self {
        Self::Malformed { reason: str.to_string() }
    }

    pub fn bad_encoding<S: ToString>(byte: u8, location: S) -> Self {
        Self::BadEncoding { byte, location: location.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn upload<E: Into<io::Error>>(e: E) -> Self {
        Self::Upload { source: e.into() }
    }
}

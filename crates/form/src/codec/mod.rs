//! Streaming codec for multipart bodies.
//!
//! The codec layer turns raw body bytes into a [`PartItem`] event stream:
//!
//! - [`MultipartDecoder`]: boundary state machine implementing
//!   [`tokio_util::codec::Decoder`], emitting part headers, body chunks and
//!   part/stream terminators incrementally
//! - [`header_decoder`]: parsing of one part's header block and its
//!   `content-disposition` parameters
//!
//! [`PartItem`]: crate::protocol::PartItem

pub(crate) mod header_decoder;
mod part_decoder;

pub use header_decoder::parse_disposition;
pub use header_decoder::parse_header_block;
pub use part_decoder::MultipartDecoder;
pub use part_decoder::DEFAULT_HEADER_BLOCK_LIMIT;

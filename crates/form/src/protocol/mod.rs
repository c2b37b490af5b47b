//! Core protocol types for the multipart decoder.
//!
//! This module holds the data model shared between the codec layer and the
//! reader:
//!
//! - [`PartHeaders`] / [`Disposition`]: one part's parsed header block
//! - [`PartItem`]: the decoder's event stream (headers, body chunks, part end, eof)
//! - [`PartOutcome`]: how a part's body will be consumed, decided from headers
//! - [`FormError`]: the fatal error taxonomy

mod part;
pub use part::Disposition;
pub use part::PartHeaders;
pub use part::PartItem;

mod outcome;
pub use outcome::PartOutcome;

mod error;
pub use error::FormError;

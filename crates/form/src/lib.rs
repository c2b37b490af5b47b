//! A streaming multipart/form-data decoder with a nested parameter assembler
//!
//! This crate turns an HTTP request body encoded as `multipart/form-data`
//! (or `multipart/mixed`) into a structured parameter tree, without ever
//! buffering the whole body. The same nested-key assembler also decodes
//! ordinary URL-encoded query strings.
//!
//! # Features
//!
//! - Incremental boundary scanning driven by a chunked, size-bounded,
//!   untrusted byte stream
//! - Per-part classification into in-memory fields, captured named parts,
//!   file uploads streamed to disk, or drained skips
//! - A global byte budget as admission control against resource exhaustion;
//!   exceeding it is a structured outcome, not an error
//! - The bracketed key grammar (`foo[bar][]`) with exact duplicate-key and
//!   list-ordering semantics, shared between multipart bodies and query
//!   strings
//! - Optional UTF-8 validation of field values and upload filenames with
//!   byte-precise error reporting
//!
//! # Example
//!
//! ```no_run
//! use micro_form::reader::{boundary_from_content_type, FormOptions, FormOutcome, FormReader};
//! use micro_form::sink::{TempDirProvider, TempFileSink};
//! use micro_form::source::BytesSource;
//!
//! # async fn example(content_type: &str, body: Vec<u8>) -> Result<(), micro_form::protocol::FormError> {
//! let boundary = boundary_from_content_type(content_type).expect("not a multipart request");
//!
//! let reader = FormReader::new(
//!     BytesSource::new(body),
//!     TempFileSink,
//!     TempDirProvider::default(),
//!     FormOptions::default(),
//! );
//!
//! match reader.parse(&boundary).await? {
//!     FormOutcome::Complete(params) => {
//!         if let Some(name) = params.get("name").and_then(|v| v.as_str()) {
//!             println!("name = {name}");
//!         }
//!     }
//!     FormOutcome::TooLarge => {
//!         // map to an HTTP 413-class response
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Query strings go through the same assembler:
//!
//! ```
//! use micro_form::params::decode_query;
//!
//! let params = decode_query("user[name]=ada&user[tags][]=x&user[tags][]=y").unwrap();
//! assert_eq!(params["user"].get("name").and_then(|v| v.as_str()), Some("ada"));
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: the boundary state machine ([`codec::MultipartDecoder`]) and
//!   part header parsing, implementing `tokio_util::codec::Decoder`
//! - [`reader`]: drives a [`source::BodySource`] through the decoder, owns
//!   the byte budget, classifies parts and produces the final tree
//! - [`params`]: the parameter tree and the nested-key fold
//! - [`protocol`]: shared part/event/error types
//! - [`sink`] / [`source`]: the filesystem and byte-supplier seams
//!
//! # Resource model
//!
//! Parsing is single-threaded per request and driven cooperatively by source
//! reads, each an await point. Memory is bounded by the configured read size
//! rather than the body size: skipped and file-upload bytes are never
//! buffered wholesale, only scalar and captured-part bytes accumulate, and
//! those are capped by the byte budget. Every opened upload handle is closed
//! exactly once on every exit path, including budget exhaustion and fatal
//! errors.

pub mod codec;
pub mod params;
pub mod protocol;
pub mod reader;
pub mod sink;
pub mod source;
pub mod utf8;

mod utils;
pub(crate) use utils::ensure;

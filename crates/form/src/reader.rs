//! The multipart reader: drives a [`BodySource`] through the boundary
//! decoder, owns the global byte budget, classifies parts and routes their
//! bodies to memory or a [`FileSink`], finally assembling the parameter tree.
//!
//! Exceeding the budget is not an error: the parse stops issuing reads and
//! returns [`FormOutcome::TooLarge`], discarding whatever accumulated before
//! the overflow — a partially received body is not a safe artifact to hand to
//! application code. All fatal paths close any open upload handle before
//! unwinding.

use crate::codec::{parse_disposition, MultipartDecoder};
use crate::params::{assemble, CapturedPart, ParamMap, ParamValue, UploadFile};
use crate::protocol::{FormError, PartHeaders, PartItem, PartOutcome};
use crate::sink::{FileSink, TempDirProvider};
use crate::source::BodySource;
use crate::utf8::validate_utf8;
use bytes::BytesMut;
use mime::Mime;
use std::path::PathBuf;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

/// Default total byte budget for one body
pub const DEFAULT_LENGTH: i64 = 8_000_000;

/// Default maximum bytes requested per [`BodySource`] read
pub const DEFAULT_READ_LENGTH: usize = 1_000_000;

/// Budget knobs applied while scanning part header blocks specifically;
/// unset fields inherit the outer [`FormOptions`] values.
#[derive(Debug, Clone, Default)]
pub struct HeaderOptions {
    pub length: Option<usize>,
    pub read_length: Option<usize>,
}

/// Configuration surface of one parse.
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Total byte budget for the whole body
    pub length: i64,
    /// Maximum bytes requested per body read
    pub read_length: usize,
    pub headers: HeaderOptions,
    /// Field name under which headerless parts are collected as a list;
    /// unset, such parts are skipped
    pub include_unnamed_parts_at: Option<String>,
    /// Validate that field values decode as UTF-8
    pub validate_utf8: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            read_length: DEFAULT_READ_LENGTH,
            headers: HeaderOptions::default(),
            include_unnamed_parts_at: None,
            validate_utf8: true,
        }
    }
}

/// The structured result of a parse that did not hit a fatal error.
#[derive(Debug)]
pub enum FormOutcome {
    /// The closing boundary was consumed within budget
    Complete(ParamMap),
    /// The byte budget was exceeded; accumulated data was discarded
    TooLarge,
}

impl FormOutcome {
    pub fn is_too_large(&self) -> bool {
        matches!(self, FormOutcome::TooLarge)
    }

    pub fn into_params(self) -> Option<ParamMap> {
        match self {
            FormOutcome::Complete(params) => Some(params),
            FormOutcome::TooLarge => None,
        }
    }
}

/// Extracts the boundary parameter from a `multipart/form-data` or
/// `multipart/mixed` content type.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mime: Mime = content_type.parse().ok()?;
    if mime.type_() != mime::MULTIPART {
        return None;
    }
    if mime.subtype() != mime::FORM_DATA && mime.subtype().as_str() != "mixed" {
        return None;
    }
    mime.get_param(mime::BOUNDARY).map(|b| b.as_str().to_string())
}

/// What the reader is doing with the current part's body.
enum PartState<H> {
    /// Between parts
    Idle,
    /// Accumulating an in-memory field
    Binary { name: String, buf: BytesMut },
    /// Capturing headers and body together as a list element
    Named { key: String, headers: PartHeaders, buf: BytesMut },
    /// Streaming to a temp file; the handle opens lazily on the first byte
    Upload {
        name: String,
        filename: String,
        content_type: Option<String>,
        path: PathBuf,
        handle: Option<H>,
    },
    /// Draining a part whose bytes are discarded
    Skip,
}

/// Streaming multipart reader over a [`BodySource`] and a [`FileSink`].
pub struct FormReader<S, F: FileSink> {
    source: S,
    sink: F,
    temp: TempDirProvider,
    options: FormOptions,
}

impl<S, F> FormReader<S, F>
where
    S: BodySource,
    F: FileSink,
{
    pub fn new(source: S, sink: F, temp: TempDirProvider, options: FormOptions) -> Self {
        Self { source, sink, temp, options }
    }

    /// Parses the whole body, consuming the reader.
    ///
    /// Returns `Ok(FormOutcome::TooLarge)` when the byte budget runs out,
    /// `Ok(FormOutcome::Complete(..))` on a clean closing boundary, and a
    /// fatal [`FormError`] for malformed input, encoding failures, source
    /// read failures or sink write failures. Any open upload handle is
    /// closed before this function returns, on every path.
    pub async fn parse(mut self, boundary: &str) -> Result<FormOutcome, FormError> {
        let header_limit = self.options.headers.length.unwrap_or_else(|| self.options.length.max(0) as usize);
        let mut decoder = MultipartDecoder::with_header_limit(boundary, header_limit);

        let mut buf = BytesMut::new();
        let mut budget: i64 = self.options.length;
        let mut finished = false;
        let mut state: PartState<F::Handle> = PartState::Idle;
        let mut pairs: Vec<(String, ParamValue)> = Vec::new();

        loop {
            let decoded = if finished { decoder.decode_eof(&mut buf) } else { decoder.decode(&mut buf) };

            let item = match decoded {
                Ok(item) => item,
                Err(FormError::TooLargeHeader { current_size, max_size }) => {
                    debug!(current_size, max_size, "header block exceeded budget");
                    self.abort(state);
                    return Ok(FormOutcome::TooLarge);
                }
                Err(e) => {
                    self.abort(state);
                    return Err(e);
                }
            };

            match item {
                Some(PartItem::Headers(headers)) => {
                    // no handle can be open between parts, nothing to abort
                    state = self.classify(&headers)?;
                }

                Some(PartItem::Chunk(bytes)) => {
                    if let Err(e) = self.consume_chunk(&mut state, &bytes) {
                        self.abort(state);
                        return Err(e);
                    }
                }

                Some(PartItem::End) => {
                    let finished_part = std::mem::replace(&mut state, PartState::Idle);
                    self.finish_part(finished_part, &mut pairs)?;
                }

                Some(PartItem::Eof) => {
                    debug!(pair_count = pairs.len(), "multipart body complete");
                    return Ok(FormOutcome::Complete(assemble(pairs)));
                }

                // the decoder needs more bytes
                None => {
                    if budget <= 0 {
                        debug!("byte budget exhausted, abandoning parse");
                        self.abort(state);
                        return Ok(FormOutcome::TooLarge);
                    }

                    let read_len = if decoder.is_in_headers() {
                        self.options.headers.read_length.unwrap_or(self.options.read_length)
                    } else {
                        self.options.read_length
                    };

                    let chunk = match self.source.read(read_len).await {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            self.abort(state);
                            return Err(e.into());
                        }
                    };

                    trace!(len = chunk.bytes.len(), finished = chunk.finished, "read body bytes");
                    budget -= chunk.bytes.len() as i64;
                    if budget < 0 {
                        debug!("byte budget exceeded, abandoning parse");
                        self.abort(state);
                        return Ok(FormOutcome::TooLarge);
                    }
                    finished = chunk.finished;
                    buf.extend_from_slice(&chunk.bytes);
                }
            }
        }
    }

    fn classify(&mut self, headers: &PartHeaders) -> Result<PartState<F::Handle>, FormError> {
        let disposition = parse_disposition(headers)?;
        let outcome =
            PartOutcome::classify(disposition.as_ref(), headers, self.options.include_unnamed_parts_at.as_deref());
        trace!(?outcome, "classified part");

        Ok(match outcome {
            PartOutcome::Binary(name) => PartState::Binary { name, buf: BytesMut::new() },
            PartOutcome::NamedPart(key) => PartState::Named { key, headers: headers.clone(), buf: BytesMut::new() },
            PartOutcome::FileUpload { name, content_type } => {
                let disposition = disposition.unwrap_or_default();
                let filename = disposition.filename.or(disposition.filename_ext).unwrap_or_default();
                PartState::Upload { name, filename, content_type, path: self.temp.fresh_path(), handle: None }
            }
            PartOutcome::Skip => PartState::Skip,
        })
    }

    fn consume_chunk(&mut self, state: &mut PartState<F::Handle>, bytes: &[u8]) -> Result<(), FormError> {
        match state {
            PartState::Binary { buf, .. } | PartState::Named { buf, .. } => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            PartState::Upload { path, handle, .. } => match handle {
                Some(opened) => self.sink.write(opened, bytes).map_err(FormError::upload),
                None => {
                    // stored before the first write so an abort can still close it
                    let opened = handle.insert(self.sink.open(path).map_err(FormError::upload)?);
                    self.sink.write(opened, bytes).map_err(FormError::upload)
                }
            },
            // drained for boundary synchronization, bytes discarded
            PartState::Skip | PartState::Idle => Ok(()),
        }
    }

    fn finish_part(&mut self, state: PartState<F::Handle>, pairs: &mut Vec<(String, ParamValue)>) -> Result<(), FormError> {
        match state {
            PartState::Idle | PartState::Skip => Ok(()),

            PartState::Binary { name, buf } => {
                let value = if self.options.validate_utf8 {
                    ParamValue::Text(validate_utf8(&buf, &name)?)
                } else {
                    match String::from_utf8(buf.to_vec()) {
                        Ok(text) => ParamValue::Text(text),
                        Err(_) => ParamValue::Binary(buf.freeze()),
                    }
                };
                pairs.push((name, value));
                Ok(())
            }

            PartState::Named { key, headers, buf } => {
                // collected as a list element under the configured key
                pairs.push((format!("{key}[]"), ParamValue::Part(CapturedPart { headers, body: buf.freeze() })));
                Ok(())
            }

            PartState::Upload { name, filename, content_type, path, handle } => {
                // a zero-byte upload still materializes an (empty) temp file
                let handle = match handle {
                    Some(handle) => handle,
                    None => self.sink.open(&path).map_err(FormError::upload)?,
                };
                self.sink.close(handle).map_err(FormError::upload)?;

                pairs.push((name, ParamValue::Upload(UploadFile { filename, temp_path: path, content_type })));
                Ok(())
            }
        }
    }

    /// Closes an in-flight upload handle on an abandonment path. The close
    /// error, if any, is irrelevant at this point and dropped.
    fn abort(&mut self, state: PartState<F::Handle>) {
        if let PartState::Upload { handle: Some(handle), .. } = state {
            let _ = self.sink.close(handle);
        }
    }
}

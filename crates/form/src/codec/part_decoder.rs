//! Streaming multipart boundary decoder.
//!
//! [`MultipartDecoder`] implements [`Decoder`] over a `BytesMut` fed by the
//! caller, splitting the raw body into a [`PartItem`] event stream without
//! ever buffering a whole part. The state machine loops
//! `Preamble -> Delimiter -> Headers -> Body -> Delimiter -> ...` until the
//! closing `--boundary--` delimiter moves it to `End`.
//!
//! `Ok(None)` always means "need more data"; malformed boundary or header
//! syntax is a fatal [`FormError`]. Body bytes are handed out as zero-copy
//! `Bytes` chunks as soon as they are known not to overlap a boundary, so
//! memory held here is bounded by the feed size plus one boundary tail.

use crate::codec::header_decoder::parse_header_block;
use crate::protocol::{FormError, PartItem};
use crate::ensure;
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Default cap on one part's header block, used when the caller configures
/// no explicit headers budget
pub const DEFAULT_HEADER_BLOCK_LIMIT: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Discarding bytes before the first boundary delimiter
    Preamble,
    /// A delimiter was consumed, expecting CRLF (next part) or `--` (close)
    Delimiter,
    /// Accumulating one part's header block up to the empty line
    Headers,
    /// Streaming one part's body up to the next boundary delimiter
    Body,
    /// The closing delimiter was consumed
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartDecoder {
    /// `--boundary`, as matched in the preamble
    delimiter: Vec<u8>,
    /// `\r\n--boundary`, as matched inside part bodies
    body_delimiter: Vec<u8>,
    header_limit: usize,
    state: State,
}

impl MultipartDecoder {
    pub fn new(boundary: &str) -> Self {
        Self::with_header_limit(boundary, DEFAULT_HEADER_BLOCK_LIMIT)
    }

    pub fn with_header_limit(boundary: &str, header_limit: usize) -> Self {
        let delimiter = [b"--", boundary.as_bytes()].concat();
        let body_delimiter = [b"\r\n--", boundary.as_bytes()].concat();
        Self { delimiter, body_delimiter, header_limit, state: State::Preamble }
    }

    /// True while the decoder is scanning a header block; the reader uses
    /// this to apply the headers-specific read size.
    pub fn is_in_headers(&self) -> bool {
        self.state == State::Headers
    }

    fn decode_preamble(&mut self, src: &mut BytesMut) -> Option<()> {
        match find_subsequence(src, &self.delimiter) {
            Some(idx) => {
                trace!(skipped = idx, "found first boundary delimiter");
                src.advance(idx + self.delimiter.len());
                self.state = State::Delimiter;
                Some(())
            }
            None => {
                // drop preamble bytes that can no longer be part of a match
                let keep = self.delimiter.len().saturating_sub(1).min(src.len());
                src.advance(src.len() - keep);
                None
            }
        }
    }

    fn decode_delimiter(&mut self, src: &mut BytesMut) -> Result<Option<()>, FormError> {
        if src.len() < 2 {
            return Ok(None);
        }

        match &src[..2] {
            b"\r\n" => {
                src.advance(2);
                self.state = State::Headers;
                Ok(Some(()))
            }
            b"--" => {
                trace!("found closing boundary delimiter");
                src.advance(2);
                self.state = State::End;
                Ok(Some(()))
            }
            _ => Err(FormError::malformed("boundary delimiter not followed by CRLF or --")),
        }
    }

    fn decode_headers(&mut self, src: &mut BytesMut) -> Result<Option<PartItem>, FormError> {
        // a headerless part is a bare empty line
        let block_len = if src.starts_with(b"\r\n") {
            Some(2)
        } else {
            find_subsequence(src, b"\r\n\r\n").map(|idx| idx + 4)
        };

        let Some(block_len) = block_len else {
            ensure!(src.len() <= self.header_limit, FormError::too_large_header(src.len(), self.header_limit));
            return Ok(None);
        };

        ensure!(block_len <= self.header_limit, FormError::too_large_header(block_len, self.header_limit));

        let block = src.split_to(block_len);
        let headers = parse_header_block(&block)?;
        trace!(header_count = headers.len(), "parsed part header block");

        self.state = State::Body;
        Ok(Some(PartItem::Headers(headers)))
    }

    fn decode_body(&mut self, src: &mut BytesMut) -> Result<Option<PartItem>, FormError> {
        match find_subsequence(src, &self.body_delimiter) {
            Some(0) => {
                src.advance(self.body_delimiter.len());
                self.state = State::Delimiter;
                Ok(Some(PartItem::End))
            }
            Some(idx) => {
                let bytes = src.split_to(idx).freeze();
                trace!(len = bytes.len(), "read part body bytes up to boundary");
                Ok(Some(PartItem::Chunk(bytes)))
            }
            None => {
                // everything except a possible boundary tail is body data
                let keep = self.body_delimiter.len().saturating_sub(1).min(src.len());
                let emit = src.len() - keep;
                if emit == 0 {
                    return Ok(None);
                }
                let bytes = src.split_to(emit).freeze();
                trace!(len = bytes.len(), "read part body bytes");
                Ok(Some(PartItem::Chunk(bytes)))
            }
        }
    }
}

impl Decoder for MultipartDecoder {
    type Item = PartItem;
    type Error = FormError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Preamble => {
                    if self.decode_preamble(src).is_none() {
                        return Ok(None);
                    }
                }
                State::Delimiter => match self.decode_delimiter(src)? {
                    Some(()) if self.state == State::End => return Ok(Some(PartItem::Eof)),
                    Some(()) => {}
                    None => return Ok(None),
                },
                State::Headers => return self.decode_headers(src),
                State::Body => return self.decode_body(src),
                State::End => return Ok(Some(PartItem::Eof)),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(buf)? {
            return Ok(Some(item));
        }

        match self.state {
            State::End => Ok(None),
            State::Headers => Err(FormError::malformed("stream ended inside a part header block")),
            _ => Err(FormError::malformed("stream ended before the closing boundary")),
        }
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    const BOUNDARY: &str = "xYzZY";

    fn body(parts: &[(&str, &str)]) -> BytesMut {
        let mut out = String::new();
        for (headers, body) in parts {
            out.push_str("--");
            out.push_str(BOUNDARY);
            out.push_str("\r\n");
            out.push_str(headers);
            out.push_str("\r\n");
            out.push_str(body);
            out.push_str("\r\n");
        }
        out.push_str("--");
        out.push_str(BOUNDARY);
        out.push_str("--\r\n");
        BytesMut::from(out.as_str())
    }

    fn drain(decoder: &mut MultipartDecoder, src: &mut BytesMut) -> Vec<PartItem> {
        let mut items = Vec::new();
        while let Some(item) = decoder.decode_eof(src).unwrap() {
            let stop = item.is_eof();
            items.push(item);
            if stop {
                break;
            }
        }
        items
    }

    #[test]
    fn two_fields() {
        let mut src = body(&[
            ("content-disposition: form-data; name=\"a\"\r\n", "hello"),
            ("content-disposition: form-data; name=\"b\"\r\n", "world"),
        ]);

        let mut decoder = MultipartDecoder::new(BOUNDARY);
        let items = drain(&mut decoder, &mut src);

        assert_eq!(items.len(), 7);
        assert!(matches!(&items[0], PartItem::Headers(h) if h.content_disposition().is_some()));
        assert_eq!(items[1], PartItem::Chunk("hello".into()));
        assert_eq!(items[2], PartItem::End);
        assert!(matches!(&items[3], PartItem::Headers(_)));
        assert_eq!(items[4], PartItem::Chunk("world".into()));
        assert_eq!(items[5], PartItem::End);
        assert_eq!(items[6], PartItem::Eof);
    }

    #[test]
    fn zero_byte_part() {
        let mut src = body(&[("content-disposition: form-data; name=\"empty\"\r\n", "")]);

        let mut decoder = MultipartDecoder::new(BOUNDARY);
        let items = drain(&mut decoder, &mut src);

        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], PartItem::Headers(_)));
        assert_eq!(items[1], PartItem::End);
        assert_eq!(items[2], PartItem::Eof);
    }

    #[test]
    fn preamble_is_skipped() {
        let mut raw = BytesMut::from("this is ignored preamble text\r\n");
        raw.extend_from_slice(&body(&[("content-disposition: form-data; name=\"a\"\r\n", "x")]));

        let mut decoder = MultipartDecoder::new(BOUNDARY);
        let items = drain(&mut decoder, &mut raw);

        assert_eq!(items[1], PartItem::Chunk("x".into()));
        assert!(items.last().unwrap().is_eof());
    }

    #[test]
    fn body_split_across_feeds_reassembles() {
        let full = body(&[("content-disposition: form-data; name=\"a\"\r\n", "hello cruel world")]);

        // feed one byte at a time, collecting chunk bytes
        let mut decoder = MultipartDecoder::new(BOUNDARY);
        let mut src = BytesMut::new();
        let mut collected = Vec::new();
        let mut saw_end = false;

        for byte in &full[..] {
            src.extend_from_slice(&[*byte]);
            while let Some(item) = decoder.decode(&mut src).unwrap() {
                match item {
                    PartItem::Chunk(bytes) => collected.extend_from_slice(&bytes),
                    PartItem::End => saw_end = true,
                    _ => {}
                }
                if decoder.state == State::End {
                    break;
                }
            }
        }

        assert!(saw_end);
        assert_eq!(collected, b"hello cruel world");
    }

    #[test]
    fn headers_over_limit_fail() {
        let huge = format!("x-filler: {}\r\n", "a".repeat(256));
        let mut src = body(&[(huge.as_str(), "x")]);

        let mut decoder = MultipartDecoder::with_header_limit(BOUNDARY, 64);
        let err = loop {
            match decoder.decode(&mut src) {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected header limit error"),
                Err(e) => break e,
            }
        };

        assert!(matches!(err, FormError::TooLargeHeader { max_size: 64, .. }));
    }

    #[test]
    fn truncated_header_block_is_malformed() {
        let mut src = BytesMut::from(format!("--{BOUNDARY}\r\ncontent-disposition: form-da").as_str());

        let mut decoder = MultipartDecoder::new(BOUNDARY);
        assert!(decoder.decode(&mut src).unwrap().is_none());

        let err = decoder.decode_eof(&mut src).unwrap_err();
        assert!(matches!(err, FormError::Malformed { .. }));
    }

    #[test]
    fn truncated_body_is_malformed() {
        let mut src =
            BytesMut::from(format!("--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"a\"\r\n\r\npartial").as_str());

        let mut decoder = MultipartDecoder::new(BOUNDARY);
        // headers come out fine, then chunks, then eof is an error
        let err = loop {
            match decoder.decode_eof(&mut src) {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected truncation error"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, FormError::Malformed { .. }));
    }

    #[test]
    fn garbage_after_delimiter_is_malformed() {
        let mut src = BytesMut::from(format!("--{BOUNDARY}xx\r\n\r\nwat").as_str());

        let mut decoder = MultipartDecoder::new(BOUNDARY);
        let err = decoder.decode(&mut src).unwrap_err();
        assert!(matches!(err, FormError::Malformed { .. }));
    }
}

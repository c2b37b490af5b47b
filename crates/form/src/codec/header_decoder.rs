//! Part header block parsing.
//!
//! A part's header block is a sequence of CRLF-terminated `name: value` lines
//! closed by an empty line. The block is parsed with `httparse`, keeping
//! header names verbatim as received, then the `content-disposition` value is
//! split into its parameters ([`Disposition`]).
//!
//! The RFC 5987 `filename*` form is recognized when its value starts with the
//! literal `utf-8''` prefix; the remainder is percent-decoded and UTF-8
//! validated, and a validation failure is a [`FormError::BadEncoding`] naming
//! the filename rather than a silent drop.

use crate::protocol::{Disposition, FormError, PartHeaders};
use crate::utf8::validate_utf8;
use httparse::Status;

/// Maximum number of headers allowed in one part's header block
const MAX_PART_HEADER_NUM: usize = 32;

/// Parses one complete header block (including the terminating empty line)
/// into ordered, verbatim-name header pairs.
pub fn parse_header_block(block: &[u8]) -> Result<PartHeaders, FormError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_PART_HEADER_NUM];

    match httparse::parse_headers(block, &mut headers) {
        Ok(Status::Complete((_, parsed))) => {
            let mut pairs = Vec::with_capacity(parsed.len());
            for header in parsed {
                let value = std::str::from_utf8(header.value)
                    .map_err(|_| FormError::malformed(format!("header {} value is not utf-8", header.name)))?;
                pairs.push((header.name.to_string(), value.to_string()));
            }
            Ok(PartHeaders::new(pairs))
        }
        // the decoder only hands over complete blocks, a partial here means
        // the terminator was bogus
        Ok(Status::Partial) => Err(FormError::malformed("part header block not terminated")),
        Err(e) => Err(FormError::malformed(format!("invalid part header: {e}"))),
    }
}

/// Parses the `content-disposition` header of a part, if present.
pub fn parse_disposition(headers: &PartHeaders) -> Result<Option<Disposition>, FormError> {
    let Some(value) = headers.content_disposition() else {
        return Ok(None);
    };

    let mut disposition = Disposition::default();

    // the first `;` segment is the disposition type (`form-data`), the rest
    // are key=value parameters
    for param in value.split(';').skip(1) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let raw = unquote(raw.trim());

        match key {
            "name" => disposition.name = Some(raw.to_string()),
            "filename" => disposition.filename = Some(raw.to_string()),
            "filename*" => disposition.filename_ext = decode_extended_filename(raw)?,
            _ => {}
        }
    }

    Ok(Some(disposition))
}

/// Decodes an RFC 5987 `filename*` value of the form `utf-8''percent%20encoded`.
///
/// Values with any other charset prefix are not recognized and yield `None`.
fn decode_extended_filename(raw: &str) -> Result<Option<String>, FormError> {
    const PREFIX: &str = "utf-8''";

    let Some(encoded) = raw.strip_prefix(PREFIX) else {
        return Ok(None);
    };

    let bytes = urlencoding::decode_binary(encoded.as_bytes());
    validate_utf8(&bytes, "filename").map(Some)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

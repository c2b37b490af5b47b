use bytes::Bytes;

/// The ordered header block of exactly one part.
///
/// Header names are preserved verbatim as received on the wire (no case
/// normalization); lookup is case-insensitive as multipart producers disagree
/// on capitalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    headers: Vec<(String, String)>,
}

impl PartHeaders {
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self { headers }
    }

    /// Returns the first header value whose name matches, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    pub fn content_disposition(&self) -> Option<&str> {
        self.get("content-disposition")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Parsed parameters of a `content-disposition` header.
///
/// Every field is optional: a part may carry no disposition at all, a bare
/// `name`, or a `name` plus one of the filename forms. `filename_ext` holds
/// the RFC 5987 `filename*` value after percent decoding and UTF-8 validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disposition {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub filename_ext: Option<String>,
}

/// Represents an item in the decoded multipart event stream.
///
/// The decoder produces these in strict order: for each part a `Headers`
/// event, zero or more `Chunk` events, then `End`; after the closing
/// boundary a single `Eof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartItem {
    /// The complete header block of the next part
    Headers(PartHeaders),
    /// A slice of the current part's body
    Chunk(Bytes),
    /// The current part's body is complete
    End,
    /// The closing boundary was consumed, no more parts follow
    Eof,
}

impl PartItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PartItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PartItem::Chunk(_))
    }

    /// Consumes the item and returns the contained bytes if this is a `Chunk`.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PartItem::Chunk(bytes) => Some(bytes),
            _ => None,
        }
    }
}
